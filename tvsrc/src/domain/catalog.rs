//! Static channel catalog.
//!
//! The catalog file is plain text:
//!
//! ```text
//! News,#genre#
//! CNN,rtmp://old1
//! CNN,rtmp://old2
//! BBC
//! ```
//!
//! A `<category>,#genre#` line opens a category. Every following
//! `<channel>,<url>` line adds a fallback URL; a bare `<channel>` line declares
//! a channel without fallbacks. Blank lines and lines starting with `#` are
//! skipped.

use std::path::Path;

use indexmap::IndexMap;

use crate::{Error, Result};

/// Marker that turns a line into a category header.
pub const GENRE_MARKER: &str = "#genre#";

/// Ordered channel name → fallback URLs.
pub type CategoryChannels = IndexMap<String, Vec<String>>;

/// Ordered category → channel → fallback URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelCatalog {
    categories: IndexMap<String, CategoryChannels>,
}

impl ChannelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel with its fallback URLs, creating the category if needed.
    ///
    /// Adding the same channel twice extends its fallback list.
    pub fn insert(
        &mut self,
        category: impl Into<String>,
        channel: impl Into<String>,
        fallback_urls: impl IntoIterator<Item = String>,
    ) {
        self.categories
            .entry(category.into())
            .or_default()
            .entry(channel.into())
            .or_default()
            .extend(fallback_urls);
    }

    /// Parse the catalog text format.
    pub fn parse(text: &str) -> Result<Self> {
        let mut catalog = Self::new();
        let mut current: Option<String> = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (name, value) = match line.split_once(',') {
                Some((name, value)) => (name.trim(), value.trim()),
                None => (line, ""),
            };
            if name.is_empty() {
                return Err(Error::catalog(line_no, "missing name"));
            }

            if value == GENRE_MARKER {
                catalog.categories.entry(name.to_string()).or_default();
                current = Some(name.to_string());
                continue;
            }

            let Some(category) = current.as_ref() else {
                return Err(Error::catalog(
                    line_no,
                    format!("channel '{name}' appears before any category"),
                ));
            };

            let urls = if value.is_empty() {
                Vec::new()
            } else {
                vec![value.to_string()]
            };
            catalog.insert(category.clone(), name, urls);
        }

        Ok(catalog)
    }

    /// Categories in definition order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &CategoryChannels)> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every `(category, channel, fallback_urls)` in definition order.
    pub fn channels(&self) -> impl Iterator<Item = (&str, &str, &[String])> {
        self.categories.iter().flat_map(|(category, channels)| {
            channels
                .iter()
                .map(move |(name, urls)| (category.as_str(), name.as_str(), urls.as_slice()))
        })
    }

    /// Channel names in definition order.
    pub fn channel_names(&self) -> Vec<String> {
        self.channels().map(|(_, name, _)| name.to_string()).collect()
    }

    pub fn channel_count(&self) -> usize {
        self.categories.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.channel_count() == 0
    }
}

/// Read and parse the catalog file.
pub async fn load_catalog(path: &Path) -> Result<ChannelCatalog> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io_path("reading catalog", path, e))?;
    ChannelCatalog::parse(&text)
}

//! Candidate URLs and the per-channel candidate set.

use std::fmt;

use indexmap::IndexMap;

/// A single discovered URL for a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateRecord {
    pub url: String,
    /// Observation date reported by the provider.
    pub observed_date: Option<String>,
    /// Resolution reported by the provider, e.g. `1920x1080` or `720p`.
    pub resolution: Option<String>,
}

impl CandidateRecord {
    pub fn new(
        url: impl Into<String>,
        observed_date: Option<String>,
        resolution: Option<String>,
    ) -> Self {
        Self {
            url: url.into(),
            observed_date,
            resolution,
        }
    }

    /// A catalog fallback URL without metadata.
    pub fn fallback(url: impl Into<String>) -> Self {
        Self::new(url, None, None)
    }
}

/// Identity of a channel within the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey {
    pub category: String,
    pub name: String,
}

impl ChannelKey {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// Candidate records per channel.
///
/// Only non-empty entries are stored; a channel without candidates is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    entries: IndexMap<ChannelKey, Vec<CandidateRecord>>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records to a channel's entry, keeping insertion order.
    pub fn extend(&mut self, key: &ChannelKey, records: impl IntoIterator<Item = CandidateRecord>) {
        let mut records = records.into_iter().peekable();
        if records.peek().is_none() {
            return;
        }
        self.entries.entry(key.clone()).or_default().extend(records);
    }

    /// Replace a channel's entry. An empty list removes the channel.
    pub fn replace(&mut self, key: ChannelKey, records: Vec<CandidateRecord>) {
        if records.is_empty() {
            self.entries.shift_remove(&key);
        } else {
            self.entries.insert(key, records);
        }
    }

    /// Candidates for `(category, name)`, empty when absent.
    pub fn candidates(&self, category: &str, name: &str) -> &[CandidateRecord] {
        self.entries
            .get(&ChannelKey::new(category, name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, key: &ChannelKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChannelKey, &[CandidateRecord])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of channels with candidates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of candidate records across all channels.
    pub fn candidate_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

impl IntoIterator for CandidateSet {
    type Item = (ChannelKey, Vec<CandidateRecord>);
    type IntoIter = indexmap::map::IntoIter<ChannelKey, Vec<CandidateRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

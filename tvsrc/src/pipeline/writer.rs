//! Writes the final candidates into the working result file.
//!
//! Output format, in catalog order:
//!
//! ```text
//! News,#genre#
//! CNN,http://a
//! CNN,http://b
//! ```

use std::path::PathBuf;

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::progress::{SharedReporter, StageProgress, format_eta};
use crate::domain::catalog::GENRE_MARKER;
use crate::domain::{CandidateRecord, CandidateSet, ChannelCatalog};
use crate::utils::fs::{ensure_parent_dir, io_error};
use crate::{Error, Result};

/// Plain URLs of a channel, in candidate order, optionally truncated.
pub fn channel_urls(records: &[CandidateRecord], limit: Option<usize>) -> Vec<&str> {
    let limit = limit.unwrap_or(usize::MAX);
    records.iter().map(|r| r.url.as_str()).take(limit).collect()
}

pub struct ResultWriter {
    path: PathBuf,
    urls_limit: Option<usize>,
}

impl ResultWriter {
    pub fn new(path: impl Into<PathBuf>, urls_limit: Option<usize>) -> Self {
        Self {
            path: path.into(),
            urls_limit,
        }
    }

    /// Write every catalog channel to the working file, replacing whatever a
    /// previous run left there.
    pub async fn write(
        &self,
        catalog: &ChannelCatalog,
        candidates: &CandidateSet,
        reporter: SharedReporter,
        token: &CancellationToken,
    ) -> Result<()> {
        let total = catalog.channel_count();
        reporter.report(&format!("Writing, {total} channels remaining"), 0, false);

        ensure_parent_dir(&self.path).await?;
        let file = File::create(&self.path)
            .await
            .map_err(|e| io_error("creating", &self.path, e))?;
        let mut out = BufWriter::new(file);
        let progress = StageProgress::new(total, reporter.clone());
        let mut urls_written = 0usize;

        for (category, channels) in catalog.categories() {
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }
            self.write_line(&mut out, &format!("{category},{GENRE_MARKER}"))
                .await?;

            for name in channels.keys() {
                if token.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let urls = channel_urls(candidates.candidates(category, name), self.urls_limit);
                for url in &urls {
                    self.write_line(&mut out, &format!("{name},{url}")).await?;
                }
                urls_written += urls.len();

                progress.advance(|s| {
                    format!(
                        "Writing, {} channels remaining, estimated time left: {}",
                        s.remaining(),
                        format_eta(s.eta())
                    )
                });
            }
        }

        if total == 0 {
            reporter.report("Writing, 0 channels remaining", 100, false);
        }

        out.flush()
            .await
            .map_err(|e| io_error("writing", &self.path, e))?;
        out.get_ref()
            .sync_all()
            .await
            .map_err(|e| io_error("syncing", &self.path, e))?;

        info!(
            path = %self.path.display(),
            channels = total,
            urls = urls_written,
            "Wrote working result"
        );
        Ok(())
    }

    async fn write_line(&self, out: &mut BufWriter<File>, line: &str) -> Result<()> {
        out.write_all(line.as_bytes())
            .await
            .map_err(|e| io_error("writing", &self.path, e))?;
        out.write_all(b"\n")
            .await
            .map_err(|e| io_error("writing", &self.path, e))
    }
}

//! Merges provider outputs and catalog fallbacks into one candidate set.

use tracing::debug;

use crate::domain::{CandidateRecord, CandidateSet, ChannelCatalog, ChannelKey, normalize_channel_name};
use crate::providers::{EnabledProviders, ProviderOutputs};
use crate::utils::url::UrlValidator;

/// Build the candidate set for every catalog channel.
///
/// Enabled providers are consulted in priority order and only URLs accepted by
/// `validator` are kept. A channel left without candidates falls back to its
/// catalog URLs, which carry no metadata. Duplicates are kept.
pub fn aggregate(
    catalog: &ChannelCatalog,
    enabled: EnabledProviders,
    outputs: &ProviderOutputs,
    validator: &dyn UrlValidator,
) -> CandidateSet {
    let mut set = CandidateSet::new();
    let mut fallbacks = 0usize;

    for (category, name, fallback_urls) in catalog.channels() {
        let key = ChannelKey::new(category, name);
        let normalized = normalize_channel_name(name);

        for kind in enabled.kinds() {
            let Some(found) = outputs.get(&kind).and_then(|r| r.get(&normalized)) else {
                continue;
            };
            set.extend(
                &key,
                found
                    .iter()
                    .filter(|record| validator.is_valid(&record.url))
                    .cloned(),
            );
        }

        if !set.contains(&key) && !fallback_urls.is_empty() {
            fallbacks += 1;
            set.extend(
                &key,
                fallback_urls.iter().map(|url| CandidateRecord::fallback(url.as_str())),
            );
        }
    }

    debug!(
        channels = set.len(),
        candidates = set.candidate_count(),
        fallbacks,
        "Aggregated candidates"
    );
    set
}

//! Channel name normalization.
//!
//! Providers key their results by the normalized name so that `CCTV-1 HD`,
//! `cctv1` and `CCTV1(高清)` all land on the same catalog channel.

use std::sync::LazyLock;

use regex::Regex;

static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[-_\s]|\([^)]*\)|（[^）]*）|\[[^\]]*\]|频道|标清|高清|超清|\bhd\b")
        .expect("channel name pattern is valid")
});

/// Normalize a channel name for cross-provider matching.
pub fn normalize_channel_name(name: &str) -> String {
    let replaced = name
        .replace("PLUS", "+")
        .replace("plus", "+")
        .replace("Plus", "+")
        .replace('＋', "+");
    NOISE.replace_all(&replaced, "").to_lowercase()
}

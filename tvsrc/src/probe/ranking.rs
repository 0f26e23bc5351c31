//! Ranking policy for probed candidates.
//!
//! Higher resolution first, then lower response time. Ties keep the order in
//! which the candidates were discovered.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

use super::Measured;

static DIMENSIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*[xX×*]\s*(\d+)").expect("dimension pattern is valid"));

static LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|\D)(\d{3,4})\s*[pi](?:\d{2,3})?(?:\D|$)").expect("line pattern is valid"));

/// Comparable size of a resolution string.
///
/// `WxH` yields the pixel count. `NNNp`/`NNNi` are converted to a 16:9 pixel
/// count so the two notations compare sensibly. Anything else is 0.
pub fn resolution_score(resolution: Option<&str>) -> u64 {
    let Some(resolution) = resolution else {
        return 0;
    };

    if let Some(caps) = DIMENSIONS.captures(resolution) {
        let width: u64 = caps[1].parse().unwrap_or(0);
        let height: u64 = caps[2].parse().unwrap_or(0);
        return width.saturating_mul(height);
    }

    if let Some(caps) = LINES.captures(resolution) {
        let height: u64 = caps[1].parse().unwrap_or(0);
        return height.saturating_mul(height).saturating_mul(16) / 9;
    }

    0
}

fn compare(a: &Measured, b: &Measured) -> Ordering {
    let a_score = resolution_score(a.record.resolution.as_deref());
    let b_score = resolution_score(b.record.resolution.as_deref());
    b_score
        .cmp(&a_score)
        .then_with(|| a.response_time_ms.cmp(&b.response_time_ms))
}

/// Sort measurements by the ranking policy. The sort is stable.
pub fn rank_measurements(mut measured: Vec<Measured>) -> Vec<Measured> {
    measured.sort_by(compare);
    measured
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::CandidateRecord;

    fn measured(url: &str, resolution: Option<&str>, ms: u64) -> Measured {
        Measured {
            record: CandidateRecord::new(url, None, resolution.map(str::to_string)),
            response_time_ms: ms,
        }
    }

    #[rstest]
    #[case(None, 0)]
    #[case(Some(""), 0)]
    #[case(Some("unknown"), 0)]
    #[case(Some("1920x1080"), 1920 * 1080)]
    #[case(Some("1280 X 720"), 1280 * 720)]
    #[case(Some("1080p"), 1080 * 1080 * 16 / 9)]
    #[case(Some("720P"), 720 * 720 * 16 / 9)]
    #[case(Some("576i"), 576 * 576 * 16 / 9)]
    #[case(Some("1080p60"), 1080 * 1080 * 16 / 9)]
    #[case(Some("1080p高清"), 1080 * 1080 * 16 / 9)]
    #[case(Some("高清720P"), 720 * 720 * 16 / 9)]
    #[case(Some("HD1080i"), 1080 * 1080 * 16 / 9)]
    #[case(Some("12345p"), 0)]
    fn test_resolution_score(#[case] input: Option<&str>, #[case] expected: u64) {
        assert_eq!(resolution_score(input), expected);
    }

    #[test]
    fn test_line_and_dimension_notations_agree() {
        assert!(resolution_score(Some("1080p")) > resolution_score(Some("1280x720")));
        assert!(resolution_score(Some("720p")) < resolution_score(Some("1920x1080")));
    }

    #[test]
    fn test_resolution_before_speed() {
        let ranked = rank_measurements(vec![
            measured("http://b", Some("720p"), 30),
            measured("http://a", Some("1080p"), 50),
        ]);
        let urls: Vec<_> = ranked.iter().map(|m| m.record.url.as_str()).collect();
        assert_eq!(urls, ["http://a", "http://b"]);
    }

    #[test]
    fn test_speed_breaks_resolution_ties() {
        let ranked = rank_measurements(vec![
            measured("http://slow", None, 300),
            measured("http://fast", None, 20),
            measured("http://hd", Some("1920x1080"), 900),
        ]);
        let urls: Vec<_> = ranked.iter().map(|m| m.record.url.as_str()).collect();
        assert_eq!(urls, ["http://hd", "http://fast", "http://slow"]);
    }

    #[test]
    fn test_full_ties_keep_discovery_order() {
        let ranked = rank_measurements(vec![
            measured("http://first", Some("720p"), 40),
            measured("http://second", Some("720p"), 40),
            measured("http://third", Some("1280x720"), 40),
        ]);
        let urls: Vec<_> = ranked.iter().map(|m| m.record.url.as_str()).collect();
        assert_eq!(urls, ["http://first", "http://second", "http://third"]);
    }
}

//! Case-insensitive regex detectors for rate-limit signals embedded in
//! agent output text, per variant.

use super::types::RateLimitInfo;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

fn claude_triggers() -> &'static [Regex] {
    static TRIGGERS: OnceLock<Vec<Regex>> = OnceLock::new();
    TRIGGERS.get_or_init(|| {
        vec![
            Regex::new(r"(?i)rate limit").unwrap(),
            Regex::new(r"(?i)too many requests").unwrap(),
            Regex::new(r"(?i)rate.?limited").unwrap(),
        ]
    })
}

fn codex_triggers() -> &'static [Regex] {
    static TRIGGERS: OnceLock<Vec<Regex>> = OnceLock::new();
    TRIGGERS.get_or_init(|| {
        vec![
            Regex::new(r"(?i)rate ?limit( reached)?").unwrap(),
            Regex::new(r"(?i)try again in").unwrap(),
        ]
    })
}

/// Matches a decimal amount followed by a time unit, abbreviated or
/// spelled out (`5.448s`, `45 seconds`, `2 minutes`, `1 hour`, `1 day`).
fn duration_phrase() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(\d+(?:\.\d+)?)\s*(d|day|days|h|hr|hrs|hour|hours|m|min|mins|minute|minutes|s|sec|secs|second|seconds)\b",
        )
        .unwrap()
    })
}

fn unit_to_seconds(amount: f64, unit: &str) -> f64 {
    let unit = unit.to_lowercase();
    if unit.starts_with('d') {
        amount * 86400.0
    } else if unit.starts_with('h') {
        amount * 3600.0
    } else if unit.starts_with('m') {
        amount * 60.0
    } else {
        amount
    }
}

/// Scan `text` against `triggers`; on a match, extract a reset duration by
/// summing every `<amount><unit>`-shaped phrase found anywhere in the text
/// (covers the short `try again in 30s` form and the long
/// `try again in 1 hours 30 minutes` form, whose components are additive),
/// defaulting to zero when none is found.
fn detect(text: &str, triggers: &[Regex]) -> Option<RateLimitInfo> {
    let trigger_match = triggers.iter().find_map(|re| re.find(text))?;

    let total_seconds: f64 = duration_phrase()
        .captures_iter(text)
        .filter_map(|caps| {
            let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
            let unit = caps.get(2)?.as_str();
            Some(unit_to_seconds(amount, unit))
        })
        .sum();

    Some(RateLimitInfo {
        is_limited: true,
        reset_after: Duration::from_secs_f64(total_seconds),
        message: trigger_match.as_str().to_string(),
    })
}

/// Claude-style detector: `rate limit`, `too many requests`, `rate
/// limited`/`rate-limited`.
pub fn detect_claude(text: &str) -> Option<RateLimitInfo> {
    detect(text, claude_triggers())
}

/// Codex-style detector: `rate limit` / `rate limit reached`, or
/// `try again in <duration>`.
pub fn detect_codex(text: &str) -> Option<RateLimitInfo> {
    detect(text, codex_triggers())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claude_detects_decimal_seconds_shorthand() {
        let info = detect_claude("Error: rate limit hit. Please try again in 5.448s").unwrap();
        assert!(info.is_limited);
        assert!(info.reset_after > Duration::from_secs(5) && info.reset_after < Duration::from_secs(6));
    }

    #[test]
    fn claude_detects_spelled_out_minutes() {
        let info = detect_claude("rate limit hit, reset in 2 minutes").unwrap();
        assert_eq!(info.reset_after, Duration::from_secs(120));
    }

    #[test]
    fn claude_detects_too_many_requests() {
        assert!(detect_claude("too many requests, slow down").is_some());
    }

    #[test]
    fn claude_missing_duration_defaults_to_zero() {
        let info = detect_claude("we are rate limited right now").unwrap();
        assert_eq!(info.reset_after, Duration::ZERO);
    }

    #[test]
    fn codex_detects_rate_limit_reached() {
        let info = detect_codex("rate limit reached, try again in 30s").unwrap();
        assert!(info.is_limited);
        assert_eq!(info.reset_after, Duration::from_secs(30));
    }

    #[test]
    fn non_matching_text_returns_none() {
        assert!(detect_claude("everything is fine").is_none());
        assert!(detect_codex("everything is fine").is_none());
    }

    #[test]
    fn codex_does_not_match_claude_only_phrase() {
        assert!(detect_codex("too many requests").is_none());
    }

    #[test]
    fn codex_detects_try_again_in_without_rate_limit_wording() {
        let info = detect_codex("Please try again in 12.5s").unwrap();
        assert!(info.is_limited);
        assert_eq!(info.reset_after, Duration::from_millis(12_500));
    }

    #[test]
    fn codex_sums_long_form_duration_components() {
        let info = detect_codex("try again in 1 hours 30 minutes").unwrap();
        assert_eq!(info.reset_after, Duration::from_secs(5400));
    }
}

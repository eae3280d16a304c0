//! Time utilities used for signature timestamps and challenge expiry.

/// Returns the current time as an RFC 3339 string (UTC), the `signed` and
/// `validFrom`/`validUntil` format used throughout the credential engine.
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Returns an RFC 3339 timestamp `duration` in the future.
pub fn iso_after(duration: std::time::Duration) -> String {
    let delta = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
    (chrono::Utc::now() + delta).to_rfc3339()
}

/// Returns the current Unix timestamp in seconds.
pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_iso_parses_back() {
        let iso = now_iso();
        assert!(chrono::DateTime::parse_from_rfc3339(&iso).is_ok());
    }

    #[test]
    fn test_iso_after_is_later() {
        let now = now_iso();
        let later = iso_after(std::time::Duration::from_secs(3600));
        assert!(later > now);
    }

    #[test]
    fn test_now_timestamp_is_reasonable() {
        let ts = now_timestamp();
        assert!(ts > 1704067200, "timestamp {} looks too old", ts);
    }
}

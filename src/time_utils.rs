// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current wall-clock time in Unix seconds.
pub fn now_epoch_seconds() -> i64 {
    Utc::now().timestamp()
}

/// Format Unix seconds for log output, falling back to the raw number.
pub fn format_epoch(epoch_seconds: i64) -> String {
    DateTime::from_timestamp(epoch_seconds, 0)
        .map(format_utc_rfc3339)
        .unwrap_or_else(|| epoch_seconds.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_epoch() {
        assert_eq!(format_epoch(1_234_567_890), "2009-02-13T23:31:30Z");
    }

    #[test]
    fn test_format_epoch_out_of_range() {
        assert_eq!(format_epoch(i64::MAX), i64::MAX.to_string());
    }
}

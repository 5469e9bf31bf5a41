// Symbolic time ranges and their resolution against the data extent
use chrono::{DateTime, Duration, Utc};

/// Symbolic range selector offered by the range buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeToken {
    Last24h,
    Last7d,
    Last30d,
    SinceStart,
}

impl RangeToken {
    pub const ALL: [RangeToken; 4] = [
        RangeToken::Last24h,
        RangeToken::Last7d,
        RangeToken::Last30d,
        RangeToken::SinceStart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RangeToken::Last24h => "24h",
            RangeToken::Last7d => "7d",
            RangeToken::Last30d => "30d",
            RangeToken::SinceStart => "all",
        }
    }

    pub fn parse(s: &str) -> Option<RangeToken> {
        match s {
            "24h" => Some(RangeToken::Last24h),
            "7d" => Some(RangeToken::Last7d),
            "30d" => Some(RangeToken::Last30d),
            "all" => Some(RangeToken::SinceStart),
            _ => None,
        }
    }

    /// Fixed duration for the token, `None` for the open-ended token.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            RangeToken::Last24h => Some(Duration::hours(24)),
            RangeToken::Last7d => Some(Duration::days(7)),
            RangeToken::Last30d => Some(Duration::days(30)),
            RangeToken::SinceStart => None,
        }
    }
}

impl std::fmt::Display for RangeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known bounds of available sensor data. An empty backend reports
/// both bounds as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataExtent {
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

/// Concrete `[start, end]` window produced by resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Resolve a symbolic token against the extent. Pure and deterministic.
/// Returns `None` when no data exists yet (`latest` absent); the start
/// is clamped so it never precedes the earliest known reading.
pub fn resolve(token: RangeToken, extent: &DataExtent) -> Option<TimeWindow> {
    let latest = extent.latest?;
    let earliest = extent.earliest.unwrap_or(latest);

    let start = match token.duration() {
        Some(duration) => {
            let candidate = latest - duration;
            if candidate < earliest { earliest } else { candidate }
        }
        None => earliest,
    };

    Some(TimeWindow { start, end: latest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_fixed_duration_window() {
        let extent = DataExtent {
            earliest: Some(ts("2024-01-01T00:00:00Z")),
            latest: Some(ts("2024-02-01T00:00:00Z")),
        };
        let window = resolve(RangeToken::Last24h, &extent).unwrap();
        assert_eq!(window.end, ts("2024-02-01T00:00:00Z"));
        assert_eq!(window.start, ts("2024-01-31T00:00:00Z"));
    }

    #[test]
    fn test_clamps_to_earliest() {
        // 3 days of data, 7-day token: start clamps to the earliest reading
        let t0 = ts("2024-03-01T00:00:00Z");
        let extent = DataExtent {
            earliest: Some(t0),
            latest: Some(t0 + Duration::days(3)),
        };
        let window = resolve(RangeToken::Last7d, &extent).unwrap();
        assert_eq!(window.start, t0);
        assert_eq!(window.end, t0 + Duration::days(3));
    }

    #[test]
    fn test_since_start_spans_extent() {
        let extent = DataExtent {
            earliest: Some(ts("2024-01-01T00:00:00Z")),
            latest: Some(ts("2024-06-01T00:00:00Z")),
        };
        let window = resolve(RangeToken::SinceStart, &extent).unwrap();
        assert_eq!(window.start, ts("2024-01-01T00:00:00Z"));
        assert_eq!(window.end, ts("2024-06-01T00:00:00Z"));
    }

    #[test]
    fn test_missing_latest_is_unavailable() {
        assert_eq!(resolve(RangeToken::Last24h, &DataExtent::default()), None);
    }

    #[test]
    fn test_missing_earliest_falls_back_to_latest() {
        let latest = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let extent = DataExtent { earliest: None, latest: Some(latest) };
        let window = resolve(RangeToken::Last30d, &extent).unwrap();
        assert_eq!(window.start, latest);
        assert_eq!(window.end, latest);
    }

    #[test]
    fn test_invariants_hold_for_all_tokens() {
        let extent = DataExtent {
            earliest: Some(ts("2024-01-10T00:00:00Z")),
            latest: Some(ts("2024-01-12T00:00:00Z")),
        };
        for token in RangeToken::ALL {
            let window = resolve(token, &extent).unwrap();
            assert!(window.start <= window.end, "{token}");
            assert!(extent.earliest.unwrap() <= window.start, "{token}");
        }
    }

    #[test]
    fn test_token_round_trip() {
        for token in RangeToken::ALL {
            assert_eq!(RangeToken::parse(token.as_str()), Some(token));
        }
        assert_eq!(RangeToken::parse("yesterday"), None);
    }
}

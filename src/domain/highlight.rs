// Cross-widget highlight selection and its normalization
use chrono::{DateTime, Utc};

/// The single active highlighted interval shared between the chart and
/// the activity list. Only produced through [`HighlightSelection::normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSelection {
    pub event_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl HighlightSelection {
    /// Normalize raw widget input: both instants must parse as RFC 3339,
    /// a zero-duration interval is invalid, and start/end are reordered
    /// so that `start <= end`.
    pub fn normalize(event_id: &str, start: &str, end: &str) -> Option<HighlightSelection> {
        let start = DateTime::parse_from_rfc3339(start).ok()?.with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339(end).ok()?.with_timezone(&Utc);
        if start == end {
            return None;
        }
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Some(HighlightSelection {
            event_id: event_id.to_string(),
            start,
            end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_duration_is_invalid() {
        let sel = HighlightSelection::normalize(
            "e1",
            "2024-01-01T10:00:00Z",
            "2024-01-01T10:00:00Z",
        );
        assert!(sel.is_none());
    }

    #[test]
    fn test_reversed_bounds_are_reordered() {
        let sel = HighlightSelection::normalize(
            "e1",
            "2024-01-01T12:00:00Z",
            "2024-01-01T10:00:00Z",
        )
        .unwrap();
        assert_eq!(sel.start.to_rfc3339(), "2024-01-01T10:00:00+00:00");
        assert_eq!(sel.end.to_rfc3339(), "2024-01-01T12:00:00+00:00");
    }

    #[test]
    fn test_unparseable_instant_is_invalid() {
        assert!(HighlightSelection::normalize("e1", "not-a-date", "2024-01-01T10:00:00Z").is_none());
        assert!(HighlightSelection::normalize("e1", "2024-01-01T10:00:00Z", "").is_none());
    }
}

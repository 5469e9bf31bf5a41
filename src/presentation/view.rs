// Dashboard view seam and the numeric display rules
use crate::domain::activity::ActivityEvent;
use crate::domain::range::RangeToken;
use crate::domain::readings::Snapshot;
use crate::domain::severity::{Severity, SeverityBands};
use crate::error::FetchError;
use chrono::{DateTime, Utc};

/// Glyph shown wherever a numeric value is missing or non-finite.
/// Never render `NaN` or an empty cell.
pub const NO_DATA_GLYPH: &str = "–";

/// Rendering collaborator: chart, KPI cards and lists. The concrete
/// implementation lives outside the core (a charting widget, a TUI, or
/// a logger); the coordinator only talks through this trait.
pub trait DashboardView: Send {
    fn show_loading(&mut self, token: RangeToken);
    fn show_no_data(&mut self, token: RangeToken);
    fn show_error(&mut self, token: RangeToken, error: &FetchError);
    fn render_snapshot(&mut self, token: RangeToken, snapshot: &Snapshot);
    fn render_activities(&mut self, token: RangeToken, events: &[ActivityEvent]);
    /// Activity cell alone failed; the rest of the range keeps its state.
    fn show_activities_error(&mut self, token: RangeToken);
    fn render_last_reading(&mut self, card: &LastReadingCard);
}

/// Direction of the latest reading versus the previous one, compared on
/// the rounded displayed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

/// Headline "latest PM2.5" card.
#[derive(Debug, Clone, PartialEq)]
pub struct LastReadingCard {
    pub value: String,
    pub measured_at: Option<DateTime<Utc>>,
    pub severity: Option<Severity>,
    pub trend: Option<Trend>,
}

impl LastReadingCard {
    pub fn from_snapshot(snapshot: &Snapshot, bands: &SeverityBands) -> LastReadingCard {
        let (last, prev) = snapshot.last_two();
        let last_pm25 = last.and_then(|r| r.pm25);
        LastReadingCard {
            value: format_concentration(last_pm25),
            measured_at: last.map(|r| r.timestamp),
            severity: bands.classify_pm25(last_pm25),
            trend: trend(last_pm25, prev.and_then(|r| r.pm25)),
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Headline counts and concentrations round to the nearest integer.
pub fn format_concentration(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => format!("{}", v.round() as i64),
        None => NO_DATA_GLYPH.to_string(),
    }
}

/// Sparkline tooltips keep one decimal.
pub fn format_tooltip_concentration(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => format!("{v:.1}"),
        None => NO_DATA_GLYPH.to_string(),
    }
}

/// Percent values round to the nearest integer.
pub fn format_percent(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) => format!("{}%", v.round() as i64),
        None => NO_DATA_GLYPH.to_string(),
    }
}

pub fn format_count(value: Option<f64>) -> String {
    format_concentration(value)
}

fn trend(last: Option<f64>, prev: Option<f64>) -> Option<Trend> {
    let last = finite(last)?.round() as i64;
    let prev = finite(prev)?.round() as i64;
    Some(if last > prev {
        Trend::Up
    } else if last < prev {
        Trend::Down
    } else {
        Trend::Flat
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::range::TimeWindow;
    use crate::domain::readings::{KpiSummary, Reading};

    #[test]
    fn test_non_finite_values_render_glyph() {
        assert_eq!(format_concentration(Some(f64::NAN)), NO_DATA_GLYPH);
        assert_eq!(format_concentration(None), NO_DATA_GLYPH);
        assert_eq!(format_percent(Some(f64::INFINITY)), NO_DATA_GLYPH);
        assert_eq!(format_tooltip_concentration(None), NO_DATA_GLYPH);
    }

    #[test]
    fn test_rounding_rules() {
        assert_eq!(format_concentration(Some(17.6)), "18");
        assert_eq!(format_percent(Some(12.4)), "12%");
        assert_eq!(format_tooltip_concentration(Some(17.64)), "17.6");
    }

    #[test]
    fn test_last_reading_card_trend() {
        let now = Utc::now();
        let reading = |minutes_ago: i64, pm25: f64| Reading {
            timestamp: now - chrono::Duration::minutes(minutes_ago),
            pm1: None,
            pm25: Some(pm25),
            pm10: None,
        };
        let snapshot = Snapshot {
            data: vec![reading(30, 9.0), reading(15, 12.0), reading(0, 18.0)],
            kpis: KpiSummary {
                total_peaks: 0,
                peaks_per_hour: 0.0,
                percent_over_threshold: 0.0,
            },
            peaks: vec![],
            window: TimeWindow {
                start: now - chrono::Duration::hours(24),
                end: now,
            },
            fetched_at: now,
        };

        let card = LastReadingCard::from_snapshot(&snapshot, &SeverityBands::default());
        assert_eq!(card.value, "18");
        assert_eq!(card.trend, Some(Trend::Up));
        assert_eq!(card.severity, Some(Severity::Risk));
        assert_eq!(card.measured_at, Some(now));
    }

    #[test]
    fn test_empty_snapshot_card() {
        let now = Utc::now();
        let snapshot = Snapshot {
            data: vec![],
            kpis: KpiSummary {
                total_peaks: 0,
                peaks_per_hour: 0.0,
                percent_over_threshold: 0.0,
            },
            peaks: vec![],
            window: TimeWindow { start: now, end: now },
            fetched_at: now,
        };
        let card = LastReadingCard::from_snapshot(&snapshot, &SeverityBands::default());
        assert_eq!(card.value, NO_DATA_GLYPH);
        assert_eq!(card.trend, None);
        assert_eq!(card.severity, None);
    }
}

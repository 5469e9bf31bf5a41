// Canonical particulate-matter data model
use crate::domain::range::TimeWindow;
use chrono::{DateTime, Utc};

/// One sensor reading. Immutable once fetched; the backend deduplicates
/// on ingestion so at most one reading exists per instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub pm1: Option<f64>,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
}

/// Detected excursion above the health threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Peak {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Aggregate over a window, recomputed per range (never incrementally
/// updated).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KpiSummary {
    pub total_peaks: i64,
    pub peaks_per_hour: f64,
    pub percent_over_threshold: f64,
}

/// One consistent bundle of series + aggregates for a resolved window.
/// Either fully populated or not produced at all; replaced wholesale on
/// refresh.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub data: Vec<Reading>,
    pub kpis: KpiSummary,
    pub peaks: Vec<Peak>,
    pub window: TimeWindow,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Latest and previous reading, used by the last-measurement card.
    pub fn last_two(&self) -> (Option<&Reading>, Option<&Reading>) {
        let mut iter = self.data.iter().rev();
        (iter.next(), iter.next())
    }
}

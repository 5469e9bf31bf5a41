// Repository traits - seam between services and the remote backend
use crate::domain::activity::ActivityEvent;
use crate::domain::range::{DataExtent, RangeToken, TimeWindow};
use crate::domain::readings::{KpiSummary, Peak, Reading};
use crate::error::FetchError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One point as accepted by the ingest endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestPoint {
    pub timestamp: DateTime<Utc>,
    pub pm1: Option<f64>,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub temp_c: Option<f64>,
    pub rh: Option<f64>,
}

#[async_trait]
pub trait ReadingsRepository: Send + Sync {
    /// Earliest/latest instants for which readings exist.
    async fn fetch_extent(&self) -> Result<DataExtent, FetchError>;

    /// Planning hint only: the backend may gain or lose rows between
    /// this call and the page fetches.
    async fn count_readings(&self, window: &TimeWindow) -> Result<usize, FetchError>;

    /// One page of readings in `[window.start, window.end]`, ordered by
    /// timestamp ascending. A page shorter than `limit` signals the end.
    async fn fetch_readings_page(
        &self,
        window: &TimeWindow,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Reading>, FetchError>;

    /// Peak counts/rates/percentages aggregated over the window.
    async fn fetch_kpis(&self, window: &TimeWindow) -> Result<KpiSummary, FetchError>;

    /// Detected excursions inside the window.
    async fn fetch_peaks(&self, window: &TimeWindow) -> Result<Vec<Peak>, FetchError>;
}

#[async_trait]
pub trait ActivitiesRepository: Send + Sync {
    async fn fetch_activities(&self, range: RangeToken) -> Result<Vec<ActivityEvent>, FetchError>;
}

/// Storage side of the ingest endpoint.
#[async_trait]
pub trait IngestSink: Send + Sync {
    async fn store_readings(
        &self,
        sensor_id: &str,
        points: &[IngestPoint],
    ) -> Result<(), FetchError>;
}

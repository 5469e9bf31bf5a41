// Dataset aggregator - builds one consistent snapshot per range
use crate::application::fetch_cache::FetchCache;
use crate::application::repository::ReadingsRepository;
use crate::domain::range::{resolve, DataExtent, RangeToken};
use crate::domain::readings::{KpiSummary, Peak, Reading, Snapshot};
use crate::error::FetchError;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Fans out to the backend resources for a range and assembles an
/// atomic [`Snapshot`]. Sub-resources are cached per `(resource, range)`
/// through one typed cache each; the snapshot itself is only produced
/// when every sub-fetch succeeds.
pub struct SnapshotService {
    repository: Arc<dyn ReadingsRepository>,
    page_size: usize,
    extent: FetchCache<(), DataExtent>,
    series: FetchCache<RangeToken, Vec<Reading>>,
    kpis: FetchCache<RangeToken, KpiSummary>,
    peaks: FetchCache<RangeToken, Vec<Peak>>,
}

impl SnapshotService {
    pub fn new(repository: Arc<dyn ReadingsRepository>, ttl: Duration, page_size: usize) -> Self {
        Self {
            repository,
            page_size,
            extent: FetchCache::new(ttl),
            series: FetchCache::new(ttl),
            kpis: FetchCache::new(ttl),
            peaks: FetchCache::new(ttl),
        }
    }

    /// Cached extent lookup; `force` bypasses the TTL for the active
    /// range's extent check.
    pub async fn refresh_extent(&self, force: bool) -> Result<DataExtent, FetchError> {
        let repository = self.repository.clone();
        self.extent
            .get_or_fetch((), force, move || async move {
                repository.fetch_extent().await
            })
            .await
    }

    pub async fn load_snapshot(
        &self,
        token: RangeToken,
        force: bool,
    ) -> Result<Snapshot, FetchError> {
        let extent = self.refresh_extent(force).await?;
        let window = resolve(token, &extent).ok_or(FetchError::Unavailable)?;

        let series_fut = self.series.get_or_fetch(token, force, {
            let repository = self.repository.clone();
            let page_size = self.page_size;
            move || async move {
                fetch_all_pages(repository.as_ref(), &window, page_size).await
            }
        });

        let kpis_fut = self.kpis.get_or_fetch(token, force, {
            let repository = self.repository.clone();
            move || async move { repository.fetch_kpis(&window).await }
        });

        let peaks_fut = self.peaks.get_or_fetch(token, force, {
            let repository = self.repository.clone();
            move || async move {
                let mut peaks = repository.fetch_peaks(&window).await?;
                // most recent first for the peak list widget
                peaks.sort_by_key(|p| std::cmp::Reverse(p.timestamp));
                Ok(peaks)
            }
        });

        let (data, kpis, peaks) = tokio::try_join!(series_fut, kpis_fut, peaks_fut)?;

        tracing::debug!(
            range = %token,
            rows = data.len(),
            peaks = peaks.len(),
            "assembled snapshot"
        );

        Ok(Snapshot {
            data,
            kpis,
            peaks,
            window,
            fetched_at: Utc::now(),
        })
    }
}

/// Page through the raw series until a short page. The backend row
/// count is a planning hint only: rows may appear or vanish between the
/// count and the page fetches, so the result is re-sorted and
/// deduplicated by timestamp.
async fn fetch_all_pages(
    repository: &dyn ReadingsRepository,
    window: &crate::domain::range::TimeWindow,
    page_size: usize,
) -> Result<Vec<Reading>, FetchError> {
    let hint = match repository.count_readings(window).await {
        Ok(count) => count,
        Err(err) => {
            tracing::debug!("row count unavailable, sizing pages blind: {err}");
            0
        }
    };

    // the count is untrusted input; cap what it can preallocate
    let mut rows: Vec<Reading> = Vec::with_capacity(hint.min(page_size.saturating_mul(8)));
    let mut offset = 0;
    loop {
        let page = repository.fetch_readings_page(window, offset, page_size).await?;
        let fetched = page.len();
        rows.extend(page);
        if fetched < page_size {
            break;
        }
        offset += fetched;
    }

    rows.sort_by_key(|r| r.timestamp);
    rows.dedup_by_key(|r| r.timestamp);
    Ok(rows)
}

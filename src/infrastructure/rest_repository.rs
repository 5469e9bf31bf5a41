// REST/RPC backend client and the payload normalization boundary
use crate::application::repository::{
    ActivitiesRepository, IngestPoint, IngestSink, ReadingsRepository,
};
use crate::domain::activity::{ActivityEvent, Pm25Stats};
use crate::domain::range::{DataExtent, RangeToken, TimeWindow};
use crate::domain::readings::{KpiSummary, Peak, Reading};
use crate::error::FetchError;
use crate::infrastructure::config::BackendSettings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

/// Client for the remote data API. Every call carries the static bearer
/// credential and the fixed request timeout; every payload goes through
/// one normalization step into the canonical domain types.
#[derive(Debug, Clone)]
pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

// The backend exposes the same concept under alternate field names in
// different deployments; serde aliases pin them all to one canonical
// shape here instead of ad-hoc fallbacks downstream.

#[derive(Debug, Deserialize)]
struct ExtentRow {
    #[serde(alias = "earliest")]
    min_ts: Option<String>,
    #[serde(alias = "latest")]
    max_ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KpiRow {
    #[serde(alias = "peak_count")]
    total_peaks: Option<f64>,
    #[serde(alias = "pph")]
    peaks_per_hour: Option<f64>,
    #[serde(alias = "pct_over_threshold", alias = "pct")]
    percent_over15: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ReadingRow {
    ts: String,
    pm1: Option<f64>,
    pm25: Option<f64>,
    pm10: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PeakRow {
    ts: String,
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ActivityRow {
    #[serde(alias = "eventId")]
    event_id: serde_json::Value,
    start: String,
    end: String,
    title: Option<String>,
    person: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    pm25: Option<Pm25Row>,
}

#[derive(Debug, Deserialize)]
struct Pm25Row {
    mean: Option<f64>,
    max: Option<f64>,
    pct_over_15: Option<f64>,
    pct_over_35: Option<f64>,
    #[serde(default)]
    points_sample: Vec<f64>,
}

impl RestBackend {
    pub fn new(settings: &BackendSettings, timeout: std::time::Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::network("client", e))?;
        Ok(Self {
            http,
            base_url: settings.url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    async fn rpc(
        &self,
        name: &str,
        resource: &'static str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, FetchError> {
        let url = format!("{}/rpc/{}", self.base_url, name);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport(resource, e))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(FetchError::network(
                resource,
                anyhow::anyhow!("rpc {name} failed with HTTP {status}"),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::validation(resource, e.to_string()))
    }

    async fn get(
        &self,
        path: &str,
        resource: &'static str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, FetchError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| map_transport(resource, e))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(FetchError::network(
                resource,
                anyhow::anyhow!("GET /{path} failed with HTTP {status}"),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::validation(resource, e.to_string()))
    }
}

fn map_transport(resource: &'static str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout { resource }
    } else {
        FetchError::network(resource, err)
    }
}

/// The RPC layer returns single rows either bare or as a one-element
/// array.
fn first_row(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Array(mut rows) if !rows.is_empty() => rows.remove(0),
        other => other,
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    resource: &'static str,
    value: serde_json::Value,
) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|e| FetchError::validation(resource, e.to_string()))
}

fn parse_instant(resource: &'static str, raw: &str) -> Result<DateTime<Utc>, FetchError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| FetchError::validation(resource, format!("bad timestamp {raw:?}")))
}

fn parse_optional_instant(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn window_body(window: &TimeWindow) -> serde_json::Value {
    json!({
        "start_ts": window.start.to_rfc3339(),
        "end_ts": window.end.to_rfc3339(),
    })
}

#[async_trait]
impl ReadingsRepository for RestBackend {
    async fn fetch_extent(&self) -> Result<DataExtent, FetchError> {
        let raw = self.rpc("readings_extent", "extent", json!({})).await?;
        let row: ExtentRow = decode("extent", first_row(raw))?;
        Ok(DataExtent {
            earliest: parse_optional_instant(row.min_ts.as_deref()),
            latest: parse_optional_instant(row.max_ts.as_deref()),
        })
    }

    async fn count_readings(&self, window: &TimeWindow) -> Result<usize, FetchError> {
        let raw = self
            .rpc("readings_count", "series", window_body(window))
            .await?;
        let row: CountRow = decode("series", first_row(raw))?;
        Ok(row.count.unwrap_or(0))
    }

    async fn fetch_readings_page(
        &self,
        window: &TimeWindow,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Reading>, FetchError> {
        let raw = self
            .get(
                "readings",
                "series",
                &[
                    ("start", window.start.to_rfc3339()),
                    ("end", window.end.to_rfc3339()),
                    ("order", "ts.asc".to_string()),
                    ("offset", offset.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let rows: Vec<ReadingRow> = decode("series", raw)?;
        rows.into_iter()
            .map(|row| {
                Ok(Reading {
                    timestamp: parse_instant("series", &row.ts)?,
                    pm1: row.pm1,
                    pm25: row.pm25,
                    pm10: row.pm10,
                })
            })
            .collect()
    }

    async fn fetch_kpis(&self, window: &TimeWindow) -> Result<KpiSummary, FetchError> {
        let raw = self
            .rpc("kpis_peaks_range", "kpis", window_body(window))
            .await?;
        let row: KpiRow = decode("kpis", first_row(raw))?;
        Ok(KpiSummary {
            total_peaks: row.total_peaks.unwrap_or(0.0) as i64,
            peaks_per_hour: row.peaks_per_hour.unwrap_or(0.0),
            percent_over_threshold: row.percent_over15.unwrap_or(0.0),
        })
    }

    async fn fetch_peaks(&self, window: &TimeWindow) -> Result<Vec<Peak>, FetchError> {
        let raw = self
            .rpc("peaks_in_range", "peaks", window_body(window))
            .await?;
        let rows: Vec<PeakRow> = decode("peaks", raw)?;
        rows.into_iter()
            .map(|row| {
                Ok(Peak {
                    timestamp: parse_instant("peaks", &row.ts)?,
                    value: row.value.unwrap_or(0.0),
                })
            })
            .collect()
    }
}

#[async_trait]
impl ActivitiesRepository for RestBackend {
    async fn fetch_activities(&self, range: RangeToken) -> Result<Vec<ActivityEvent>, FetchError> {
        let raw = self
            .rpc("activities_site", "activities", json!({ "range": range.as_str() }))
            .await?;
        let rows: Vec<ActivityRow> = decode("activities", raw)?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            // the id may arrive as a string or a number; anything else
            // makes the row unusable
            let id = match &row.event_id {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                other => {
                    tracing::warn!("dropping activity with unusable id {other:?}");
                    continue;
                }
            };
            let (Ok(start), Ok(end)) = (
                parse_instant("activities", &row.start),
                parse_instant("activities", &row.end),
            ) else {
                tracing::warn!(event = %id, "dropping activity with unparseable bounds");
                continue;
            };

            events.push(ActivityEvent {
                id,
                start,
                end,
                title: row.title.unwrap_or_else(|| "Untitled".to_string()),
                person: row.person,
                kind: row.kind.unwrap_or_else(|| "other".to_string()),
                pm25: row.pm25.map(|p| Pm25Stats {
                    mean: p.mean,
                    max: p.max,
                    pct_over_15: p.pct_over_15,
                    pct_over_35: p.pct_over_35,
                    points_sample: p.points_sample,
                }),
            });
        }
        Ok(events)
    }
}

#[async_trait]
impl IngestSink for RestBackend {
    async fn store_readings(
        &self,
        sensor_id: &str,
        points: &[IngestPoint],
    ) -> Result<(), FetchError> {
        let rows: Vec<serde_json::Value> = points
            .iter()
            .map(|p| {
                json!({
                    "ts": p.timestamp.to_rfc3339(),
                    "sensor_id": sensor_id,
                    "pm1": p.pm1,
                    "pm25": p.pm25,
                    "pm10": p.pm10,
                    "temp_c": p.temp_c,
                    "rh": p.rh,
                })
            })
            .collect();

        let url = format!("{}/readings", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header("Prefer", "resolution=merge-duplicates")
            .json(&rows)
            .send()
            .await
            .map_err(|e| map_transport("ingest", e))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(FetchError::network(
                "ingest",
                anyhow::anyhow!("readings upsert failed with HTTP {status}"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kpi_row_accepts_alternate_field_names() {
        let canonical: KpiRow = serde_json::from_value(json!({
            "total_peaks": 4, "peaks_per_hour": 0.5, "percent_over15": 12.0
        }))
        .unwrap();
        assert_eq!(canonical.total_peaks, Some(4.0));

        let aliased: KpiRow = serde_json::from_value(json!({
            "peak_count": 4, "pph": 0.5, "pct_over_threshold": 12.0
        }))
        .unwrap();
        assert_eq!(aliased.total_peaks, Some(4.0));
        assert_eq!(aliased.percent_over15, Some(12.0));
    }

    #[test]
    fn test_extent_row_aliases() {
        let row: ExtentRow = serde_json::from_value(json!({
            "earliest": "2024-01-01T00:00:00Z", "latest": "2024-02-01T00:00:00Z"
        }))
        .unwrap();
        assert!(row.min_ts.is_some());
        assert!(row.max_ts.is_some());
    }

    #[test]
    fn test_first_row_unwraps_single_element_arrays() {
        let wrapped = json!([{ "count": 3 }]);
        assert_eq!(first_row(wrapped), json!({ "count": 3 }));
        let bare = json!({ "count": 3 });
        assert_eq!(first_row(bare.clone()), bare);
    }

    #[test]
    fn test_bad_timestamp_is_validation_error() {
        let err = parse_instant("series", "not-a-date").unwrap_err();
        assert!(matches!(err, FetchError::Validation { resource: "series", .. }));
    }
}

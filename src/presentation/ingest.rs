// Sensor ingest endpoint - bearer device credential + range validation
use crate::application::repository::{IngestPoint, IngestSink};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json as JsonResponse},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

pub const MAX_POINTS_PER_REQUEST: usize = 100;

#[derive(Clone)]
pub struct IngestState {
    pub sink: Arc<dyn IngestSink>,
    /// sensor_id -> SHA-256 hex of that device's bearer credential
    pub device_hashes: Arc<HashMap<String, String>>,
}

pub fn router(state: IngestState) -> Router {
    Router::new()
        .route("/ingest", post(ingest))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct IngestBody {
    pub sensor_id: String,
    #[serde(default)]
    pub points: Vec<WirePoint>,
}

#[derive(Debug, Deserialize)]
pub struct WirePoint {
    pub ts: String,
    pub pm1: Option<f64>,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub temp_c: Option<f64>,
    pub rh: Option<f64>,
}

pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// 401 when the header is absent or not a bearer token, 403 when the
/// hashed credential does not match the stored one for this sensor.
fn authorize(
    bearer: Option<&str>,
    sensor_id: &str,
    device_hashes: &HashMap<String, String>,
) -> Result<(), StatusCode> {
    let token = bearer.ok_or(StatusCode::UNAUTHORIZED)?;
    let expected = device_hashes.get(sensor_id).ok_or(StatusCode::FORBIDDEN)?;
    if sha256_hex(token) == *expected {
        Ok(())
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

fn in_range(value: f64, min: f64, max: f64) -> bool {
    value.is_finite() && value >= min && value <= max
}

/// Validate one point and convert it, parsing the timestamp exactly
/// once so the stored instant is the one the sensor sent.
fn parse_point(point: &WirePoint) -> Result<IngestPoint, Vec<String>> {
    let mut errors = Vec::new();
    let timestamp = match DateTime::parse_from_rfc3339(&point.ts) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(_) => {
            errors.push("invalid timestamp".to_string());
            None
        }
    };
    for (field, value, min, max) in [
        ("pm1", point.pm1, 0.0, 1000.0),
        ("pm25", point.pm25, 0.0, 1000.0),
        ("pm10", point.pm10, 0.0, 1000.0),
        ("temp_c", point.temp_c, -50.0, 100.0),
        ("rh", point.rh, 0.0, 100.0),
    ] {
        if let Some(v) = value {
            if !in_range(v, min, max) {
                errors.push(format!("{field} must be between {min} and {max}"));
            }
        }
    }
    match (timestamp, errors.is_empty()) {
        (Some(timestamp), true) => Ok(IngestPoint {
            timestamp,
            pm1: point.pm1,
            pm25: point.pm25,
            pm10: point.pm10,
            temp_c: point.temp_c,
            rh: point.rh,
        }),
        _ => Err(errors),
    }
}

pub fn parse_body(body: &IngestBody) -> Result<Vec<IngestPoint>, Vec<String>> {
    let mut errors = Vec::new();
    if body.sensor_id.trim().is_empty() {
        errors.push("missing sensor_id".to_string());
    }
    if body.points.is_empty() {
        errors.push("points array cannot be empty".to_string());
    }
    if body.points.len() > MAX_POINTS_PER_REQUEST {
        errors.push(format!("too many points (max {MAX_POINTS_PER_REQUEST} per request)"));
    }
    let mut points = Vec::with_capacity(body.points.len().min(MAX_POINTS_PER_REQUEST));
    for (index, point) in body.points.iter().enumerate() {
        match parse_point(point) {
            Ok(point) => points.push(point),
            Err(point_errors) => {
                for error in point_errors {
                    errors.push(format!("point {index}: {error}"));
                }
            }
        }
    }
    if errors.is_empty() {
        Ok(points)
    } else {
        Err(errors)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn ingest(
    State(state): State<IngestState>,
    headers: HeaderMap,
    Json(body): Json<IngestBody>,
) -> impl IntoResponse {
    if let Err(status) = authorize(bearer_token(&headers), &body.sensor_id, &state.device_hashes) {
        tracing::warn!(sensor = %body.sensor_id, "ingest auth rejected");
        return (status, JsonResponse(json!({ "error": "invalid device credentials" })));
    }

    let points = match parse_body(&body) {
        Ok(points) => points,
        Err(errors) => {
            return (
                StatusCode::BAD_REQUEST,
                JsonResponse(json!({ "error": "validation failed", "details": errors })),
            );
        }
    };

    match state.sink.store_readings(&body.sensor_id, &points).await {
        Ok(()) => {
            tracing::info!(sensor = %body.sensor_id, points = points.len(), "readings ingested");
            (
                StatusCode::ACCEPTED,
                JsonResponse(json!({
                    "message": "data ingested",
                    "sensor_id": body.sensor_id,
                    "points_received": points.len(),
                })),
            )
        }
        Err(err) => {
            tracing::error!(sensor = %body.sensor_id, "ingest storage failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                JsonResponse(json!({ "error": "storage failure" })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(ts: &str, pm25: Option<f64>) -> WirePoint {
        WirePoint {
            ts: ts.to_string(),
            pm1: None,
            pm25,
            pm10: None,
            temp_c: None,
            rh: None,
        }
    }

    #[test]
    fn test_authorize_status_codes() {
        let mut hashes = HashMap::new();
        hashes.insert("esp32-01".to_string(), sha256_hex("secret-token"));

        assert_eq!(authorize(None, "esp32-01", &hashes), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(
            authorize(Some("wrong"), "esp32-01", &hashes),
            Err(StatusCode::FORBIDDEN)
        );
        assert_eq!(
            authorize(Some("secret-token"), "unknown", &hashes),
            Err(StatusCode::FORBIDDEN)
        );
        assert_eq!(authorize(Some("secret-token"), "esp32-01", &hashes), Ok(()));
    }

    #[test]
    fn test_point_range_validation() {
        let valid = point("2024-05-01T12:00:00Z", Some(18.7));
        assert!(parse_point(&valid).is_ok());

        let out_of_range = point("2024-05-01T12:00:00Z", Some(2000.0));
        assert_eq!(parse_point(&out_of_range).unwrap_err().len(), 1);

        let bad_ts = point("yesterday noon", Some(10.0));
        assert_eq!(parse_point(&bad_ts).unwrap_err().len(), 1);
    }

    #[test]
    fn test_parsed_point_keeps_the_sent_timestamp() {
        let wire = point("2024-05-01T12:00:00+02:00", Some(9.5));
        let parsed = parse_point(&wire).unwrap();
        assert_eq!(parsed.timestamp.to_rfc3339(), "2024-05-01T10:00:00+00:00");
        assert_eq!(parsed.pm25, Some(9.5));
    }

    #[test]
    fn test_body_limits() {
        let empty = IngestBody {
            sensor_id: "esp32-01".to_string(),
            points: vec![],
        };
        assert!(parse_body(&empty).is_err());

        let too_many = IngestBody {
            sensor_id: "esp32-01".to_string(),
            points: (0..101)
                .map(|_| point("2024-05-01T12:00:00Z", Some(5.0)))
                .collect(),
        };
        assert!(parse_body(&too_many)
            .unwrap_err()
            .iter()
            .any(|e| e.contains("too many points")));
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}

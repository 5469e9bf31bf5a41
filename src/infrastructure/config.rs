// Configuration loading - file plus AQ_-prefixed environment overrides
use crate::domain::severity::SeverityBands;
use crate::error::FetchError;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub backend: BackendSettings,
    #[serde(default)]
    pub refresh: RefreshSettings,
    #[serde(default)]
    pub severity: SeverityBands,
    #[serde(default)]
    pub calendar: Option<CalendarSettings>,
    #[serde(default)]
    pub ingest: IngestSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    pub url: String,
    /// Static bearer credential; usually supplied as AQ_BACKEND__API_KEY.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RefreshSettings {
    pub cache_ttl_ms: u64,
    pub activities_ttl_ms: u64,
    pub min_reload_interval_ms: u64,
    pub passive_interval_ms: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 60_000,
            activities_ttl_ms: 60_000,
            // at most 30 interactive reloads per hour, half that passively
            min_reload_interval_ms: 2 * 60 * 1000,
            passive_interval_ms: 4 * 60 * 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CalendarSettings {
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub keyword_rules: Vec<KeywordRule>,
}

/// Free-text classification of calendar events: the first rule whose
/// keyword appears in the title wins.
#[derive(Debug, Deserialize, Clone)]
pub struct KeywordRule {
    pub keyword: String,
    pub activity_type: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestSettings {
    pub listen_addr: String,
    /// sensor_id -> SHA-256 hex of the device bearer credential
    pub devices: HashMap<String, String>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            devices: HashMap::new(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_page_size() -> usize {
    1_000
}

impl DashboardConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.backend.request_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.refresh.cache_ttl_ms)
    }

    pub fn activities_ttl(&self) -> Duration {
        Duration::from_millis(self.refresh.activities_ttl_ms)
    }

    pub fn min_reload_interval(&self) -> Duration {
        Duration::from_millis(self.refresh.min_reload_interval_ms)
    }

    pub fn passive_interval(&self) -> Duration {
        Duration::from_millis(self.refresh.passive_interval_ms)
    }

    /// A missing credential is permanent: the dashboard shows N/A and
    /// never retries.
    pub fn ensure_credentials(&self) -> Result<(), FetchError> {
        if self.backend.api_key.trim().is_empty() {
            return Err(FetchError::ConfigurationMissing);
        }
        Ok(())
    }
}

pub fn load_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("AQ").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> DashboardConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = parse("backend = { url = \"https://backend.example\", api_key = \"k\" }");

        assert_eq!(cfg.backend.page_size, 1000);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(60));
        assert!(cfg.min_reload_interval() < cfg.passive_interval());
        assert!(cfg.ensure_credentials().is_ok());
        assert!(cfg.calendar.is_none());
    }

    #[test]
    fn test_missing_credential() {
        let cfg = parse("backend = { url = \"https://backend.example\" }");
        assert!(matches!(
            cfg.ensure_credentials(),
            Err(FetchError::ConfigurationMissing)
        ));
    }
}

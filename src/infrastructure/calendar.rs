// Alternate activities source: a third-party calendar API
use crate::application::repository::ActivitiesRepository;
use crate::domain::activity::ActivityEvent;
use crate::domain::range::RangeToken;
use crate::error::FetchError;
use crate::infrastructure::config::{CalendarSettings, KeywordRule};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Calendar client: confirmed events in a wall-clock window, paginated
/// by continuation token, classified by keyword rules against titles.
#[derive(Debug, Clone)]
pub struct CalendarClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    rules: Vec<KeywordRule>,
}

#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<EventItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    id: String,
    status: Option<String>,
    summary: Option<String>,
    organizer: Option<String>,
    start: String,
    end: String,
}

impl CalendarClient {
    pub fn new(
        settings: &CalendarSettings,
        timeout: std::time::Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::network("calendar", e))?;
        Ok(Self {
            http,
            base_url: settings.url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            rules: settings.keyword_rules.clone(),
        })
    }

    /// Calendar windows are wall-clock relative: the sensor extent does
    /// not constrain what was scheduled.
    fn window_for(token: RangeToken, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let span = token.duration().unwrap_or_else(|| Duration::days(365));
        (now - span, now)
    }

    async fn fetch_page(
        &self,
        time_min: &str,
        time_max: &str,
        page_token: Option<&str>,
    ) -> Result<EventsPage, FetchError> {
        let url = format!("{}/events", self.base_url);
        let mut query: Vec<(&str, String)> = vec![
            ("time_min", time_min.to_string()),
            ("time_max", time_max.to_string()),
            ("single_events", "true".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("page_token", token.to_string()));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout { resource: "calendar" }
                } else {
                    FetchError::network("calendar", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(FetchError::network(
                "calendar",
                anyhow::anyhow!("events query failed with HTTP {status}"),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::validation("calendar", e.to_string()))
    }
}

/// First matching rule wins; unmatched titles fall back to "other".
pub fn classify_title(rules: &[KeywordRule], title: &str) -> String {
    let lowered = title.to_lowercase();
    rules
        .iter()
        .find(|rule| lowered.contains(&rule.keyword.to_lowercase()))
        .map(|rule| rule.activity_type.clone())
        .unwrap_or_else(|| "other".to_string())
}

#[async_trait]
impl ActivitiesRepository for CalendarClient {
    async fn fetch_activities(&self, range: RangeToken) -> Result<Vec<ActivityEvent>, FetchError> {
        let (start, end) = Self::window_for(range, Utc::now());
        let time_min = start.to_rfc3339();
        let time_max = end.to_rfc3339();

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .fetch_page(&time_min, &time_max, page_token.as_deref())
                .await?;

            for item in page.items {
                if item.status.as_deref() != Some("confirmed") {
                    continue;
                }
                let (Some(start), Some(end)) = (
                    DateTime::parse_from_rfc3339(&item.start).ok(),
                    DateTime::parse_from_rfc3339(&item.end).ok(),
                ) else {
                    tracing::warn!(event = %item.id, "dropping calendar event with unparseable bounds");
                    continue;
                };
                let title = item.summary.unwrap_or_else(|| "Untitled".to_string());
                let kind = classify_title(&self.rules, &title);
                events.push(ActivityEvent {
                    id: item.id,
                    start: start.with_timezone(&Utc),
                    end: end.with_timezone(&Utc),
                    title,
                    person: item.organizer,
                    kind,
                    pm25: None,
                });
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(range = %range, events = events.len(), "fetched calendar activities");
        Ok(events)
    }
}

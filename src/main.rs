// Main entry point - Dependency injection, refresh loops and ingest server
use std::{net::SocketAddr, sync::Arc, sync::Mutex};

use atelier_air::application::activity_service::ActivityService;
use atelier_air::application::repository::ActivitiesRepository;
use atelier_air::application::snapshot_service::SnapshotService;
use atelier_air::domain::activity::ActivityEvent;
use atelier_air::domain::range::RangeToken;
use atelier_air::domain::readings::Snapshot;
use atelier_air::error::FetchError;
use atelier_air::infrastructure::calendar::CalendarClient;
use atelier_air::infrastructure::config::load_config;
use atelier_air::infrastructure::rest_repository::RestBackend;
use atelier_air::presentation::coordinator::RenderCoordinator;
use atelier_air::presentation::highlight_bus::HighlightBus;
use atelier_air::presentation::ingest::{router, IngestState};
use atelier_air::presentation::view::{
    format_count, format_percent, DashboardView, LastReadingCard, NO_DATA_GLYPH,
};
use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Headless view: renders dashboard state into the log stream. Keeps
/// the caches warm and makes the refresh behavior observable without a
/// chart widget attached.
struct TracingView;

impl DashboardView for TracingView {
    fn show_loading(&mut self, token: RangeToken) {
        tracing::debug!(range = %token, "loading");
    }

    fn show_no_data(&mut self, token: RangeToken) {
        tracing::info!(range = %token, "no data in range");
    }

    fn show_error(&mut self, token: RangeToken, error: &FetchError) {
        tracing::warn!(range = %token, "range in error state: {error}");
    }

    fn render_snapshot(&mut self, token: RangeToken, snapshot: &Snapshot) {
        tracing::info!(
            range = %token,
            rows = snapshot.data.len(),
            peaks = format_count(Some(snapshot.kpis.total_peaks as f64)),
            pct_over = format_percent(Some(snapshot.kpis.percent_over_threshold)),
            "snapshot ready"
        );
    }

    fn render_activities(&mut self, token: RangeToken, events: &[ActivityEvent]) {
        tracing::info!(range = %token, activities = events.len(), "activities ready");
    }

    fn show_activities_error(&mut self, token: RangeToken) {
        tracing::warn!(range = %token, "activities cell unavailable ({NO_DATA_GLYPH})");
    }

    fn render_last_reading(&mut self, card: &LastReadingCard) {
        tracing::info!(
            pm25 = %card.value,
            severity = card.severity.map(|s| s.as_str()).unwrap_or(NO_DATA_GLYPH),
            "latest reading"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = load_config().context("failed to load configuration")?;
    config
        .ensure_credentials()
        .context("backend credentials are required")?;

    // Backend client (infrastructure layer)
    let backend = Arc::new(RestBackend::new(&config.backend, config.request_timeout())?);
    let activities_source: Arc<dyn ActivitiesRepository> = match &config.calendar {
        Some(settings) => Arc::new(CalendarClient::new(settings, config.request_timeout())?),
        None => backend.clone(),
    };

    // Services (application layer)
    let snapshots = Arc::new(SnapshotService::new(
        backend.clone(),
        config.cache_ttl(),
        config.backend.page_size,
    ));
    let activities = Arc::new(ActivityService::new(
        activities_source,
        config.activities_ttl(),
    ));

    // Coordinator with the headless view (presentation layer)
    let highlight = Arc::new(Mutex::new(HighlightBus::new()));
    let coordinator = Arc::new(RenderCoordinator::new(
        snapshots,
        activities,
        Box::new(TracingView),
        highlight,
        config.severity,
        config.min_reload_interval(),
    ));

    coordinator.initialize().await;
    tokio::spawn(
        coordinator
            .clone()
            .run_passive_refresh(config.passive_interval()),
    );

    // Ingest endpoint
    let state = IngestState {
        sink: backend,
        device_hashes: Arc::new(config.ingest.devices.clone()),
    };
    let app = router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config
        .ingest
        .listen_addr
        .parse()
        .context("invalid ingest listen address")?;
    tracing::info!("starting atelier-air on {addr}");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}

// Render coordinator - range selection state machine and refresh loops
use crate::application::activity_service::ActivityService;
use crate::application::fetch_cache::ReloadGate;
use crate::application::snapshot_service::SnapshotService;
use crate::domain::range::RangeToken;
use crate::domain::readings::Snapshot;
use crate::domain::severity::SeverityBands;
use crate::error::FetchError;
use crate::presentation::highlight_bus::HighlightBus;
use crate::presentation::view::{DashboardView, LastReadingCard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Lifecycle of one range selection. `Loading` always ends in `Ready`
/// or `Error`; failures in one range never disturb another range's
/// `Ready` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeState {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Owns the view, the current-range selection and the refresh
/// discipline. One explicit context object created at dashboard
/// initialization; nothing range-related lives outside it.
pub struct RenderCoordinator {
    snapshots: Arc<SnapshotService>,
    activities: Arc<ActivityService>,
    view: Mutex<Box<dyn DashboardView>>,
    highlight: Arc<Mutex<HighlightBus>>,
    bands: SeverityBands,
    states: Mutex<HashMap<RangeToken, RangeState>>,
    current: Mutex<RangeToken>,
    selection_seq: AtomicU64,
    gate: ReloadGate,
}

impl RenderCoordinator {
    pub fn new(
        snapshots: Arc<SnapshotService>,
        activities: Arc<ActivityService>,
        view: Box<dyn DashboardView>,
        highlight: Arc<Mutex<HighlightBus>>,
        bands: SeverityBands,
        min_reload_interval: Duration,
    ) -> Self {
        Self {
            snapshots,
            activities,
            view: Mutex::new(view),
            highlight,
            bands,
            states: Mutex::new(HashMap::new()),
            current: Mutex::new(RangeToken::Last24h),
            selection_seq: AtomicU64::new(0),
            gate: ReloadGate::new(min_reload_interval),
        }
    }

    pub fn current_range(&self) -> RangeToken {
        *self.current.lock().unwrap()
    }

    pub fn state(&self, token: RangeToken) -> RangeState {
        self.states
            .lock()
            .unwrap()
            .get(&token)
            .copied()
            .unwrap_or(RangeState::Idle)
    }

    /// Prefetch every range once, then allow an immediate manual reload.
    pub async fn initialize(&self) {
        {
            let mut states = self.states.lock().unwrap();
            for token in RangeToken::ALL {
                states.entry(token).or_insert(RangeState::Idle);
            }
        }
        self.reload(false).await;
        self.gate.allow_immediate();
    }

    /// User picked a range. A result arriving after a newer selection
    /// still warms the cache and settles the range's state, but only
    /// the response matching the latest selection sequence may touch
    /// the view.
    pub async fn select_range(&self, token: RangeToken) {
        let seq = self.selection_seq.fetch_add(1, Ordering::SeqCst) + 1;
        *self.current.lock().unwrap() = token;
        self.set_state(token, RangeState::Loading);
        self.with_view(|view| view.show_loading(token));

        let result = self.snapshots.load_snapshot(token, false).await;
        let fresh = self.selection_seq.load(Ordering::SeqCst) == seq;
        self.settle(token, result, fresh).await;
    }

    /// Reload the extent and every previously viewed range. Guarded by
    /// the minimum-interval gate; a user-initiated call passes once
    /// regardless. Returns whether the reload actually ran.
    pub async fn reload(&self, user_initiated: bool) -> bool {
        if user_initiated {
            self.gate.allow_immediate();
            // an explicit reload also wants a fresh activity list
            self.activities.clear_cache();
        }
        if !self.gate.try_acquire() {
            return false;
        }

        // forced extent check for the active view; ranges themselves
        // stay TTL-respecting
        if let Err(err) = self.snapshots.refresh_extent(true).await {
            tracing::warn!("extent refresh failed: {err}");
        }

        let viewed: Vec<RangeToken> = self.states.lock().unwrap().keys().copied().collect();
        for token in viewed {
            let result = self.snapshots.load_snapshot(token, false).await;
            let fresh = self.current_range() == token;
            self.settle(token, result, fresh).await;
        }
        true
    }

    /// Background refresh at a longer cadence than the interactive gate.
    pub async fn run_passive_refresh(self: Arc<Self>, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // immediate first tick is the initialize() load
        loop {
            ticker.tick().await;
            self.reload(false).await;
        }
    }

    async fn settle(&self, token: RangeToken, result: Result<Snapshot, FetchError>, fresh: bool) {
        match result {
            Ok(snapshot) => {
                self.set_state(token, RangeState::Ready);
                if fresh {
                    self.render_snapshot(token, &snapshot);
                    self.refresh_activities(token).await;
                }
            }
            Err(FetchError::Unavailable) => {
                // empty backend is a defined display state, not an error
                self.set_state(token, RangeState::Ready);
                if fresh {
                    self.with_view(|view| view.show_no_data(token));
                }
            }
            Err(err) => {
                self.set_state(token, RangeState::Error);
                tracing::error!(range = %token, "snapshot load failed: {err}");
                if fresh {
                    self.with_view(|view| view.show_error(token, &err));
                }
            }
        }
    }

    fn render_snapshot(&self, token: RangeToken, snapshot: &Snapshot) {
        let card = (token == RangeToken::Last24h)
            .then(|| LastReadingCard::from_snapshot(snapshot, &self.bands));
        let mut view = self.view.lock().unwrap();
        view.render_snapshot(token, snapshot);
        if let Some(card) = card {
            view.render_last_reading(&card);
        }
    }

    async fn refresh_activities(&self, token: RangeToken) {
        let seq_before = self.selection_seq.load(Ordering::SeqCst);
        match self.activities.load(token, false).await {
            Ok(events) => {
                // a refresh that removed the selected event clears the
                // highlight everywhere
                {
                    let mut bus = self.highlight.lock().unwrap();
                    let vanished = bus
                        .current()
                        .is_some_and(|sel| !events.iter().any(|e| e.id == sel.event_id));
                    if vanished {
                        bus.clear();
                    }
                }
                let still_current = self.selection_seq.load(Ordering::SeqCst) == seq_before
                    && self.current_range() == token;
                if still_current {
                    self.with_view(|view| view.render_activities(token, &events));
                }
            }
            Err(err) => {
                tracing::error!(range = %token, "activities load failed: {err}");
                if self.current_range() == token {
                    self.with_view(|view| view.show_activities_error(token));
                }
            }
        }
    }

    fn set_state(&self, token: RangeToken, state: RangeState) {
        self.states.lock().unwrap().insert(token, state);
    }

    fn with_view(&self, f: impl FnOnce(&mut dyn DashboardView)) {
        let mut view = self.view.lock().unwrap();
        f(view.as_mut());
    }
}

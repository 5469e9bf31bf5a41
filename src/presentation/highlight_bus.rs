// Cross-widget highlight bus and its two standard listeners
use crate::domain::highlight::HighlightSelection;
use chrono::{DateTime, Utc};

/// Raw selection as emitted by a widget, instants still in wire form.
#[derive(Debug, Clone)]
pub struct RawSelection {
    pub event_id: String,
    pub start: String,
    pub end: String,
}

pub trait HighlightListener: Send {
    fn on_highlight(&mut self, selection: Option<&HighlightSelection>);
}

/// Typed publish/subscribe replacing ambient event dispatch. Owns the
/// single process-wide selection; every publish (including clears)
/// notifies all listeners synchronously with the normalized selection.
#[derive(Default)]
pub struct HighlightBus {
    current: Option<HighlightSelection>,
    listeners: Vec<Box<dyn HighlightListener>>,
}

impl HighlightBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Box<dyn HighlightListener>) {
        self.listeners.push(listener);
    }

    /// Normalize and publish. An unparseable or zero-duration selection
    /// clears the highlight instead of propagating garbage.
    pub fn publish(&mut self, raw: Option<RawSelection>) {
        self.current = raw
            .and_then(|r| HighlightSelection::normalize(&r.event_id, &r.start, &r.end));
        self.notify();
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.notify();
    }

    pub fn current(&self) -> Option<&HighlightSelection> {
        self.current.as_ref()
    }

    fn notify(&mut self) {
        let selection = self.current.clone();
        for listener in &mut self.listeners {
            listener.on_highlight(selection.as_ref());
        }
    }
}

/// Chart overlay shapes. The static guides are the "base" list; the
/// highlight span is recomputed on top of it, never accumulated.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    ThresholdLine { value: f64 },
    ThresholdBand { from: f64, to: f64 },
    HighlightSpan { start: DateTime<Utc>, end: DateTime<Utc> },
}

/// The opaque chart widget, as far as overlays are concerned.
pub trait ChartSurface: Send {
    fn apply_shapes(&mut self, shapes: &[Shape]);
}

pub struct ChartHighlightOverlay<S: ChartSurface> {
    surface: S,
    base_shapes: Vec<Shape>,
}

impl<S: ChartSurface> ChartHighlightOverlay<S> {
    pub fn new(surface: S, base_shapes: Vec<Shape>) -> Self {
        Self { surface, base_shapes }
    }
}

impl<S: ChartSurface> HighlightListener for ChartHighlightOverlay<S> {
    fn on_highlight(&mut self, selection: Option<&HighlightSelection>) {
        let mut shapes = self.base_shapes.clone();
        if let Some(sel) = selection {
            shapes.push(Shape::HighlightSpan {
                start: sel.start,
                end: sel.end,
            });
        }
        self.surface.apply_shapes(&shapes);
    }
}

/// The activity list widget, as far as row highlighting is concerned.
pub trait ActivityListSurface: Send {
    fn set_active_row(&mut self, event_id: Option<&str>);
    fn is_row_visible(&self, event_id: &str) -> bool;
    fn scroll_to_row(&mut self, event_id: &str);
}

pub struct ActivityRowHighlighter<S: ActivityListSurface> {
    surface: S,
    active: Option<String>,
}

impl<S: ActivityListSurface> ActivityRowHighlighter<S> {
    pub fn new(surface: S) -> Self {
        Self { surface, active: None }
    }
}

impl<S: ActivityListSurface> HighlightListener for ActivityRowHighlighter<S> {
    fn on_highlight(&mut self, selection: Option<&HighlightSelection>) {
        let event_id = selection.map(|s| s.event_id.clone());
        let unchanged = event_id == self.active;
        self.active = event_id;
        self.surface.set_active_row(self.active.as_deref());

        // scroll only when the target changed and is currently off-screen
        if let Some(id) = self.active.clone() {
            if !unchanged && !self.surface.is_row_visible(&id) {
                self.surface.scroll_to_row(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingChart {
        applied: Arc<Mutex<Vec<Vec<Shape>>>>,
    }

    impl ChartSurface for RecordingChart {
        fn apply_shapes(&mut self, shapes: &[Shape]) {
            self.applied.lock().unwrap().push(shapes.to_vec());
        }
    }

    #[derive(Default, Clone)]
    struct RecordingList {
        active: Arc<Mutex<Option<String>>>,
        visible: Arc<Mutex<Vec<String>>>,
        scrolls: Arc<Mutex<Vec<String>>>,
    }

    impl ActivityListSurface for RecordingList {
        fn set_active_row(&mut self, event_id: Option<&str>) {
            *self.active.lock().unwrap() = event_id.map(str::to_string);
        }
        fn is_row_visible(&self, event_id: &str) -> bool {
            self.visible.lock().unwrap().iter().any(|id| id == event_id)
        }
        fn scroll_to_row(&mut self, event_id: &str) {
            self.scrolls.lock().unwrap().push(event_id.to_string());
        }
    }

    fn raw(id: &str, start: &str, end: &str) -> RawSelection {
        RawSelection {
            event_id: id.to_string(),
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    fn base_shapes() -> Vec<Shape> {
        vec![
            Shape::ThresholdLine { value: 15.0 },
            Shape::ThresholdBand { from: 15.0, to: 60.0 },
        ]
    }

    #[test]
    fn test_overlay_never_accumulates() {
        let chart = RecordingChart::default();
        let applied = chart.applied.clone();
        let mut bus = HighlightBus::new();
        bus.subscribe(Box::new(ChartHighlightOverlay::new(chart, base_shapes())));

        let sel = raw("e1", "2024-01-01T10:00:00Z", "2024-01-01T12:00:00Z");
        bus.publish(Some(sel.clone()));
        bus.publish(Some(sel));

        let applied = applied.lock().unwrap();
        assert_eq!(applied.len(), 2);
        for shapes in applied.iter() {
            assert_eq!(shapes.len(), 3, "base shapes plus exactly one span");
        }
    }

    #[test]
    fn test_clear_restores_base_shapes() {
        let chart = RecordingChart::default();
        let applied = chart.applied.clone();
        let mut bus = HighlightBus::new();
        bus.subscribe(Box::new(ChartHighlightOverlay::new(chart, base_shapes())));

        bus.publish(Some(raw("e1", "2024-01-01T10:00:00Z", "2024-01-01T12:00:00Z")));
        bus.publish(None);

        let applied = applied.lock().unwrap();
        assert_eq!(applied.last().unwrap(), &base_shapes());
        assert!(bus.current().is_none());
    }

    #[test]
    fn test_invalid_selection_clears() {
        let mut bus = HighlightBus::new();
        bus.publish(Some(raw("e1", "2024-01-01T10:00:00Z", "2024-01-01T10:00:00Z")));
        assert!(bus.current().is_none());
    }

    #[test]
    fn test_reversed_selection_is_normalized() {
        let mut bus = HighlightBus::new();
        bus.publish(Some(raw("e1", "2024-01-01T12:00:00Z", "2024-01-01T10:00:00Z")));
        let sel = bus.current().unwrap();
        assert!(sel.start < sel.end);
    }

    #[test]
    fn test_row_selection_is_idempotent() {
        let list = RecordingList::default();
        let scrolls = list.scrolls.clone();
        let active = list.active.clone();
        let mut bus = HighlightBus::new();
        bus.subscribe(Box::new(ActivityRowHighlighter::new(list)));

        let sel = raw("e1", "2024-01-01T10:00:00Z", "2024-01-01T12:00:00Z");
        bus.publish(Some(sel.clone()));
        bus.publish(Some(sel));

        assert_eq!(active.lock().unwrap().as_deref(), Some("e1"));
        // second publish of the same event must not scroll again
        assert_eq!(scrolls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_no_scroll_when_row_already_visible() {
        let list = RecordingList::default();
        list.visible.lock().unwrap().push("e1".to_string());
        let scrolls = list.scrolls.clone();
        let mut bus = HighlightBus::new();
        bus.subscribe(Box::new(ActivityRowHighlighter::new(list)));

        bus.publish(Some(raw("e1", "2024-01-01T10:00:00Z", "2024-01-01T12:00:00Z")));
        assert!(scrolls.lock().unwrap().is_empty());
    }
}

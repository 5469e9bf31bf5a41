// Calendar activity model and its display ordering
use chrono::{DateTime, Utc};

/// PM2.5 aggregate attached to an activity by the backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pm25Stats {
    pub mean: Option<f64>,
    pub max: Option<f64>,
    pub pct_over_15: Option<f64>,
    pub pct_over_35: Option<f64>,
    pub points_sample: Vec<f64>,
}

/// Activity owned by the calendar collaborator; read-only here, keyed
/// by `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEvent {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    pub person: Option<String>,
    pub kind: String,
    pub pm25: Option<Pm25Stats>,
}

/// Order activities for the list: ongoing first ascending by start,
/// then finished descending by end.
pub fn order_for_display(mut events: Vec<ActivityEvent>, now: DateTime<Utc>) -> Vec<ActivityEvent> {
    let (mut ongoing, mut finished): (Vec<_>, Vec<_>) =
        events.drain(..).partition(|evt| evt.end >= now);

    ongoing.sort_by_key(|evt| evt.start);
    finished.sort_by_key(|evt| std::cmp::Reverse(evt.end));

    ongoing.extend(finished);
    ongoing
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn evt(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> ActivityEvent {
        ActivityEvent {
            id: id.to_string(),
            start,
            end,
            title: format!("activity {id}"),
            person: None,
            kind: "other".to_string(),
            pm25: None,
        }
    }

    #[test]
    fn test_ongoing_before_finished() {
        let now = Utc::now();
        let events = vec![
            evt("done-late", now - Duration::hours(3), now - Duration::hours(1)),
            evt("running-b", now - Duration::minutes(10), now + Duration::hours(1)),
            evt("done-early", now - Duration::hours(6), now - Duration::hours(5)),
            evt("running-a", now - Duration::minutes(30), now + Duration::hours(2)),
        ];

        let ordered = order_for_display(events, now);
        let ids: Vec<&str> = ordered.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["running-a", "running-b", "done-late", "done-early"]);
    }
}

// Activity loading - per-range cache over the calendar/backend source
use crate::application::fetch_cache::FetchCache;
use crate::application::repository::ActivitiesRepository;
use crate::domain::activity::{order_for_display, ActivityEvent};
use crate::domain::range::RangeToken;
use crate::error::FetchError;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

pub struct ActivityService {
    repository: Arc<dyn ActivitiesRepository>,
    cache: FetchCache<RangeToken, Vec<ActivityEvent>>,
}

impl ActivityService {
    pub fn new(repository: Arc<dyn ActivitiesRepository>, ttl: Duration) -> Self {
        Self {
            repository,
            cache: FetchCache::new(ttl),
        }
    }

    /// Activities for the range, in display order (ongoing first).
    pub async fn load(
        &self,
        token: RangeToken,
        force: bool,
    ) -> Result<Vec<ActivityEvent>, FetchError> {
        let events = self
            .cache
            .get_or_fetch(token, force, {
                let repository = self.repository.clone();
                move || async move { repository.fetch_activities(token).await }
            })
            .await?;
        Ok(order_for_display(events, Utc::now()))
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

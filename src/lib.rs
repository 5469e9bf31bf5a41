// Air-quality dashboard core: incremental data refresh, per-range
// caching with single-flight fetches, snapshot aggregation and
// cross-widget highlight synchronization.
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

// Application layer - Services and the caching/throttling machinery
pub mod activity_service;
pub mod fetch_cache;
pub mod repository;
pub mod snapshot_service;

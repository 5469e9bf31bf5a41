// Infrastructure layer - External dependencies and adapters
pub mod calendar;
pub mod config;
pub mod rest_repository;

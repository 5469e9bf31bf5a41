// Presentation layer - view seam, coordinator, highlight bus, ingest endpoint
pub mod coordinator;
pub mod highlight_bus;
pub mod ingest;
pub mod view;

// Domain layer - Pure data model and range/highlight logic
pub mod activity;
pub mod highlight;
pub mod range;
pub mod readings;
pub mod severity;

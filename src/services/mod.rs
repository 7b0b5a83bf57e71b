pub mod dashboard;
pub mod fetchers;
pub mod stats;
pub mod toggle;

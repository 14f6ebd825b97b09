pub mod config;
pub mod error;
pub mod metrics;
pub mod providers;
pub mod similarity;
pub mod store;
pub mod types;

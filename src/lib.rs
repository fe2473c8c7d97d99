pub mod bronze;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod digest;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod provision;
pub mod silver;
pub mod snapshot;
pub mod store;

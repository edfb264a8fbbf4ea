// Kagami image transformation gateway library

pub mod authorizer;
pub mod cache;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod proxy;
pub mod rate_limit;
pub mod server;
pub mod transform;

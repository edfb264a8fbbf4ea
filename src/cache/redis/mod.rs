// Redis cache implementation module
//
// Shared artifact storage across gateway instances. Artifacts are stored as
// MessagePack with SET EX so Redis owns expiry.

pub mod cache;
pub mod config;
pub mod serialization;

pub use cache::RedisStore;
pub use config::RedisConfig;

// Constants module - centralized default values for configuration
//
// Every default the gateway falls back to lives here so the config layer,
// the env overrides and the tests agree on a single value.

// =============================================================================
// Server defaults
// =============================================================================

/// Default listen port (matches the `PORT` env default)
pub const DEFAULT_PORT: u16 = 3000;

/// Default number of worker threads
pub const DEFAULT_THREADS: usize = 4;

/// Default request read timeout in seconds
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Default response write timeout in seconds
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 30;

/// Default keep-alive idle timeout in seconds
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

/// Default graceful shutdown window in seconds
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 10;

// =============================================================================
// Gateway defaults
// =============================================================================

/// Default maximum source image size (10 MiB)
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Cache-Control value sent with every image response
pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=31536000";

// =============================================================================
// Rate limit defaults
// =============================================================================

/// Default per-client requests per second
pub const DEFAULT_RATE_LIMIT_RPS: u32 = 100;

/// Default interval between bucket sweeps in seconds
pub const DEFAULT_RATE_LIMIT_CLEANUP_SECS: u64 = 60;

/// Default maximum number of tracked clients
pub const DEFAULT_MAX_TRACKED_CLIENTS: usize = 100_000;

// =============================================================================
// Cache defaults
// =============================================================================

/// Default artifact TTL in seconds (one day)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;

/// Default Redis address (host:port form accepted)
pub const DEFAULT_REDIS_URL: &str = "localhost:6379";

/// Default key prefix for Redis entries
pub const DEFAULT_REDIS_KEY_PREFIX: &str = "kagami";

/// Default in-process cache size in megabytes
pub const DEFAULT_MEMORY_CACHE_MB: u64 = 256;

// =============================================================================
// Downloader defaults
// =============================================================================

/// Default overall download timeout in seconds
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 15;

/// Default connect/TLS handshake timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default idle connections kept per origin
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Default idle connection lifetime in seconds
pub const DEFAULT_POOL_IDLE_TIMEOUT_SECS: u64 = 90;

// =============================================================================
// Engine defaults
// =============================================================================

/// Default number of engine worker threads
pub const DEFAULT_ENGINE_CONCURRENCY: usize = 8;

/// Default decoded pixel budget per source image (100 megapixels)
pub const DEFAULT_MAX_SOURCE_PIXELS: u64 = 100_000_000;

/// Default output quality
pub const DEFAULT_QUALITY: u8 = 80;

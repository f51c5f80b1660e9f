//! Constants definition module
//!
//! Centralizes constants used throughout the application.
//! This improves maintainability by requiring changes in only one place.

/// Application basic settings
pub const APP_NAME: &str = "switchboard";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file name, used when `--config` is not given.
pub const DEFAULT_CONFIG_FILENAME: &str = "config.yaml";

/// Health check settings
///
/// Applied when `health-check-interval` is absent or zero in the config file.
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 10;
pub const HEALTH_CHECK_TIMEOUT_MS: u64 = 1_000;

/// Maximum number of backend dispatch attempts per inbound request before
/// giving up and returning 502 to the client.
pub const MAX_DISPATCH_ATTEMPTS: u32 = 5;

/// Multiplier applied to the backend count to bound the number of
/// `pool.next()` calls `pick_backend` will make while searching for a live
/// backend. Guarantees termination and gives every backend at least two
/// chances under adversarial pool ordering.
pub const PICK_RETRY_MULTIPLIER: usize = 2;

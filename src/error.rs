//! Error handling module
//!
//! Based on anyhow but adds domain-specific error contexts to improve
//! debugging and user feedback.

use std::io;

/// Main error types for the switchboard application
///
/// Each error clearly expresses the context where it occurred (config,
/// network, backend, ...) to reduce problem resolution time.
#[derive(Debug)]
pub enum LbError {
    /// Configuration file related errors
    Config(String),
    /// Network/IO related errors
    Network(String),
    /// Backend connection related errors
    Backend(String),
    /// Health check related errors
    HealthCheck(String),
}

impl std::fmt::Display for LbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LbError::Config(msg) => write!(f, "config error: {}", msg),
            LbError::Network(msg) => write!(f, "network error: {}", msg),
            LbError::Backend(msg) => write!(f, "backend connection failed: {}", msg),
            LbError::HealthCheck(msg) => write!(f, "health check failed: {}", msg),
        }
    }
}

impl std::error::Error for LbError {}

/// Helper trait for adding context to anyhow::Error
pub trait ResultExt<T> {
    /// Add configuration error context
    fn context_config(self, msg: &str) -> anyhow::Result<T>;
    /// Add network error context
    fn context_network(self, msg: &str) -> anyhow::Result<T>;
    /// Add backend error context
    fn context_backend(self, msg: &str) -> anyhow::Result<T>;
}

impl<T> ResultExt<T> for anyhow::Result<T> {
    fn context_config(self, msg: &str) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{}: {}", LbError::Config(msg.to_string()), e))
    }

    fn context_network(self, msg: &str) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{}: {}", LbError::Network(msg.to_string()), e))
    }

    fn context_backend(self, msg: &str) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{}: {}", LbError::Backend(msg.to_string()), e))
    }
}

impl<T> ResultExt<T> for io::Result<T> {
    fn context_config(self, msg: &str) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{}: {}", LbError::Config(msg.to_string()), e))
    }

    fn context_network(self, msg: &str) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{}: {}", LbError::Network(msg.to_string()), e))
    }

    fn context_backend(self, msg: &str) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{}: {}", LbError::Backend(msg.to_string()), e))
    }
}

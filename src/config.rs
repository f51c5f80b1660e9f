//! Configuration file management module
//!
//! Parses the YAML configuration into a validated [`Config`], mirroring the
//! upstream declarative schema while enforcing the exact startup-error
//! messages operators depend on.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use url::Url;

use crate::constants::DEFAULT_HEALTH_CHECK_INTERVAL_SECS;

/// Pool variant requested in the config file.
///
/// `RoundRobin` is the declared intent; whether it actually resolves to a
/// plain round-robin pool or a weighted one depends on whether any backend
/// carries an explicit weight (see [`Config::pool_kind`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    RoundRobin,
    WeightedRoundRobin,
    LeastConn,
    Random,
}

fn default_lb_type() -> String {
    "round-robin".to_string()
}

/// One `backends[]` entry as written in the config file.
#[derive(Debug, Clone, Deserialize)]
struct RawBackend {
    url: String,
    #[serde(default)]
    weight: Option<i64>,
}

/// Top-level config file shape, deserialized before validation.
#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    port: u16,
    #[serde(rename = "type", default = "default_lb_type")]
    lb_type: String,
    #[serde(rename = "health-check-interval", default)]
    health_check_interval: Option<i64>,
    #[serde(default)]
    backends: Vec<RawBackend>,
}

/// A single validated backend entry.
#[derive(Debug, Clone)]
pub struct BackendSpec {
    pub url: Url,
    pub weight: u32,
    /// Whether `weight` was explicitly set (as opposed to defaulted to 1).
    ///
    /// The round-robin-vs-WRR decision is keyed on this, not on the
    /// post-default value, since a backend with `weight: 1` written
    /// explicitly should behave the same as one left blank.
    pub has_explicit_weight: bool,
}

/// Fully validated configuration, ready to build a pool and balancer from.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub pool_kind: PoolKind,
    pub probe_interval: Option<Duration>,
    pub backends: Vec<BackendSpec>,
}

impl Config {
    /// Load and validate a configuration file from disk.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read configuration file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse and validate configuration file contents.
    ///
    /// Split out from [`Self::load_from_file`] so tests can exercise it
    /// without touching the filesystem.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(content).context("invalid config file")?;

        if raw.backends.is_empty() {
            bail!("no backend specified");
        }

        let mut backends = Vec::with_capacity(raw.backends.len());
        let mut any_explicit_weight = false;

        for entry in &raw.backends {
            let url = Url::parse(&entry.url)
                .with_context(|| format!("invalid backend url: {}", entry.url))?;

            let has_explicit_weight = entry.weight.is_some();
            let raw_weight = entry.weight.unwrap_or(0);
            if raw_weight < 0 {
                bail!("invalid negative weight");
            }
            if has_explicit_weight && raw_weight > 0 {
                any_explicit_weight = true;
            }
            let weight = if raw_weight == 0 { 1 } else { raw_weight as u32 };

            backends.push(BackendSpec {
                url,
                weight,
                has_explicit_weight,
            });
        }

        let pool_kind = match raw.lb_type.as_str() {
            "least-conn" => PoolKind::LeastConn,
            "random" => PoolKind::Random,
            "round-robin" if any_explicit_weight => PoolKind::WeightedRoundRobin,
            "round-robin" => PoolKind::RoundRobin,
            _ => bail!("invalid load balancer type"),
        };

        let probe_interval = match raw.health_check_interval {
            None | Some(0) => Some(Duration::from_secs(DEFAULT_HEALTH_CHECK_INTERVAL_SECS)),
            Some(secs) if secs < 0 => None,
            Some(secs) => Some(Duration::from_secs(secs as u64)),
        };

        Ok(Config {
            port: raw.port,
            pool_kind,
            probe_interval,
            backends,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(body: &str) -> String {
        format!("port: 9295\n{}", body)
    }

    #[test]
    fn defaults_to_round_robin_without_weights() {
        let cfg = Config::parse(&yaml(
            "backends:\n  - url: \"http://127.0.0.1:9000\"\n  - url: \"http://127.0.0.1:9001\"\n",
        ))
        .unwrap();
        assert_eq!(cfg.pool_kind, PoolKind::RoundRobin);
        assert_eq!(cfg.backends.len(), 2);
        assert_eq!(cfg.backends[0].weight, 1);
    }

    #[test]
    fn explicit_positive_weight_upgrades_to_wrr() {
        let cfg = Config::parse(&yaml(
            "backends:\n  - url: \"http://127.0.0.1:9000\"\n    weight: 5\n  - url: \"http://127.0.0.1:9001\"\n",
        ))
        .unwrap();
        assert_eq!(cfg.pool_kind, PoolKind::WeightedRoundRobin);
    }

    #[test]
    fn explicit_type_is_respected_over_weight_heuristic() {
        let cfg = Config::parse(&yaml(
            "type: least-conn\nbackends:\n  - url: \"http://127.0.0.1:9000\"\n    weight: 5\n",
        ))
        .unwrap();
        assert_eq!(cfg.pool_kind, PoolKind::LeastConn);
    }

    #[test]
    fn negative_weight_is_rejected() {
        let err = Config::parse(&yaml(
            "backends:\n  - url: \"http://127.0.0.1:9000\"\n    weight: -1\n",
        ))
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid negative weight");
    }

    #[test]
    fn empty_backend_list_is_rejected() {
        let err = Config::parse(&yaml("backends: []\n")).unwrap_err();
        assert_eq!(err.to_string(), "no backend specified");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = Config::parse(&yaml(
            "type: sticky\nbackends:\n  - url: \"http://127.0.0.1:9000\"\n",
        ))
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid load balancer type");
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        let err = Config::parse("port: [this is not: valid\n").unwrap_err();
        assert_eq!(err.to_string(), "invalid config file");
    }

    #[test]
    fn zero_weight_defaults_to_one_and_does_not_trigger_wrr() {
        let cfg = Config::parse(&yaml(
            "backends:\n  - url: \"http://127.0.0.1:9000\"\n    weight: 0\n  - url: \"http://127.0.0.1:9001\"\n",
        ))
        .unwrap();
        assert_eq!(cfg.pool_kind, PoolKind::RoundRobin);
        assert_eq!(cfg.backends[0].weight, 1);
    }

    #[test]
    fn negative_health_check_interval_disables_probing() {
        let cfg = Config::parse(&format!(
            "port: 9295\nhealth-check-interval: -1\nbackends:\n  - url: \"http://127.0.0.1:9000\"\n"
        ))
        .unwrap();
        assert!(cfg.probe_interval.is_none());
    }

    #[test]
    fn absent_health_check_interval_uses_default() {
        let cfg = Config::parse(&yaml("backends:\n  - url: \"http://127.0.0.1:9000\"\n")).unwrap();
        assert_eq!(
            cfg.probe_interval,
            Some(Duration::from_secs(DEFAULT_HEALTH_CHECK_INTERVAL_SECS))
        );
    }

    #[tokio::test]
    async fn load_from_file_reads_and_validates_a_real_file() {
        let mut file = tempfile::NamedTempFile::new().expect("scratch config file");
        std::io::Write::write_all(
            &mut file,
            yaml("backends:\n  - url: \"http://127.0.0.1:9000\"\n").as_bytes(),
        )
        .unwrap();

        let cfg = Config::load_from_file(file.path()).await.unwrap();
        assert_eq!(cfg.port, 9295);
        assert_eq!(cfg.backends.len(), 1);
    }

    #[tokio::test]
    async fn load_from_file_reports_missing_file() {
        let err = Config::load_from_file(Path::new("/nonexistent/switchboard.yaml"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot read configuration file"));
    }
}

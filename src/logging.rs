//! Logging module
//!
//! Initializes env_logger with a one-line, timestamped record shape so every
//! log line is machine-parseable without pulling in a full tracing stack.

use anyhow::Result;
use log::LevelFilter;
use serde_json::{json, Value};
use std::io::Write;

/// Parse log level string to LevelFilter
fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// Initialize the console logger.
///
/// `log_level_str` is typically sourced from `RUST_LOG`; callers that don't
/// care can pass `"info"`.
pub fn init_logging(log_level_str: &str) -> Result<()> {
    let log_level = parse_log_level(log_level_str);

    env_logger::Builder::new()
        .format(move |buf, record| {
            let payload = build_json_payload(
                &chrono::Utc::now().to_rfc3339(),
                &record.level().to_string(),
                &record.args().to_string(),
                record.module_path().unwrap_or(record.target()),
            );
            writeln!(buf, "{}", payload)
        })
        .filter_level(log_level)
        .init();

    Ok(())
}

fn build_json_payload(timestamp: &str, level: &str, message: &str, module: &str) -> Value {
    json!({
        "timestamp": timestamp,
        "level": level,
        "message": message,
        "module": module,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_log_payload_uses_stable_keys() {
        let payload = build_json_payload(
            "2026-01-01T00:00:00Z",
            "INFO",
            "switchboard listening on :9295",
            "switchboard::server",
        );

        assert_eq!(payload["timestamp"], "2026-01-01T00:00:00Z");
        assert_eq!(payload["level"], "INFO");
        assert_eq!(payload["message"], "switchboard listening on :9295");
        assert_eq!(payload["module"], "switchboard::server");
    }

    #[test]
    fn unknown_level_defaults_to_info() {
        assert_eq!(parse_log_level("trace-ish"), LevelFilter::Info);
        assert_eq!(parse_log_level("DEBUG"), LevelFilter::Debug);
    }
}

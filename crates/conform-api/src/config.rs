//! # Service Configuration
//!
//! Read once from the environment at startup.
//!
//! | Variable                             | Default   |
//! |--------------------------------------|-----------|
//! | `PORT`                               | `8080`    |
//! | `CONFORM_MANIFEST`                   | unset     |
//! | `CONFORM_ALLOW_UNDECLARED_RESPONSES` | `false`   |
//! | `CONFORM_RESPONSE_BODY_LIMIT`        | `2097152` |
//! | `CONFORM_METRICS_ENABLED`            | `true`    |

use std::path::PathBuf;

use thiserror::Error;

/// Default cap on buffered response bodies: 2 MiB.
pub const DEFAULT_RESPONSE_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// A configuration variable holds a value that cannot be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value {value:?} for {var}: expected {expected}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Route manifest served as a contract-checked stub API.
    pub manifest: Option<PathBuf>,
    /// Let statuses without a declared schema through unchecked.
    pub allow_undeclared_responses: bool,
    /// Largest response body the contract middleware will buffer.
    pub response_body_limit: usize,
    /// Mount `/metrics` and install the Prometheus recorder.
    pub metrics_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            manifest: None,
            allow_undeclared_responses: false,
            response_body_limit: DEFAULT_RESPONSE_BODY_LIMIT,
            metrics_enabled: true,
        }
    }
}

impl AppConfig {
    /// Build configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |var: &'static str| lookup(var).filter(|v| !v.trim().is_empty());

        let port = match read("PORT") {
            Some(value) => parse_number("PORT", value)?,
            None => defaults.port,
        };
        let response_body_limit = match read("CONFORM_RESPONSE_BODY_LIMIT") {
            Some(value) => parse_number("CONFORM_RESPONSE_BODY_LIMIT", value)?,
            None => defaults.response_body_limit,
        };
        let allow_undeclared_responses = match read("CONFORM_ALLOW_UNDECLARED_RESPONSES") {
            Some(value) => parse_flag("CONFORM_ALLOW_UNDECLARED_RESPONSES", value)?,
            None => defaults.allow_undeclared_responses,
        };
        let metrics_enabled = match read("CONFORM_METRICS_ENABLED") {
            Some(value) => parse_flag("CONFORM_METRICS_ENABLED", value)?,
            None => defaults.metrics_enabled,
        };

        Ok(Self {
            port,
            manifest: read("CONFORM_MANIFEST").map(PathBuf::from),
            allow_undeclared_responses,
            response_body_limit,
            metrics_enabled,
        })
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError {
        var,
        value,
        expected: "a non-negative integer",
    })
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError {
            var,
            value,
            expected: "true or false",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let cfg = config(&[
            ("PORT", "9000"),
            ("CONFORM_MANIFEST", "/etc/conform/routes.yaml"),
            ("CONFORM_ALLOW_UNDECLARED_RESPONSES", "TRUE"),
            ("CONFORM_RESPONSE_BODY_LIMIT", "1024"),
            ("CONFORM_METRICS_ENABLED", "off"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.manifest, Some(PathBuf::from("/etc/conform/routes.yaml")));
        assert!(cfg.allow_undeclared_responses);
        assert_eq!(cfg.response_body_limit, 1024);
        assert!(!cfg.metrics_enabled);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = config(&[("PORT", " "), ("CONFORM_MANIFEST", "")]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert!(cfg.manifest.is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.var, "PORT");
        assert!(err.to_string().contains("eighty"));

        let err = config(&[("CONFORM_METRICS_ENABLED", "maybe")]).unwrap_err();
        assert_eq!(err.var, "CONFORM_METRICS_ENABLED");
    }
}

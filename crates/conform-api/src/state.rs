//! # Application State
//!
//! Built once at startup and shared by every request.

use std::sync::Arc;

use conform_schema::{ContractOptions, JsonSchemaCompiler};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::AppConfig;
use crate::middleware::contract::ContractGuard;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Present when the Prometheus recorder was installed.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Guard configured from this state, backed by the bundled compiler.
    pub fn contract_guard(&self) -> ContractGuard {
        ContractGuard::new(
            Arc::new(JsonSchemaCompiler::new()),
            ContractOptions {
                allow_undeclared_responses: self.config.allow_undeclared_responses,
            },
            self.config.response_body_limit,
        )
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

pub mod access;
pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod service;
pub mod startup;
pub mod utils;

pub use db::DbPool;

use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use service::WatchlistService;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub service: WatchlistService,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, service: WatchlistService) -> Self {
        Self {
            config,
            db,
            service,
            metrics_handle: None,
        }
    }

    /// Set the Prometheus metrics handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

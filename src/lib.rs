//! # icpulse
//!
//! Live network metrics for a ledger dashboard. Each displayed metric is
//! polled on its own fixed interval; the latest accepted value, the value
//! it replaced and a consecutive-error count are kept per metric and turned
//! into animated, error-aware card state.
//!
//! ## Modules
//!
//! - [`poller`]: Generic fetch-parse-update engine, one task per metric
//! - [`client`]: HTTP client seam and a scripted fake
//! - [`sources`]: Response shapes, chart series and the metric catalog
//! - [`display`]: Card and chart presentation rules
//! - [`dashboard`]: Mounts and tears down a set of pollers
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML config with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use icpulse::client::{ClientConfig, HttpMetricsClient};
//! use icpulse::dashboard::Dashboard;
//! use icpulse::sources::{builtin_metrics, DEFAULT_API_URL};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(HttpMetricsClient::new(ClientConfig::default())?);
//!     let dashboard = Dashboard::mount(builtin_metrics(), client, DEFAULT_API_URL).await?;
//!
//!     let mut updates = dashboard.handle("block_height").unwrap().subscribe();
//!     while updates.changed().await.is_ok() {
//!         if let Some(card) = dashboard.get("block_height") {
//!             println!("{}: {}", card.title, card.display.text());
//!         }
//!     }
//!
//!     dashboard.shutdown();
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod display;
pub mod poller;
pub mod sources;

// Re-export top-level types for convenience
pub use poller::{
    start, BaselineEstimator, ErrorKind, MetricKind, MetricSample, PollError, PollResult,
    PollState, PollerConfig, PollerHandle, TickOutcome,
};

pub use client::{ClientConfig, HttpMetricsClient, MetricsClient};

pub use sources::{Bucket, ChartWindow, MetricSettings, ResponseShape};

pub use display::DisplayValue;

pub use dashboard::{Dashboard, MetricSnapshot};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError, ConfigSource, LoadOutcome, LoggingConfig};

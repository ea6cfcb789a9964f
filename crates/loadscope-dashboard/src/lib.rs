// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Loadscope Dashboard
//!
//! Receives load-test samples, aggregates them into the Prometheus
//! instruments of [`loadscope_metrics`], and serves them over HTTP while the
//! test runs.
//!
//! # Data flow
//!
//! ```text
//! producer ──add_samples──▶ SampleBuffer ──every period──▶ flusher
//!     flusher ──batches of 10k──▶ channel(10) ──▶ bounded workers ──▶ registry
//!     registry ◀──GET /api/metrics── scrapers
//! ```
//!
//! # Example
//!
//! ```ignore
//! use loadscope_dashboard::{Dashboard, Output};
//! use loadscope_metrics::Sample;
//!
//! let mut dashboard = Dashboard::new("port=5665&period=2")?;
//! dashboard.start().await?;
//! dashboard.add_samples(vec![Sample::counter("http_reqs", 1.0)]);
//! dashboard.stop().await?;
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod feed;
pub mod output;
pub mod pipeline;

pub use buffer::SampleBuffer;
pub use config::DashboardOptions;
pub use error::{ConfigError, ConfigResult, DashboardError, DashboardResult};
pub use feed::{FeedStats, JsonFeed};
pub use output::{Dashboard, Output};
pub use pipeline::{split_batches, Pipeline, PipelineConfig, PipelineState, BATCH_SIZE};

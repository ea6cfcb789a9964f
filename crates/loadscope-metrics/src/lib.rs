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
//! Loadscope Metrics
//!
//! The instrument registry: a closed catalog of Prometheus instruments fed by
//! load-test samples, plus the HTTP endpoint that exposes them for scraping.
//!
//! # Features
//!
//! - **Closed Catalog**: the built-in load generator metrics, resolved once
//! - **Typed Dispatch**: counters add, gauges set, rates observe, trends do both
//! - **Concurrent Scrapes**: text exposition readable while samples are applied
//!
//! # Example
//!
//! ```ignore
//! use loadscope_metrics::{InstrumentRegistry, RegistryConfig, Sample};
//!
//! let registry = InstrumentRegistry::new(RegistryConfig::default())?;
//! registry.handle_sample(&Sample::counter("http_reqs", 1.0));
//! registry.handle_sample(&Sample::trend("http_req_duration", 120.5));
//!
//! let exposition = registry.scrape_handler().exposition()?;
//! ```

pub mod catalog;
pub mod error;
pub mod registry;
pub mod server;
pub mod types;

pub use error::{MetricsError, MetricsResult};
pub use registry::{Exposition, Handler, Instrument, InstrumentRegistry, ScrapeHandler, Trend};
pub use server::{IndexPage, METRICS_PATH};
pub use types::{default_buckets, MetricType, RegistryConfig, Sample};

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
//! Common types for sample ingestion

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Declared type of a metric as reported by the producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Cumulative total, only ever increases
    Counter,
    /// Instantaneous value, last write wins
    Gauge,
    /// Fraction of non-zero values, in [0, 1]
    Rate,
    /// Series of measurements such as durations
    Trend,
    /// Any tag this crate does not understand
    #[serde(other)]
    Unknown,
}

impl MetricType {
    /// Lowercase label, as used by the producer
    pub fn as_label(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Rate => "rate",
            MetricType::Trend => "trend",
            MetricType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// One measurement produced by the load generator
///
/// Samples are read-only for the registry. The metric name is shared so
/// that producers can hand out many samples for the same metric cheaply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Metric name, e.g. `http_req_duration`
    pub metric: Arc<str>,

    /// Declared metric type
    #[serde(rename = "type")]
    pub metric_type: MetricType,

    /// Observed value
    pub value: f64,
}

impl Sample {
    /// Create a sample
    pub fn new(metric: impl Into<Arc<str>>, metric_type: MetricType, value: f64) -> Self {
        Self {
            metric: metric.into(),
            metric_type,
            value,
        }
    }

    /// Shorthand for a counter sample
    pub fn counter(metric: impl Into<Arc<str>>, value: f64) -> Self {
        Self::new(metric, MetricType::Counter, value)
    }

    /// Shorthand for a gauge sample
    pub fn gauge(metric: impl Into<Arc<str>>, value: f64) -> Self {
        Self::new(metric, MetricType::Gauge, value)
    }

    /// Shorthand for a rate sample
    pub fn rate(metric: impl Into<Arc<str>>, value: f64) -> Self {
        Self::new(metric, MetricType::Rate, value)
    }

    /// Shorthand for a trend sample
    pub fn trend(metric: impl Into<Arc<str>>, value: f64) -> Self {
        Self::new(metric, MetricType::Trend, value)
    }
}

/// Configuration for the instrument registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Prometheus namespace prepended to every instrument name
    pub namespace: String,

    /// Prometheus subsystem placed between namespace and name
    pub subsystem: String,

    /// Histogram buckets. `None` selects [`default_buckets`].
    pub buckets: Option<Vec<f64>>,
}

impl RegistryConfig {
    /// Create a config with a namespace and subsystem
    pub fn with_prefix(namespace: impl Into<String>, subsystem: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            subsystem: subsystem.into(),
            buckets: None,
        }
    }
}

/// Default histogram layout: tenths up to 0.9, then powers of two up to 32768.
///
/// The fine low range keeps rates (fractions in [0, 1]) resolvable while the
/// exponential tail covers millisecond timings.
pub fn default_buckets() -> Vec<f64> {
    let fractions = (1..10).map(|i| f64::from(i) / 10.0);
    let powers = (0..16).map(|i| 2f64.powi(i));
    fractions.chain(powers).collect()
}

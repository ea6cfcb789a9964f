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
//! Instrument registry: the closed catalog of Prometheus instruments and the
//! per-sample dispatch that updates them.

use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::catalog::{self, BUILTIN_METRICS};
use crate::error::{MetricsError, MetricsResult};
use crate::types::{default_buckets, MetricType, RegistryConfig, Sample};

/// A trend is exposed twice: as a distribution and as its latest value
#[derive(Clone)]
pub struct Trend {
    /// Last observed value
    pub current: Gauge,
    /// All observed values
    pub distribution: Histogram,
}

/// A registered instrument
#[derive(Clone)]
pub enum Instrument {
    /// Accumulated total
    Counter(Counter),
    /// Last written value
    Gauge(Gauge),
    /// Distribution of observed values, used for rates
    Histogram(Histogram),
    /// Distribution plus last value
    Trend(Trend),
}

/// Update path selected for a sample by its declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// `add` on a counter
    Counter,
    /// `set` on a gauge
    Gauge,
    /// `observe` on a histogram
    Rate,
    /// `set` on the current gauge and `observe` on the histogram
    Trend,
}

/// Registry of the built-in instruments
///
/// Cheap to clone and safe to share across tasks: the name map is built once
/// and only instrument values change afterwards, through Prometheus' own
/// atomics.
#[derive(Clone)]
pub struct InstrumentRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    registry: Registry,
    instruments: HashMap<Box<str>, Instrument>,
}

impl InstrumentRegistry {
    /// Build and register every catalog instrument
    pub fn new(config: RegistryConfig) -> MetricsResult<Self> {
        let registry = Registry::new();
        let buckets = config.buckets.clone().unwrap_or_else(default_buckets);
        let mut instruments = HashMap::with_capacity(BUILTIN_METRICS.len() * 2);

        for entry in BUILTIN_METRICS {
            let instrument = match entry.kind {
                MetricType::Counter => {
                    let counter = Counter::with_opts(opts(&config, entry.name, entry.help))?;
                    registry.register(Box::new(counter.clone()))?;
                    Instrument::Counter(counter)
                }
                MetricType::Gauge => {
                    let gauge = Gauge::with_opts(opts(&config, entry.name, entry.help))?;
                    registry.register(Box::new(gauge.clone()))?;
                    Instrument::Gauge(gauge)
                }
                MetricType::Rate => {
                    let histogram = Histogram::with_opts(histogram_opts(
                        &config,
                        entry.name,
                        entry.help,
                        &buckets,
                    ))?;
                    registry.register(Box::new(histogram.clone()))?;
                    Instrument::Histogram(histogram)
                }
                MetricType::Trend => {
                    let current_name = catalog::current_gauge_name(entry.name);
                    let current = Gauge::with_opts(opts(&config, &current_name, entry.help))?;
                    registry.register(Box::new(current.clone()))?;

                    let distribution = Histogram::with_opts(histogram_opts(
                        &config,
                        entry.name,
                        entry.help,
                        &buckets,
                    ))?;
                    registry.register(Box::new(distribution.clone()))?;

                    instruments.insert(
                        current_name.into_boxed_str(),
                        Instrument::Gauge(current.clone()),
                    );
                    Instrument::Trend(Trend {
                        current,
                        distribution,
                    })
                }
                MetricType::Unknown => continue,
            };
            instruments.insert(entry.name.into(), instrument);
        }

        debug!(instruments = instruments.len(), "Instrument registry ready");

        Ok(Self {
            inner: Arc::new(RegistryInner {
                registry,
                instruments,
            }),
        })
    }

    /// Underlying Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Instrument tracked under `name`, if any
    pub fn instrument(&self, name: &str) -> Option<&Instrument> {
        self.inner.instruments.get(name)
    }

    /// Names of every addressable instrument, sorted
    pub fn metric_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.inner.instruments.keys().map(|name| &**name).collect();
        names.sort_unstable();
        names
    }

    /// Pick the update path for a sample from its declared type
    ///
    /// Unknown types are logged and yield `None`.
    pub fn classify(&self, sample: &Sample) -> Option<Handler> {
        match sample.metric_type {
            MetricType::Counter => Some(Handler::Counter),
            MetricType::Gauge => Some(Handler::Gauge),
            MetricType::Rate => Some(Handler::Rate),
            MetricType::Trend => Some(Handler::Trend),
            MetricType::Unknown => {
                warn!(metric = %sample.metric, "Unknown metric type");
                None
            }
        }
    }

    /// Classify a sample and apply it to its instrument
    pub fn handle_sample(&self, sample: &Sample) {
        match self.classify(sample) {
            Some(Handler::Counter) => self.apply_counter(sample),
            Some(Handler::Gauge) => self.apply_gauge(sample),
            Some(Handler::Rate) => self.apply_rate(sample),
            Some(Handler::Trend) => self.apply_trend(sample),
            None => {}
        }
    }

    /// Add the sample value to the named counter
    pub fn apply_counter(&self, sample: &Sample) {
        match self.instrument(&sample.metric) {
            Some(Instrument::Counter(counter)) => {
                // Counter::inc_by panics on negative input
                if sample.value.is_nan() || sample.value < 0.0 {
                    warn!(
                        metric = %sample.metric,
                        value = sample.value,
                        "Counter cannot decrease, dropping sample"
                    );
                    return;
                }
                counter.inc_by(sample.value);
            }
            _ => untracked(sample),
        }
    }

    /// Set the named gauge to the sample value
    pub fn apply_gauge(&self, sample: &Sample) {
        match self.instrument(&sample.metric) {
            Some(Instrument::Gauge(gauge)) => gauge.set(sample.value),
            _ => untracked(sample),
        }
    }

    /// Record the sample value in the named rate histogram
    pub fn apply_rate(&self, sample: &Sample) {
        match self.instrument(&sample.metric) {
            Some(Instrument::Histogram(histogram)) => histogram.observe(sample.value),
            _ => untracked(sample),
        }
    }

    /// Update both views of the named trend
    pub fn apply_trend(&self, sample: &Sample) {
        match self.instrument(&sample.metric) {
            Some(Instrument::Trend(trend)) => {
                trend.current.set(sample.value);
                trend.distribution.observe(sample.value);
            }
            _ => untracked(sample),
        }
    }

    /// Handle for serving the text exposition
    pub fn scrape_handler(&self) -> ScrapeHandler {
        ScrapeHandler {
            registry: self.inner.registry.clone(),
        }
    }
}

fn untracked(sample: &Sample) {
    match catalog::lookup(&sample.metric) {
        Some(entry) => debug!(
            metric = %sample.metric,
            metric_type = %sample.metric_type,
            expected = %entry.kind,
            "Ignoring sample with mismatched type"
        ),
        None => debug!(
            metric = %sample.metric,
            metric_type = %sample.metric_type,
            "Ignoring sample for untracked metric"
        ),
    }
}

fn opts(config: &RegistryConfig, name: &str, help: &str) -> Opts {
    Opts::new(name, help)
        .namespace(config.namespace.clone())
        .subsystem(config.subsystem.clone())
}

fn histogram_opts(config: &RegistryConfig, name: &str, help: &str, buckets: &[f64]) -> HistogramOpts {
    HistogramOpts::new(name, help)
        .namespace(config.namespace.clone())
        .subsystem(config.subsystem.clone())
        .buckets(buckets.to_vec())
}

/// Encoded registry state
#[derive(Debug, Clone)]
pub struct Exposition {
    /// Value for the `Content-Type` header
    pub content_type: &'static str,
    /// Prometheus text format body
    pub body: Vec<u8>,
}

/// Pull interface over the registry for scrapers
///
/// Each call gathers a fresh view. Every instrument is read atomically, but
/// the response as a whole is not a consistent snapshot across instruments.
#[derive(Clone)]
pub struct ScrapeHandler {
    registry: Registry,
}

impl ScrapeHandler {
    /// Gather and encode every registered family
    pub fn exposition(&self) -> MetricsResult<Exposition> {
        let families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut body = Vec::new();

        encoder
            .encode(&families, &mut body)
            .map_err(|e| MetricsError::Encode(e.to_string()))?;

        Ok(Exposition {
            content_type: prometheus::TEXT_FORMAT,
            body,
        })
    }
}

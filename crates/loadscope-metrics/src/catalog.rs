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
//! The closed set of metrics tracked by the registry.
//!
//! Names and descriptions mirror the built-in metrics of the load generator.
//! Anything outside this table is ignored.

use crate::types::MetricType;

/// One built-in metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Name as reported by the producer
    pub name: &'static str,
    /// Prometheus help text
    pub help: &'static str,
    /// Which instrument backs it
    pub kind: MetricType,
}

const fn entry(name: &'static str, kind: MetricType, help: &'static str) -> CatalogEntry {
    CatalogEntry { name, help, kind }
}

/// Suffix of the last-value gauge that accompanies every trend
pub const CURRENT_SUFFIX: &str = "_current";

/// Built-in metrics
pub const BUILTIN_METRICS: &[CatalogEntry] = &[
    entry("vus", MetricType::Gauge, "Current number of active virtual users"),
    entry("vus_max", MetricType::Gauge, "Max possible number of virtual users"),
    entry(
        "iterations",
        MetricType::Counter,
        "The aggregate number of times the VUs in the test have executed",
    ),
    entry(
        "dropped_iterations",
        MetricType::Counter,
        "The number of iterations that could not be started",
    ),
    entry("data_received", MetricType::Counter, "The amount of received data"),
    entry("data_sent", MetricType::Counter, "The amount of data sent"),
    entry(
        "http_reqs",
        MetricType::Counter,
        "How many HTTP requests has the load generator issued, in total",
    ),
    entry("checks", MetricType::Rate, "The rate of successful checks"),
    entry("http_req_failed", MetricType::Rate, "The rate of failed requests"),
    entry(
        "iteration_duration",
        MetricType::Trend,
        "The time it took to complete one full iteration",
    ),
    entry(
        "http_req_blocked",
        MetricType::Trend,
        "Time spent blocked before initiating the request",
    ),
    entry(
        "http_req_connecting",
        MetricType::Trend,
        "Time spent establishing TCP connection",
    ),
    entry(
        "http_req_tls_handshaking",
        MetricType::Trend,
        "Time spent handshaking TLS session",
    ),
    entry("http_req_sending", MetricType::Trend, "Time spent sending data"),
    entry("http_req_waiting", MetricType::Trend, "Time spent waiting for response"),
    entry(
        "http_req_receiving",
        MetricType::Trend,
        "Time spent receiving response data",
    ),
    entry("http_req_duration", MetricType::Trend, "Total time for the request"),
];

/// Look up a built-in metric by exact name
pub fn lookup(name: &str) -> Option<&'static CatalogEntry> {
    BUILTIN_METRICS.iter().find(|entry| entry.name == name)
}

/// Name of the last-value gauge for a trend
pub fn current_gauge_name(trend: &str) -> String {
    format!("{trend}{CURRENT_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let names: HashSet<_> = BUILTIN_METRICS.iter().map(|e| e.name).collect();
        assert_eq!(names.len(), BUILTIN_METRICS.len());
    }

    #[test]
    fn test_catalog_has_no_unknown_kinds() {
        assert!(BUILTIN_METRICS.iter().all(|e| e.kind != MetricType::Unknown));
    }

    #[test]
    fn test_current_names_do_not_collide() {
        for trend in BUILTIN_METRICS.iter().filter(|e| e.kind == MetricType::Trend) {
            assert!(lookup(&current_gauge_name(trend.name)).is_none());
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("http_reqs").map(|e| e.kind), Some(MetricType::Counter));
        assert!(lookup("http_reqs_total").is_none());
    }
}

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
//! NDJSON sample feed.
//!
//! Reads the load generator's JSON output, one object per line:
//!
//! ```text
//! {"type":"Metric","metric":"http_reqs","data":{"name":"http_reqs","type":"counter",...}}
//! {"type":"Point","metric":"http_reqs","data":{"time":"...","value":1,"tags":{...}}}
//! ```
//!
//! `Metric` lines declare a metric's type; `Point` lines become samples.
//! Points for metrics that were never declared are tagged
//! [`MetricType::Unknown`] and left for the registry to drop.

use loadscope_metrics::{MetricType, Sample};
use serde::Deserialize;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::buffer::SampleBuffer;

/// Default number of samples per appended container
pub const DEFAULT_CHUNK: usize = 512;

/// Default delay after which a partial container is appended anyway
pub const DEFAULT_LINGER: Duration = Duration::from_millis(200);

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Line {
    Metric { metric: String, data: MetricData },
    Point { metric: String, data: PointData },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MetricData {
    #[serde(rename = "type")]
    metric_type: MetricType,
}

#[derive(Debug, Deserialize)]
struct PointData {
    value: f64,
}

/// Counters for one [`JsonFeed::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// Lines read, including blank and malformed ones
    pub lines: u64,
    /// Samples appended to the buffer
    pub samples: u64,
    /// Malformed lines skipped
    pub skipped: u64,
}

/// Turns an NDJSON stream into sample containers
#[derive(Debug)]
pub struct JsonFeed {
    declared: HashMap<Arc<str>, MetricType>,
    chunk: usize,
    linger: Duration,
}

impl Default for JsonFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK, DEFAULT_LINGER)
    }
}

impl JsonFeed {
    /// Append containers of up to `chunk` samples, or whatever is pending
    /// once the input has been idle for `linger`
    pub fn new(chunk: usize, linger: Duration) -> Self {
        Self {
            declared: HashMap::new(),
            chunk: chunk.max(1),
            linger,
        }
    }

    /// Type declared for `metric`, if a `Metric` line was seen
    pub fn declared_type(&self, metric: &str) -> Option<MetricType> {
        self.declared.get(metric).copied()
    }

    /// Parse one line. Blank lines and non-sample records yield `None`.
    pub fn parse_line(&mut self, line: &str) -> serde_json::Result<Option<Sample>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<Line>(line)? {
            Line::Metric { metric, data } => {
                debug!(metric = %metric, metric_type = %data.metric_type, "Metric declared");
                self.declared.insert(metric.into(), data.metric_type);
                Ok(None)
            }
            Line::Point { metric, data } => {
                let (name, metric_type) = match self.declared.get_key_value(metric.as_str()) {
                    Some((name, metric_type)) => (Arc::clone(name), *metric_type),
                    None => (Arc::from(metric), MetricType::Unknown),
                };
                Ok(Some(Sample::new(name, metric_type, data.value)))
            }
            Line::Other => Ok(None),
        }
    }

    /// Read `reader` to the end, appending samples to `buffer`
    ///
    /// Malformed lines are logged and skipped. Only read errors abort.
    pub async fn run<R>(&mut self, reader: R, buffer: &SampleBuffer) -> io::Result<FeedStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut pending = Vec::with_capacity(self.chunk);
        let mut stats = FeedStats::default();

        loop {
            // next_line is cancel safe, so an idle timeout loses nothing
            let line = match tokio::time::timeout(self.linger, lines.next_line()).await {
                Ok(line) => line?,
                Err(_) => {
                    stats.samples += append(buffer, &mut pending);
                    continue;
                }
            };
            let Some(line) = line else { break };
            stats.lines += 1;

            match self.parse_line(&line) {
                Ok(Some(sample)) => {
                    pending.push(sample);
                    if pending.len() >= self.chunk {
                        stats.samples += append(buffer, &mut pending);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    stats.skipped += 1;
                    warn!(line = stats.lines, "Skipping malformed line: {}", e);
                }
            }
        }

        stats.samples += append(buffer, &mut pending);
        Ok(stats)
    }
}

fn append(buffer: &SampleBuffer, pending: &mut Vec<Sample>) -> u64 {
    if pending.is_empty() {
        return 0;
    }
    let count = pending.len() as u64;
    buffer.add_samples(pending.drain(..));
    count
}

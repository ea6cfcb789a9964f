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
//! Integration tests for loadscope-dashboard
//!
//! Runs the dashboard on a real socket and drives it through the public
//! output API and the NDJSON feed.

use loadscope_dashboard::{Dashboard, JsonFeed, Output, PipelineState};
use loadscope_metrics::{Instrument, InstrumentRegistry, Sample, METRICS_PATH};
use std::io::Write;
use std::time::Duration;
use tokio::io::BufReader;

fn counter_value(registry: &InstrumentRegistry, name: &str) -> f64 {
    match registry.instrument(name) {
        Some(Instrument::Counter(c)) => c.get(),
        _ => panic!("{name} is not a counter"),
    }
}

async fn scrape_until(url: &str, needle: &str) -> String {
    let mut body = String::new();
    for _ in 0..50 {
        body = reqwest::get(url).await.unwrap().text().await.unwrap();
        if body.contains(needle) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    body
}

#[tokio::test]
async fn test_samples_visible_on_scrape_endpoint() {
    let mut dashboard = Dashboard::new("host=127.0.0.1&port=0&period=1").unwrap();
    dashboard.start().await.unwrap();
    let addr = dashboard.local_addr().unwrap();

    let mut samples = vec![Sample::counter("http_reqs", 1.0); 5];
    samples.push(Sample::trend("http_req_duration", 120.5));
    dashboard.add_samples(samples);

    let url = format!("http://{addr}{METRICS_PATH}");
    let body = scrape_until(&url, "http_req_duration_count 1").await;
    assert!(body.contains("http_reqs 5"));
    assert!(body.contains("http_req_duration_current 120.5"));
    assert!(body.contains("http_req_duration_count 1"));
    assert!(body.contains("http_req_duration_sum 120.5"));

    let index = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert!(index.status().is_success());

    dashboard.stop().await.unwrap();
    assert!(reqwest::get(&url).await.is_err());
}

#[tokio::test]
async fn test_stop_drains_and_freezes_state() {
    let mut dashboard = Dashboard::new("host=127.0.0.1&port=0&period=60&workers=2").unwrap();
    dashboard.start().await.unwrap();

    dashboard.add_samples(vec![Sample::counter("iterations", 1.0); 25_000]);
    dashboard.stop().await.unwrap();

    assert_eq!(dashboard.state(), PipelineState::Stopped);
    assert_eq!(dashboard.in_flight(), 0);
    assert_eq!(counter_value(dashboard.registry(), "iterations"), 25_000.0);

    dashboard.add_samples(vec![Sample::counter("iterations", 1.0); 10]);
    assert!(dashboard.buffer().is_empty());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(counter_value(dashboard.registry(), "iterations"), 25_000.0);
}

#[tokio::test]
async fn test_feed_file_into_dashboard() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{"type":"Metric","data":{{"name":"http_reqs","type":"counter"}},"metric":"http_reqs"}}"#
    )
    .unwrap();
    for _ in 0..3 {
        writeln!(
            file,
            r#"{{"type":"Point","data":{{"value":1,"tags":{{}}}},"metric":"http_reqs"}}"#
        )
        .unwrap();
    }
    writeln!(file, r#"{{"type":"Point","data":{{"value":7}},"metric":"my_custom"}}"#).unwrap();
    writeln!(file, "{{broken").unwrap();
    file.flush().unwrap();

    let mut dashboard = Dashboard::new("host=127.0.0.1&port=0").unwrap();
    dashboard.start().await.unwrap();

    let input = tokio::fs::File::open(file.path()).await.unwrap();
    let buffer = dashboard.buffer();
    let stats = JsonFeed::default()
        .run(BufReader::new(input), &buffer)
        .await
        .unwrap();
    assert_eq!(stats.lines, 6);
    assert_eq!(stats.samples, 4);
    assert_eq!(stats.skipped, 1);

    dashboard.stop().await.unwrap();

    assert_eq!(counter_value(dashboard.registry(), "http_reqs"), 3.0);
    assert!(dashboard.registry().instrument("my_custom").is_none());
}

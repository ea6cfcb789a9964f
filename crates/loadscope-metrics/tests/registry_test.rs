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

//! Integration tests for loadscope-metrics
//!
//! Exercises the public API: sample dispatch, concurrent scraping and the
//! HTTP endpoint on a real socket.

use loadscope_metrics::server::{router, serve};
use loadscope_metrics::{IndexPage, Instrument, InstrumentRegistry, RegistryConfig, Sample, METRICS_PATH};
use std::sync::Arc;
use std::thread;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

fn counter_value(registry: &InstrumentRegistry, name: &str) -> f64 {
    match registry.instrument(name) {
        Some(Instrument::Counter(c)) => c.get(),
        _ => panic!("{name} is not a counter"),
    }
}

#[test]
fn test_registry_creation() {
    let registry = InstrumentRegistry::new(RegistryConfig::default());
    assert!(registry.is_ok(), "InstrumentRegistry should create successfully");
}

#[test]
fn test_registries_are_independent() {
    let first = InstrumentRegistry::new(RegistryConfig::default()).unwrap();
    let second = InstrumentRegistry::new(RegistryConfig::default()).unwrap();

    first.handle_sample(&Sample::counter("iterations", 4.0));
    assert_eq!(counter_value(&first, "iterations"), 4.0);
    assert_eq!(counter_value(&second, "iterations"), 0.0);
}

#[test]
fn test_concurrent_updates_and_scrapes() {
    let registry = Arc::new(InstrumentRegistry::new(RegistryConfig::default()).unwrap());

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let reg = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..1_000 {
                    reg.handle_sample(&Sample::counter("http_reqs", 1.0));
                    reg.handle_sample(&Sample::trend("http_req_duration", f64::from(i)));
                }
            })
        })
        .collect();

    let scraper = {
        let handler = registry.scrape_handler();
        thread::spawn(move || {
            for _ in 0..50 {
                let exposition = handler.exposition().unwrap();
                assert!(!exposition.body.is_empty());
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    scraper.join().unwrap();

    assert_eq!(counter_value(&registry, "http_reqs"), 4_000.0);
    match registry.instrument("http_req_duration") {
        Some(Instrument::Trend(trend)) => assert_eq!(trend.distribution.get_sample_count(), 4_000),
        _ => panic!("http_req_duration is not a trend"),
    }
}

#[tokio::test]
async fn test_scrape_over_http() {
    let registry = InstrumentRegistry::new(RegistryConfig::default()).unwrap();
    for _ in 0..5 {
        registry.handle_sample(&Sample::counter("http_reqs", 1.0));
    }
    registry.handle_sample(&Sample::trend("http_req_duration", 120.5));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let app = router(registry.scrape_handler(), IndexPage::default());
    let server = tokio::spawn(serve(listener, app, async {
        let _ = stop_rx.await;
    }));

    let response = reqwest::get(format!("http://{addr}{METRICS_PATH}")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/plain; version=0.0.4"
    );

    let body = response.text().await.unwrap();
    assert!(body.contains("http_reqs 5"));
    assert!(body.contains("http_req_duration_current 120.5"));
    assert!(body.contains("http_req_duration_count 1"));
    assert!(body.contains("http_req_duration_sum 120.5"));

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

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
//! Host-facing lifecycle: the dashboard output.

use async_trait::async_trait;
use loadscope_metrics::server::{self, IndexPage};
use loadscope_metrics::{InstrumentRegistry, RegistryConfig, Sample};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::buffer::SampleBuffer;
use crate::config::DashboardOptions;
use crate::error::{DashboardError, DashboardResult};
use crate::pipeline::{Pipeline, PipelineConfig, PipelineState};

/// Lifecycle hooks a host calls on an output
#[async_trait]
pub trait Output: Send + Sync {
    /// Human readable summary, shown by the host at startup
    fn description(&self) -> String;

    /// Bind, launch background work and begin accepting samples
    async fn start(&mut self) -> DashboardResult<()>;

    /// Drain everything accepted so far and release resources
    async fn stop(&mut self) -> DashboardResult<()>;

    /// Hand one container of samples to the output
    fn add_samples(&self, samples: Vec<Sample>);
}

struct ServerHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

/// Live dashboard: ingests samples and serves them for Prometheus scraping
pub struct Dashboard {
    config_argument: String,
    registry: InstrumentRegistry,
    buffer: Arc<SampleBuffer>,
    options: Option<DashboardOptions>,
    pipeline: Option<Pipeline>,
    server: Option<ServerHandle>,
    local_addr: Option<SocketAddr>,
}

impl Dashboard {
    /// Create a dashboard from its option string (see [`DashboardOptions`])
    ///
    /// Options are only parsed by [`Output::start`].
    pub fn new(config_argument: impl Into<String>) -> DashboardResult<Self> {
        Self::with_registry_config(config_argument, RegistryConfig::default())
    }

    /// Create a dashboard with a custom instrument namespace or buckets
    pub fn with_registry_config(
        config_argument: impl Into<String>,
        registry_config: RegistryConfig,
    ) -> DashboardResult<Self> {
        Ok(Self {
            config_argument: config_argument.into(),
            registry: InstrumentRegistry::new(registry_config)?,
            buffer: Arc::new(SampleBuffer::new()),
            options: None,
            pipeline: None,
            server: None,
            local_addr: None,
        })
    }

    /// Registry backing the scrape endpoint
    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    /// Buffer producers append to
    pub fn buffer(&self) -> Arc<SampleBuffer> {
        Arc::clone(&self.buffer)
    }

    /// Address actually bound, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Options in effect, once started
    pub fn options(&self) -> Option<&DashboardOptions> {
        self.options.as_ref()
    }

    /// Pipeline state, or `Created` before start
    pub fn state(&self) -> PipelineState {
        self.pipeline
            .as_ref()
            .map_or(PipelineState::Created, Pipeline::state)
    }

    /// Workers still applying samples
    pub fn in_flight(&self) -> usize {
        self.pipeline.as_ref().map_or(0, Pipeline::in_flight)
    }
}

#[async_trait]
impl Output for Dashboard {
    fn description(&self) -> String {
        match self.local_addr {
            Some(addr) => format!("dashboard ({addr})"),
            None => "dashboard ()".to_string(),
        }
    }

    async fn start(&mut self) -> DashboardResult<()> {
        if self.pipeline.is_some() {
            return Err(DashboardError::InvalidState {
                operation: "start",
                state: self.state(),
            });
        }

        // Everything that can fail on bad input runs before any task is spawned
        let options = DashboardOptions::parse(&self.config_argument)?;
        let ui = options.ui_url()?;
        let addr = options.listen_addr();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| DashboardError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let app = server::router(self.registry.scrape_handler(), IndexPage::render(ui.as_deref()));
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let task = tokio::spawn(async move {
            let stopped = async move { signal.cancelled().await };
            if let Err(e) = server::serve(listener, app, stopped).await {
                error!("{}", e);
            }
        });

        let pipeline = Pipeline::new(
            self.registry.clone(),
            Arc::clone(&self.buffer),
            PipelineConfig::from(&options),
        );
        pipeline.start()?;

        info!(
            addr = %local_addr,
            period_secs = options.period,
            workers = options.workers,
            "Dashboard started"
        );

        self.server = Some(ServerHandle { shutdown, task });
        self.pipeline = Some(pipeline);
        self.options = Some(options);
        self.local_addr = Some(local_addr);
        Ok(())
    }

    async fn stop(&mut self) -> DashboardResult<()> {
        let Some(pipeline) = self.pipeline.as_ref() else {
            return Err(DashboardError::InvalidState {
                operation: "stop",
                state: PipelineState::Created,
            });
        };
        // A failed background task is reported after the server is down
        let drained = match pipeline.stop().await {
            Err(e @ DashboardError::InvalidState { .. }) => return Err(e),
            other => other,
        };

        let wait = self.options.as_ref().map(DashboardOptions::wait).unwrap_or_default();
        if !wait.is_zero() {
            info!("All set, waiting {}s before shutdown", wait.as_secs());
            tokio::time::sleep(wait).await;
        }

        if let Some(server) = self.server.take() {
            server.shutdown.cancel();
            if let Err(e) = server.task.await {
                error!("Metrics server task failed: {}", e);
            }
        }

        info!("Dashboard stopped");
        drained
    }

    fn add_samples(&self, samples: Vec<Sample>) {
        if self.state() == PipelineState::Stopped {
            warn!(samples = samples.len(), "Dashboard stopped, discarding samples");
            return;
        }
        self.buffer.add_samples(samples);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_description_before_start() {
        let dashboard = Dashboard::new("").unwrap();
        assert_eq!(dashboard.description(), "dashboard ()");
        assert_eq!(dashboard.state(), PipelineState::Created);
    }

    #[tokio::test]
    async fn test_start_rejects_bad_options() {
        let mut dashboard = Dashboard::new("port=notaport").unwrap();
        let err = dashboard.start().await.unwrap_err();
        assert!(matches!(err, DashboardError::Config(ConfigError::Parse(_))));
        assert!(dashboard.local_addr().is_none());
        assert_eq!(dashboard.state(), PipelineState::Created);
    }

    #[tokio::test]
    async fn test_start_rejects_out_of_range_period() {
        let mut dashboard =
            Dashboard::new("host=127.0.0.1&port=0&period=18446744073709551615").unwrap();
        let err = dashboard.start().await.unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Config(ConfigError::InvalidValue { .. })
        ));
        assert!(dashboard.local_addr().is_none());
        assert_eq!(dashboard.state(), PipelineState::Created);
    }

    #[tokio::test]
    async fn test_start_rejects_bad_ui() {
        let mut dashboard = Dashboard::new("host=127.0.0.1&port=0&ui=https://a%20b/").unwrap();
        let err = dashboard.start().await.unwrap_err();
        assert!(matches!(err, DashboardError::Config(ConfigError::InvalidUi { .. })));
    }

    #[tokio::test]
    async fn test_bind_conflict_is_fatal() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let mut dashboard = Dashboard::new(format!("host=127.0.0.1&port={port}")).unwrap();
        let err = dashboard.start().await.unwrap_err();
        assert!(matches!(err, DashboardError::Bind { .. }));
        assert_eq!(dashboard.state(), PipelineState::Created);
    }

    #[tokio::test]
    async fn test_stop_before_start() {
        let mut dashboard = Dashboard::new("").unwrap();
        assert!(matches!(
            dashboard.stop().await,
            Err(DashboardError::InvalidState { operation: "stop", .. })
        ));
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let mut dashboard = Dashboard::new("host=127.0.0.1&port=0&period=1").unwrap();
        dashboard.start().await.unwrap();

        let addr = dashboard.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(dashboard.description(), format!("dashboard ({addr})"));
        assert_eq!(dashboard.state(), PipelineState::Running);
        assert!(dashboard.start().await.is_err());

        dashboard.add_samples(vec![Sample::counter("http_reqs", 1.0); 5]);
        dashboard.stop().await.unwrap();

        assert_eq!(dashboard.state(), PipelineState::Stopped);
        assert_eq!(dashboard.in_flight(), 0);

        dashboard.add_samples(vec![Sample::counter("http_reqs", 1.0); 5]);
        assert!(dashboard.buffer().is_empty());
    }
}

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
//! `loadscope`: feeds NDJSON samples into a live dashboard.

use anyhow::{Context, Result};
use clap::Parser;
use loadscope_dashboard::{Dashboard, JsonFeed, Output};
use loadscope_observability::{init_tracing, LogFormat};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, BufReader};

#[derive(Parser)]
#[command(name = "loadscope")]
#[command(version, about = "Live Prometheus dashboard for load-test metrics")]
#[command(
    long_about = "Reads the load generator's NDJSON output, aggregates the samples into \
Prometheus instruments and serves them on /api/metrics until the input ends."
)]
struct Cli {
    /// Dashboard options as a query string, e.g. port=5665&period=2
    #[arg(short, long, value_name = "QUERY", default_value = "")]
    config: String,

    /// NDJSON sample source, `-` for stdin
    #[arg(short, long, value_name = "PATH", default_value = "-")]
    input: String,

    /// Log format (pretty|compact|json)
    #[arg(long, value_name = "FORMAT", default_value = "compact")]
    log_format: String,

    /// Log level filter, overrides RUST_LOG
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

async fn open_input(input: &str) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let path = PathBuf::from(input);
    let file = tokio::fs::File::open(&path)
        .await
        .with_context(|| format!("Failed to open input {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format: LogFormat = cli.log_format.parse()?;
    init_tracing(format, cli.log_level.as_deref())?;

    let reader = open_input(&cli.input).await?;

    let mut dashboard = Dashboard::new(cli.config)?;
    dashboard.start().await?;
    tracing::info!("Started {}", dashboard.description());

    let buffer = dashboard.buffer();
    let mut feed = JsonFeed::default();
    let fed = tokio::select! {
        result = feed.run(reader, &buffer) => Some(result),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping");
            None
        }
    };

    let stopped = dashboard.stop().await;

    if let Some(result) = fed {
        let stats = result.context("Failed to read input")?;
        tracing::info!(
            lines = stats.lines,
            samples = stats.samples,
            skipped = stats.skipped,
            "Input finished"
        );
    }
    stopped?;

    Ok(())
}

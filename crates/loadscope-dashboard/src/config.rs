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
//! Dashboard options.
//!
//! Options arrive as a URL query string, e.g. `port=5665&period=2&wait=5`.
//! Keys are accepted lowercase or capitalized (`Port`, `UI`). Unknown keys
//! and malformed values are errors, never silently coerced.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use axum::http::Uri;

use crate::error::{ConfigError, ConfigResult};

/// Default listen port
pub const DEFAULT_PORT: u16 = 5665;

/// Default flush period in seconds
pub const DEFAULT_PERIOD: u64 = 10;

/// Default cap on concurrently running batch workers
pub const DEFAULT_WORKERS: usize = 16;

/// Longest accepted flush period in seconds, one day
pub const MAX_PERIOD: u64 = 86_400;

/// Dashboard options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardOptions {
    /// Port to listen on
    #[serde(alias = "Port")]
    pub port: u16,

    /// Host to bind to. Empty binds every interface.
    #[serde(alias = "Host")]
    pub host: String,

    /// Flush interval in seconds
    #[serde(alias = "Period")]
    pub period: u64,

    /// Base URL of the companion front end
    #[serde(alias = "UI", alias = "Ui")]
    pub ui: String,

    /// Grace delay after stop, in seconds
    #[serde(alias = "Wait")]
    pub wait: u64,

    /// Maximum number of batch workers running at once
    #[serde(alias = "Workers")]
    pub workers: usize,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: String::new(),
            period: DEFAULT_PERIOD,
            ui: String::new(),
            wait: 0,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl DashboardOptions {
    /// Parse a query string. An empty string yields the defaults.
    pub fn parse(query: &str) -> ConfigResult<Self> {
        let query = query.trim().trim_start_matches('?');
        if query.is_empty() {
            return Ok(Self::default());
        }

        let options: Self = serde_urlencoded::from_str(query)?;
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.period == 0 {
            return Err(ConfigError::invalid_value("period", "must be at least 1 second"));
        }
        if self.period > MAX_PERIOD {
            return Err(ConfigError::invalid_value(
                "period",
                format!("must be at most {MAX_PERIOD} seconds"),
            ));
        }
        if self.workers == 0 {
            return Err(ConfigError::invalid_value("workers", "must be at least 1"));
        }
        Ok(())
    }

    /// Address to bind, `host:port`
    pub fn listen_addr(&self) -> String {
        match self.host.as_str() {
            "" => format!("0.0.0.0:{}", self.port),
            host if host.contains(':') && !host.starts_with('[') => format!("[{}]:{}", host, self.port),
            host => format!("{}:{}", host, self.port),
        }
    }

    /// Flush interval
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period)
    }

    /// Grace delay after stop
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait)
    }

    /// Normalized front end URL, `https` when no scheme is given
    pub fn ui_url(&self) -> ConfigResult<Option<String>> {
        let ui = self.ui.trim();
        if ui.is_empty() {
            return Ok(None);
        }

        let candidate = if ui.contains("://") {
            ui.to_string()
        } else {
            format!("https://{ui}")
        };

        let uri: Uri = candidate.parse().map_err(|e: axum::http::uri::InvalidUri| {
            ConfigError::InvalidUi {
                value: self.ui.clone(),
                reason: e.to_string(),
            }
        })?;

        if uri.host().is_none() {
            return Err(ConfigError::InvalidUi {
                value: self.ui.clone(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Some(candidate))
    }
}

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
use loadscope_metrics::MetricsError;
use std::io;
use thiserror::Error;

use crate::pipeline::PipelineState;

/// Errors raised while parsing dashboard options
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The option string is not a valid query string for the known keys
    #[error("Failed to parse dashboard options: {0}")]
    Parse(#[from] serde_urlencoded::de::Error),

    /// A key parsed but its value is out of range
    #[error("Invalid configuration value for field '{field}': {reason}")]
    InvalidValue {
        /// Option key
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// The companion UI location is not a usable URL
    #[error("Invalid UI URL '{value}': {reason}")]
    InvalidUi {
        /// Value as configured
        value: String,
        /// Parser message
        reason: String,
    },
}

impl ConfigError {
    /// Build an [`ConfigError::InvalidValue`]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for option parsing
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by the dashboard lifecycle
#[derive(Error, Debug)]
pub enum DashboardError {
    /// Options could not be parsed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Instrument registry could not be built
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    /// The listen address could not be bound
    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        /// Address as configured
        addr: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// A lifecycle call arrived in the wrong state
    #[error("Cannot {operation} pipeline in state {state}")]
    InvalidState {
        /// Rejected call
        operation: &'static str,
        /// State at the time of the call
        state: PipelineState,
    },

    /// A background task ended abnormally; samples it held were not applied
    #[error("Pipeline {task} task failed: {reason}")]
    TaskFailed {
        /// Which task
        task: &'static str,
        /// Join error message
        reason: String,
    },

    /// Other IO failure
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for lifecycle calls
pub type DashboardResult<T> = Result<T, DashboardError>;

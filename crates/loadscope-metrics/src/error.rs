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
use thiserror::Error;

/// Errors raised while building or exposing the instrument registry
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Instrument construction or registration failed
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// Text exposition could not be produced
    #[error("Failed to encode metrics: {0}")]
    Encode(String),

    /// The HTTP server stopped with an error
    #[error("Metrics server error: {0}")]
    Server(String),
}

/// Result alias for this crate
pub type MetricsResult<T> = Result<T, MetricsError>;

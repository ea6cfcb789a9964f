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
//! Producer-fed sample buffer.

use loadscope_metrics::Sample;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Append-only sample accumulator shared between producers and the pipeline
///
/// Producers append whole containers. The pipeline removes everything at
/// once with [`SampleBuffer::drain_all`]; each drain observes every append
/// that completed before it and none of those samples twice.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    samples: Mutex<Vec<Sample>>,
}

impl SampleBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one container of samples, keeping its order
    pub fn add_samples<I>(&self, container: I)
    where
        I: IntoIterator<Item = Sample>,
    {
        self.lock().extend(container);
    }

    /// Remove and return every buffered sample in arrival order
    pub fn drain_all(&self) -> Vec<Sample> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of buffered samples
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panicking producer cannot leave the Vec half-written, so a poisoned
    // lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, Vec<Sample>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

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
//! Ingestion pipeline: periodic drain, batch split and concurrent dispatch.
//!
//! ```text
//! SampleBuffer --drain--> split_batches --mpsc--> dispatch loop --spawn--> worker
//!                                                                  |
//!                                                     InstrumentRegistry::handle_sample
//! ```
//!
//! Samples inside a batch are applied in arrival order by a single worker.
//! Batches run concurrently and may complete in any order.

use loadscope_metrics::{InstrumentRegistry, Sample};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::buffer::SampleBuffer;
use crate::config::{DashboardOptions, DEFAULT_PERIOD, DEFAULT_WORKERS};
use crate::error::{DashboardError, DashboardResult};

/// Maximum number of samples handed to one worker
pub const BATCH_SIZE: usize = 10_000;

/// Batches that may wait in the dispatch channel before flushes block
pub const CHANNEL_CAPACITY: usize = 10;

/// Lifecycle of a [`Pipeline`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Built, nothing scheduled yet
    Created,
    /// Flushing periodically and dispatching batches
    Running,
    /// No new flushes; waiting for workers to finish
    Draining,
    /// Every worker finished
    Stopped,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Created => "created",
            PipelineState::Running => "running",
            PipelineState::Draining => "draining",
            PipelineState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Pipeline tuning
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Interval between flushes
    pub period: Duration,
    /// Maximum samples per batch
    pub batch_size: usize,
    /// Dispatch channel capacity, in batches
    pub channel_capacity: usize,
    /// Maximum number of workers running at once
    pub max_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(DEFAULT_PERIOD),
            batch_size: BATCH_SIZE,
            channel_capacity: CHANNEL_CAPACITY,
            max_workers: DEFAULT_WORKERS,
        }
    }
}

impl From<&DashboardOptions> for PipelineConfig {
    fn from(options: &DashboardOptions) -> Self {
        Self {
            period: options.period(),
            max_workers: options.workers,
            ..Self::default()
        }
    }
}

/// Split `samples` into consecutive batches of at most `size`, keeping order
///
/// Only the last batch may be shorter. A `size` of zero is treated as one.
pub fn split_batches(samples: Vec<Sample>, size: usize) -> impl Iterator<Item = Vec<Sample>> {
    let size = size.max(1);
    let mut samples = samples.into_iter();
    std::iter::from_fn(move || {
        let batch: Vec<Sample> = samples.by_ref().take(size).collect();
        (!batch.is_empty()).then_some(batch)
    })
}

/// Drains the buffer and pushes batches into the dispatch channel
struct Flusher {
    buffer: Arc<SampleBuffer>,
    sender: mpsc::Sender<Vec<Sample>>,
    batch_size: usize,
    in_flight: Arc<AtomicUsize>,
}

impl Flusher {
    /// One flush step. Returns the number of batches sent.
    async fn flush(&self) -> usize {
        let samples = self.buffer.drain_all();
        if samples.is_empty() {
            return 0;
        }

        let total = samples.len();
        let mut batches = 0;
        for batch in split_batches(samples, self.batch_size) {
            // Blocks while the channel is full
            if self.sender.send(batch).await.is_err() {
                warn!("Dispatch channel closed, dropping the rest of this flush");
                break;
            }
            batches += 1;
        }

        info!(
            in_flight = self.in_flight.load(Ordering::SeqCst),
            samples = total,
            batches,
            "Flushed samples"
        );
        batches
    }

    async fn run(self, period: Duration, shutdown: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.flush().await;
                }
            }
        }

        // Pick up whatever arrived since the last tick
        self.flush().await;
        debug!("Flusher stopped");
    }
}

/// Decrements the in-flight count when a worker ends, even by panic
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn dispatch_loop(
    mut receiver: mpsc::Receiver<Vec<Sample>>,
    registry: InstrumentRegistry,
    tracker: TaskTracker,
    in_flight: Arc<AtomicUsize>,
    permits: Arc<Semaphore>,
) {
    while let Some(batch) = receiver.recv().await {
        // Waiting here leaves batches queued in the channel, which in turn
        // blocks the flusher.
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            error!("Worker permits closed, stopping dispatch");
            break;
        };

        let guard = InFlightGuard::enter(&in_flight);
        let registry = registry.clone();
        tracker.spawn(async move {
            let _permit = permit;
            let _guard = guard;
            for sample in &batch {
                registry.handle_sample(sample);
            }
            debug!(samples = batch.len(), "Batch processed");
        });
    }
    debug!("Dispatch channel closed");
}

struct RunningTasks {
    flusher: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

/// Periodically drains a [`SampleBuffer`] into an
/// [`InstrumentRegistry`]
pub struct Pipeline {
    registry: InstrumentRegistry,
    buffer: Arc<SampleBuffer>,
    config: PipelineConfig,
    state: Mutex<PipelineState>,
    in_flight: Arc<AtomicUsize>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    tasks: Mutex<Option<RunningTasks>>,
}

impl Pipeline {
    /// Create a pipeline in the [`PipelineState::Created`] state
    pub fn new(
        registry: InstrumentRegistry,
        buffer: Arc<SampleBuffer>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            buffer,
            config,
            state: Mutex::new(PipelineState::Created),
            in_flight: Arc::new(AtomicUsize::new(0)),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(None),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> PipelineState {
        *lock(&self.state)
    }

    /// Workers spawned and not yet finished
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Registry the workers update
    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    /// Buffer the flusher drains
    pub fn buffer(&self) -> &Arc<SampleBuffer> {
        &self.buffer
    }

    /// Launch the flusher and the dispatch loop
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> DashboardResult<()> {
        self.transition("start", PipelineState::Created, PipelineState::Running)?;

        let (sender, receiver) = mpsc::channel(self.config.channel_capacity.max(1));
        let permits = Arc::new(Semaphore::new(self.config.max_workers.max(1)));

        let dispatcher = tokio::spawn(dispatch_loop(
            receiver,
            self.registry.clone(),
            self.tracker.clone(),
            Arc::clone(&self.in_flight),
            permits,
        ));

        let flusher = Flusher {
            buffer: Arc::clone(&self.buffer),
            sender,
            batch_size: self.config.batch_size,
            in_flight: Arc::clone(&self.in_flight),
        };
        let flusher = tokio::spawn(flusher.run(self.config.period, self.shutdown.clone()));

        *lock(&self.tasks) = Some(RunningTasks {
            flusher,
            dispatcher,
        });

        info!(
            period_ms = self.config.period.as_millis() as u64,
            batch_size = self.config.batch_size,
            max_workers = self.config.max_workers,
            "Pipeline started"
        );
        Ok(())
    }

    /// Stop flushing, dispatch what is left and wait for every worker
    ///
    /// Buffered samples are flushed one last time before the channel closes.
    /// No worker is aborted; a slow worker delays the return.
    pub async fn stop(&self) -> DashboardResult<()> {
        self.transition("stop", PipelineState::Running, PipelineState::Draining)?;
        info!(in_flight = self.in_flight(), "Draining pipeline");

        self.shutdown.cancel();

        let mut failure = None;
        let tasks = lock(&self.tasks).take();
        if let Some(tasks) = tasks {
            // The flusher owns the only sender, so the dispatcher ends once
            // the flusher has pushed its final batches.
            if let Err(e) = tasks.flusher.await {
                error!("Flusher task failed: {}", e);
                failure = Some(task_failed("flusher", &e));
            }
            if let Err(e) = tasks.dispatcher.await {
                error!("Dispatch task failed: {}", e);
                failure.get_or_insert_with(|| task_failed("dispatch", &e));
            }
        }

        self.tracker.close();
        self.tracker.wait().await;

        *lock(&self.state) = PipelineState::Stopped;
        info!(in_flight = self.in_flight(), "Pipeline stopped");
        failure.map_or(Ok(()), Err)
    }

    fn transition(
        &self,
        operation: &'static str,
        from: PipelineState,
        to: PipelineState,
    ) -> DashboardResult<()> {
        let mut state = lock(&self.state);
        if *state != from {
            return Err(DashboardError::InvalidState {
                operation,
                state: *state,
            });
        }
        *state = to;
        Ok(())
    }
}

fn task_failed(task: &'static str, e: &JoinError) -> DashboardError {
    DashboardError::TaskFailed {
        task,
        reason: e.to_string(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

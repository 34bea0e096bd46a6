// src/scheduler.rs

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{DEFAULT_BATCH_DELAY_MS, DEFAULT_BATCH_SIZE, MAX_BATCH_DELAY_MS};
use crate::sink::{MarkerFactory, RenderSink};
use crate::types::{Batch, Point};

/// A render sink shared between the viewer and scheduled batches.
pub type SharedSink<S> = Arc<Mutex<S>>;

/// Monotonic counter bumped by every load, clear and display-mode switch.
///
/// Batches remember the value they were scheduled under and do nothing once it has
/// moved on. Bump it while holding the sink lock so a batch that already passed its
/// check cannot land after the reset.
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Invalidates everything scheduled so far and returns the new value.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Splits `points` into contiguous batches of at most `batch_size`, in order.
pub fn partition(points: &[Point], batch_size: usize) -> Vec<Batch> {
    points
        .chunks(batch_size.max(1))
        .enumerate()
        .map(|(index, chunk)| Batch {
            index,
            items: chunk.to_vec(),
        })
        .collect()
}

/// How a scheduled render ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOutcome {
    pub applied: usize,
    pub discarded: usize,
}

/// Handle to batches that were scheduled but may not have run yet.
#[derive(Debug)]
pub struct ScheduledRender {
    generation: u64,
    batch_count: usize,
    handle: JoinHandle<RenderOutcome>,
}

impl ScheduledRender {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn batch_count(&self) -> usize {
        self.batch_count
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the last batch to run (or be discarded).
    pub async fn wait(self) -> RenderOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Render task for generation {} failed: {}", self.generation, e);
                RenderOutcome {
                    applied: 0,
                    discarded: self.batch_count,
                }
            }
        }
    }
}

/// Feeds points to a render sink in fixed-size batches, spaced out in time so the
/// map stays responsive while tens of thousands of markers are inserted.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    batch_size: usize,
    delay: Duration,
    generation: Generation,
    factory: Arc<MarkerFactory>,
}

impl BatchScheduler {
    /// Creates a scheduler.
    ///
    /// # Arguments
    /// * `batch_size`: Points per batch. Zero is treated as one.
    /// * `delay`: Pause between consecutive batches, capped at `MAX_BATCH_DELAY_MS`.
    /// * `generation`: Counter shared with whoever resets the sink.
    /// * `factory`: Builds the markers handed to the sink.
    pub fn new(
        batch_size: usize,
        delay: Duration,
        generation: Generation,
        factory: Arc<MarkerFactory>,
    ) -> Self {
        BatchScheduler {
            batch_size: batch_size.max(1),
            delay: delay.min(Duration::from_millis(MAX_BATCH_DELAY_MS)),
            generation,
            factory,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Schedules batch *k* to run `k × delay` after now and returns at once.
    ///
    /// Each batch reaches the sink through exactly one `add_batch` call. Batches
    /// run in index order and are dropped if the generation has advanced by the
    /// time their turn comes.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Arguments
    /// * `points`: Points to render, in display order.
    /// * `sink`: The sink that receives the batches.
    ///
    /// # Returns
    /// A `ScheduledRender` that can be awaited for the applied/discarded counts.
    pub fn schedule<S>(&self, points: &[Point], sink: SharedSink<S>) -> ScheduledRender
    where
        S: RenderSink + 'static,
    {
        let batches: VecDeque<Batch> = partition(points, self.batch_size).into();
        let batch_count = batches.len();
        let generation = self.generation.current();
        log::info!(
            "Loading {} points in {} batches (generation {})",
            points.len(),
            batch_count,
            generation
        );

        let handle = tokio::spawn(drain(
            batches,
            sink,
            self.delay,
            self.generation.clone(),
            generation,
            Arc::clone(&self.factory),
        ));

        ScheduledRender {
            generation,
            batch_count,
            handle,
        }
    }
}

async fn drain<S>(
    mut queue: VecDeque<Batch>,
    sink: SharedSink<S>,
    delay: Duration,
    live: Generation,
    scheduled_under: u64,
    factory: Arc<MarkerFactory>,
) -> RenderOutcome
where
    S: RenderSink + 'static,
{
    let start = Instant::now();
    let total = queue.len();
    let mut outcome = RenderOutcome::default();

    while let Some(batch) = queue.pop_front() {
        let offset = delay.saturating_mul(u32::try_from(batch.index).unwrap_or(u32::MAX));
        match start.checked_add(offset) {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => tokio::time::sleep(delay).await,
        }

        let applied = {
            let mut sink = sink.lock();
            if live.current() != scheduled_under {
                false
            } else {
                let markers = factory.markers(&batch.items, sink.display_mode());
                sink.add_batch(markers);
                true
            }
        };

        if !applied {
            outcome.discarded = 1 + queue.len();
            log::debug!(
                "Discarding {} stale batches of generation {}",
                outcome.discarded,
                scheduled_under
            );
            break;
        }
        outcome.applied += 1;
        log::debug!("Batch {}/{} added ({} markers)", batch.index + 1, total, batch.len());
    }

    outcome
}

impl Default for BatchScheduler {
    fn default() -> Self {
        Self::new(
            DEFAULT_BATCH_SIZE,
            Duration::from_millis(DEFAULT_BATCH_DELAY_MS),
            Generation::new(),
            Arc::new(MarkerFactory::default()),
        )
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tracing::warn;

use super::simulation::TickOutcome;

static POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn note_poison(operation: &'static str) {
    if !POISON_WARNED.swap(true, Ordering::Relaxed) {
        warn!(operation, "metrics_lock_poisoned_recovered");
    }
}

/// Loop health over the last reporting interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    pub worst_frame_ms: f32,
    /// Simulation time discarded by the per-frame tick cap.
    pub dropped_backlog_ms: f32,
    /// Ticks that found no viewport transform and did nothing.
    pub suspended_ticks: u32,
    pub landings: u32,
    pub fall_recoveries: u32,
    /// Running total since startup, not per interval.
    pub ground_changes: u64,
}

/// Shared read side for the latest snapshot; clones observe the same value.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        *self.read()
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        *self.write() = snapshot;
    }

    fn read(&self) -> RwLockReadGuard<'_, LoopMetricsSnapshot> {
        self.latest.read().unwrap_or_else(|poisoned| {
            note_poison("read");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, LoopMetricsSnapshot> {
        self.latest.write().unwrap_or_else(|poisoned| {
            note_poison("write");
            poisoned.into_inner()
        })
    }
}

#[derive(Debug, Default)]
struct IntervalCounters {
    frames: u32,
    ticks: u32,
    frame_time_sum: Duration,
    worst_frame: Duration,
    dropped_backlog: Duration,
    suspended_ticks: u32,
    landings: u32,
    fall_recoveries: u32,
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    counters: IntervalCounters,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval_start: Instant::now(),
            interval,
            counters: IntervalCounters::default(),
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        let counters = &mut self.counters;
        counters.frames = counters.frames.saturating_add(1);
        counters.frame_time_sum = counters.frame_time_sum.saturating_add(frame_dt);
        counters.worst_frame = counters.worst_frame.max(frame_dt);
    }

    pub(crate) fn record_tick(&mut self, outcome: &TickOutcome) {
        let counters = &mut self.counters;
        match outcome {
            TickOutcome::Suspended => {
                counters.suspended_ticks = counters.suspended_ticks.saturating_add(1);
            }
            TickOutcome::Advanced(report) => {
                counters.ticks = counters.ticks.saturating_add(1);
                if report.landed {
                    counters.landings = counters.landings.saturating_add(1);
                }
                if report.recovered {
                    counters.fall_recoveries = counters.fall_recoveries.saturating_add(1);
                }
            }
        }
    }

    pub(crate) fn record_dropped_backlog(&mut self, dropped: Duration) {
        self.counters.dropped_backlog = self.counters.dropped_backlog.saturating_add(dropped);
    }

    /// Closes the interval once it has elapsed and starts the next one at `now`.
    pub(crate) fn maybe_snapshot(
        &mut self,
        now: Instant,
        ground_changes: u64,
    ) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let counters = std::mem::take(&mut self.counters);
        self.interval_start = now;

        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = match counters.frames {
            0 => 0.0,
            frames => counters.frame_time_sum.as_secs_f32() * 1000.0 / frames as f32,
        };
        Some(LoopMetricsSnapshot {
            fps: counters.frames as f32 / seconds,
            tps: counters.ticks as f32 / seconds,
            frame_time_ms,
            worst_frame_ms: counters.worst_frame.as_secs_f32() * 1000.0,
            dropped_backlog_ms: counters.dropped_backlog.as_secs_f32() * 1000.0,
            suspended_ticks: counters.suspended_ticks,
            landings: counters.landings,
            fall_recoveries: counters.fall_recoveries,
            ground_changes,
        })
    }
}

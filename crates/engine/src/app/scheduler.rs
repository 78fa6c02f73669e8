use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub ticks_to_run: u32,
    pub remaining_accumulator: Duration,
    pub dropped_backlog: Duration,
    /// Clamped wall-clock delta that fed the accumulator.
    pub frame_dt: Duration,
}

/// Fixed-timestep accumulator over a monotonic clock.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    fixed_dt: Duration,
    max_frame_delta: Duration,
    max_ticks_per_frame: u32,
    accumulator: Duration,
    last_frame: Option<Instant>,
}

impl FrameScheduler {
    pub fn new(target_tps: u32, max_frame_delta: Duration, max_ticks_per_frame: u32) -> Self {
        let target_tps = target_tps.max(1);
        Self {
            fixed_dt: Duration::from_secs_f64(1.0 / target_tps as f64),
            max_frame_delta: normalize_non_zero_duration(
                max_frame_delta,
                Duration::from_millis(250),
            ),
            max_ticks_per_frame: max_ticks_per_frame.max(1),
            accumulator: Duration::ZERO,
            last_frame: None,
        }
    }

    pub fn fixed_dt(&self) -> Duration {
        self.fixed_dt
    }

    pub fn max_frame_delta(&self) -> Duration {
        self.max_frame_delta
    }

    pub fn max_ticks_per_frame(&self) -> u32 {
        self.max_ticks_per_frame
    }

    /// The first call only anchors the clock and schedules nothing.
    pub fn advance(&mut self, now: Instant) -> StepPlan {
        let raw_dt = match self.last_frame {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last_frame = Some(now);

        let frame_dt = clamp_frame_delta(raw_dt, self.max_frame_delta);
        let plan = plan_sim_steps(
            self.accumulator.saturating_add(frame_dt),
            self.fixed_dt,
            self.max_ticks_per_frame,
        );
        self.accumulator = plan.remaining_accumulator;
        StepPlan { frame_dt, ..plan }
    }

    /// Forgets the clock anchor, e.g. after the window was hidden.
    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
        self.last_frame = None;
    }
}

pub(crate) fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };

    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
        frame_dt: Duration::ZERO,
    }
}

pub(crate) fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

pub(crate) fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

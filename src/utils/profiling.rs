use log::{debug, log_enabled, trace, Level};
use std::time::{Duration, Instant};

/// Timing and size data gathered over one solve pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct SolveProfile {
    pub build_time: Duration,
    pub prune_time: Duration,
    pub solver_time: Duration,
    pub write_back_time: Duration,

    pub body_count: usize,
    pub joint_count: usize,
    pub limit_count: usize,
    pub pruned_joint_count: usize,
}

impl SolveProfile {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn total_time(&self) -> Duration {
        self.build_time + self.prune_time + self.solver_time + self.write_back_time
    }

    /// Emits the profile at debug level.
    pub fn report(&self) {
        if !log_enabled!(Level::Debug) {
            return;
        }
        debug!(
            "solve: {} bodies, {} joints, {} limits, {} pruned",
            self.body_count, self.joint_count, self.limit_count, self.pruned_joint_count
        );
        debug!(
            "solve: total {:.3} ms (prune {:.3}, build {:.3}, solver {:.3}, write-back {:.3})",
            self.total_time().as_secs_f64() * 1000.0,
            self.prune_time.as_secs_f64() * 1000.0,
            self.build_time.as_secs_f64() * 1000.0,
            self.solver_time.as_secs_f64() * 1000.0,
            self.write_back_time.as_secs_f64() * 1000.0,
        );
    }
}

/// Adds the lifetime of the guard to a duration slot.
pub struct ScopedTimer<'a> {
    label: &'static str,
    start: Instant,
    output: &'a mut Duration,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'static str, output: &'a mut Duration) -> Self {
        if log_enabled!(Level::Trace) {
            trace!("start {label}");
        }
        Self {
            label,
            start: Instant::now(),
            output,
        }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        *self.output += elapsed;
        if log_enabled!(Level::Trace) {
            trace!("end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

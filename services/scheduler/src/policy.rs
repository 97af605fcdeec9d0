//! Named policies for behavior the driver applies on every event.

use std::time::Duration;

/// What to do about offer suppression when a status update arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevivePolicy {
    /// Send REVIVE on every status update so a suppressed framework gets
    /// offers again when one of its tasks changes state.
    #[default]
    OnStatusUpdate,
    /// Leave suppression to the application.
    Never,
}

/// When to ask the master to reconcile task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcilePolicy {
    /// Once, after the first successful subscribe of this process.
    #[default]
    Startup,
    /// After startup and again after every status update.
    OnStatusUpdate,
}

/// Driver behavior knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverPolicy {
    pub revive: RevivePolicy,
    pub reconcile: ReconcilePolicy,
    /// Missed heartbeats tolerated before the stream is declared dead.
    /// Zero disables the watchdog.
    pub heartbeat_misses: u32,
}

impl Default for DriverPolicy {
    fn default() -> Self {
        Self {
            revive: RevivePolicy::default(),
            reconcile: ReconcilePolicy::default(),
            heartbeat_misses: 3,
        }
    }
}

impl DriverPolicy {
    /// Idle limit for the subscription stream given the master's heartbeat
    /// interval.
    pub fn heartbeat_timeout(&self, interval_secs: Option<f64>) -> Option<Duration> {
        let interval = interval_secs.filter(|s| s.is_finite() && *s > 0.0)?;
        if self.heartbeat_misses == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(interval * f64::from(self.heartbeat_misses)))
    }
}

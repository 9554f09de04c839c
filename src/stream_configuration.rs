//! Configuration types for rs2-push schedulers

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the tokio-backed scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound on tasks fired per driver wake-up before yielding to the runtime
    pub max_tasks_per_tick: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_tick: 1024,
        }
    }
}

impl SchedulerConfig {
    /// Create a new scheduler configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of tasks fired per wake-up
    pub fn max_tasks_per_tick(mut self, max: usize) -> Self {
        self.max_tasks_per_tick = max.max(1);
        self
    }
}

/// Configuration for the deterministic virtual-time scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualSchedulerConfig {
    /// Initial value of the virtual clock
    pub start: Duration,
    /// Maximum number of tasks a single advance/run call may fire
    pub max_steps: usize,
}

impl Default for VirtualSchedulerConfig {
    fn default() -> Self {
        Self {
            start: Duration::ZERO,
            max_steps: 100_000,
        }
    }
}

impl VirtualSchedulerConfig {
    /// Create a new virtual scheduler configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial clock value
    pub fn start(mut self, start: Duration) -> Self {
        self.start = start;
        self
    }

    /// Set the step bound for a single advance/run call
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

//! Bounded history of control-loop samples.
//!
//! Each effective tick appends one [`ControlSample`]; display layers read the
//! buffer for trend plots, and step-test procedures use
//! [`TrendBuffer::is_stable`] to decide when the temperature has settled
//! before moving to the next step.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One record of a completed control tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlSample {
    /// Wall-clock time of the tick.
    pub timestamp: DateTime<Utc>,
    /// Aggregated temperature fed into the controller.
    pub reading: f32,
    /// Bounded command forwarded to the actuator.
    pub output: f32,
    /// Setpoint in effect during the tick.
    pub setpoint: f32,
}

/// Rolling window of the most recent [`ControlSample`]s.
pub struct TrendBuffer {
    capacity: usize,
    samples: VecDeque<ControlSample>,
}

impl TrendBuffer {
    /// Create a buffer that retains at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample, evicting the oldest once the buffer is full.
    pub fn push(&mut self, sample: ControlSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` when nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The most recent sample.
    pub fn latest(&self) -> Option<&ControlSample> {
        self.samples.back()
    }

    /// Iterate oldest-to-newest.
    pub fn iter(&self) -> impl Iterator<Item = &ControlSample> {
        self.samples.iter()
    }

    /// `true` when the last `window` readings span at most `threshold`
    /// degrees.  Returns `false` until `window` samples exist (an empty or
    /// short history is not evidence of stability).
    pub fn is_stable(&self, window: usize, threshold: f32) -> bool {
        if window == 0 || self.samples.len() < window {
            return false;
        }
        let recent = self.samples.iter().rev().take(window).map(|s| s.reading);
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for r in recent {
            min = min.min(r);
            max = max.max(r);
        }
        max - min <= threshold
    }
}

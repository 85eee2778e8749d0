//! [`ControlLoop`] – one synchronous tick from cameras to actuator.
//!
//! The loop owns the camera bank, the actuator sink, and the controller, and
//! exposes a single bounded [`tick`][ControlLoop::tick].  A periodic driver
//! (timer thread, GUI timer) calls it; nothing in here spawns threads or
//! blocks on I/O.  Per tick:
//!
//! 1. **Aggregate** – reduce the latest valid frames under the configured
//!    [`AggregationMode`] to one temperature reading.  No valid data → the
//!    tick is skipped and the actuator holds its last command.
//! 2. **Regulate** – feed the reading through the [`PidController`].
//! 3. **Actuate** – forward the bounded command to the actuator.  A rejected
//!    command is logged and the loop keeps running.
//! 4. **Record** – append a [`ControlSample`] to the trend history.
//!
//! Configuration (setpoint, gains, limits, sample time) is retuned live
//! through the [`PidTuning`] handle from any thread; the tick itself never
//! holds that lock for longer than one settings copy.

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use thermaloop_hal::{Actuator, CameraBank};
use thermaloop_types::ThermalError;

use crate::aggregator::{AggregationMode, AggregationResult, Aggregator};
use crate::pid::{PidController, PidTuning};
use crate::trend::{ControlSample, TrendBuffer};

/// Which cameras feed the loop, and how their frames are reduced.
#[derive(Debug, Clone)]
pub struct ControlQuery {
    /// Indices into the streaming-camera list; `None` selects all cameras.
    /// Out-of-range indices are skipped at aggregation time.
    pub camera_indices: Option<Vec<usize>>,
    /// Reduction strategy.  Must be a scalar-producing mode.
    pub mode: AggregationMode,
}

/// The closed control loop: cameras → aggregation → PID → actuator.
pub struct ControlLoop {
    bank: CameraBank,
    actuator: Box<dyn Actuator>,
    pid: PidController,
    query: ControlQuery,
    trend: TrendBuffer,
}

impl ControlLoop {
    /// Assemble a loop.
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::InvalidConfig`] when `query.mode` does not
    /// reduce to a scalar — a list of temperatures is not a process variable.
    pub fn new(
        bank: CameraBank,
        actuator: Box<dyn Actuator>,
        pid: PidController,
        query: ControlQuery,
        trend_capacity: usize,
    ) -> Result<Self, ThermalError> {
        if !query.mode.is_scalar() {
            return Err(ThermalError::InvalidConfig(format!(
                "aggregation mode '{}' does not produce a scalar reading",
                query.mode
            )));
        }
        Ok(Self {
            bank,
            actuator,
            pid,
            query,
            trend: TrendBuffer::new(trend_capacity),
        })
    }

    /// Run one tick against the wall clock.
    pub fn tick(&mut self) -> Option<ControlSample> {
        self.tick_at(Instant::now())
    }

    /// Run one tick as of `now`.  Returns the recorded sample, or `None` when
    /// the loop is paused or no valid camera data was available (either way
    /// the actuator is left untouched).
    pub fn tick_at(&mut self, now: Instant) -> Option<ControlSample> {
        if self.pid.is_paused() {
            debug!("controller paused; tick skipped");
            return None;
        }

        let aggregator = Aggregator::new(&self.bank);
        let result = aggregator.frames_for_pid(self.query.camera_indices.as_deref(), self.query.mode);

        let reading = match result {
            Some(AggregationResult::Scalar(value)) => value,
            Some(_) => {
                // Unreachable with the constructor's scalar-mode check, but a
                // wrong shape must degrade like missing data, not panic.
                warn!(mode = %self.query.mode, "non-scalar aggregation result in control tick");
                return None;
            }
            None => {
                debug!("no valid frames this tick; holding last actuator command");
                return None;
            }
        };

        let output = self.pid.update_at(reading, now);

        if let Err(err) = self.actuator.set_voltage(output) {
            warn!(actuator = self.actuator.id(), error = %err, "actuator rejected command");
        }

        let sample = ControlSample {
            timestamp: Utc::now(),
            reading,
            output,
            setpoint: self.pid.setpoint(),
        };
        self.trend.push(sample);
        Some(sample)
    }

    /// Pause regulation and drive the actuator to 0 V.
    ///
    /// # Errors
    ///
    /// Returns the actuator's fault when the zero command is rejected; the
    /// controller stays paused either way.
    pub fn stop(&mut self) -> Result<(), ThermalError> {
        self.pid.pause();
        self.actuator.set_voltage(0.0)
    }

    /// Resume regulation after [`stop`][Self::stop].
    pub fn resume(&mut self) {
        self.pid.resume();
    }

    /// `true` while regulation is stopped.
    pub fn is_paused(&self) -> bool {
        self.pid.is_paused()
    }

    /// Clear the controller's loop state (integral, derivative memory).
    pub fn reset(&mut self) {
        self.pid.reset();
    }

    /// Live-retuning handle for operator threads.
    pub fn tuning(&self) -> PidTuning {
        self.pid.tuning()
    }

    /// The camera collection the loop reads from.
    pub fn bank(&self) -> &CameraBank {
        &self.bank
    }

    /// The actuator sink, for status displays.
    pub fn actuator(&self) -> &dyn Actuator {
        self.actuator.as_ref()
    }

    /// The recorded tick history.
    pub fn trend(&self) -> &TrendBuffer {
        &self.trend
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

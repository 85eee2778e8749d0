//! Sample-time-limited PID controller with clamped output and live retuning.
//!
//! The controller converts a temperature reading into a bounded actuator
//! voltage.  It is deliberately hardware-agnostic: the caller supplies the
//! measurement (and, in tests, the clock) and forwards the returned command
//! to whatever sink it owns.
//!
//! Two details matter for a loop driven by an irregular timer:
//!
//! - **Rate limiting** – ticks arriving earlier than `sample_time` after the
//!   previous one are no-ops that return the previous output unchanged.
//! - **Anti-windup** – the integral contribution is clamped to the output
//!   limits, the summed output is clamped again, and the accumulator is
//!   frozen while the unclamped sum is saturated in the error's direction.
//!   Without this, a long heat-up ramp leaves the accumulator holding hours
//!   of error and the output pinned high long after the setpoint is reached.
//!
//! Tuning is shared through [`PidTuning`], a cloneable handle over one mutex,
//! so an operator thread can retune mid-session without ever observing (or
//! producing) a half-updated gain set.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use thermaloop_control::pid::{PidController, PidSettings};
//!
//! let settings = PidSettings {
//!     kp: 4.0,
//!     ki: 0.0,
//!     kd: 0.0,
//!     setpoint: 200.0,
//!     output_limits: (0.0, 10.0),
//!     sample_time: Duration::from_millis(100),
//! };
//! let mut pid = PidController::new(settings).unwrap();
//! // error = 200 − 150 = 50; kp·error = 200 → clamped to the 10 V limit.
//! assert_eq!(pid.update(150.0), 10.0);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thermaloop_types::ThermalError;

// ────────────────────────────────────────────────────────────────────────────
// Settings and the tuning handle
// ────────────────────────────────────────────────────────────────────────────

/// The full tunable configuration of a [`PidController`].
///
/// The core supplies no defaults; the configuration layer that constructs the
/// controller decides every field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidSettings {
    /// Proportional gain.
    pub kp: f32,
    /// Integral gain.
    pub ki: f32,
    /// Derivative gain.
    pub kd: f32,
    /// Target temperature.
    pub setpoint: f32,
    /// Inclusive output clamp `(lo, hi)`, e.g. the actuator's voltage range.
    pub output_limits: (f32, f32),
    /// Minimum time between effective ticks; earlier ticks are no-ops.
    pub sample_time: Duration,
}

impl PidSettings {
    /// Check the configuration for contract violations.
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::InvalidConfig`] when the lower output limit
    /// exceeds the upper one.
    pub fn validate(&self) -> Result<(), ThermalError> {
        let (lo, hi) = self.output_limits;
        if lo > hi {
            return Err(ThermalError::InvalidConfig(format!(
                "output limits are inverted: lo {lo} > hi {hi}"
            )));
        }
        Ok(())
    }
}

/// Cloneable, thread-safe handle to a controller's [`PidSettings`].
///
/// Every setter takes the settings mutex for the duration of the write only,
/// so a tick on the control thread copies either the old or the new settings,
/// never a mixture.
#[derive(Clone)]
pub struct PidTuning {
    inner: Arc<Mutex<PidSettings>>,
}

impl PidTuning {
    fn new(settings: PidSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(settings)),
        }
    }

    // The guarded value is plain copyable data, so a poisoned lock still
    // holds a consistent snapshot; recover rather than propagate.
    fn lock(&self) -> MutexGuard<'_, PidSettings> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace all three gains at once.
    pub fn set_gains(&self, kp: f32, ki: f32, kd: f32) {
        let mut s = self.lock();
        s.kp = kp;
        s.ki = ki;
        s.kd = kd;
    }

    /// Change the target temperature.
    pub fn set_setpoint(&self, setpoint: f32) {
        self.lock().setpoint = setpoint;
    }

    /// Change the output clamp.
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::InvalidConfig`] when `lo > hi`; the previous
    /// limits stay in effect.
    pub fn set_output_limits(&self, lo: f32, hi: f32) -> Result<(), ThermalError> {
        if lo > hi {
            return Err(ThermalError::InvalidConfig(format!(
                "output limits are inverted: lo {lo} > hi {hi}"
            )));
        }
        self.lock().output_limits = (lo, hi);
        Ok(())
    }

    /// Change the minimum time between effective ticks.
    pub fn set_sample_time(&self, sample_time: Duration) {
        self.lock().sample_time = sample_time;
    }

    /// One consistent copy of the current settings.
    pub fn snapshot(&self) -> PidSettings {
        *self.lock()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Controller
// ────────────────────────────────────────────────────────────────────────────

/// A PID controller for closed-loop temperature regulation.
///
/// The loop state (integral, derivative memory, timing) is owned exclusively
/// by this instance and mutated once per effective tick; only the settings
/// are shared, via [`PidTuning`].
pub struct PidController {
    tuning: PidTuning,
    integral: f32,
    last_error: Option<f32>,
    last_tick: Option<Instant>,
    last_output: f32,
    auto: bool,
}

impl PidController {
    /// Create a controller in the Idle state (no tick recorded yet).
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::InvalidConfig`] when `settings` fail
    /// [`PidSettings::validate`].
    pub fn new(settings: PidSettings) -> Result<Self, ThermalError> {
        settings.validate()?;
        let (lo, hi) = settings.output_limits;
        Ok(Self {
            tuning: PidTuning::new(settings),
            integral: 0.0,
            last_error: None,
            last_tick: None,
            last_output: 0.0f32.clamp(lo, hi),
            auto: true,
        })
    }

    /// A retuning handle that can be handed to another thread.
    pub fn tuning(&self) -> PidTuning {
        self.tuning.clone()
    }

    /// Current target temperature.
    pub fn setpoint(&self) -> f32 {
        self.tuning.snapshot().setpoint
    }

    /// The output returned by the most recent tick.
    pub fn last_output(&self) -> f32 {
        self.last_output
    }

    /// Stop computing: subsequent ticks return the last output unchanged.
    pub fn pause(&mut self) {
        self.auto = false;
    }

    /// Resume computing.  Timing and derivative memory are dropped so the
    /// pause gap never enters `dt`; the integral is kept for a bumpless
    /// handover.
    pub fn resume(&mut self) {
        self.auto = true;
        self.last_tick = None;
        self.last_error = None;
    }

    /// `true` while the controller is paused.
    pub fn is_paused(&self) -> bool {
        !self.auto
    }

    /// Return to the Idle state: clears the integral accumulator and the
    /// previous-error/previous-tick memory.  Call after a large setpoint
    /// change to avoid a derivative kick and stale integral.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = None;
        self.last_tick = None;
    }

    /// Compute the next output using the wall clock.
    pub fn update(&mut self, measurement: f32) -> f32 {
        self.update_at(measurement, Instant::now())
    }

    /// Compute the next output as of `now`.
    ///
    /// The first call after construction, [`reset`][Self::reset], or
    /// [`resume`][Self::resume] records timing state and returns a
    /// proportional-only output (there is no valid `dt` for the integral or
    /// derivative yet).  A call earlier than `sample_time` after the previous
    /// effective tick returns the previous output unchanged.
    pub fn update_at(&mut self, measurement: f32, now: Instant) -> f32 {
        if !self.auto {
            return self.last_output;
        }

        let s = self.tuning.snapshot();
        let (lo, hi) = s.output_limits;
        let error = s.setpoint - measurement;

        let dt = match self.last_tick {
            None => {
                let i_term = (s.ki * self.integral).clamp(lo, hi);
                let output = (s.kp * error + i_term).clamp(lo, hi);
                self.last_error = Some(error);
                self.last_tick = Some(now);
                self.last_output = output;
                return output;
            }
            Some(prev) => {
                let elapsed = now.saturating_duration_since(prev);
                if elapsed < s.sample_time {
                    return self.last_output;
                }
                elapsed.as_secs_f32()
            }
        };

        let p_term = s.kp * error;

        let proposed_integral = self.integral + error * dt;
        let i_unclamped = s.ki * proposed_integral;
        let i_term = i_unclamped.clamp(lo, hi);

        let d_term = match self.last_error {
            Some(prev) if dt > 0.0 => s.kd * (error - prev) / dt,
            _ => 0.0,
        };

        let output = (p_term + i_term + d_term).clamp(lo, hi);

        // Commit the accumulator only while the unclamped sum stays inside
        // the limits, or the error is already pulling the output back in.
        let unclamped = p_term + i_unclamped + d_term;
        let pushing_past_limit = (unclamped > hi && error > 0.0) || (unclamped < lo && error < 0.0);
        if !pushing_past_limit {
            self.integral = proposed_integral;
        }

        self.last_error = Some(error);
        self.last_tick = Some(now);
        self.last_output = output;
        output
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const WIDE: (f32, f32) = (f32::NEG_INFINITY, f32::INFINITY);

    fn settings(kp: f32, ki: f32, kd: f32, setpoint: f32, limits: (f32, f32)) -> PidSettings {
        PidSettings {
            kp,
            ki,
            kd,
            setpoint,
            output_limits: limits,
            sample_time: Duration::from_millis(100),
        }
    }

    #[test]
    fn proportional_output_is_clamped_to_limits() {
        // kp=4, setpoint=200, reading=150 → 4·50 = 200, clamped to [0, 10].
        let mut pid = PidController::new(settings(4.0, 0.0, 0.0, 200.0, (0.0, 10.0))).unwrap();
        assert_eq!(pid.update(150.0), 10.0);
    }

    #[test]
    fn proportional_output_unclamped_within_wide_limits() {
        let mut pid = PidController::new(settings(4.0, 0.0, 0.0, 200.0, WIDE)).unwrap();
        assert!((pid.update(150.0) - 200.0).abs() < 1e-4);
    }

    #[test]
    fn output_is_zero_at_setpoint() {
        let mut pid = PidController::new(settings(2.0, 0.0, 0.0, 60.0, WIDE)).unwrap();
        assert!(pid.update(60.0).abs() < 1e-6);
    }

    #[test]
    fn ticks_within_sample_time_are_idempotent() {
        let mut pid = PidController::new(settings(1.0, 0.5, 0.1, 50.0, (0.0, 5.0))).unwrap();
        let t0 = Instant::now();
        let first = pid.update_at(20.0, t0);
        // Two early ticks with wildly different readings change nothing.
        let early_a = pid.update_at(45.0, t0 + Duration::from_millis(10));
        let early_b = pid.update_at(0.0, t0 + Duration::from_millis(90));
        assert_eq!(first, early_a);
        assert_eq!(first, early_b);
    }

    #[test]
    fn tick_at_sample_time_boundary_is_effective() {
        let mut pid = PidController::new(settings(1.0, 0.0, 0.0, 50.0, WIDE)).unwrap();
        let t0 = Instant::now();
        pid.update_at(20.0, t0);
        // Exactly sample_time later must recompute (error changed 30 → 10).
        let out = pid.update_at(40.0, t0 + Duration::from_millis(100));
        assert!((out - 10.0).abs() < 1e-4);
    }

    #[test]
    fn integral_accumulates_over_effective_ticks() {
        let mut pid = PidController::new(settings(0.0, 1.0, 0.0, 2.0, WIDE)).unwrap();
        let t0 = Instant::now();
        // First tick: no dt yet → integral untouched, output 0.
        assert!(pid.update_at(1.0, t0).abs() < 1e-6);
        // error=1 over 1 s → integral 1.0 → output 1.0.
        let out1 = pid.update_at(1.0, t0 + Duration::from_secs(1));
        assert!((out1 - 1.0).abs() < 1e-4);
        // Another second of error=1 → integral 2.0.
        let out2 = pid.update_at(1.0, t0 + Duration::from_secs(2));
        assert!((out2 - 2.0).abs() < 1e-4);
    }

    #[test]
    fn derivative_is_zero_on_first_tick() {
        let mut pid = PidController::new(settings(0.0, 0.0, 5.0, 10.0, WIDE)).unwrap();
        assert!(pid.update(0.0).abs() < 1e-6);
    }

    #[test]
    fn derivative_tracks_error_slope() {
        let mut pid = PidController::new(settings(0.0, 0.0, 1.0, 10.0, WIDE)).unwrap();
        let t0 = Instant::now();
        pid.update_at(0.0, t0); // error 10
        // One second later error is 5: d = (5 − 10)/1 = −5.
        let out = pid.update_at(5.0, t0 + Duration::from_secs(1));
        assert!((out - (-5.0)).abs() < 1e-4);
    }

    #[test]
    fn integral_freezes_while_saturated() {
        // Pure-I controller pinned at the 1 V limit by a huge error.
        let mut pid = PidController::new(settings(0.0, 1.0, 0.0, 100.0, (0.0, 1.0))).unwrap();
        let t0 = Instant::now();
        pid.update_at(0.0, t0);
        for i in 1..=10 {
            let out = pid.update_at(0.0, t0 + Duration::from_secs(i));
            assert_eq!(out, 1.0);
        }
        // The moment the error disappears, the output must let go of the
        // limit instead of replaying minutes of accumulated error.
        let recovered = pid.update_at(100.0, t0 + Duration::from_secs(11));
        assert!(recovered < 0.5, "windup not prevented: output still {recovered}");
    }

    #[test]
    fn output_never_escapes_limits_under_extreme_error() {
        let mut pid = PidController::new(settings(1e6, 1e3, 1e3, 1e6, (0.0, 5.0))).unwrap();
        let t0 = Instant::now();
        for i in 0..20 {
            let out = pid.update_at(-1e6, t0 + Duration::from_secs(i));
            assert!((0.0..=5.0).contains(&out), "output {out} escaped limits");
        }
        // And the negative direction.
        pid.tuning().set_setpoint(-1e6);
        let out = pid.update_at(1e6, t0 + Duration::from_secs(30));
        assert!((0.0..=5.0).contains(&out));
    }

    #[test]
    fn reset_matches_a_fresh_controller() {
        let cfg = settings(1.0, 1.0, 1.0, 5.0, WIDE);
        let mut pid = PidController::new(cfg).unwrap();
        let t0 = Instant::now();
        pid.update_at(0.0, t0);
        pid.update_at(2.0, t0 + Duration::from_secs(1));
        pid.reset();

        let mut fresh = PidController::new(cfg).unwrap();
        let t1 = t0 + Duration::from_secs(2);
        assert_eq!(pid.update_at(1.0, t1), fresh.update_at(1.0, t1));
    }

    #[test]
    fn pause_holds_last_output() {
        let mut pid = PidController::new(settings(1.0, 0.0, 0.0, 50.0, (0.0, 10.0))).unwrap();
        let t0 = Instant::now();
        let held = pid.update_at(45.0, t0);
        pid.pause();
        assert!(pid.is_paused());
        assert_eq!(pid.update_at(0.0, t0 + Duration::from_secs(5)), held);
        assert_eq!(pid.update_at(100.0, t0 + Duration::from_secs(10)), held);
    }

    #[test]
    fn resume_does_not_spike_from_the_pause_gap() {
        let mut pid = PidController::new(settings(0.0, 0.0, 100.0, 50.0, WIDE)).unwrap();
        let t0 = Instant::now();
        pid.update_at(10.0, t0);
        pid.pause();
        pid.resume();
        // First tick after resume is proportional-only: a big kd must not see
        // the hour-long gap as a derivative step.
        let out = pid.update_at(49.0, t0 + Duration::from_secs(3600));
        assert!(out.abs() < 1e-6);
    }

    #[test]
    fn retuning_applies_between_ticks() {
        let mut pid = PidController::new(settings(1.0, 0.0, 0.0, 10.0, WIDE)).unwrap();
        let tuning = pid.tuning();
        let t0 = Instant::now();
        assert!((pid.update_at(0.0, t0) - 10.0).abs() < 1e-4);

        tuning.set_gains(3.0, 0.0, 0.0);
        tuning.set_setpoint(20.0);
        let out = pid.update_at(0.0, t0 + Duration::from_secs(1));
        assert!((out - 60.0).abs() < 1e-4);
        assert_eq!(pid.setpoint(), 20.0);
    }

    #[test]
    fn retuning_handle_works_across_threads() {
        let pid = PidController::new(settings(1.0, 0.0, 0.0, 10.0, WIDE)).unwrap();
        let tuning = pid.tuning();
        let handle = std::thread::spawn(move || {
            tuning.set_setpoint(75.0);
            tuning.set_sample_time(Duration::from_millis(50));
        });
        handle.join().unwrap();
        let snap = pid.tuning().snapshot();
        assert_eq!(snap.setpoint, 75.0);
        assert_eq!(snap.sample_time, Duration::from_millis(50));
    }

    #[test]
    fn inverted_limits_are_rejected() {
        let cfg = settings(1.0, 0.0, 0.0, 10.0, (5.0, 0.0));
        assert!(matches!(PidController::new(cfg), Err(ThermalError::InvalidConfig(_))));

        let pid = PidController::new(settings(1.0, 0.0, 0.0, 10.0, (0.0, 5.0))).unwrap();
        let tuning = pid.tuning();
        assert!(tuning.set_output_limits(9.0, 1.0).is_err());
        // The previous limits must survive a rejected update.
        assert_eq!(tuning.snapshot().output_limits, (0.0, 5.0));
    }
}

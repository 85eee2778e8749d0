//! Generic `Actuator` trait for the heating-power sink.
//!
//! In the reference rig the actuator is a bench signal generator whose output
//! voltage drives a heating element.  The control loop only ever talks to the
//! trait, so the generator can be swapped for a simulator (or a different
//! instrument) without touching the controller.

use thermaloop_types::ThermalError;

/// A voltage-commanded actuator (signal generator, programmable PSU, …).
pub trait Actuator: Send + Sync {
    /// Stable identifier for this actuator, e.g. `"siggen"`.
    fn id(&self) -> &str;

    /// Command the actuator output to `volts`.
    ///
    /// The caller is responsible for bounding the command; the PID loop
    /// clamps its output before it reaches this call.
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::HardwareFault`] when the command cannot be
    /// applied (e.g. the instrument is disconnected).  The control loop
    /// reports such failures and keeps ticking.
    fn set_voltage(&mut self, volts: f32) -> Result<(), ThermalError>;

    /// The most recently commanded output voltage.
    fn voltage(&self) -> f32;
}

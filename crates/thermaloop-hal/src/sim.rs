//! In-process simulation drivers for headless testing without hardware.
//!
//! [`SimCamera`] and [`SimHeater`] implement the HAL traits over shared
//! in-memory state, and [`ThermalPlant`] is a first-order thermal model that
//! closes the loop between them.  Together they let the full control stack
//! run in CI and in the demo binary with no cameras or instruments attached.
//!
//! # Example
//!
//! ```rust
//! use thermaloop_hal::sim::{SimCamera, SimHeater};
//! use thermaloop_hal::{Actuator, ThermalCamera};
//! use thermaloop_types::Frame;
//!
//! let cam = SimCamera::new("cam0");
//! cam.inject(Frame::from_rows(vec![vec![42.0]]).unwrap());
//! let (frame, header) = cam.latest_frame().unwrap();
//! assert_eq!(header.frame_counter, 1);
//! assert_eq!(frame.samples(), &[42.0]);
//!
//! let mut heater = SimHeater::new("siggen");
//! heater.set_voltage(2.5).unwrap();
//! assert!((heater.voltage() - 2.5).abs() < f32::EPSILON);
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::debug;

use thermaloop_types::{Frame, FrameHeader, ThermalError};

use crate::actuator::Actuator;
use crate::camera::ThermalCamera;

// ────────────────────────────────────────────────────────────────────────────
// Sim camera
// ────────────────────────────────────────────────────────────────────────────

struct SimCameraState {
    latest: Option<(Frame, FrameHeader)>,
    frame_counter: u64,
    streaming: bool,
}

/// A simulated thermal camera whose frames are injected by the test or demo
/// harness.
///
/// Clones share the same underlying state, so a clone kept outside the
/// [`CameraBank`][crate::bank::CameraBank] can keep feeding frames to the
/// boxed driver inside it.
#[derive(Clone)]
pub struct SimCamera {
    id: String,
    state: Arc<Mutex<SimCameraState>>,
}

impl SimCamera {
    /// Create a new simulated camera with the given identifier.  Starts
    /// streaming with no frame available.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Arc::new(Mutex::new(SimCameraState {
                latest: None,
                frame_counter: 0,
                streaming: true,
            })),
        }
    }

    /// Publish `frame` as the camera's latest reading, stamping it with an
    /// incrementing frame counter.
    pub fn inject(&self, frame: Frame) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.frame_counter += 1;
        let header = FrameHeader {
            frame_counter: state.frame_counter,
            source_id: self.id.clone(),
            captured_at: Utc::now(),
        };
        state.latest = Some((frame, header));
    }

    /// Drop the latest reading, simulating a camera with no data this cycle.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.latest = None;
    }

    /// Toggle the streaming flag, simulating connect/disconnect.
    pub fn set_streaming(&self, streaming: bool) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.streaming = streaming;
    }
}

impl ThermalCamera for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_streaming(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .streaming
    }

    fn latest_frame(&self) -> Option<(Frame, FrameHeader)> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .latest
            .clone()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sim heater / signal generator
// ────────────────────────────────────────────────────────────────────────────

/// A simulated signal generator that records the most recently commanded
/// voltage.  Always succeeds.
///
/// Clones share state, so the demo harness can read back the voltage the
/// control loop commanded on its boxed copy.
#[derive(Clone)]
pub struct SimHeater {
    id: String,
    volts: Arc<Mutex<f32>>,
}

impl SimHeater {
    /// Create a new simulated heater driver at 0 V output.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            volts: Arc::new(Mutex::new(0.0)),
        }
    }
}

impl Actuator for SimHeater {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_voltage(&mut self, volts: f32) -> Result<(), ThermalError> {
        debug!(actuator = %self.id, volts, "sim heater commanded");
        *self.volts.lock().unwrap_or_else(PoisonError::into_inner) = volts;
        Ok(())
    }

    fn voltage(&self) -> f32 {
        *self.volts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// First-order thermal plant
// ────────────────────────────────────────────────────────────────────────────

/// A first-order model of the heated sample under the cameras:
///
/// ```text
/// dT/dt = (ambient − T) / tau + volts_to_deg_per_s · V
/// ```
///
/// Good enough to exercise the closed loop end to end; not a calibration
/// model.
#[derive(Debug, Clone)]
pub struct ThermalPlant {
    temperature: f32,
    ambient: f32,
    tau_s: f32,
    volts_to_deg_per_s: f32,
}

impl ThermalPlant {
    /// Create a plant at ambient temperature.
    ///
    /// `tau_s` is the cooling time constant in seconds;
    /// `volts_to_deg_per_s` is the heating rate per commanded volt.
    pub fn new(ambient: f32, tau_s: f32, volts_to_deg_per_s: f32) -> Self {
        Self {
            temperature: ambient,
            ambient,
            tau_s: tau_s.max(f32::EPSILON),
            volts_to_deg_per_s,
        }
    }

    /// Advance the model by `dt` seconds under `volts` of heating drive and
    /// return the new temperature.
    pub fn step(&mut self, volts: f32, dt: f32) -> f32 {
        let dt = dt.max(0.0);
        let cooling = (self.ambient - self.temperature) / self.tau_s;
        self.temperature += (cooling + self.volts_to_deg_per_s * volts) * dt;
        self.temperature
    }

    /// Current plant temperature.
    pub fn temperature(&self) -> f32 {
        self.temperature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: f32) -> Frame {
        Frame::from_rows(vec![vec![value, value], vec![value, value]]).unwrap()
    }

    #[test]
    fn sim_camera_counts_injected_frames() {
        let cam = SimCamera::new("cam0");
        assert!(cam.latest_frame().is_none());

        cam.inject(frame(20.0));
        cam.inject(frame(21.0));
        let (f, h) = cam.latest_frame().unwrap();
        assert_eq!(h.frame_counter, 2);
        assert_eq!(h.source_id, "cam0");
        assert!((f.mean().unwrap() - 21.0).abs() < 1e-6);
    }

    #[test]
    fn sim_camera_clear_drops_reading() {
        let cam = SimCamera::new("cam0");
        cam.inject(frame(20.0));
        cam.clear();
        assert!(cam.latest_frame().is_none());
        // Counter keeps going after a gap.
        cam.inject(frame(22.0));
        assert_eq!(cam.latest_frame().unwrap().1.frame_counter, 2);
    }

    #[test]
    fn sim_camera_clones_share_state() {
        let cam = SimCamera::new("cam0");
        let feeder = cam.clone();
        feeder.inject(frame(25.0));
        assert!(cam.latest_frame().is_some());
        feeder.set_streaming(false);
        assert!(!cam.is_streaming());
    }

    #[test]
    fn sim_heater_records_last_command() {
        let mut heater = SimHeater::new("siggen");
        let observer = heater.clone();
        heater.set_voltage(4.2).unwrap();
        assert!((observer.voltage() - 4.2).abs() < f32::EPSILON);
    }

    #[test]
    fn plant_relaxes_to_ambient_without_drive() {
        let mut plant = ThermalPlant::new(25.0, 5.0, 10.0);
        plant.step(3.0, 1.0); // heat up first
        let hot = plant.temperature();
        assert!(hot > 25.0);
        for _ in 0..200 {
            plant.step(0.0, 0.5);
        }
        assert!((plant.temperature() - 25.0).abs() < 0.5);
    }

    #[test]
    fn plant_heats_under_voltage() {
        let mut plant = ThermalPlant::new(25.0, 10.0, 5.0);
        let before = plant.temperature();
        plant.step(2.0, 0.1);
        assert!(plant.temperature() > before);
    }

    #[test]
    fn plant_ignores_negative_dt() {
        let mut plant = ThermalPlant::new(25.0, 10.0, 5.0);
        let before = plant.temperature();
        plant.step(2.0, -1.0);
        assert!((plant.temperature() - before).abs() < f32::EPSILON);
    }
}

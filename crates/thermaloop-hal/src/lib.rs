//! `thermaloop-hal` – Hardware Abstraction
//!
//! Device-facing traits and the camera collection the control core consumes.
//! The rest of the workspace only ever talks to these traits, so real serial
//! drivers and the in-process simulators are interchangeable.
//!
//! # Modules
//!
//! - [`camera`] – [`ThermalCamera`][camera::ThermalCamera]:
//!   the "latest frame + header, or absence" capability every thermal camera
//!   backend provides.  Frame retrieval is non-blocking by contract.
//! - [`actuator`] – [`Actuator`][actuator::Actuator]:
//!   the bounded-voltage sink the control loop drives (a signal generator
//!   feeding the heating element, in the reference rig).
//! - [`bank`] – [`CameraBank`][bank::CameraBank]:
//!   an ordered, indexable collection of camera drivers.  Aggregation code
//!   borrows the bank; it never owns or reconnects cameras.
//! - [`sim`] – [`SimCamera`][sim::SimCamera], [`SimHeater`][sim::SimHeater],
//!   [`ThermalPlant`][sim::ThermalPlant]:
//!   in-process simulation drivers so the full control stack runs in headless
//!   tests, CI, and the demo binary without any physical hardware.

pub mod actuator;
pub mod bank;
pub mod camera;
pub mod sim;

pub use actuator::Actuator;
pub use bank::CameraBank;
pub use camera::ThermalCamera;
pub use sim::{SimCamera, SimHeater, ThermalPlant};

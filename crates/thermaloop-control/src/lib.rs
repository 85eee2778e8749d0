//! `thermaloop-control` – Aggregation & Regulation
//!
//! The control core: it turns N independent, possibly-missing camera readings
//! into one temperature signal and regulates that signal with a bounded PID
//! output.  Everything hardware-facing stays behind the `thermaloop-hal`
//! traits; everything user-facing (GUI, export, serial plumbing) lives in the
//! surrounding application.
//!
//! # Modules
//!
//! - [`aggregator`] – [`Aggregator`][aggregator::Aggregator]:
//!   reduces the latest frames from a borrowed
//!   [`CameraBank`][thermaloop_hal::CameraBank] under one of six
//!   [`AggregationMode`][aggregator::AggregationMode]s, tolerant of missing
//!   and empty frames.  Absence of data is always `None`, never `0.0` and
//!   never an error.
//! - [`pid`] – [`PidController`][pid::PidController]:
//!   a sample-time-limited PID with clamped output, saturation-aware
//!   anti-windup, pause/resume, and a thread-safe
//!   [`PidTuning`][pid::PidTuning] handle for live retuning from an operator
//!   thread.
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]:
//!   one synchronous tick = aggregate → PID → actuator, driven by an external
//!   timer.  Actuator faults are logged and survived.
//! - [`trend`] – [`TrendBuffer`][trend::TrendBuffer]:
//!   bounded history of [`ControlSample`][trend::ControlSample]s with a
//!   stability predicate for step-and-settle test procedures.

pub mod aggregator;
pub mod control_loop;
pub mod pid;
pub mod trend;

pub use aggregator::{AggregationMode, AggregationResult, Aggregator};
pub use control_loop::{ControlLoop, ControlQuery};
pub use pid::{PidController, PidSettings, PidTuning};
pub use trend::{ControlSample, TrendBuffer};

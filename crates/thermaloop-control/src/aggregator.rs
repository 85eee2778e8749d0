//! Multi-camera temperature aggregation.
//!
//! [`Aggregator`] borrows a [`CameraBank`] and reduces the latest frame from
//! each selected camera into the shape a controller or display asked for.
//! It is built around partial availability: cameras may be mid-reconnect,
//! deliver nothing this cycle, or hand back an empty frame, and none of that
//! is an error.  A reading that does not exist is `None` — never `0.0`, which
//! is a perfectly legitimate temperature.
//!
//! # Example
//!
//! ```rust
//! use thermaloop_control::aggregator::{AggregationMode, AggregationResult, Aggregator};
//! use thermaloop_hal::{CameraBank, SimCamera};
//! use thermaloop_types::Frame;
//!
//! let cam = SimCamera::new("cam0");
//! cam.inject(Frame::from_rows(vec![vec![10.0, 20.0], vec![30.0, 40.0]]).unwrap());
//! let mut bank = CameraBank::new();
//! bank.add_camera(Box::new(cam));
//!
//! let agg = Aggregator::new(&bank);
//! assert_eq!(agg.average_of_mean_temperatures(), Some(25.0));
//! match agg.frames_for_pid(None, AggregationMode::OverallMax) {
//!     Some(AggregationResult::Scalar(max)) => assert_eq!(max, 40.0),
//!     other => panic!("unexpected result: {other:?}"),
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use thermaloop_hal::CameraBank;
use thermaloop_types::{Frame, FrameHeader, ThermalError};

// ────────────────────────────────────────────────────────────────────────────
// Mode and result types
// ────────────────────────────────────────────────────────────────────────────

/// Reduction strategy across the selected cameras.
///
/// The serialized names (`"average_mean"`, `"overall_max"`, …) are the mode
/// strings accepted in configuration files and operator commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Mean of the per-frame means → one scalar.
    AverageMean,
    /// Max of the per-frame maxima → one scalar.
    OverallMax,
    /// Per-frame means, one per valid pair, in selection order.
    IndividualMeans,
    /// Per-frame maxima, one per valid pair, in selection order.
    IndividualMaxs,
    /// Mean of the first valid pair in selection order → one scalar.
    FirstValidMean,
    /// The valid (frame, header) pairs themselves, unreduced.
    RawFrames,
}

impl AggregationMode {
    /// `true` for modes that reduce to a single scalar, i.e. the modes a PID
    /// loop can consume directly.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            AggregationMode::AverageMean
                | AggregationMode::OverallMax
                | AggregationMode::FirstValidMean
        )
    }

    /// The configuration-file spelling of this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationMode::AverageMean => "average_mean",
            AggregationMode::OverallMax => "overall_max",
            AggregationMode::IndividualMeans => "individual_means",
            AggregationMode::IndividualMaxs => "individual_maxs",
            AggregationMode::FirstValidMean => "first_valid_mean",
            AggregationMode::RawFrames => "raw_frames",
        }
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationMode {
    type Err = ThermalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "average_mean" => Ok(AggregationMode::AverageMean),
            "overall_max" => Ok(AggregationMode::OverallMax),
            "individual_means" => Ok(AggregationMode::IndividualMeans),
            "individual_maxs" => Ok(AggregationMode::IndividualMaxs),
            "first_valid_mean" => Ok(AggregationMode::FirstValidMean),
            "raw_frames" => Ok(AggregationMode::RawFrames),
            other => Err(ThermalError::UnknownAggregationMode(other.to_string())),
        }
    }
}

/// What an aggregation call produced.  Which variant you get is determined
/// entirely by the requested [`AggregationMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationResult {
    /// A single reduced temperature.
    Scalar(f32),
    /// One value per valid frame, selection order preserved.
    Scalars(Vec<f32>),
    /// The valid frame/header pairs, selection order preserved.
    Frames(Vec<(Frame, FrameHeader)>),
}

impl AggregationResult {
    /// The scalar value, when this result is [`AggregationResult::Scalar`].
    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            AggregationResult::Scalar(v) => Some(*v),
            _ => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Aggregator
// ────────────────────────────────────────────────────────────────────────────

/// Reduces the latest readings of a borrowed [`CameraBank`].
///
/// Cheap to construct; the control loop builds one per tick.  The aggregator
/// never mutates the bank and never blocks: it only calls the non-blocking
/// `latest_frame` on each selected camera.
pub struct Aggregator<'a> {
    bank: &'a CameraBank,
}

impl<'a> Aggregator<'a> {
    /// Borrow `bank` for aggregation.
    pub fn new(bank: &'a CameraBank) -> Self {
        Self { bank }
    }

    /// Mean of the per-frame mean temperatures across every streaming camera
    /// with a valid frame.  `None` when no valid frame exists anywhere.
    pub fn average_of_mean_temperatures(&self) -> Option<f32> {
        let means: Vec<f32> = self
            .valid_pairs(None)
            .iter()
            .filter_map(|(frame, _)| frame.mean())
            .collect();
        mean_of(&means)
    }

    /// Hottest sample across every streaming camera with a valid frame.
    /// `None` when no valid frame exists anywhere.
    pub fn max_temperature_from_all(&self) -> Option<f32> {
        self.valid_pairs(None)
            .iter()
            .filter_map(|(frame, _)| frame.max())
            .reduce(f32::max)
    }

    /// General-purpose aggregation entry point.
    ///
    /// `camera_indices` selects cameras by index into the streaming-camera
    /// list (`None` = all of them); out-of-range indices are skipped, not
    /// errors.  Returns `None` when zero valid frames remain after selection,
    /// for every mode.
    pub fn frames_for_pid(
        &self,
        camera_indices: Option<&[usize]>,
        mode: AggregationMode,
    ) -> Option<AggregationResult> {
        let valid = self.valid_pairs(camera_indices);
        if valid.is_empty() {
            return None;
        }

        match mode {
            AggregationMode::AverageMean => {
                let means: Vec<f32> = valid.iter().filter_map(|(f, _)| f.mean()).collect();
                mean_of(&means).map(AggregationResult::Scalar)
            }
            AggregationMode::OverallMax => valid
                .iter()
                .filter_map(|(f, _)| f.max())
                .reduce(f32::max)
                .map(AggregationResult::Scalar),
            AggregationMode::IndividualMeans => Some(AggregationResult::Scalars(
                valid.iter().filter_map(|(f, _)| f.mean()).collect(),
            )),
            AggregationMode::IndividualMaxs => Some(AggregationResult::Scalars(
                valid.iter().filter_map(|(f, _)| f.max()).collect(),
            )),
            AggregationMode::FirstValidMean => valid
                .first()
                .and_then(|(f, _)| f.mean())
                .map(AggregationResult::Scalar),
            AggregationMode::RawFrames => Some(AggregationResult::Frames(valid)),
        }
    }

    /// Like [`frames_for_pid`][Self::frames_for_pid], but takes the mode as a
    /// string (the shape configuration layers hand us).  An unknown mode is
    /// logged and degrades to "no data"; it never raises.
    pub fn frames_for_pid_named(
        &self,
        camera_indices: Option<&[usize]>,
        mode: &str,
    ) -> Option<AggregationResult> {
        match mode.parse::<AggregationMode>() {
            Ok(parsed) => self.frames_for_pid(camera_indices, parsed),
            Err(err) => {
                warn!(error = %err, "aggregation request ignored");
                None
            }
        }
    }

    /// Gather the latest (frame, header) pair from each selected streaming
    /// camera and keep only the valid (non-empty) ones, selection order
    /// preserved.
    fn valid_pairs(&self, camera_indices: Option<&[usize]>) -> Vec<(Frame, FrameHeader)> {
        let active = self.bank.streaming();

        let selected: Vec<Option<(Frame, FrameHeader)>> = match camera_indices {
            Some(indices) => indices
                .iter()
                .filter_map(|&i| match active.get(i) {
                    Some(camera) => Some(camera.latest_frame()),
                    None => {
                        debug!(index = i, active = active.len(), "camera index out of range; skipped");
                        None
                    }
                })
                .collect(),
            None => active.iter().map(|camera| camera.latest_frame()).collect(),
        };

        selected
            .into_iter()
            .flatten()
            .filter(|(frame, _)| !frame.is_empty())
            .collect()
    }
}

/// Mean of a slice, `None` when it is empty.
fn mean_of(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f32>() / values.len() as f32)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

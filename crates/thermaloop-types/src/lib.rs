//! `thermaloop-types` – Shared Data Model
//!
//! Foundation crate for the workspace: thermal frames, their headers, and the
//! shared error type.  Every other crate depends on this one; this one depends
//! on nothing in the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single thermal image: a row-major `rows × cols` grid of temperature
/// samples in degrees Celsius.
///
/// A frame is *valid* for aggregation purposes only when it contains at least
/// one sample.  Cameras that have nothing to report hand out `None` instead of
/// an empty frame, but an empty frame is tolerated and treated the same way:
/// silently excluded, never counted as a zero reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Frame {
    /// Build a frame from row-major sample data.
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::FrameDimensionMismatch`] when `data.len()` does
    /// not equal `rows * cols`.  This is a programmer-contract violation, not
    /// a data-availability problem.
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, ThermalError> {
        if data.len() != rows * cols {
            return Err(ThermalError::FrameDimensionMismatch {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Build a frame from a list of equal-length rows.
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::FrameDimensionMismatch`] when the rows have
    /// differing lengths.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, ThermalError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let data: Vec<f32> = rows.into_iter().flatten().collect();
        Self::new(n_rows, n_cols, data)
    }

    /// Number of rows in the grid.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns in the grid.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Raw row-major sample data.
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// `true` when the frame holds no samples at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Arithmetic mean of all samples, or `None` for an empty frame.
    pub fn mean(&self) -> Option<f32> {
        if self.data.is_empty() {
            return None;
        }
        let sum: f32 = self.data.iter().sum();
        Some(sum / self.data.len() as f32)
    }

    /// Largest sample in the frame, or `None` for an empty frame.
    pub fn max(&self) -> Option<f32> {
        self.data.iter().copied().reduce(f32::max)
    }
}

/// Metadata paired with every [`Frame`].
///
/// The aggregator treats headers as opaque: they travel with their frame and
/// are only ever inspected by display or export layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameHeader {
    /// Monotonically increasing per-camera frame counter.
    pub frame_counter: u64,
    /// Stable identifier of the producing camera, e.g. `"cam0"`.
    pub source_id: String,
    /// Wall-clock capture time.
    pub captured_at: DateTime<Utc>,
}

/// Workspace-wide error type.
///
/// Errors are reserved for contract violations and driver faults.  Missing or
/// stale camera data is *not* an error anywhere in this workspace; it is
/// represented as an absent value (`Option::None`).
#[derive(Error, Debug)]
pub enum ThermalError {
    #[error("frame dimension mismatch: {rows}x{cols} grid cannot hold {len} samples")]
    FrameDimensionMismatch { rows: usize, cols: usize, len: usize },

    #[error("unknown aggregation mode '{0}'")]
    UnknownAggregationMode(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("hardware fault on {component}: {details}")]
    HardwareFault { component: String, details: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_mean_and_max() {
        let frame = Frame::from_rows(vec![vec![10.0, 20.0], vec![30.0, 40.0]]).unwrap();
        assert_eq!(frame.rows(), 2);
        assert_eq!(frame.cols(), 2);
        assert!((frame.mean().unwrap() - 25.0).abs() < 1e-6);
        assert!((frame.max().unwrap() - 40.0).abs() < 1e-6);
    }

    #[test]
    fn empty_frame_has_no_statistics() {
        let frame = Frame::new(0, 0, vec![]).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.mean(), None);
        assert_eq!(frame.max(), None);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let result = Frame::new(2, 2, vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            result,
            Err(ThermalError::FrameDimensionMismatch { rows: 2, cols: 2, len: 3 })
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let result = Frame::from_rows(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(ThermalError::FrameDimensionMismatch { .. })));
    }

    #[test]
    fn max_handles_negative_temperatures() {
        let frame = Frame::from_rows(vec![vec![-40.0, -12.5], vec![-30.0, -99.0]]).unwrap();
        assert!((frame.max().unwrap() - (-12.5)).abs() < 1e-6);
    }

    #[test]
    fn frame_serialization_roundtrip() {
        let frame = Frame::from_rows(vec![vec![21.5, 22.0]]).unwrap();
        let json = serde_json::to_string(&frame).unwrap();
        let back: Frame = serde_json::from_str(&json).unwrap();
        assert_eq!(frame, back);
    }

    #[test]
    fn header_serialization_roundtrip() {
        let header = FrameHeader {
            frame_counter: 42,
            source_id: "cam0".to_string(),
            captured_at: Utc::now(),
        };
        let json = serde_json::to_string(&header).unwrap();
        let back: FrameHeader = serde_json::from_str(&json).unwrap();
        assert_eq!(header, back);
    }

    #[test]
    fn thermal_error_display() {
        let err = ThermalError::UnknownAggregationMode("median".to_string());
        assert!(err.to_string().contains("median"));

        let err2 = ThermalError::HardwareFault {
            component: "siggen".to_string(),
            details: "port closed".to_string(),
        };
        assert!(err2.to_string().contains("siggen"));
    }
}

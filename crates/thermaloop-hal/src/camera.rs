//! Generic `ThermalCamera` trait for thermal-imaging hardware.

use thermaloop_types::{Frame, FrameHeader};

/// A thermal camera backend.
///
/// Drivers implement this trait and are collected in a
/// [`CameraBank`][crate::bank::CameraBank].  The contract is deliberately
/// narrow: a camera hands out its most recent frame/header pair, or `None`
/// when it has nothing usable this cycle.  Acquisition (serial reads, frame
/// assembly) happens on the driver's own thread; `latest_frame` must never
/// block the control tick.
pub trait ThermalCamera: Send + Sync {
    /// Stable identifier for this camera, e.g. `"cam0"`.
    fn id(&self) -> &str;

    /// `true` while the camera is connected and delivering frames.
    /// Non-streaming cameras are skipped by the bank's selection helpers.
    fn is_streaming(&self) -> bool;

    /// Return the most recently acquired frame and its header, or `None`
    /// when no reading is available.  Must not block.
    fn latest_frame(&self) -> Option<(Frame, FrameHeader)>;
}

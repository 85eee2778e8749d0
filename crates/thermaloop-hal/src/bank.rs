//! [`CameraBank`] – the ordered camera-source collection.
//!
//! The bank holds every registered [`ThermalCamera`] driver in a stable
//! order, so camera index 0 in the operator's selection always refers to the
//! same physical device for the lifetime of the session.  Aggregation code
//! borrows the bank read-only; connecting, reconnecting, and tearing down
//! cameras is the acquisition layer's job, outside the tick path.

use tracing::info;

use crate::camera::ThermalCamera;

/// Ordered, indexable collection of camera drivers.
#[derive(Default)]
pub struct CameraBank {
    cameras: Vec<Box<dyn ThermalCamera>>,
}

impl CameraBank {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a camera driver.  Cameras keep their insertion order; the
    /// position returned by [`len`][Self::len] before this call is the new
    /// camera's stable index.
    pub fn add_camera(&mut self, camera: Box<dyn ThermalCamera>) {
        info!(camera = camera.id(), index = self.cameras.len(), "camera registered");
        self.cameras.push(camera);
    }

    /// Number of registered cameras, streaming or not.
    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    /// `true` when no cameras are registered.
    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// The camera at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&dyn ThermalCamera> {
        self.cameras.get(index).map(AsRef::as_ref)
    }

    /// The currently streaming cameras, in bank order.
    ///
    /// Selection and aggregation operate over this view, mirroring the
    /// acquisition layer's notion of "active" devices.
    pub fn streaming(&self) -> Vec<&dyn ThermalCamera> {
        self.cameras
            .iter()
            .map(AsRef::as_ref)
            .filter(|c| c.is_streaming())
            .collect()
    }
}

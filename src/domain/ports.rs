//! Domain Ports - Core types and trait definitions for the classifier
//!
//! These define the boundary between the classification logic and the
//! device manager that calls it.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// Device Info
// =============================================================================

/// Type tag of a block (buffered) special file, as in mknod(1)
pub const BLOCK_DEVICE_TYPE: &str = "b";

/// Generic host device descriptor supplied by the device manager.
///
/// Only `dev_type` is consumed here; the rest travels with the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device path on the host
    pub host_path: String,
    /// Device path inside the container
    pub container_path: String,
    /// Type of device: c, b, u or p
    pub dev_type: String,
    /// Major number
    pub major: i64,
    /// Minor number
    pub minor: i64,
    /// Driver-specific options
    pub driver_options: HashMap<String, String>,
}

impl DeviceInfo {
    /// Create a descriptor for a host path with the given type tag
    pub fn new(host_path: impl Into<String>, dev_type: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            dev_type: dev_type.into(),
            ..Default::default()
        }
    }

    /// Check if the descriptor names a block device
    pub fn is_block(&self) -> bool {
        is_block_device(self)
    }
}

/// Check if the device is a block device.
pub fn is_block_device(info: &DeviceInfo) -> bool {
    info.dev_type == BLOCK_DEVICE_TYPE
}

// =============================================================================
// Display Detector Port
// =============================================================================

/// Port for display-controller detection on passthrough groups
pub trait DisplayDetector: Send + Sync {
    /// Check whether a host path names an isolation group
    fn is_group_path(&self, path: &Path) -> bool;

    /// Resolve whether the group behind `path` holds a display controller.
    ///
    /// `Ok(false)` means definitively no (or not a group at all); an `Err`
    /// means no member could be classified.
    fn has_display_controller(&self, path: &Path) -> Result<bool>;
}

pub type DisplayDetectorRef = Arc<dyn DisplayDetector>;

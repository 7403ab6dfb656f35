//! VFIO Classifier - Host device classification for passthrough
//!
//! Decides whether a host device path names a VFIO group and, if it does,
//! whether the IOMMU group behind it carries a display controller. Container
//! and VM runtimes use the answer to pick a passthrough policy for the group.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                              Device Manager                                  │
//! └──────────────────────────────────┬──────────────────────────────────────────┘
//!                                    │  host path (/dev/vfio/<group>)
//! ┌──────────────────────────────────┴──────────────────────────────────────────┐
//! │  ┌─────────────────────────┐        ┌─────────────────────────────────────┐ │
//! │  │  Group Path Classifier  │  yes   │          Group Inspector            │ │
//! │  │  (pure, no I/O)         ├───────►│  /sys/kernel/iommu_groups/<id>/     │ │
//! │  └─────────────────────────┘        │      devices/<member>/class         │ │
//! │                                     └──────────────────┬──────────────────┘ │
//! │                                                        │                    │
//! │                     ┌──────────────────────────────────┴─────────────────┐  │
//! │                     │  Member Classification                             │  │
//! │                     │  pci address │ mdev uuid │ malformed │ unknown     │  │
//! │                     └────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`hardware`]: Configuration, group discovery, and member classification
//! - [`domain`]: Device descriptor and detector port
//! - [`error`]: Error types and handling

pub mod domain;
pub mod error;
pub mod hardware;

// Re-export commonly used types
pub use domain::ports::{
    is_block_device, DeviceInfo, DisplayDetector, DisplayDetectorRef, BLOCK_DEVICE_TYPE,
};

pub use error::{Error, Result};

pub use hardware::{
    classify_member, is_vfio_group_path, ClassCode, ClassifierConfig, GroupInspector,
    GroupPathClassifier, GroupReport, MemberId, MemberKind, MemberReport, PciAddress,
    ScanPolicy,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

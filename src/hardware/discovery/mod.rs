//! Hardware Discovery Module
//!
//! Recognises VFIO group nodes and enumerates the IOMMU groups behind them.

pub mod group_path;
pub mod inspector;

pub use group_path::*;
pub use inspector::*;

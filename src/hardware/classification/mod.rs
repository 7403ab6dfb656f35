//! Hardware Classification Module
//!
//! Classifies IOMMU group members by identifier shape and PCI class code.

pub mod class_code;
pub mod member_id;

pub use class_code::*;
pub use member_id::*;

//! Domain layer - Core types and port definitions
//!
//! This module defines the device descriptor consumed from the device
//! manager and the detector port the classifier exposes to it.

pub mod ports;

pub use ports::*;

//! Hardware Module
//!
//! Provides configuration, group discovery, and member classification for
//! VFIO passthrough devices.

pub mod config;
pub mod discovery;
pub mod classification;

pub use config::*;
pub use discovery::*;
pub use classification::*;

//! Classifier Configuration
//!
//! Filesystem roots and class-code constants used by the group path
//! classifier and the group inspector. Everything is injectable so tests can
//! point the classifier at a fake devfs/sysfs tree.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

// =============================================================================
// Constants
// =============================================================================

/// Root of the VFIO group device nodes
pub const VFIO_DEV_PATH: &str = "/dev/vfio";

/// Name of the group-independent VFIO container device under the root
pub const VFIO_CONTROL_DEVICE: &str = "vfio";

/// Root of the IOMMU group topology in sysfs
pub const IOMMU_GROUPS_PATH: &str = "/sys/kernel/iommu_groups";

/// PCI base class prefix for display controllers
pub const PCI_CLASS_DISPLAY_CONTROLLER: &str = "0x03";

// =============================================================================
// Scan Policy
// =============================================================================

/// How member results are aggregated across an IOMMU group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPolicy {
    /// The first PCI member whose class code can be read decides the result
    #[default]
    FirstReadable,
    /// Any display-class member makes the group a display group
    AnyDisplay,
}

impl std::fmt::Display for ScanPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanPolicy::FirstReadable => write!(f, "first_readable"),
            ScanPolicy::AnyDisplay => write!(f, "any_display"),
        }
    }
}

// =============================================================================
// Classifier Configuration
// =============================================================================

/// Configuration shared by the path classifier and the group inspector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Root under which VFIO group nodes live
    pub vfio_root: PathBuf,
    /// Control device name directly under `vfio_root`
    pub control_device: String,
    /// Sysfs IOMMU group topology root
    pub iommu_groups_root: PathBuf,
    /// Class code prefix identifying display controllers
    pub display_class_prefix: String,
    /// Member aggregation policy
    pub scan_policy: ScanPolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            vfio_root: PathBuf::from(VFIO_DEV_PATH),
            control_device: VFIO_CONTROL_DEVICE.to_string(),
            iommu_groups_root: PathBuf::from(IOMMU_GROUPS_PATH),
            display_class_prefix: PCI_CLASS_DISPLAY_CONTROLLER.to_string(),
            scan_policy: ScanPolicy::default(),
        }
    }
}

impl ClassifierConfig {
    /// Build a configuration rooted at a fake host tree.
    ///
    /// Lays out `<root>/dev/vfio` and `<root>/sys/kernel/iommu_groups`.
    pub fn with_host_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            vfio_root: root.join("dev/vfio"),
            iommu_groups_root: root.join("sys/kernel/iommu_groups"),
            ..Default::default()
        }
    }

    /// Load a configuration from a YAML file.
    ///
    /// Missing keys fall back to their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;

        debug!(path = %path.display(), ?config, "Loaded classifier configuration");
        Ok(config)
    }

    /// Path of the reserved control device
    pub fn control_device_path(&self) -> PathBuf {
        self.vfio_root.join(&self.control_device)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.vfio_root.as_os_str().is_empty() {
            return Err(Error::Configuration("vfio_root must not be empty".into()));
        }
        if self.iommu_groups_root.as_os_str().is_empty() {
            return Err(Error::Configuration(
                "iommu_groups_root must not be empty".into(),
            ));
        }
        if self.control_device.is_empty() || self.control_device.contains('/') {
            return Err(Error::Configuration(format!(
                "control_device must be a single path segment, got {:?}",
                self.control_device
            )));
        }
        if self.display_class_prefix.is_empty() {
            return Err(Error::Configuration(
                "display_class_prefix must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = ClassifierConfig::default();

        assert_eq!(config.vfio_root, PathBuf::from("/dev/vfio"));
        assert_eq!(config.control_device_path(), PathBuf::from("/dev/vfio/vfio"));
        assert_eq!(config.iommu_groups_root, PathBuf::from("/sys/kernel/iommu_groups"));
        assert_eq!(config.display_class_prefix, "0x03");
        assert_eq!(config.scan_policy, ScanPolicy::FirstReadable);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("classifier.yaml");
        fs::write(
            &path,
            "iommu_groups_root: /tmp/groups\nscan_policy: any_display\n",
        )
        .unwrap();

        let config = ClassifierConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.iommu_groups_root, PathBuf::from("/tmp/groups"));
        assert_eq!(config.scan_policy, ScanPolicy::AnyDisplay);
        assert_eq!(config.vfio_root, PathBuf::from("/dev/vfio"));
    }

    #[test]
    fn test_yaml_invalid_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("classifier.yaml");
        fs::write(&path, "control_device: a/b\n").unwrap();

        assert_matches!(
            ClassifierConfig::from_yaml_file(&path),
            Err(Error::Configuration(_))
        );

        assert_matches!(
            ClassifierConfig::from_yaml_file(tmp.path().join("missing.yaml")),
            Err(Error::Configuration(_))
        );
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        let config = ClassifierConfig {
            display_class_prefix: String::new(),
            ..Default::default()
        };
        assert_matches!(config.validate(), Err(Error::Configuration(_)));
    }
}

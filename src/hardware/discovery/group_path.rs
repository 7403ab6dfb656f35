//! VFIO Group Path Classification
//!
//! Decides whether a host device path names a VFIO group node. No I/O is
//! performed.

use crate::hardware::config::ClassifierConfig;
use std::path::{Component, Path, PathBuf};

/// Classifies host paths against the VFIO group root
#[derive(Debug, Clone)]
pub struct GroupPathClassifier {
    vfio_root: PathBuf,
    control_device: PathBuf,
}

impl GroupPathClassifier {
    /// Create a classifier from the shared configuration
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            vfio_root: config.vfio_root.clone(),
            control_device: PathBuf::from(&config.control_device),
        }
    }

    /// Check if `path` is a VFIO group node.
    ///
    /// The path must lie strictly below the root, matched on whole
    /// components, must not climb back out with `..`, and must not be the
    /// control device.
    pub fn is_group_path(&self, path: impl AsRef<Path>) -> bool {
        match path.as_ref().strip_prefix(&self.vfio_root) {
            Ok(rest) => {
                !rest.as_os_str().is_empty()
                    && rest != self.control_device
                    && rest.components().all(|c| matches!(c, Component::Normal(_)))
            }
            Err(_) => false,
        }
    }

    /// IOMMU group id named by a group path (its last segment)
    pub fn group_id<'a>(&self, path: &'a Path) -> Option<&'a str> {
        if !self.is_group_path(path) {
            return None;
        }
        path.file_name().and_then(|n| n.to_str())
    }

    /// Root of the VFIO group nodes
    pub fn vfio_root(&self) -> &Path {
        &self.vfio_root
    }
}

impl Default for GroupPathClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

/// Check if the path is a VFIO group under the default `/dev/vfio` root.
pub fn is_vfio_group_path(path: impl AsRef<Path>) -> bool {
    GroupPathClassifier::default().is_group_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_paths() {
        assert!(is_vfio_group_path("/dev/vfio/1"));
        assert!(is_vfio_group_path("/dev/vfio/42"));
        assert!(is_vfio_group_path("/dev/vfio/vfio0"));
        assert!(is_vfio_group_path("/dev/vfio/noiommu-0"));
    }

    #[test]
    fn test_root_and_control_device_excluded() {
        assert!(!is_vfio_group_path("/dev/vfio"));
        assert!(!is_vfio_group_path("/dev/vfio/"));
        assert!(!is_vfio_group_path("/dev/vfio/vfio"));
        assert!(!is_vfio_group_path("/dev/vfio/vfio/"));
    }

    #[test]
    fn test_paths_outside_root() {
        assert!(!is_vfio_group_path("/dev/sda"));
        assert!(!is_vfio_group_path("/dev/vfiox/1"));
        assert!(!is_vfio_group_path("/dev/vfio1"));
        assert!(!is_vfio_group_path("dev/vfio/1"));
        assert!(!is_vfio_group_path(""));
    }

    #[test]
    fn test_parent_dir_components_rejected() {
        let classifier = GroupPathClassifier::default();

        assert!(!is_vfio_group_path("/dev/vfio/.."));
        assert!(!is_vfio_group_path("/dev/vfio/../vfio/1"));
        assert!(!is_vfio_group_path("/dev/vfio/1/.."));
        assert_eq!(classifier.group_id(Path::new("/dev/vfio/..")), None);
    }

    #[test]
    fn test_group_id() {
        let classifier = GroupPathClassifier::default();

        assert_eq!(classifier.group_id(Path::new("/dev/vfio/12")), Some("12"));
        assert_eq!(classifier.group_id(Path::new("/dev/vfio/12/")), Some("12"));
        assert_eq!(classifier.group_id(Path::new("/dev/vfio/vfio")), None);
        assert_eq!(classifier.group_id(Path::new("/dev/sda")), None);
    }

    #[test]
    fn test_custom_root() {
        let config = ClassifierConfig {
            vfio_root: PathBuf::from("/run/test/vfio"),
            control_device: "ctl".to_string(),
            ..Default::default()
        };
        let classifier = GroupPathClassifier::new(&config);

        assert!(classifier.is_group_path("/run/test/vfio/3"));
        assert!(classifier.is_group_path("/run/test/vfio/vfio"));
        assert!(!classifier.is_group_path("/run/test/vfio/ctl"));
        assert!(!classifier.is_group_path("/dev/vfio/3"));
    }
}

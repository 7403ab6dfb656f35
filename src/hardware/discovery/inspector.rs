//! IOMMU Group Inspector
//!
//! Enumerates the members of an IOMMU group from sysfs and resolves whether
//! the group carries a display controller.
//!
//! Members are visited in ascending name order. Under the default
//! [`ScanPolicy::FirstReadable`] the first PCI member whose class code can be
//! read decides the result and later members are never looked at; failures
//! on earlier members are recorded and skipped.

use crate::domain::ports::DisplayDetector;
use crate::error::{Error, Result};
use crate::hardware::classification::{ClassCode, MemberId, MemberKind};
use crate::hardware::config::{ClassifierConfig, ScanPolicy};
use crate::hardware::discovery::group_path::GroupPathClassifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DEVICES_DIR: &str = "devices";

// =============================================================================
// Reports
// =============================================================================

/// Classification of a single group member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberReport {
    /// Member name as listed in sysfs
    pub name: String,
    /// Inferred member kind
    pub kind: MemberKind,
    /// Class code, when it could be read
    pub class_code: Option<String>,
    /// Whether the class code marks a display controller
    pub display_controller: bool,
    /// Why the member could not be classified
    pub error: Option<String>,
}

/// Classification of every member of an IOMMU group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupReport {
    /// IOMMU group id
    pub group_id: String,
    /// Group device node
    pub host_path: PathBuf,
    /// Sysfs member directory
    pub devices_path: PathBuf,
    /// Members in scan order
    pub members: Vec<MemberReport>,
    /// Any member is a display controller
    pub has_display_controller: bool,
    /// Inspection timestamp
    pub inspected_at: DateTime<Utc>,
}

impl GroupReport {
    /// Members that could not be classified
    pub fn failed_members(&self) -> impl Iterator<Item = &MemberReport> {
        self.members.iter().filter(|m| m.error.is_some())
    }
}

// =============================================================================
// Group Inspector
// =============================================================================

/// Inspects IOMMU groups behind VFIO group paths
#[derive(Debug, Clone)]
pub struct GroupInspector {
    config: ClassifierConfig,
    paths: GroupPathClassifier,
}

impl GroupInspector {
    /// Create a new inspector
    pub fn new(config: ClassifierConfig) -> Self {
        let paths = GroupPathClassifier::new(&config);
        Self { config, paths }
    }

    /// Create an inspector for the real host paths
    pub fn default_inspector() -> Self {
        Self::new(ClassifierConfig::default())
    }

    /// Active configuration
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Check if `path` is a VFIO group node
    pub fn is_group_path(&self, path: impl AsRef<Path>) -> bool {
        self.paths.is_group_path(path)
    }

    /// Sysfs member directory for a group path
    pub fn devices_path(&self, path: &Path) -> Result<PathBuf> {
        let group_id = self.paths.group_id(path).ok_or_else(|| Error::InvalidGroupPath {
            path: path.to_path_buf(),
        })?;
        Ok(self.config.iommu_groups_root.join(group_id).join(DEVICES_DIR))
    }

    /// Resolve whether the group behind `path` holds a display controller.
    ///
    /// Returns `Ok(false)` for paths that are not VFIO groups. Failing to
    /// list the group is returned immediately. Member failures are recorded
    /// and only the last one is returned, and only when no member settled
    /// the answer.
    pub fn has_display_controller(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        if !self.is_group_path(path) {
            return Ok(false);
        }

        let devices_path = self.devices_path(path)?;
        let members = list_members(&devices_path)?;

        let mut last_error: Option<Error> = None;
        for raw in members {
            let member = member_id(&raw);
            let member_path = devices_path.join(&raw);

            let class = match resolve_class(&member, &member_path) {
                Ok(class) => class,
                Err(e) => {
                    warn!(member = %member_path.display(), error = %e, "Skipping IOMMU group member");
                    last_error = Some(e);
                    continue;
                }
            };

            let is_display = class.has_prefix(&self.config.display_class_prefix);
            debug!(
                member = %member_path.display(),
                class = %class,
                is_display,
                "Resolved PCI class code"
            );

            match self.config.scan_policy {
                ScanPolicy::FirstReadable => return Ok(is_display),
                ScanPolicy::AnyDisplay if is_display => return Ok(true),
                ScanPolicy::AnyDisplay => {}
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(false),
        }
    }

    /// Classify every member of the group behind `path`
    pub fn inspect(&self, path: impl AsRef<Path>) -> Result<GroupReport> {
        let path = path.as_ref();
        let devices_path = self.devices_path(path)?;
        let group_id = self
            .paths
            .group_id(path)
            .map(str::to_string)
            .unwrap_or_default();

        let members: Vec<MemberReport> = list_members(&devices_path)?
            .into_iter()
            .map(|raw| {
                let member = member_id(&raw);
                let member_path = devices_path.join(&raw);
                let name = member.name().to_string();
                match resolve_class(&member, &member_path) {
                    Ok(class) => MemberReport {
                        display_controller: class.has_prefix(&self.config.display_class_prefix),
                        class_code: Some(class.as_str().to_string()),
                        error: None,
                        kind: member.kind(),
                        name,
                    },
                    Err(e) => MemberReport {
                        display_controller: false,
                        class_code: None,
                        error: Some(e.to_string()),
                        kind: member.kind(),
                        name,
                    },
                }
            })
            .collect();

        let has_display_controller = members.iter().any(|m| m.display_controller);

        info!(
            group = %group_id,
            members = members.len(),
            has_display_controller,
            "Inspected IOMMU group"
        );

        Ok(GroupReport {
            group_id,
            host_path: path.to_path_buf(),
            devices_path,
            members,
            has_display_controller,
            inspected_at: Utc::now(),
        })
    }

    /// List the VFIO group nodes under the root, control device excluded.
    ///
    /// Numeric group ids sort first, in numeric order.
    pub fn list_groups(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.paths.vfio_root().join("*");
        let mut groups: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
            .filter_map(|entry| match entry {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!(path = %e.path().display(), error = %e.error(), "Skipping unreadable VFIO node");
                    None
                }
            })
            .filter(|p| self.is_group_path(p))
            .collect();

        groups.sort_by_key(|p| {
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let id: Option<u64> = name.parse().ok();
            (id.is_none(), id.unwrap_or(0), name)
        });

        debug!(root = %self.paths.vfio_root().display(), groups = groups.len(), "Listed VFIO groups");
        Ok(groups)
    }
}

impl Default for GroupInspector {
    fn default() -> Self {
        Self::default_inspector()
    }
}

impl DisplayDetector for GroupInspector {
    fn is_group_path(&self, path: &Path) -> bool {
        GroupInspector::is_group_path(self, path)
    }

    fn has_display_controller(&self, path: &Path) -> Result<bool> {
        GroupInspector::has_display_controller(self, path)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// List raw member names of a group, sorted by name
fn list_members(devices_path: &Path) -> Result<Vec<OsString>> {
    let listing_error = |source: std::io::Error| Error::GroupListing {
        path: devices_path.to_path_buf(),
        source,
    };

    let mut members = Vec::new();
    for entry in fs::read_dir(devices_path).map_err(listing_error)? {
        let entry = entry.map_err(listing_error)?;
        members.push(entry.file_name());
    }
    members.sort();

    debug!(path = %devices_path.display(), members = ?members, "Read IOMMU group");
    Ok(members)
}

/// Classify a raw member name; names that are not UTF-8 have no known shape
fn member_id(raw: &OsStr) -> MemberId {
    match raw.to_str() {
        Some(name) => MemberId::parse(name),
        None => MemberId::Unknown {
            name: raw.to_string_lossy().into_owned(),
        },
    }
}

/// Resolve the class code of one member
fn resolve_class(member: &MemberId, member_path: &Path) -> Result<ClassCode> {
    match member {
        MemberId::Pci { .. } => ClassCode::read(member_path).map_err(|source| Error::ClassCodeRead {
            path: member_path.to_path_buf(),
            source,
        }),
        MemberId::Mediated { .. } => Err(Error::MediatedUnsupported {
            path: member_path.to_path_buf(),
        }),
        MemberId::Malformed { reason, .. } => Err(Error::MalformedIdentifier {
            path: member_path.to_path_buf(),
            reason: reason.clone(),
        }),
        MemberId::Unknown { .. } => Err(Error::UnrecognizedIdentifier {
            path: member_path.to_path_buf(),
        }),
    }
}

//! IOMMU Group Member Identifiers
//!
//! Sysfs exposes no type field for the entries under
//! `iommu_groups/<id>/devices`, so a member's kind is inferred from the shape
//! of its name.
//!
//! # Grammar
//!
//! ```text
//! pci-address := domain ":" bus ":" device "." function
//! domain      := 4*8HEXDIG            ; kernel prints %04x, wider on VMD
//! bus         := 2HEXDIG
//! device      := 2HEXDIG              ; 00-1f
//! function    := %x30-37              ; 0-7
//!
//! mdev-uuid   := 8HEXDIG "-" 4HEXDIG "-" 4HEXDIG "-" 4HEXDIG "-" 12HEXDIG
//! ```
//!
//! A name that splits into exactly three `:` segments has the PCI shape;
//! failing that, a name that splits into exactly five `-` segments has the
//! UUID shape. A shaped name that does not satisfy its grammar is
//! [`MemberId::Malformed`]; a name with neither shape is [`MemberId::Unknown`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// PCI address format: 0000:01:00.0
static PCI_ADDRESS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9a-fA-F]{4,8}):([0-9a-fA-F]{2}):([0-9a-fA-F]{2})\.([0-7])$")
        .expect("Invalid PCI address regex")
});

/// Mediated device UUID format: 8-4-4-4-12 hex digits
static MDEV_UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .expect("Invalid mediated device UUID regex")
});

const MAX_PCI_DEVICE: u8 = 0x1f;

// =============================================================================
// Member Kind
// =============================================================================

/// Kind of an IOMMU group member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    /// Physical PCI function addressed by domain:bus:device.function
    NormalPci,
    /// Mediated device identified by UUID
    Mediated,
    /// Has a known shape but violates its grammar
    Malformed,
    /// Neither shape
    Unknown,
}

impl std::fmt::Display for MemberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberKind::NormalPci => write!(f, "pci"),
            MemberKind::Mediated => write!(f, "mdev"),
            MemberKind::Malformed => write!(f, "malformed"),
            MemberKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Identifier shape recognised by delimiter count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdShape {
    PciAddress,
    Uuid,
}

impl IdShape {
    /// Detect the shape of a raw member name
    pub fn detect(name: &str) -> Option<Self> {
        if name.split(':').count() == 3 {
            Some(IdShape::PciAddress)
        } else if name.split('-').count() == 5 {
            Some(IdShape::Uuid)
        } else {
            None
        }
    }
}

// =============================================================================
// PCI Address
// =============================================================================

/// Parsed PCI function address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PciAddress {
    pub domain: u32,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl std::fmt::Display for PciAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}

impl std::str::FromStr for PciAddress {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let caps = PCI_ADDRESS_REGEX.captures(s).ok_or_else(|| {
            "expected domain:bus:device.function (e.g. 0000:01:00.0)".to_string()
        })?;

        // The regex pins every field to hex digits of bounded width.
        let field = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();
        let domain = u32::from_str_radix(field(1), 16).map_err(|e| e.to_string())?;
        let bus = u8::from_str_radix(field(2), 16).map_err(|e| e.to_string())?;
        let device = u8::from_str_radix(field(3), 16).map_err(|e| e.to_string())?;
        let function = u8::from_str_radix(field(4), 16).map_err(|e| e.to_string())?;

        if device > MAX_PCI_DEVICE {
            return Err(format!(
                "device number {:#04x} out of range (max {:#04x})",
                device, MAX_PCI_DEVICE
            ));
        }

        Ok(Self { domain, bus, device, function })
    }
}

// =============================================================================
// Member Identifier
// =============================================================================

/// Classified IOMMU group member name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberId {
    Pci { name: String, address: PciAddress },
    Mediated { name: String },
    Malformed { name: String, shape: IdShape, reason: String },
    Unknown { name: String },
}

impl MemberId {
    /// Classify a member name.
    ///
    /// Pure: the same name always yields the same identifier.
    pub fn parse(name: &str) -> Self {
        let name_owned = name.to_string();
        match IdShape::detect(name) {
            Some(IdShape::PciAddress) => match name.parse::<PciAddress>() {
                Ok(address) => MemberId::Pci { name: name_owned, address },
                Err(reason) => MemberId::Malformed {
                    name: name_owned,
                    shape: IdShape::PciAddress,
                    reason,
                },
            },
            Some(IdShape::Uuid) => {
                if MDEV_UUID_REGEX.is_match(name) {
                    MemberId::Mediated { name: name_owned }
                } else {
                    MemberId::Malformed {
                        name: name_owned,
                        shape: IdShape::Uuid,
                        reason: "expected 8-4-4-4-12 hex digit UUID".to_string(),
                    }
                }
            }
            None => MemberId::Unknown { name: name_owned },
        }
    }

    /// Raw member name as listed in sysfs
    pub fn name(&self) -> &str {
        match self {
            MemberId::Pci { name, .. }
            | MemberId::Mediated { name }
            | MemberId::Malformed { name, .. }
            | MemberId::Unknown { name } => name,
        }
    }

    /// Kind of this member
    pub fn kind(&self) -> MemberKind {
        match self {
            MemberId::Pci { .. } => MemberKind::NormalPci,
            MemberId::Mediated { .. } => MemberKind::Mediated,
            MemberId::Malformed { .. } => MemberKind::Malformed,
            MemberId::Unknown { .. } => MemberKind::Unknown,
        }
    }

    /// PCI address, for normal PCI members
    pub fn pci_address(&self) -> Option<PciAddress> {
        match self {
            MemberId::Pci { address, .. } => Some(*address),
            _ => None,
        }
    }
}

/// Classify a member name into its kind
pub fn classify_member(name: &str) -> MemberKind {
    MemberId::parse(name).kind()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pci_members() {
        let id = MemberId::parse("0000:03:00.0");
        assert_eq!(id.kind(), MemberKind::NormalPci);
        assert_eq!(
            id.pci_address(),
            Some(PciAddress { domain: 0, bus: 3, device: 0, function: 0 })
        );
        assert_eq!(id.name(), "0000:03:00.0");

        assert_eq!(classify_member("0000:ff:1f.7"), MemberKind::NormalPci);
        assert_eq!(classify_member("ABCD:12:1a.5"), MemberKind::NormalPci);
    }

    #[test]
    fn test_wide_pci_domain() {
        let id = MemberId::parse("10000:e1:00.0");
        assert_eq!(id.kind(), MemberKind::NormalPci);
        assert_eq!(
            id.pci_address(),
            Some(PciAddress { domain: 0x10000, bus: 0xe1, device: 0, function: 0 })
        );
        assert_eq!(id.pci_address().unwrap().to_string(), "10000:e1:00.0");

        assert_eq!(classify_member("ffffffff:00:01.0"), MemberKind::NormalPci);
        assert_eq!(classify_member("100000000:00:01.0"), MemberKind::Malformed);
        assert_eq!(classify_member("000:00:01.0"), MemberKind::Malformed);
    }

    #[test]
    fn test_mediated_members() {
        let id = MemberId::parse("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee");
        assert_eq!(id.kind(), MemberKind::Mediated);
        assert_eq!(id.pci_address(), None);

        assert_eq!(
            classify_member("83b8f4f2-509f-382f-3c1e-e6bfe0fa1001"),
            MemberKind::Mediated
        );
    }

    #[test]
    fn test_malformed_members() {
        // PCI shape, bad grammar
        assert_matches::assert_matches!(
            MemberId::parse("0000:03:00"),
            MemberId::Malformed { shape: IdShape::PciAddress, .. }
        );
        assert_eq!(classify_member("0000:03:00.8"), MemberKind::Malformed);
        assert_eq!(classify_member("0000:03:20.0"), MemberKind::Malformed);
        assert_eq!(classify_member("zzzz:03:00.0"), MemberKind::Malformed);

        // UUID shape, bad grammar
        assert_matches::assert_matches!(
            MemberId::parse("a-b-c-d-e"),
            MemberId::Malformed { shape: IdShape::Uuid, .. }
        );
    }

    #[test]
    fn test_unknown_members() {
        assert_eq!(classify_member("bogus"), MemberKind::Unknown);
        assert_eq!(classify_member("03:00.0"), MemberKind::Unknown);
        assert_eq!(classify_member("a-b-c"), MemberKind::Unknown);
        assert_eq!(classify_member(""), MemberKind::Unknown);
    }

    #[test]
    fn test_colon_shape_takes_precedence() {
        // Three colon segments win even if hyphens are present.
        assert_eq!(classify_member("a-b:c-d:e-f"), MemberKind::Malformed);
        assert_eq!(
            IdShape::detect("a-b:c-d:e-f"),
            Some(IdShape::PciAddress)
        );
    }

    #[test]
    fn test_classification_is_idempotent() {
        for name in [
            "0000:03:00.0",
            "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee",
            "0000:03:00",
            "bogus",
        ] {
            assert_eq!(MemberId::parse(name), MemberId::parse(name));
        }
    }

    #[test]
    fn test_pci_address_display() {
        let addr: PciAddress = "0000:0A:1F.3".parse().unwrap();
        assert_eq!(addr.to_string(), "0000:0a:1f.3");
    }
}

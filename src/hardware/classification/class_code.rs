//! PCI Class Codes
//!
//! Reads the sysfs `class` attribute of a PCI function. Only the first line
//! is meaningful; anything after it is discarded.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Sysfs attribute holding a PCI function's class code
pub const CLASS_ATTR: &str = "class";

/// Class code of a PCI function, e.g. `0x030000`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassCode(String);

impl ClassCode {
    /// Build a class code from raw attribute contents
    pub fn from_sysfs(contents: &str) -> Self {
        let first_line = contents.split('\n').next().unwrap_or_default();
        Self(first_line.to_string())
    }

    /// Read the class attribute of the PCI function at `device_path`
    pub fn read(device_path: &Path) -> io::Result<Self> {
        fs::read_to_string(device_path.join(CLASS_ATTR)).map(|s| Self::from_sysfs(&s))
    }

    /// Raw class code string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the class code against a class prefix such as `0x03`
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl std::fmt::Display for ClassCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_line_only() {
        let code = ClassCode::from_sysfs("0x030000\n");
        assert_eq!(code.as_str(), "0x030000");

        let code = ClassCode::from_sysfs("0x010802\n0x030000\n");
        assert_eq!(code.as_str(), "0x010802");
        assert!(!code.has_prefix("0x03"));

        assert_eq!(ClassCode::from_sysfs("").as_str(), "");
    }

    #[test]
    fn test_display_prefix() {
        assert!(ClassCode::from_sysfs("0x030000").has_prefix("0x03"));
        assert!(ClassCode::from_sysfs("0x030200").has_prefix("0x03"));
        assert!(ClassCode::from_sysfs("0x038000").has_prefix("0x03"));
        assert!(!ClassCode::from_sysfs("0x040300").has_prefix("0x03"));
        assert!(!ClassCode::from_sysfs(" 0x030000").has_prefix("0x03"));
    }

    #[test]
    fn test_read_from_device_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CLASS_ATTR), "0x030000\n").unwrap();

        let code = ClassCode::read(tmp.path()).unwrap();
        assert_eq!(code.to_string(), "0x030000");

        let missing = ClassCode::read(&tmp.path().join("absent"));
        assert_eq!(missing.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}

//! Hardware specification model
//!
//! The required/detected data shape covering CPU, memory, storage, network,
//! firmware, and enumerated bus-device inventories. The same [`HwSpec`]
//! shape is used twice per validation pass: the *required* instance is
//! authored externally per variant, the *detected* instance is populated
//! from live hardware and discarded after comparison.

mod fieldkey;

pub use fieldkey::FieldKey;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use gp_error::{GprovError, Result};
use serde::{Deserialize, Serialize};

use crate::constants::limits;

/// One main-storage disk
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiskSpec {
    /// Disk kind (e.g. "nvme", "sata-ssd", "sata-hdd", "virtio")
    pub kind: String,
    /// Capacity in MB; ignored when alternatives are normalized for matching
    pub size_mb: u64,
}

/// Recovery-media descriptor
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecoveryMedia {
    /// Media kind (e.g. "usb", "emmc", "sd")
    pub media: String,
    pub size_mb: u64,
}

/// Network-interface statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NicStats {
    /// Interfaces whose MAC carries the vendor prefix
    pub vendor_count: u32,
    /// All interfaces
    pub total_count: u32,
    /// Whether the vendor-prefixed MACs are sequential
    pub sequential: bool,
}

/// Firmware version fields
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FirmwareVersions {
    pub bios_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmc_version: Option<String>,
}

/// Hardware specification - identical shape for required and detected data.
///
/// `disks` is a list of *alternatives*: each inner list is one acceptable
/// main-storage configuration, and all alternatives must have the same disk
/// count. `dmi_fields` keys use the [`FieldKey`] syntax; keys prefixed with
/// an underscore are documentation only and excluded from detection and
/// comparison.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HwSpec {
    pub code_name: String,
    /// Newline-delimited, one entry per installed processor
    #[serde(default)]
    pub cpu_signature: String,
    #[serde(default)]
    pub memory_mb: u64,
    #[serde(default)]
    pub recovery: RecoveryMedia,
    #[serde(default)]
    pub disks: Vec<Vec<DiskSpec>>,
    #[serde(default)]
    pub nics: NicStats,
    #[serde(default)]
    pub firmware: FirmwareVersions,
    #[serde(default)]
    pub pci_devices: Vec<String>,
    #[serde(default)]
    pub usb_devices: Vec<String>,
    #[serde(default)]
    pub serial_regex: String,
    #[serde(default)]
    pub dmi_fields: BTreeMap<String, String>,
}

/// One named identity check derived from the `dmi_fields` map
#[derive(Debug, Clone, PartialEq)]
pub struct NamedCheck {
    /// Raw key text as authored, for mismatch reporting
    pub raw: String,
    pub key: FieldKey,
    pub expected: String,
}

impl HwSpec {
    /// Parse and validate a specification document
    pub fn load_str(doc: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(doc)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Load a specification document from disk
    pub fn load_file(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|source| GprovError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        if metadata.len() > limits::MAX_DOCUMENT_SIZE {
            return Err(GprovError::spec(format!(
                "specification document too large: {} bytes (max {})",
                metadata.len(),
                limits::MAX_DOCUMENT_SIZE
            )));
        }

        let content = fs::read_to_string(path).map_err(|source| GprovError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load_str(&content)
    }

    /// Validate the authoring invariants:
    /// equal disk counts across alternatives, parseable identity-field keys,
    /// and a compilable serial pattern.
    pub fn validate(&self) -> Result<()> {
        let counts: Vec<usize> = self.disks.iter().map(|alt| alt.len()).collect();
        if counts.windows(2).any(|pair| pair[0] != pair[1]) {
            return Err(GprovError::UnevenAlternatives { counts });
        }

        for key in self.dmi_fields.keys() {
            if key.starts_with('_') {
                continue;
            }
            FieldKey::parse(key)?;
        }

        if !self.serial_regex.is_empty() {
            regex::Regex::new(&self.serial_regex).map_err(|e| {
                GprovError::spec(format!("bad serial pattern {:?}: {}", self.serial_regex, e))
            })?;
        }

        Ok(())
    }

    /// The named identity checks to detect and compare.
    ///
    /// Underscore-prefixed keys are skipped. Only valid after
    /// [`HwSpec::validate`], which this re-checks by propagating parse
    /// errors.
    pub fn named_checks(&self) -> Result<Vec<NamedCheck>> {
        let mut checks = Vec::new();
        for (raw, expected) in &self.dmi_fields {
            if raw.starts_with('_') {
                continue;
            }
            checks.push(NamedCheck {
                raw: raw.clone(),
                key: FieldKey::parse(raw)?,
                expected: expected.clone(),
            });
        }
        Ok(checks)
    }

    /// Pretty JSON rendering for the diagnostic dump
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

//! Platform variant registry
//!
//! An ordered catalog of platform descriptors loaded from a JSON document.
//! Descriptors are immutable once loaded; lookup is first-match-wins over
//! document order, and duplicate code names are rejected at load time so
//! the scan can never resolve ambiguously.

use std::fs;
use std::path::Path;

use gp_error::{GprovError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::constants::{dmi, limits};

/// Override naming which table record and field supplies the SKU instead of
/// the default System Information `SKU Number:` field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkuSource {
    pub category: u8,
    #[serde(default)]
    pub entry: usize,
    /// Field label; trailing colon is appended at load when omitted
    pub field: String,
}

/// One catalog entry describing a hardware model's identity-matching rules
/// and its opaque platform-configuration payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariantDescriptor {
    /// Unique code name (enforced at load)
    pub code_name: String,
    /// Product family
    pub family: String,
    /// Expected manufacturer string
    pub manufacturer: String,
    /// Expected product string
    pub product: String,
    /// Pattern matched against the SKU/model field
    pub model_regex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku_source: Option<SkuSource>,
    /// Newline-delimited required processor versions; compared as a multiset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_signature: Option<String>,
    /// Identity keyword read as the unit serial number
    #[serde(default = "default_serial_field")]
    pub serial_field: String,
    /// Pre-production board
    #[serde(default)]
    pub prototype: bool,
    /// Disk/NIC/recovery-media parameters, uninterpreted by this core
    #[serde(default)]
    pub platform_config: serde_json::Value,
}

fn default_serial_field() -> String {
    dmi::SYSTEM_SERIAL.to_string()
}

impl VariantDescriptor {
    /// One-line diagnostic summary
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} / {} / {} -> {}",
            self.manufacturer, self.product, self.model_regex, self.code_name
        );
        if let Some(sig) = &self.cpu_signature {
            line.push_str(&format!(" (cpu: {})", sig.replace('\n', " | ")));
        }
        if self.prototype {
            line.push_str(" [prototype]");
        }
        line
    }
}

/// Ordered catalog of variant descriptors
#[derive(Debug, Clone, Default)]
pub struct VariantRegistry {
    variants: Vec<VariantDescriptor>,
}

impl VariantRegistry {
    /// Parse a registry document, replacing nothing until it validates
    pub fn from_json(doc: &str) -> Result<Self> {
        let mut variants: Vec<VariantDescriptor> = serde_json::from_str(doc)?;
        validate_catalog(&mut variants)?;
        info!(count = variants.len(), "variant registry loaded");
        Ok(Self { variants })
    }

    /// Load a registry document from disk
    pub fn load_file(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|source| GprovError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        if metadata.len() > limits::MAX_DOCUMENT_SIZE {
            return Err(GprovError::registry(format!(
                "registry document too large: {} bytes (max {})",
                metadata.len(),
                limits::MAX_DOCUMENT_SIZE
            )));
        }

        let content = fs::read_to_string(path).map_err(|source| GprovError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Replace the in-memory catalog with a new document
    pub fn load_str(&mut self, doc: &str) -> Result<()> {
        *self = Self::from_json(doc)?;
        Ok(())
    }

    /// First catalog entry with this exact code name
    pub fn lookup(&self, code_name: &str) -> Option<&VariantDescriptor> {
        self.variants.iter().find(|v| v.code_name == code_name)
    }

    /// All descriptors in document order
    pub fn variants(&self) -> &[VariantDescriptor] {
        &self.variants
    }

    /// One-line summaries of the whole catalog, for unresolved diagnostics
    pub fn dump_all(&self) -> Vec<String> {
        self.variants.iter().map(|v| v.summary()).collect()
    }

    /// Built-in default catalog used when no registry document is supplied
    pub fn builtin() -> Self {
        let variants = vec![
            VariantDescriptor {
                code_name: "QEMU-mfg-test".to_string(),
                family: "qemu".to_string(),
                manufacturer: "GPROV_QEMU".to_string(),
                product: "mfg_test".to_string(),
                model_regex: ".*".to_string(),
                sku_source: None,
                cpu_signature: None,
                serial_field: dmi::SYSTEM_SERIAL.to_string(),
                prototype: false,
                platform_config: json!({
                    "disk": "virtio",
                    "nic_vendor_prefix": "52:54:00",
                    "recovery_media": "usb",
                }),
            },
            VariantDescriptor {
                code_name: "GX1200".to_string(),
                family: "gx".to_string(),
                manufacturer: "Supermicro".to_string(),
                product: "X11SSH-F".to_string(),
                model_regex: "^SYS-5019S".to_string(),
                sku_source: None,
                cpu_signature: Some(
                    "Intel(R) Xeon(R) CPU E3-1240 v6 @ 3.70GHz".to_string(),
                ),
                serial_field: dmi::SYSTEM_SERIAL.to_string(),
                prototype: false,
                platform_config: json!({
                    "disk": "sata-ssd",
                    "nic_vendor_prefix": "ac:1f:6b",
                    "recovery_media": "usb",
                }),
            },
            VariantDescriptor {
                code_name: "GX2400-proto".to_string(),
                family: "gx".to_string(),
                manufacturer: "Supermicro".to_string(),
                product: "X12STH-F".to_string(),
                model_regex: "^SYS-5019|^Not Specified$".to_string(),
                sku_source: Some(SkuSource {
                    category: 2,
                    entry: 0,
                    field: "Product Name:".to_string(),
                }),
                cpu_signature: None,
                serial_field: "baseboard-serial-number".to_string(),
                prototype: true,
                platform_config: json!({
                    "disk": "nvme",
                    "nic_vendor_prefix": "ac:1f:6b",
                    "recovery_media": "usb",
                }),
            },
        ];
        Self { variants }
    }
}

/// Load-time catalog validation: compilable patterns, normalized SKU
/// override fields, unique code names.
fn validate_catalog(variants: &mut [VariantDescriptor]) -> Result<()> {
    for variant in variants.iter_mut() {
        regex::Regex::new(&variant.model_regex).map_err(|e| GprovError::BadPattern {
            code_name: variant.code_name.clone(),
            pattern: variant.model_regex.clone(),
            reason: e.to_string(),
        })?;

        if let Some(sku) = variant.sku_source.as_mut() {
            if sku.field.trim().is_empty() {
                return Err(GprovError::registry(format!(
                    "empty SKU override field for {}",
                    variant.code_name
                )));
            }
            if !sku.field.ends_with(':') {
                sku.field.push(':');
            }
        }

        if variant.serial_field.trim().is_empty() {
            return Err(GprovError::registry(format!(
                "empty serial field for {}",
                variant.code_name
            )));
        }
    }

    for (i, variant) in variants.iter().enumerate() {
        if variants[..i].iter().any(|v| v.code_name == variant.code_name) {
            return Err(GprovError::DuplicateCodeName(variant.code_name.clone()));
        }
    }

    Ok(())
}

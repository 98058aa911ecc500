//! Firmware identity source access
//!
//! Cached access to SMBIOS/DMI identity data: keyword lookups
//! (`dmidecode -s <keyword>`) and raw per-category table dumps
//! (`dmidecode -t <type>`). A [`DmiSource`] is an owned cache object, not
//! process-wide state; the frozen variant pins the caches to fixed maps so
//! tests and offline runs never shell out.

use std::collections::HashMap;
use std::process::Command;

use tracing::{debug, warn};

use crate::constants::dmi;

/// Cached accessor over the firmware identity tables.
///
/// Live sources populate the caches lazily from `dmidecode`; a query failure
/// is logged and cached as the empty string, never raised. Frozen sources
/// answer only from their pinned maps - a miss returns empty without any
/// live query.
#[derive(Debug, Clone)]
pub struct DmiSource {
    strings: HashMap<String, String>,
    tables: HashMap<u8, String>,
    live: bool,
}

impl DmiSource {
    /// Create a live source with empty caches
    pub fn live() -> Self {
        Self {
            strings: HashMap::new(),
            tables: HashMap::new(),
            live: true,
        }
    }

    /// Create a frozen source pinned to fixed keyword and table maps
    pub fn frozen(strings: HashMap<String, String>, tables: HashMap<u8, String>) -> Self {
        Self {
            strings,
            tables,
            live: false,
        }
    }

    /// Whether this source may invoke live identity queries
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Reset the caches so the next lookup queries live again.
    ///
    /// Frozen sources keep their pinned maps; clearing one would leave it
    /// unable to answer anything.
    pub fn clear(&mut self) {
        if self.live {
            self.strings.clear();
            self.tables.clear();
        }
    }

    /// Look up a singular identity keyword (e.g. `system-manufacturer`).
    ///
    /// Returns the cached value on a hit. On a miss a live source runs the
    /// identity query and caches the trimmed result; empty on failure.
    pub fn string_field(&mut self, key: &str) -> String {
        if let Some(value) = self.strings.get(key) {
            return value.clone();
        }
        if !self.live {
            return String::new();
        }

        let value = query_keyword(key).unwrap_or_default();
        self.strings.insert(key.to_string(), value.clone());
        value
    }

    /// Raw multi-record text for a table category (e.g. type 17 memory devices)
    pub fn raw_category(&mut self, category: u8) -> String {
        if let Some(raw) = self.tables.get(&category) {
            return raw.clone();
        }
        if !self.live {
            return String::new();
        }

        let raw = dump_category(category).unwrap_or_default();
        self.tables.insert(category, raw.clone());
        raw
    }

    /// Extract a single field from one record of a category dump.
    ///
    /// Records are delimited by boundary lines starting with `Handle`; the
    /// boundary line precedes each record. `entry_index` is 0-based.
    /// `field` must carry its trailing colon (e.g. `"SKU Number:"`).
    pub fn field_from_category(&mut self, category: u8, entry_index: usize, field: &str) -> String {
        let raw = self.raw_category(category);
        let entries = split_records(&raw);

        if let Some(entry) = entries.get(entry_index) {
            for line in entry.lines() {
                if let Some(rest) = line.trim_start().strip_prefix(field) {
                    return rest.trim().to_string();
                }
            }
        }

        warn!(
            category,
            entry_index,
            field,
            raw_dump = %raw,
            "identity field not found in category dump"
        );
        String::new()
    }

    /// Concatenated raw dump of the diagnostic category set
    pub fn dump_tables(&mut self) -> String {
        let mut out = String::new();
        for &category in dmi::DUMP_CATEGORIES {
            let raw = self.raw_category(category);
            if !raw.is_empty() {
                out.push_str(&raw);
                if !raw.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
        out
    }
}

/// Split a category dump into per-record segments.
///
/// Header text before the first boundary line is discarded.
fn split_records(raw: &str) -> Vec<String> {
    let mut records: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for line in raw.lines() {
        if line.starts_with(dmi::HANDLE_PREFIX) {
            if let Some(done) = current.take() {
                records.push(done);
            }
            current = Some(String::new());
            continue;
        }
        if let Some(buf) = current.as_mut() {
            buf.push_str(line);
            buf.push('\n');
        }
    }
    if let Some(done) = current {
        records.push(done);
    }
    records
}

/// Run the keyword query command and clean its output
fn query_keyword(key: &str) -> Option<String> {
    let output = Command::new(dmi::DMIDECODE).args(["-s", key]).output();
    match output {
        Ok(out) if out.status.success() => {
            let text = String::from_utf8_lossy(&out.stdout);
            Some(clean_keyword_output(&text))
        }
        Ok(out) => {
            warn!(
                key,
                status = %out.status,
                stderr = %String::from_utf8_lossy(&out.stderr),
                "identity keyword query failed"
            );
            None
        }
        Err(e) => {
            warn!(key, error = %e, "identity keyword query could not be run");
            None
        }
    }
}

/// Run the category dump command
fn dump_category(category: u8) -> Option<String> {
    let output = Command::new(dmi::DMIDECODE)
        .args(["-t", &category.to_string()])
        .output();
    match output {
        Ok(out) if out.status.success() => {
            debug!(category, "identity category dump cached");
            Some(String::from_utf8_lossy(&out.stdout).to_string())
        }
        Ok(out) => {
            warn!(
                category,
                status = %out.status,
                "identity category dump failed"
            );
            None
        }
        Err(e) => {
            warn!(category, error = %e, "identity category dump could not be run");
            None
        }
    }
}

/// Strip the trailing `Invalid entry` diagnostic line and trim.
///
/// Multi-line values (one line per processor for `processor-version`) keep
/// their newlines.
fn clean_keyword_output(text: &str) -> String {
    text.lines()
        .filter(|line| !line.starts_with(dmi::INVALID_ENTRY_PREFIX))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

//! Specification comparison
//!
//! Turns a *required* and a *detected* [`HwSpec`] into a typed mismatch
//! list plus a diagnostic trail. The comparator is pure: it never
//! terminates the process; the boundary layer decides what a non-empty
//! report means. Field groups use different policies - exact equality,
//! tolerant numeric equality for memory, multiset equality for the CPU
//! signature, a pattern match for the serial number, and per-key string
//! equality for the named identity fields.

use gp_error::{GprovError, Result};
use regex::Regex;
use tracing::{debug, warn};

use crate::constants::limits;
use crate::dmi::DmiSource;
use crate::identify::{multiset_eq, ResolvedVariant};
use crate::spec::{DiskSpec, FirmwareVersions, HwSpec, NicStats, RecoveryMedia};

/// One field that failed comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub field: String,
    pub required: String,
    pub detected: String,
}

/// External hardware detectors invoked while populating a detected spec.
///
/// Raw detection (block devices, links, bus walks) lives in the caller's
/// platform layer; this trait is the seam. Implementations report probing
/// failures as [`GprovError::DetectorFailed`] (see [`GprovError::detector`]),
/// which [`populate`] propagates unchanged. [`FixedDetectors`] is the
/// deterministic table-driven implementation for tests and offline runs.
pub trait Detectors {
    fn cpu_signature(&mut self) -> Result<String>;
    fn memory_mb(&mut self) -> Result<u64>;
    fn disks(&mut self) -> Result<Vec<DiskSpec>>;
    fn recovery_media(&mut self) -> Result<RecoveryMedia>;
    fn nic_stats(&mut self) -> Result<NicStats>;
    fn firmware_versions(&mut self) -> Result<FirmwareVersions>;
    fn pci_devices(&mut self) -> Result<Vec<String>>;
    fn usb_devices(&mut self) -> Result<Vec<String>>;
}

/// Serial-number and code-name accessors - the only coupling point to the
/// caller's broader platform abstraction.
pub trait HardwareInfo {
    fn serial_number(&self) -> String;
    fn code_name(&self) -> String;
}

impl HardwareInfo for ResolvedVariant {
    fn serial_number(&self) -> String {
        self.serial.clone()
    }

    fn code_name(&self) -> String {
        self.descriptor.code_name.clone()
    }
}

/// Deterministic detector set answering from fixed values
#[derive(Debug, Clone, Default)]
pub struct FixedDetectors {
    pub cpu_signature: String,
    pub memory_mb: u64,
    pub disks: Vec<DiskSpec>,
    pub recovery: RecoveryMedia,
    pub nics: NicStats,
    pub firmware: FirmwareVersions,
    pub pci_devices: Vec<String>,
    pub usb_devices: Vec<String>,
}

impl Detectors for FixedDetectors {
    fn cpu_signature(&mut self) -> Result<String> {
        Ok(self.cpu_signature.clone())
    }

    fn memory_mb(&mut self) -> Result<u64> {
        Ok(self.memory_mb)
    }

    fn disks(&mut self) -> Result<Vec<DiskSpec>> {
        Ok(self.disks.clone())
    }

    fn recovery_media(&mut self) -> Result<RecoveryMedia> {
        Ok(self.recovery.clone())
    }

    fn nic_stats(&mut self) -> Result<NicStats> {
        Ok(self.nics.clone())
    }

    fn firmware_versions(&mut self) -> Result<FirmwareVersions> {
        Ok(self.firmware.clone())
    }

    fn pci_devices(&mut self) -> Result<Vec<String>> {
        Ok(self.pci_devices.clone())
    }

    fn usb_devices(&mut self) -> Result<Vec<String>> {
        Ok(self.usb_devices.clone())
    }
}

/// Aggregate result of a validation pass
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub mismatches: Vec<Mismatch>,
    /// Pretty JSON of the detected spec; filled when mismatches exist
    pub detected_json: String,
    /// Raw identity-table dump; filled when mismatches exist
    pub raw_tables: String,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.mismatches.len()
    }
}

/// Catch authoring errors in the required spec before any hardware is
/// touched: alternatives must exist, none may be empty, all must carry the
/// same disk count, and the recovery media must clear the fixed floor.
pub fn sanity_check(required: &HwSpec) -> Result<()> {
    if required.disks.is_empty() {
        return Err(GprovError::NoAlternatives);
    }
    for (index, alternative) in required.disks.iter().enumerate() {
        if alternative.is_empty() {
            return Err(GprovError::EmptyAlternative { index });
        }
    }
    let counts: Vec<usize> = required.disks.iter().map(|alt| alt.len()).collect();
    if counts.windows(2).any(|pair| pair[0] != pair[1]) {
        return Err(GprovError::UnevenAlternatives { counts });
    }
    if required.recovery.size_mb < limits::RECOVERY_SIZE_FLOOR_MB {
        return Err(GprovError::RecoveryTooSmall {
            size_mb: required.recovery.size_mb,
            floor_mb: limits::RECOVERY_SIZE_FLOOR_MB,
        });
    }
    Ok(())
}

/// Build the detected spec by invoking the external detectors. The
/// required spec serves as a hint for identity keys: only its named
/// non-underscore fields are queried. Storage holds the observed disks
/// as a single configuration; picking the required alternative they are
/// measured against is [`compare_storage`]'s job.
pub fn populate(
    required: &HwSpec,
    detectors: &mut dyn Detectors,
    info: &dyn HardwareInfo,
    source: &mut DmiSource,
) -> Result<HwSpec> {
    let mut detected = HwSpec {
        code_name: info.code_name(),
        cpu_signature: detectors.cpu_signature()?,
        memory_mb: detectors.memory_mb()?,
        recovery: detectors.recovery_media()?,
        disks: vec![detectors.disks()?],
        nics: detectors.nic_stats()?,
        firmware: detectors.firmware_versions()?,
        pci_devices: detectors.pci_devices()?,
        usb_devices: detectors.usb_devices()?,
        ..HwSpec::default()
    };
    detected.pci_devices.sort();
    detected.usb_devices.sort();

    for check in required.named_checks()? {
        let value = check.key.resolve(source);
        detected.dmi_fields.insert(check.raw, value);
    }

    Ok(detected)
}

/// Compare the required spec against the detected one.
///
/// Every individual mismatch is logged with the field name, the required
/// value, and the detected value, and contributes exactly one entry. An
/// empty result means pass.
pub fn compare(
    required: &HwSpec,
    detected: &HwSpec,
    info: &dyn HardwareInfo,
    via_fallback: bool,
) -> Result<Vec<Mismatch>> {
    let mut mismatches = Vec::new();

    check_exact(
        &mut mismatches,
        "code_name",
        &required.code_name,
        &detected.code_name,
    );

    if !multiset_eq(&required.cpu_signature, &detected.cpu_signature) {
        push_mismatch(
            &mut mismatches,
            "cpu_signature",
            &required.cpu_signature.replace('\n', " | "),
            &detected.cpu_signature.replace('\n', " | "),
        );
    }

    if !memory_within_tolerance(required.memory_mb, detected.memory_mb) {
        push_mismatch(
            &mut mismatches,
            "memory_mb",
            &required.memory_mb.to_string(),
            &detected.memory_mb.to_string(),
        );
    }

    check_exact(
        &mut mismatches,
        "recovery.media",
        &required.recovery.media,
        &detected.recovery.media,
    );
    if detected.recovery.size_mb < required.recovery.size_mb {
        push_mismatch(
            &mut mismatches,
            "recovery.size_mb",
            &required.recovery.size_mb.to_string(),
            &detected.recovery.size_mb.to_string(),
        );
    }

    compare_storage(&mut mismatches, required, detected);

    check_exact(
        &mut mismatches,
        "nics.vendor_count",
        &required.nics.vendor_count.to_string(),
        &detected.nics.vendor_count.to_string(),
    );
    check_exact(
        &mut mismatches,
        "nics.total_count",
        &required.nics.total_count.to_string(),
        &detected.nics.total_count.to_string(),
    );
    check_exact(
        &mut mismatches,
        "nics.sequential",
        &required.nics.sequential.to_string(),
        &detected.nics.sequential.to_string(),
    );

    check_exact(
        &mut mismatches,
        "firmware.bios_version",
        &required.firmware.bios_version,
        &detected.firmware.bios_version,
    );
    if let Some(required_bmc) = &required.firmware.bmc_version {
        let detected_bmc = detected.firmware.bmc_version.clone().unwrap_or_default();
        check_exact(
            &mut mismatches,
            "firmware.bmc_version",
            required_bmc,
            &detected_bmc,
        );
    }

    check_exact(
        &mut mismatches,
        "pci_devices",
        &sorted_join(&required.pci_devices),
        &sorted_join(&detected.pci_devices),
    );
    check_exact(
        &mut mismatches,
        "usb_devices",
        &sorted_join(&required.usb_devices),
        &sorted_join(&detected.usb_devices),
    );

    check_serial(&mut mismatches, required, info, via_fallback)?;

    for check in required.named_checks()? {
        let detected_value = detected
            .dmi_fields
            .get(&check.raw)
            .cloned()
            .unwrap_or_default();
        check_exact(&mut mismatches, &check.raw, &check.expected, &detected_value);
    }

    Ok(mismatches)
}

/// Full validation pass: sanity-check the required spec, populate the
/// detected one, compare, and bundle diagnostics when anything mismatched.
pub fn run_validation(
    required: &HwSpec,
    detectors: &mut dyn Detectors,
    info: &dyn HardwareInfo,
    source: &mut DmiSource,
    via_fallback: bool,
) -> Result<ValidationReport> {
    sanity_check(required)?;
    let detected = populate(required, detectors, info, source)?;
    let mismatches = compare(required, &detected, info, via_fallback)?;

    let mut report = ValidationReport {
        mismatches,
        ..ValidationReport::default()
    };
    if !report.passed() {
        warn!(
            error_count = report.error_count(),
            code_name = %required.code_name,
            "specification validation failed"
        );
        report.detected_json = detected.to_json_pretty()?;
        report.raw_tables = source.dump_tables();
    }
    Ok(report)
}

/// Main storage: the observed disks must match one required alternative by
/// count and by kind multiset; exact sizes are normalized away.
fn compare_storage(mismatches: &mut Vec<Mismatch>, required: &HwSpec, detected: &HwSpec) {
    let empty: Vec<DiskSpec> = Vec::new();
    let observed = detected.disks.first().unwrap_or(&empty);

    let chosen = match choose_alternative(&required.disks, observed) {
        Some(alternative) => alternative,
        None => {
            push_mismatch(
                mismatches,
                "disks",
                "at least one storage alternative",
                &render_disks(observed),
            );
            return;
        }
    };

    if chosen.len() != observed.len() {
        push_mismatch(
            mismatches,
            "disks.count",
            &chosen.len().to_string(),
            &observed.len().to_string(),
        );
        return;
    }

    let required_kinds = join_lines(chosen.iter().map(|d| d.kind.clone()));
    let observed_kinds = join_lines(observed.iter().map(|d| d.kind.clone()));
    if !multiset_eq(&required_kinds, &observed_kinds) {
        push_mismatch(
            mismatches,
            "disks.kinds",
            &required_kinds.replace('\n', " | "),
            &observed_kinds.replace('\n', " | "),
        );
    }
}

/// Pick the required alternative that best matches the observed disks,
/// scoring disk-count equality above per-kind overlap. First alternative
/// wins ties, preserving document order.
pub fn choose_alternative<'a>(
    alternatives: &'a [Vec<DiskSpec>],
    observed: &[DiskSpec],
) -> Option<&'a Vec<DiskSpec>> {
    let mut best: Option<(&'a Vec<DiskSpec>, usize)> = None;

    for alternative in alternatives {
        let mut score = 0;
        if alternative.len() == observed.len() {
            score += 100;
        }

        let mut remaining: Vec<&str> = observed.iter().map(|d| d.kind.as_str()).collect();
        for disk in alternative {
            if let Some(pos) = remaining.iter().position(|k| *k == disk.kind) {
                remaining.swap_remove(pos);
                score += 1;
            }
        }

        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((alternative, score)),
        }
    }

    best.map(|(alternative, score)| {
        debug!(score, disks = ?alternative, "storage alternative chosen");
        alternative
    })
}

fn check_serial(
    mismatches: &mut Vec<Mismatch>,
    required: &HwSpec,
    info: &dyn HardwareInfo,
    via_fallback: bool,
) -> Result<()> {
    if required.serial_regex.is_empty() {
        return Ok(());
    }

    let serial = info.serial_number();
    if via_fallback {
        // Fallback-derived units may carry serials from a different field;
        // the pattern check is advisory only.
        debug!(
            serial = %serial,
            pattern = %required.serial_regex,
            "serial pattern check softened for fallback-derived resolution"
        );
        return Ok(());
    }

    let pattern = Regex::new(&required.serial_regex).map_err(|e| {
        GprovError::spec(format!(
            "bad serial pattern {:?}: {}",
            required.serial_regex, e
        ))
    })?;
    if !pattern.is_match(&serial) {
        push_mismatch(
            mismatches,
            "serial_number",
            &required.serial_regex,
            &serial,
        );
    }
    Ok(())
}

/// Tolerant numeric equality: within ±1% of the required value
fn memory_within_tolerance(required_mb: u64, detected_mb: u64) -> bool {
    let diff = required_mb.abs_diff(detected_mb);
    diff * 100 <= required_mb * limits::MEMORY_TOLERANCE_PERCENT
}

fn check_exact(mismatches: &mut Vec<Mismatch>, field: &str, required: &str, detected: &str) {
    if required != detected {
        push_mismatch(mismatches, field, required, detected);
    }
}

fn push_mismatch(mismatches: &mut Vec<Mismatch>, field: &str, required: &str, detected: &str) {
    warn!(
        field,
        required,
        detected,
        "specification mismatch"
    );
    mismatches.push(Mismatch {
        field: field.to_string(),
        required: required.to_string(),
        detected: detected.to_string(),
    });
}

fn sorted_join(items: &[String]) -> String {
    let mut sorted = items.to_vec();
    sorted.sort();
    sorted.join(", ")
}

fn join_lines(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join("\n")
}

fn render_disks(disks: &[DiskSpec]) -> String {
    disks
        .iter()
        .map(|d| format!("{} {} MB", d.kind, d.size_mb))
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    struct TestInfo {
        serial: String,
        code_name: String,
    }

    impl HardwareInfo for TestInfo {
        fn serial_number(&self) -> String {
            self.serial.clone()
        }

        fn code_name(&self) -> String {
            self.code_name.clone()
        }
    }

    fn required_spec() -> HwSpec {
        let mut dmi_fields = BTreeMap::new();
        dmi_fields.insert("chassis-manufacturer".to_string(), "GPROV".to_string());
        dmi_fields.insert("_note".to_string(), "chassis vendor locked".to_string());

        HwSpec {
            code_name: "QEMU-mfg-test".to_string(),
            cpu_signature: "QEMU Virtual CPU".to_string(),
            memory_mb: 16384,
            recovery: RecoveryMedia {
                media: "usb".to_string(),
                size_mb: 4096,
            },
            disks: vec![
                vec![DiskSpec {
                    kind: "virtio".to_string(),
                    size_mb: 102400,
                }],
                vec![DiskSpec {
                    kind: "sata-ssd".to_string(),
                    size_mb: 97280,
                }],
            ],
            nics: NicStats {
                vendor_count: 2,
                total_count: 2,
                sequential: true,
            },
            firmware: FirmwareVersions {
                bios_version: "rel-1.16.2".to_string(),
                bmc_version: None,
            },
            pci_devices: vec!["8086:10d3".to_string()],
            usb_devices: vec![],
            serial_regex: "^QEMU[0-9]{5}$".to_string(),
            dmi_fields,
        }
    }

    fn matching_detected() -> HwSpec {
        let mut detected = required_spec();
        detected.serial_regex = String::new();
        detected.disks = vec![vec![DiskSpec {
            kind: "sata-ssd".to_string(),
            size_mb: 98304, // sizes are normalized away
        }]];
        detected.dmi_fields = BTreeMap::new();
        detected
            .dmi_fields
            .insert("chassis-manufacturer".to_string(), "GPROV".to_string());
        detected
    }

    fn test_info() -> TestInfo {
        TestInfo {
            serial: "QEMU01234".to_string(),
            code_name: "QEMU-mfg-test".to_string(),
        }
    }

    #[test]
    fn test_compare_pass() {
        let mismatches =
            compare(&required_spec(), &matching_detected(), &test_info(), false).unwrap();
        assert_eq!(mismatches, vec![]);
    }

    #[test]
    fn test_memory_tolerance() {
        assert!(memory_within_tolerance(1000, 1000));
        assert!(memory_within_tolerance(1000, 1009));
        assert!(memory_within_tolerance(1000, 991));
        assert!(!memory_within_tolerance(1000, 1011));
        assert!(!memory_within_tolerance(1000, 989));
    }

    #[test]
    fn test_compare_memory_within_tolerance_passes() {
        let mut required = required_spec();
        let mut detected = matching_detected();
        required.memory_mb = 1000;
        detected.memory_mb = 1009;
        assert!(compare(&required, &detected, &test_info(), false)
            .unwrap()
            .is_empty());

        detected.memory_mb = 1011;
        let mismatches = compare(&required, &detected, &test_info(), false).unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "memory_mb");
    }

    #[test]
    fn test_compare_cpu_signature_multiset() {
        let mut required = required_spec();
        let mut detected = matching_detected();
        required.cpu_signature = "Xeon A\nXeon B".to_string();
        detected.cpu_signature = "Xeon B\nXeon A".to_string();
        assert!(compare(&required, &detected, &test_info(), false)
            .unwrap()
            .is_empty());

        detected.cpu_signature = "Xeon A".to_string();
        let mismatches = compare(&required, &detected, &test_info(), false).unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "cpu_signature");
    }

    #[test]
    fn test_compare_named_fields() {
        let mut required = required_spec();
        let detected = matching_detected();
        // Underscore key present in required, absent in detected: 0 mismatches
        assert!(compare(&required, &detected, &test_info(), false)
            .unwrap()
            .is_empty());

        // Any other differing key: exactly 1 mismatch regardless of magnitude
        required
            .dmi_fields
            .insert("chassis-manufacturer".to_string(), "OtherVendor".to_string());
        let mismatches = compare(&required, &detected, &test_info(), false).unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "chassis-manufacturer");
        assert_eq!(mismatches[0].required, "OtherVendor");
        assert_eq!(mismatches[0].detected, "GPROV");
    }

    #[test]
    fn test_compare_serial_pattern() {
        let required = required_spec();
        let detected = matching_detected();
        let bad_info = TestInfo {
            serial: "BADSERIAL".to_string(),
            code_name: "QEMU-mfg-test".to_string(),
        };

        let mismatches = compare(&required, &detected, &bad_info, false).unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "serial_number");

        // Softened for fallback-derived resolutions
        assert!(compare(&required, &detected, &bad_info, true)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_compare_storage_alternatives() {
        let required = required_spec();
        let mut detected = matching_detected();

        // Either alternative kind passes
        detected.disks = vec![vec![DiskSpec {
            kind: "virtio".to_string(),
            size_mb: 1,
        }]];
        assert!(compare(&required, &detected, &test_info(), false)
            .unwrap()
            .is_empty());

        // A kind matching no alternative fails
        detected.disks = vec![vec![DiskSpec {
            kind: "sata-hdd".to_string(),
            size_mb: 102400,
        }]];
        let mismatches = compare(&required, &detected, &test_info(), false).unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "disks.kinds");

        // A disk-count mismatch fails
        detected.disks = vec![vec![]];
        let mismatches = compare(&required, &detected, &test_info(), false).unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "disks.count");
    }

    #[test]
    fn test_choose_alternative_prefers_count_then_kind() {
        let alternatives = vec![
            vec![
                DiskSpec {
                    kind: "sata-hdd".to_string(),
                    size_mb: 500000,
                },
                DiskSpec {
                    kind: "sata-hdd".to_string(),
                    size_mb: 500000,
                },
            ],
            vec![
                DiskSpec {
                    kind: "nvme".to_string(),
                    size_mb: 500000,
                },
                DiskSpec {
                    kind: "nvme".to_string(),
                    size_mb: 500000,
                },
            ],
        ];
        let observed = vec![
            DiskSpec {
                kind: "nvme".to_string(),
                size_mb: 512000,
            },
            DiskSpec {
                kind: "nvme".to_string(),
                size_mb: 512000,
            },
        ];
        let chosen = choose_alternative(&alternatives, &observed).unwrap();
        assert_eq!(chosen[0].kind, "nvme");
        assert!(choose_alternative(&[], &observed).is_none());
    }

    #[test]
    fn test_sanity_check() {
        let required = required_spec();
        assert!(sanity_check(&required).is_ok());

        let mut no_alts = required.clone();
        no_alts.disks.clear();
        assert!(matches!(
            sanity_check(&no_alts),
            Err(GprovError::NoAlternatives)
        ));

        let mut empty_alt = required.clone();
        empty_alt.disks.push(vec![]);
        assert!(matches!(
            sanity_check(&empty_alt),
            Err(GprovError::EmptyAlternative { index: 2 })
        ));

        // A hand-built spec skipping load-time validation still cannot
        // reach hardware with uneven alternative lengths
        let mut uneven = required.clone();
        uneven.disks.push(vec![
            DiskSpec {
                kind: "sata-hdd".to_string(),
                size_mb: 500000,
            },
            DiskSpec {
                kind: "sata-hdd".to_string(),
                size_mb: 500000,
            },
        ]);
        assert!(matches!(
            sanity_check(&uneven),
            Err(GprovError::UnevenAlternatives { counts }) if counts == vec![1, 1, 2]
        ));

        let mut small_recovery = required;
        small_recovery.recovery.size_mb = 512;
        assert!(matches!(
            sanity_check(&small_recovery),
            Err(GprovError::RecoveryTooSmall {
                size_mb: 512,
                floor_mb: _,
            })
        ));
    }

    #[test]
    fn test_run_validation_bundles_diagnostics_on_failure() {
        use std::collections::HashMap;

        let required = required_spec();
        let mut detectors = FixedDetectors {
            cpu_signature: "QEMU Virtual CPU".to_string(),
            memory_mb: 16384,
            disks: vec![DiskSpec {
                kind: "virtio".to_string(),
                size_mb: 102400,
            }],
            recovery: RecoveryMedia {
                media: "usb".to_string(),
                size_mb: 4096,
            },
            nics: NicStats {
                vendor_count: 2,
                total_count: 2,
                sequential: true,
            },
            firmware: FirmwareVersions {
                bios_version: "rel-1.16.2".to_string(),
                bmc_version: None,
            },
            pci_devices: vec!["8086:10d3".to_string()],
            usb_devices: vec![],
        };

        let mut strings = HashMap::new();
        strings.insert("chassis-manufacturer".to_string(), "GPROV".to_string());
        let mut tables = HashMap::new();
        tables.insert(
            1u8,
            "Handle 0x0100, DMI type 1, 27 bytes\nSystem Information\n\tManufacturer: GPROV_QEMU\n"
                .to_string(),
        );
        let mut source = DmiSource::frozen(strings, tables);

        let report = run_validation(
            &required,
            &mut detectors,
            &test_info(),
            &mut source,
            false,
        )
        .unwrap();
        assert!(report.passed());
        assert!(report.detected_json.is_empty());

        // Break one detector and the report carries full diagnostics
        detectors.firmware.bios_version = "rel-1.14.0".to_string();
        let report = run_validation(
            &required,
            &mut detectors,
            &test_info(),
            &mut source,
            false,
        )
        .unwrap();
        assert_eq!(report.error_count(), 1);
        assert!(report.detected_json.contains("rel-1.14.0"));
        assert!(report.raw_tables.contains("System Information"));
    }

    #[test]
    fn test_populate_detects_only_required_named_fields() {
        use std::collections::HashMap;

        let required = required_spec();
        let mut detectors = FixedDetectors::default();
        let mut strings = HashMap::new();
        strings.insert("chassis-manufacturer".to_string(), "GPROV".to_string());
        strings.insert("chassis-serial-number".to_string(), "unqueried".to_string());
        let mut source = DmiSource::frozen(strings, HashMap::new());

        let detected = populate(&required, &mut detectors, &test_info(), &mut source).unwrap();
        assert_eq!(
            detected.dmi_fields.get("chassis-manufacturer"),
            Some(&"GPROV".to_string())
        );
        // Underscore documentation keys are never detected
        assert!(!detected.dmi_fields.contains_key("_note"));
        assert_eq!(detected.dmi_fields.len(), 1);
        assert_eq!(detected.code_name, "QEMU-mfg-test");
    }

    #[test]
    fn test_populate_propagates_detector_failure() {
        use std::collections::HashMap;

        struct NoStorage(FixedDetectors);

        impl Detectors for NoStorage {
            fn cpu_signature(&mut self) -> Result<String> {
                self.0.cpu_signature()
            }

            fn memory_mb(&mut self) -> Result<u64> {
                self.0.memory_mb()
            }

            fn disks(&mut self) -> Result<Vec<DiskSpec>> {
                Err(GprovError::detector("storage", "lsblk returned no devices"))
            }

            fn recovery_media(&mut self) -> Result<RecoveryMedia> {
                self.0.recovery_media()
            }

            fn nic_stats(&mut self) -> Result<NicStats> {
                self.0.nic_stats()
            }

            fn firmware_versions(&mut self) -> Result<FirmwareVersions> {
                self.0.firmware_versions()
            }

            fn pci_devices(&mut self) -> Result<Vec<String>> {
                self.0.pci_devices()
            }

            fn usb_devices(&mut self) -> Result<Vec<String>> {
                self.0.usb_devices()
            }
        }

        let required = required_spec();
        let mut detectors = NoStorage(FixedDetectors::default());
        let mut source = DmiSource::frozen(HashMap::new(), HashMap::new());

        let err = populate(&required, &mut detectors, &test_info(), &mut source).unwrap_err();
        assert!(matches!(
            err,
            GprovError::DetectorFailed { domain, .. } if domain == "storage"
        ));
    }
}

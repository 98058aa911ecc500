//! Platform identification engine
//!
//! Multi-stage matching of live identity data against the variant registry.
//! Stage 1 matches on board-level manufacturer/product fields, stage 2 on
//! system-level fields; each candidate must also satisfy the descriptor's
//! SKU pattern and, when declared, multiset equality of the CPU signature.
//! The first satisfying catalog entry wins and the result is cached until
//! [`Identifier::reidentify`].

use gp_error::{GprovError, Result};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::constants::dmi;
use crate::dmi::DmiSource;
use crate::registry::{VariantDescriptor, VariantRegistry};

/// A successful identification: the matched descriptor paired with the
/// identity values actually observed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResolvedVariant {
    pub descriptor: VariantDescriptor,
    /// Manufacturer string read at match time
    pub manufacturer: String,
    /// Product string read at match time
    pub product: String,
    /// SKU value used for the pattern match (default or override field)
    pub sku: String,
    /// Serial number from the descriptor's designated field
    pub serial: String,
    /// Resolution came from the external fallback path, not live matching
    pub via_fallback: bool,
}

/// Identification engine owning the registry, the identity source, and at
/// most one cached resolution.
#[derive(Debug)]
pub struct Identifier {
    registry: VariantRegistry,
    source: DmiSource,
    /// Compiled model patterns, parallel to the registry's variants.
    /// Compiled once on first identification and reused across rescans.
    patterns: Option<Vec<Regex>>,
    resolved: Option<ResolvedVariant>,
}

impl Identifier {
    pub fn new(registry: VariantRegistry, source: DmiSource) -> Self {
        Self {
            registry,
            source,
            patterns: None,
            resolved: None,
        }
    }

    pub fn registry(&self) -> &VariantRegistry {
        &self.registry
    }

    /// The identity source, for the comparator's named-field detection and
    /// diagnostic dumps
    pub fn source_mut(&mut self) -> &mut DmiSource {
        &mut self.source
    }

    /// The cached resolution, if any
    pub fn resolved(&self) -> Option<&ResolvedVariant> {
        self.resolved.as_ref()
    }

    /// Resolve the running platform against the catalog.
    ///
    /// Returns the cached result when already resolved. `Ok(None)` means no
    /// catalog entry matched; the caller decides between fallback and abort.
    pub fn identify(&mut self) -> Result<Option<&ResolvedVariant>> {
        if self.resolved.is_some() {
            return Ok(self.resolved.as_ref());
        }

        self.ensure_patterns()?;
        let patterns = self.patterns.as_deref().unwrap_or(&[]);

        let mut result = match_stage(
            &self.registry,
            patterns,
            &mut self.source,
            dmi::BOARD_MANUFACTURER,
            dmi::BOARD_PRODUCT,
        );
        if result.is_none() {
            result = match_stage(
                &self.registry,
                patterns,
                &mut self.source,
                dmi::SYSTEM_MANUFACTURER,
                dmi::SYSTEM_PRODUCT,
            );
        }

        match result {
            Some(resolved) => {
                info!(
                    code_name = %resolved.descriptor.code_name,
                    serial = %resolved.serial,
                    "platform identified"
                );
                self.resolved = Some(resolved);
                Ok(self.resolved.as_ref())
            }
            None => {
                self.log_unresolved();
                Ok(None)
            }
        }
    }

    /// Drop the cached resolution and the identity cache, then rerun the
    /// matching stages.
    pub fn reidentify(&mut self) -> Result<Option<&ResolvedVariant>> {
        self.resolved = None;
        self.source.clear();
        self.identify()
    }

    /// Resolve via stages 1-2, then fall back to a caller-supplied code name.
    ///
    /// A supplier error or a code name absent from the registry is an
    /// explicit error, never a silent unresolved state.
    pub fn identify_with_fallback<F, E>(&mut self, supplier: F) -> Result<&ResolvedVariant>
    where
        F: FnOnce() -> std::result::Result<String, E>,
        E: std::fmt::Display,
    {
        self.identify()?;

        if self.resolved.is_none() {
            let code_name =
                supplier().map_err(|e| GprovError::FallbackFailed(e.to_string()))?;
            let descriptor = self
                .registry
                .lookup(&code_name)
                .cloned()
                .ok_or_else(|| GprovError::UnknownCodeName(code_name.clone()))?;

            let source = &mut self.source;
            let sku = read_sku(source, &descriptor);
            let resolved = ResolvedVariant {
                manufacturer: source.string_field(dmi::SYSTEM_MANUFACTURER),
                product: source.string_field(dmi::SYSTEM_PRODUCT),
                sku,
                serial: source.string_field(&descriptor.serial_field),
                descriptor,
                via_fallback: true,
            };
            info!(code_name = %code_name, "platform identified via fallback");
            self.resolved = Some(resolved);
        }

        self.resolved.as_ref().ok_or(GprovError::NotIdentified)
    }

    /// Compile every catalog model pattern, once per engine. Registries
    /// loaded through [`VariantRegistry::from_json`] have already proven
    /// their patterns, so a failure here is confined to hand-assembled
    /// catalogs and surfaces on first use.
    fn ensure_patterns(&mut self) -> Result<()> {
        if self.patterns.is_some() {
            return Ok(());
        }
        let mut patterns = Vec::with_capacity(self.registry.variants().len());
        for variant in self.registry.variants() {
            let pattern =
                Regex::new(&variant.model_regex).map_err(|e| GprovError::BadPattern {
                    code_name: variant.code_name.clone(),
                    pattern: variant.model_regex.clone(),
                    reason: e.to_string(),
                })?;
            patterns.push(pattern);
        }
        self.patterns = Some(patterns);
        Ok(())
    }

    fn log_unresolved(&mut self) {
        let board_mfr = self.source.string_field(dmi::BOARD_MANUFACTURER);
        let board_product = self.source.string_field(dmi::BOARD_PRODUCT);
        let sys_mfr = self.source.string_field(dmi::SYSTEM_MANUFACTURER);
        let sys_product = self.source.string_field(dmi::SYSTEM_PRODUCT);
        let cpu = self.source.string_field(dmi::PROCESSOR_VERSION);

        warn!(
            board_manufacturer = %board_mfr,
            board_product = %board_product,
            system_manufacturer = %sys_mfr,
            system_product = %sys_product,
            processor_version = %cpu,
            "no catalog entry matched this platform"
        );
        for line in self.registry.dump_all() {
            warn!(catalog = %line, "known platform");
        }
    }
}

/// One matching stage: scan the catalog against the given manufacturer and
/// product keywords; first entry satisfying all conditions wins. `patterns`
/// holds the precompiled model pattern for each variant, in catalog order.
fn match_stage(
    registry: &VariantRegistry,
    patterns: &[Regex],
    source: &mut DmiSource,
    manufacturer_key: &str,
    product_key: &str,
) -> Option<ResolvedVariant> {
    let manufacturer = source.string_field(manufacturer_key);
    let product = source.string_field(product_key);
    let default_sku =
        source.field_from_category(dmi::SYSTEM_INFO_TYPE, 0, dmi::SKU_FIELD);

    trace!(
        stage = manufacturer_key,
        manufacturer = %manufacturer,
        product = %product,
        sku = %default_sku,
        "matching stage"
    );

    for (variant, pattern) in registry.variants().iter().zip(patterns) {
        if variant.manufacturer != manufacturer || variant.product != product {
            continue;
        }

        let sku = match &variant.sku_source {
            Some(_) => read_sku(source, variant),
            None => default_sku.clone(),
        };

        if !pattern.is_match(&sku) {
            trace!(
                code_name = %variant.code_name,
                sku = %sku,
                "SKU pattern did not match"
            );
            continue;
        }

        if let Some(required_sig) = &variant.cpu_signature {
            let current = source.string_field(dmi::PROCESSOR_VERSION);
            if !multiset_eq(required_sig, &current) {
                debug!(
                    code_name = %variant.code_name,
                    required = %required_sig,
                    current = %current,
                    "CPU signature mismatch"
                );
                continue;
            }
        }

        let serial = source.string_field(&variant.serial_field);
        return Some(ResolvedVariant {
            descriptor: variant.clone(),
            manufacturer,
            product,
            sku,
            serial,
            via_fallback: false,
        });
    }

    None
}

/// Read the SKU from the descriptor's override field, or the default
/// System Information field when no override is declared.
fn read_sku(source: &mut DmiSource, variant: &VariantDescriptor) -> String {
    match &variant.sku_source {
        Some(sku) => source.field_from_category(sku.category, sku.entry, &sku.field),
        None => source.field_from_category(dmi::SYSTEM_INFO_TYPE, 0, dmi::SKU_FIELD),
    }
}

/// Multiset equality over newline-delimited lists: every current element is
/// consumed by exactly one equal required element and nothing is left over
/// on either side.
pub fn multiset_eq(required: &str, current: &str) -> bool {
    let required: Vec<&str> = lines_of(required);
    let mut remaining: Vec<&str> = lines_of(current);

    if required.len() != remaining.len() {
        return false;
    }
    for item in required {
        match remaining.iter().position(|r| *r == item) {
            Some(pos) => {
                remaining.swap_remove(pos);
            }
            None => return false,
        }
    }
    remaining.is_empty()
}

fn lines_of(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

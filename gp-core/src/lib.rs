//! gprov Core Library
//!
//! Platform identification and verification for the appliance-provisioning
//! pipeline. A wrong or unverified match can ship an incorrectly configured
//! unit, so everything here fails closed: identification resolves at most
//! one variant, and validation reports every discrepancy instead of the
//! first.
//!
//! # Module Structure
//!
//! - `dmi/` - Cached firmware identity access (keyword and table queries)
//! - `registry/` - Ordered catalog of platform variant descriptors
//! - `identify/` - Multi-stage matching of live identity data to a variant
//! - `spec/` - Required/detected hardware specification model
//! - `compare/` - Per-field-group comparison policies and diagnostics
//!
//! # Example
//!
//! ```no_run
//! use gp_core::{DmiSource, Identifier, VariantRegistry};
//!
//! let mut engine = Identifier::new(VariantRegistry::builtin(), DmiSource::live());
//! if let Some(resolved) = engine.identify().unwrap() {
//!     println!("{} serial {}", resolved.descriptor.code_name, resolved.serial);
//! }
//! ```

// Grouped modules
pub mod compare;
pub mod dmi;
pub mod identify;
pub mod registry;
pub mod spec;

// Standalone modules
pub mod constants;

// Re-export identity source
pub use dmi::DmiSource;

// Re-export registry types
pub use registry::{SkuSource, VariantDescriptor, VariantRegistry};

// Re-export identification engine
pub use identify::{multiset_eq, Identifier, ResolvedVariant};

// Re-export specification model
pub use spec::{
    DiskSpec, FieldKey, FirmwareVersions, HwSpec, NamedCheck, NicStats, RecoveryMedia,
};

// Re-export comparator
pub use compare::{
    choose_alternative, compare, populate, run_validation, sanity_check, Detectors,
    FixedDetectors, HardwareInfo, Mismatch, ValidationReport,
};

// Re-export error types
pub use gp_error::{GprovError, Result};

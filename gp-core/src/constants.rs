//! Constants and configuration values for gprov
//!
//! Centralizes all magic numbers, field keywords, and configuration defaults.
//! This is the SINGLE SOURCE OF TRUTH for all configuration values.
//! Never use magic numbers in other files - add them here first.

/// Firmware identity table access (SMBIOS/DMI via dmidecode)
pub mod dmi {
    /// Identity query binary
    pub const DMIDECODE: &str = "dmidecode";

    /// Lines starting a new record in a category dump
    pub const HANDLE_PREFIX: &str = "Handle";

    /// Diagnostic line emitted by the query tool after some keyword values;
    /// stripped before the value is cached
    pub const INVALID_ENTRY_PREFIX: &str = "Invalid entry";

    /// Board-level identity keywords (primary match stage)
    pub const BOARD_MANUFACTURER: &str = "baseboard-manufacturer";
    pub const BOARD_PRODUCT: &str = "baseboard-product-name";

    /// System-level identity keywords (alternate match stage)
    pub const SYSTEM_MANUFACTURER: &str = "system-manufacturer";
    pub const SYSTEM_PRODUCT: &str = "system-product-name";

    /// Processor version keyword; one line per installed processor
    pub const PROCESSOR_VERSION: &str = "processor-version";

    /// Default serial-number keyword when a descriptor does not name one
    pub const SYSTEM_SERIAL: &str = "system-serial-number";

    /// System Information table (DMI type 1)
    pub const SYSTEM_INFO_TYPE: u8 = 1;

    /// Default SKU field within the System Information table
    pub const SKU_FIELD: &str = "SKU Number:";

    /// Categories included in the diagnostic table dump
    pub const DUMP_CATEGORIES: &[u8] = &[0, 1, 2, 3, 4, 17];
}

/// Validation limits
pub mod limits {
    /// Minimum recovery-media size accepted in a required specification
    pub const RECOVERY_SIZE_FLOOR_MB: u64 = 1024;

    /// Memory size tolerance, percent of the required value
    pub const MEMORY_TOLERANCE_PERCENT: u64 = 1;

    /// Maximum registry/specification document size
    pub const MAX_DOCUMENT_SIZE: u64 = 10 * 1024 * 1024; // 10 MB
}

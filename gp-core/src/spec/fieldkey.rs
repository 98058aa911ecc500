//! Parsed identity-field keys
//!
//! Named identity checks in a required specification address either a
//! singular keyword (`system-serial-number`) or a field inside one record of
//! a table category (`"1[0] SKU Number:"`). The key syntax is parsed once
//! into a [`FieldKey`] when the document is validated, not re-parsed on
//! every detection pass.

use gp_error::{GprovError, Result};

use crate::dmi::DmiSource;

/// A validated identity-field address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKey {
    /// Singular keyword lookup (`dmidecode -s` style)
    Keyword(String),
    /// Field inside one record of a table category.
    /// `field` always carries its trailing colon.
    Table {
        category: u8,
        entry: usize,
        field: String,
    },
}

impl FieldKey {
    /// Parse `"<category>[<entry>] <field>:"`, `"<category> <field>:"` or a
    /// bare keyword. The entry index defaults to 0 and a trailing colon is
    /// appended to the field name when omitted.
    pub fn parse(key: &str) -> Result<Self> {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(bad_key(key, "empty key"));
        }

        let first = trimmed.chars().next().unwrap_or_default();
        if !first.is_ascii_digit() {
            return Ok(Self::Keyword(trimmed.to_string()));
        }

        let (head, field) = trimmed
            .split_once(char::is_whitespace)
            .ok_or_else(|| bad_key(key, "table key needs a field name"))?;
        let field = field.trim();
        if field.is_empty() {
            return Err(bad_key(key, "table key needs a field name"));
        }

        let (category, entry) = match head.split_once('[') {
            Some((cat, rest)) => {
                let idx = rest
                    .strip_suffix(']')
                    .ok_or_else(|| bad_key(key, "unterminated entry index"))?;
                let category = cat
                    .parse::<u8>()
                    .map_err(|_| bad_key(key, "bad category number"))?;
                let entry = idx
                    .parse::<usize>()
                    .map_err(|_| bad_key(key, "bad entry index"))?;
                (category, entry)
            }
            None => {
                let category = head
                    .parse::<u8>()
                    .map_err(|_| bad_key(key, "bad category number"))?;
                (category, 0)
            }
        };

        let mut field = field.to_string();
        if !field.ends_with(':') {
            field.push(':');
        }

        Ok(Self::Table {
            category,
            entry,
            field,
        })
    }

    /// Read the addressed value from an identity source
    pub fn resolve(&self, source: &mut DmiSource) -> String {
        match self {
            Self::Keyword(keyword) => source.string_field(keyword),
            Self::Table {
                category,
                entry,
                field,
            } => source.field_from_category(*category, *entry, field),
        }
    }
}

fn bad_key(key: &str, reason: &str) -> GprovError {
    GprovError::BadFieldKey {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

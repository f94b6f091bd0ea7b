//! Warehouse short code.

use core::fmt;

use serde::{Deserialize, Serialize};

use depot_core::{DomainError, DomainResult, ValueObject};

/// Short name identifying a warehouse ("WH", "SF01"): at most this many characters.
pub const MAX_CODE_LEN: usize = 5;

/// Validated warehouse short code.
///
/// Also used as the view location name, the prefix of every numbering
/// sequence and the prefix of rule names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WarehouseCode(String);

impl WarehouseCode {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let code = raw.trim();
        if code.is_empty() {
            return Err(DomainError::validation("short name cannot be empty"));
        }
        if code.chars().count() > MAX_CODE_LEN {
            return Err(DomainError::validation(format!(
                "short name cannot exceed {MAX_CODE_LEN} characters"
            )));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for WarehouseCode {}

impl fmt::Display for WarehouseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for WarehouseCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WarehouseCode> for String {
    fn from(value: WarehouseCode) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(WarehouseCode::parse("  WH ").unwrap().as_str(), "WH");
    }

    #[test]
    fn rejects_empty_and_long_codes() {
        assert!(matches!(WarehouseCode::parse("   "), Err(DomainError::Validation(_))));
        assert!(matches!(WarehouseCode::parse("TOOLONG"), Err(DomainError::Validation(_))));
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert!(WarehouseCode::parse("ÉÉÉÉÉ").is_ok());
    }

    #[test]
    fn deserialization_validates() {
        let err = serde_json::from_str::<WarehouseCode>("\"ABCDEF\"");
        assert!(err.is_err());
    }

    proptest! {
        #[test]
        fn accepts_every_short_alphanumeric_code(code in "[A-Z0-9]{1,5}") {
            let parsed = WarehouseCode::parse(&code).unwrap();
            prop_assert_eq!(parsed.as_str(), code.as_str());
        }

        #[test]
        fn rejects_every_code_longer_than_five(code in "[A-Z0-9]{6,12}") {
            prop_assert!(WarehouseCode::parse(&code).is_err());
        }
    }
}

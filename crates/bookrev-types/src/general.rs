use std::str::FromStr;

use garde::Validate;
use serde::{Deserialize, Serialize};

/// Guid as used by client records (user, book or combined comment guid).
/// Guids are opaque ascii identifiers, we only restrict length and charset.
#[derive(Debug, Clone, PartialEq, Eq, Validate, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[garde(transparent)]
pub struct ValidGuid(#[garde(ascii, length(min = 1, max = 128))] String);

impl FromStr for ValidGuid {
    type Err = garde::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let guid = ValidGuid(s.to_string());
        guid.validate()?;
        Ok(guid)
    }
}

impl AsRef<str> for ValidGuid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ValidGuid> for String {
    fn from(value: ValidGuid) -> Self {
        value.0
    }
}

impl std::fmt::Display for ValidGuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

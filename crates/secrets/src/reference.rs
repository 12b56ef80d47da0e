//! Parsing of `aws:<secret-id>[:<field>]` references
//!
//! The syntax has no escaping: an identifier or field containing `:` (such as
//! a full ARN) produces too many parts and is rejected.

use crate::SecretError;

/// Prefix marking a configuration string as a secret reference.
pub const REFERENCE_PREFIX: &str = "aws:";

/// A parsed secret reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReference {
    /// Identifier of the secret in the store (may be empty)
    pub secret_id: String,

    /// Field to extract from a structured secret
    pub field: Option<String>,
}

impl SecretReference {
    /// Check whether a string uses the reference prefix.
    #[must_use]
    pub fn is_reference(value: &str) -> bool {
        value.starts_with(REFERENCE_PREFIX)
    }

    /// Parse a configuration string.
    ///
    /// Returns `Ok(None)` for strings that are not references.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::InvalidReference`] when a prefixed string does
    /// not split into exactly 2 or 3 parts.
    pub fn parse(value: &str) -> Result<Option<Self>, SecretError> {
        if !Self::is_reference(value) {
            return Ok(None);
        }

        let parts: Vec<&str> = value.split(':').collect();
        match parts.as_slice() {
            [_, secret_id] => Ok(Some(Self {
                secret_id: (*secret_id).to_string(),
                field: None,
            })),
            [_, secret_id, field] => Ok(Some(Self {
                secret_id: (*secret_id).to_string(),
                field: Some((*field).to_string()),
            })),
            _ => Err(SecretError::InvalidReference {
                reference: value.to_string(),
            }),
        }
    }

    /// Whether the secret must be decoded as structured data.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        self.field.is_some()
    }
}

impl std::fmt::Display for SecretReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{REFERENCE_PREFIX}{}", self.secret_id)?;
        if let Some(field) = &self.field {
            write!(f, ":{field}")?;
        }
        Ok(())
    }
}

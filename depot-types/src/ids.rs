//! Identifier types for bins and documents.
//!
//! Names starting with `_` are reserved for service routes (`_sync`,
//! `_index`, ...) and are rejected for both bins and documents.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use uuid::Uuid;

/// Checks that `name` is usable as a bin or document identifier.
pub fn validate_name(kind: &'static str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidName { kind, name: name.to_string() });
    }
    if name.starts_with('_') || name.contains('/') {
        return Err(Error::InvalidName { kind, name: name.to_string() });
    }
    Ok(())
}

/// Identifier of a document within a bin.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    /// Generates a fresh random identifier (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parses a caller-supplied identifier.
    pub fn parse(s: &str) -> Result<Self> {
        validate_name("document", s)?;
        Ok(Self(s.to_string()))
    }

    /// Uses `s` when it is non-empty, otherwise generates a new identifier.
    pub fn or_generate(s: Option<&str>) -> Result<Self> {
        match s {
            Some(s) if !s.is_empty() => Self::parse(s),
            _ => Ok(Self::generate()),
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identifier, returning the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for DocId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

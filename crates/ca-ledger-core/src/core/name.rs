// crates/ca-ledger-core/src/core/name.rs
// ============================================================================
// Module: CA Ledger Names
// Description: Hierarchical names for CAs, identities, and keys.
// Purpose: Provide a validated, URI-rendered name type with prefix operations.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`Name`] is an ordered list of non-empty components rendered as a URI such
//! as `/example/KEY/1`. CA names, identity names, and key names all use this
//! type. The URI form is canonical: parsing and rendering are inverse
//! operations for every valid name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a rendered name in bytes.
pub const MAX_NAME_LENGTH: usize = 2048;

/// Component separator in the URI form.
const SEPARATOR: char = '/';

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when parsing or extending names.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// Name does not start with `/`.
    #[error("name must start with '/': {0}")]
    MissingLeadingSeparator(String),
    /// Name contains an empty component.
    #[error("name contains an empty component: {0}")]
    EmptyComponent(String),
    /// Name contains a component with whitespace or control characters.
    #[error("name component contains invalid characters: {0}")]
    InvalidComponent(String),
    /// Name exceeds [`MAX_NAME_LENGTH`].
    #[error("name exceeds {MAX_NAME_LENGTH} bytes")]
    TooLong,
}

// ============================================================================
// SECTION: Name
// ============================================================================

/// Hierarchical name rendered as `/component/component`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name {
    /// Ordered name components; empty for the root name.
    components: Vec<String>,
}

impl Name {
    /// Returns the root name `/`.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Parses a name from its URI form.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] when the URI is malformed.
    pub fn parse(uri: &str) -> Result<Self, NameError> {
        if uri.len() > MAX_NAME_LENGTH {
            return Err(NameError::TooLong);
        }
        let Some(rest) = uri.strip_prefix(SEPARATOR) else {
            return Err(NameError::MissingLeadingSeparator(uri.to_string()));
        };
        if rest.is_empty() {
            return Ok(Self::root());
        }
        let mut components = Vec::new();
        for component in rest.split(SEPARATOR) {
            validate_component(component).map_err(|err| match err {
                NameError::EmptyComponent(_) => NameError::EmptyComponent(uri.to_string()),
                other => other,
            })?;
            components.push(component.to_string());
        }
        Ok(Self {
            components,
        })
    }

    /// Returns the name components in order.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Returns the number of components.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true for the root name.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Returns true when `self` is a prefix of (or equal to) `other`.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.components.starts_with(&self.components)
    }

    /// Returns a new name with `component` appended.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] when the component is invalid or the result is
    /// too long.
    pub fn append(&self, component: &str) -> Result<Self, NameError> {
        validate_component(component)?;
        let mut components = self.components.clone();
        components.push(component.to_string());
        let name = Self {
            components,
        };
        if name.to_uri().len() > MAX_NAME_LENGTH {
            return Err(NameError::TooLong);
        }
        Ok(name)
    }

    /// Returns the first `count` components as a new name.
    #[must_use]
    pub fn prefix(&self, count: usize) -> Self {
        let end = count.min(self.components.len());
        Self {
            components: self.components[.. end].to_vec(),
        }
    }

    /// Renders the name in URI form.
    #[must_use]
    pub fn to_uri(&self) -> String {
        if self.components.is_empty() {
            return SEPARATOR.to_string();
        }
        let mut uri = String::new();
        for component in &self.components {
            uri.push(SEPARATOR);
            uri.push_str(component);
        }
        uri
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Name {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Name {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_uri())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates a single name component.
fn validate_component(component: &str) -> Result<(), NameError> {
    if component.is_empty() {
        return Err(NameError::EmptyComponent(component.to_string()));
    }
    if component.chars().any(|ch| ch == SEPARATOR || ch.is_whitespace() || ch.is_control()) {
        return Err(NameError::InvalidComponent(component.to_string()));
    }
    Ok(())
}

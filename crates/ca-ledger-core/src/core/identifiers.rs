// crates/ca-ledger-core/src/core/identifiers.rs
// ============================================================================
// Module: CA Ledger Identifiers
// Description: Opaque identifiers and tags for requests and certificates.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Request identifiers, certificate identifiers, status tags, and challenge
//! tags are opaque strings assigned by the protocol layer. Storage stores and
//! returns them verbatim; these wrappers only keep them from being mixed up.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Identifier of one in-flight certificate signing request.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a new request identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identifier assigned to an issued certificate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertId(String);

impl CertId {
    /// Creates a new certificate identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CertId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CertId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Status
// ============================================================================

/// Well-known lifecycle tags used by the protocol layer.
pub mod status {
    /// Request accepted, no challenge selected yet.
    pub const NEW: &str = "NEW";
    /// Challenge selected and awaiting the requester's answer.
    pub const CHALLENGE_PENDING: &str = "CHALLENGE_PENDING";
    /// Challenge answered correctly.
    pub const CHALLENGE_SUCCESS: &str = "CHALLENGE_SUCCESS";
    /// Challenge failed; the request will not be approved.
    pub const CHALLENGE_FAILURE: &str = "CHALLENGE_FAILURE";
}

/// Lifecycle tag of a certificate request.
///
/// # Invariants
/// - Storage treats the tag as opaque text and returns it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestStatus(String);

impl RequestStatus {
    /// Creates a status tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the [`status::NEW`] tag.
    #[must_use]
    pub fn new_request() -> Self {
        Self::new(status::NEW)
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RequestStatus {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Challenge Type
// ============================================================================

/// Tag naming a challenge implementation (for example `PIN` or `EMAIL`).
///
/// An empty tag means no challenge has been selected yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChallengeType(String);

impl ChallengeType {
    /// Creates a challenge tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when no challenge has been selected.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ChallengeType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ChallengeType {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// crates/ca-ledger-core/src/core/certificate.rs
// ============================================================================
// Module: CA Ledger Certificates
// Description: Opaque certificate payloads and issued certificate records.
// Purpose: Carry encoded certificates across the storage boundary.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Certificate encoding and signing live outside this crate. A [`Certificate`]
//! is the encoded blob together with the key name the encoding layer
//! extracted from it; the key name is the uniqueness anchor used by storage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CertId;
use crate::core::name::Name;

// ============================================================================
// SECTION: Certificate
// ============================================================================

/// Encoded certificate (or unsigned certificate request) plus its key name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Key name extracted from the encoded payload.
    key_name: Name,
    /// Encoded payload bytes.
    encoded: Vec<u8>,
}

impl Certificate {
    /// Wraps an encoded payload and its extracted key name.
    #[must_use]
    pub fn new(key_name: Name, encoded: impl Into<Vec<u8>>) -> Self {
        Self {
            key_name,
            encoded: encoded.into(),
        }
    }

    /// Returns the key name.
    #[must_use]
    pub const fn key_name(&self) -> &Name {
        &self.key_name
    }

    /// Returns the encoded payload.
    #[must_use]
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }
}

// ============================================================================
// SECTION: Issued Certificate
// ============================================================================

/// Certificate persisted after a successful challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCertificate {
    /// Identifier assigned at issuance.
    pub cert_id: CertId,
    /// Issued certificate.
    pub certificate: Certificate,
}

impl IssuedCertificate {
    /// Creates an issued certificate record.
    #[must_use]
    pub const fn new(cert_id: CertId, certificate: Certificate) -> Self {
        Self {
            cert_id,
            certificate,
        }
    }

    /// Returns the key name of the issued certificate.
    #[must_use]
    pub const fn key_name(&self) -> &Name {
        self.certificate.key_name()
    }
}

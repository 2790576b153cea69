// crates/ca-ledger-core/src/core/request.rs
// ============================================================================
// Module: CA Ledger Certificate Requests
// Description: In-flight signing requests and their challenge state.
// Purpose: Define the request entity exchanged with storage backends.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`CertificateRequest`] tracks one signing request through its challenge
//! lifecycle. The CA name, request identifier, and unsigned payload are fixed
//! at construction; status and challenge state change as the protocol layer
//! advances the request.
//!
//! Challenge secrets are an opaque JSON object. Backends that persist them as
//! text use [`encode_challenge_secrets`] and [`decode_challenge_secrets`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::certificate::Certificate;
use crate::core::identifiers::ChallengeType;
use crate::core::identifiers::RequestId;
use crate::core::identifiers::RequestStatus;
use crate::core::name::Name;
use crate::interfaces::StorageError;

// ============================================================================
// SECTION: Challenge Secrets
// ============================================================================

/// Challenge-specific state (attempt counters, expected answer hashes, ...).
pub type ChallengeSecrets = Map<String, Value>;

/// Serializes challenge secrets to compact JSON text with sorted keys.
///
/// Numbers keep their integer or float form, so decoding the text yields a
/// document equal to `secrets`.
///
/// # Errors
///
/// Returns [`StorageError::Invalid`] when the document cannot be serialized.
pub fn encode_challenge_secrets(secrets: &ChallengeSecrets) -> Result<String, StorageError> {
    serde_json::to_string(secrets).map_err(|err| StorageError::Invalid(err.to_string()))
}

/// Parses challenge secrets from stored text.
///
/// # Errors
///
/// Returns [`StorageError::Corrupt`] when the text is not a JSON object.
pub fn decode_challenge_secrets(text: &str) -> Result<ChallengeSecrets, StorageError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|err| StorageError::Corrupt(format!("challenge secrets: {err}")))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StorageError::Corrupt(format!(
            "challenge secrets must be a json object, found {}",
            json_kind(&other)
        ))),
    }
}

/// Returns a short label for a JSON value kind.
const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// SECTION: Certificate Request
// ============================================================================

/// In-flight certificate signing request.
///
/// # Invariants
/// - `ca_name`, `request_id`, and `cert_request` never change after
///   construction.
/// - The key name is always the one carried by `cert_request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRequest {
    /// CA this request targets.
    ca_name: Name,
    /// Identifier assigned by the protocol layer.
    request_id: RequestId,
    /// Lifecycle tag.
    status: RequestStatus,
    /// Challenge in progress; unset until one is selected.
    challenge_type: ChallengeType,
    /// Challenge-specific state.
    challenge_secrets: ChallengeSecrets,
    /// Unsigned certificate request payload.
    cert_request: Certificate,
}

impl CertificateRequest {
    /// Creates a request with no challenge selected.
    #[must_use]
    pub fn new(
        ca_name: Name,
        request_id: RequestId,
        status: RequestStatus,
        cert_request: Certificate,
    ) -> Self {
        Self {
            ca_name,
            request_id,
            status,
            challenge_type: ChallengeType::default(),
            challenge_secrets: ChallengeSecrets::new(),
            cert_request,
        }
    }

    /// Creates a request with explicit challenge state.
    #[must_use]
    pub const fn with_challenge(
        ca_name: Name,
        request_id: RequestId,
        status: RequestStatus,
        challenge_type: ChallengeType,
        challenge_secrets: ChallengeSecrets,
        cert_request: Certificate,
    ) -> Self {
        Self {
            ca_name,
            request_id,
            status,
            challenge_type,
            challenge_secrets,
            cert_request,
        }
    }

    /// Returns the targeted CA name.
    #[must_use]
    pub const fn ca_name(&self) -> &Name {
        &self.ca_name
    }

    /// Returns the request identifier.
    #[must_use]
    pub const fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Returns the lifecycle tag.
    #[must_use]
    pub const fn status(&self) -> &RequestStatus {
        &self.status
    }

    /// Returns the selected challenge tag.
    #[must_use]
    pub const fn challenge_type(&self) -> &ChallengeType {
        &self.challenge_type
    }

    /// Returns the challenge state.
    #[must_use]
    pub const fn challenge_secrets(&self) -> &ChallengeSecrets {
        &self.challenge_secrets
    }

    /// Returns the unsigned certificate request payload.
    #[must_use]
    pub const fn cert_request(&self) -> &Certificate {
        &self.cert_request
    }

    /// Returns the key name requested for certification.
    #[must_use]
    pub const fn key_name(&self) -> &Name {
        self.cert_request.key_name()
    }

    /// Replaces the lifecycle tag.
    pub fn set_status(&mut self, status: RequestStatus) {
        self.status = status;
    }

    /// Replaces the challenge tag and its state together.
    pub fn set_challenge(&mut self, challenge_type: ChallengeType, secrets: ChallengeSecrets) {
        self.challenge_type = challenge_type;
        self.challenge_secrets = secrets;
    }

    /// Returns mutable access to the challenge state.
    pub const fn challenge_secrets_mut(&mut self) -> &mut ChallengeSecrets {
        &mut self.challenge_secrets
    }
}

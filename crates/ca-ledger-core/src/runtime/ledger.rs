// crates/ca-ledger-core/src/runtime/ledger.rs
// ============================================================================
// Module: CA Ledger
// Description: Storage backend paired with the CA policy set.
// Purpose: Persist request state and route policy calls by CA name.
// Dependencies: crate::core, crate::interfaces, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`CaLedger`] is the entry point used by the protocol layer. It owns one
//! storage backend and the loaded policies, checks that requests target a
//! configured CA and a challenge that CA supports, and notifies the CA's
//! request update callback after every committed change.
//!
//! Storage faults (`NotFound`, `Conflict`) are returned unchanged for the
//! caller to turn into protocol-level denials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::core::CaPolicy;
use crate::core::CaRecommendation;
use crate::core::CertId;
use crate::core::Certificate;
use crate::core::CertificateRequest;
use crate::core::Name;
use crate::core::PolicyError;
use crate::core::RequestId;
use crate::interfaces::BoxedCaStorage;
use crate::interfaces::CaStorage;
use crate::interfaces::StorageError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Ledger errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No policy is configured for the CA name.
    #[error("unknown ca: {0}")]
    UnknownCa(String),
    /// Two policies share a CA name.
    #[error("duplicate ca policy: {0}")]
    DuplicateCa(String),
    /// The CA does not accept the selected challenge.
    #[error("ca {ca_name} does not support challenge {challenge}")]
    UnsupportedChallenge {
        /// CA name.
        ca_name: String,
        /// Rejected challenge tag.
        challenge: String,
    },
    /// Storage fault.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Policy handler fault.
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

// ============================================================================
// SECTION: Ledger
// ============================================================================

/// Storage backend plus the CA policy set.
pub struct CaLedger {
    /// Backend owning all persisted rows.
    storage: BoxedCaStorage,
    /// Policies keyed by CA name.
    policies: BTreeMap<Name, CaPolicy>,
}

impl CaLedger {
    /// Creates a ledger over `storage` with the given policies.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateCa`] when two policies share a name.
    pub fn new(
        storage: impl CaStorage + 'static,
        policies: Vec<CaPolicy>,
    ) -> Result<Self, LedgerError> {
        let mut by_name = BTreeMap::new();
        for policy in policies {
            let name = policy.ca_name.clone();
            if by_name.insert(name.clone(), policy).is_some() {
                return Err(LedgerError::DuplicateCa(name.to_uri()));
            }
        }
        Ok(Self {
            storage: Box::new(storage),
            policies: by_name,
        })
    }

    /// Returns the storage backend.
    #[must_use]
    pub fn storage(&self) -> &dyn CaStorage {
        self.storage.as_ref()
    }

    /// Returns the policy for `ca_name`, if configured.
    #[must_use]
    pub fn policy(&self, ca_name: &Name) -> Option<&CaPolicy> {
        self.policies.get(ca_name)
    }

    /// Returns all policies ordered by CA name.
    pub fn policies(&self) -> impl Iterator<Item = &CaPolicy> {
        self.policies.values()
    }

    /// Returns the policy for `ca_name` or [`LedgerError::UnknownCa`].
    fn require_policy(&self, ca_name: &Name) -> Result<&CaPolicy, LedgerError> {
        self.policies.get(ca_name).ok_or_else(|| LedgerError::UnknownCa(ca_name.to_uri()))
    }

    /// Checks that the request's challenge, if selected, is supported.
    fn check_challenge(policy: &CaPolicy, request: &CertificateRequest) -> Result<(), LedgerError> {
        let challenge = request.challenge_type();
        if challenge.is_unset() || policy.supports_challenge(challenge) {
            return Ok(());
        }
        Err(LedgerError::UnsupportedChallenge {
            ca_name: policy.ca_name.to_uri(),
            challenge: challenge.as_str().to_string(),
        })
    }

    /// Stores a new request and notifies the CA's update callback.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownCa`], [`LedgerError::UnsupportedChallenge`],
    /// or the storage fault (for example `Conflict`).
    pub fn submit_request(&self, request: &CertificateRequest) -> Result<(), LedgerError> {
        let policy = self.require_policy(request.ca_name())?;
        Self::check_challenge(policy, request)?;
        if let Err(err) = self.storage.add_request(request) {
            if err.is_conflict() {
                warn!(
                    ca = %request.ca_name(),
                    key = %request.key_name(),
                    "rejected request for key with a live artifact"
                );
            }
            return Err(err.into());
        }
        debug!(request_id = %request.request_id(), "request submitted");
        policy.notify_request_update(request);
        Ok(())
    }

    /// Fails when `request` names a different CA or key than the `stored` row.
    fn check_stored_identity(
        stored: &CertificateRequest,
        request: &CertificateRequest,
    ) -> Result<(), LedgerError> {
        if stored.ca_name() != request.ca_name() {
            return Err(StorageError::Invalid(format!(
                "request {} targets ca {}, not {}",
                request.request_id(),
                stored.ca_name(),
                request.ca_name()
            ))
            .into());
        }
        if stored.key_name() != request.key_name() {
            return Err(StorageError::Invalid(format!(
                "request {} holds key {}, not {}",
                request.request_id(),
                stored.key_name(),
                request.key_name()
            ))
            .into());
        }
        Ok(())
    }

    /// Persists the current request state (upsert) and notifies the callback.
    ///
    /// When the request is already stored, its CA and key name must match the
    /// stored row, so the policy checked is always the one owning the row.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownCa`], [`LedgerError::UnsupportedChallenge`],
    /// [`StorageError::Invalid`] for a CA or key mismatch, or the storage fault.
    pub fn record_request(&self, request: &CertificateRequest) -> Result<(), LedgerError> {
        match self.storage.get_request(request.request_id()) {
            Ok(stored) => Self::check_stored_identity(&stored, request)?,
            Err(StorageError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }
        let policy = self.require_policy(request.ca_name())?;
        Self::check_challenge(policy, request)?;
        self.storage.update_request(request)?;
        debug!(
            request_id = %request.request_id(),
            status = %request.status(),
            "request recorded"
        );
        policy.notify_request_update(request);
        Ok(())
    }

    /// Loads a pending request.
    ///
    /// # Errors
    ///
    /// Returns the storage fault (for example `NotFound`).
    pub fn request(&self, request_id: &RequestId) -> Result<CertificateRequest, LedgerError> {
        Ok(self.storage.get_request(request_id)?)
    }

    /// Replaces a pending request with its issued certificate.
    ///
    /// The update callback observes the request as it was when promoted.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownCa`] or the storage fault.
    pub fn issue_certificate(
        &self,
        request_id: &RequestId,
        cert_id: &CertId,
        certificate: &Certificate,
    ) -> Result<(), LedgerError> {
        let request = self.storage.get_request(request_id)?;
        let policy = self.require_policy(request.ca_name())?;
        self.storage.promote_request(request_id, cert_id, certificate)?;
        debug!(request_id = %request_id, cert_id = %cert_id, "certificate issued");
        policy.notify_request_update(&request);
        Ok(())
    }

    /// Deletes a pending request; a missing request is not an error.
    ///
    /// # Errors
    ///
    /// Returns the storage fault for backend failures.
    pub fn drop_request(&self, request_id: &RequestId) -> Result<(), LedgerError> {
        Ok(self.storage.delete_request(request_id)?)
    }

    /// Maps probe text to an identity name using the CA's probe handler.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownCa`] or [`PolicyError::InvalidProbeInput`].
    pub fn probe(&self, ca_name: &Name, requester_input: &str) -> Result<String, LedgerError> {
        Ok(self.require_policy(ca_name)?.probe(requester_input)?)
    }

    /// Recommends a related CA for probe text using the CA's handler.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownCa`] or [`PolicyError::InvalidProbeInput`].
    pub fn recommend_ca(
        &self,
        ca_name: &Name,
        requester_input: &str,
    ) -> Result<CaRecommendation, LedgerError> {
        Ok(self.require_policy(ca_name)?.recommend_ca(requester_input)?)
    }
}

// crates/ca-ledger-core/src/interfaces/mod.rs
// ============================================================================
// Module: CA Ledger Interfaces
// Description: Backend-agnostic storage contract for requests and certificates.
// Purpose: Define the persistence surface used by the protocol layer.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! [`CaStorage`] is the contract every persistence engine satisfies. Entities
//! are value copies handed across the boundary; backends never retain
//! references to caller-owned data between calls.
//!
//! Global invariant: for a given key name, at most one live artifact exists
//! across pending requests and issued certificates. Backends enforce it on
//! every insert path.
//!
//! All operations are blocking. Callers running on a cooperative scheduler
//! must dispatch them to a blocking-capable execution context. There is no
//! cancellation: each call runs to completion or fails.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::CertId;
use crate::core::Certificate;
use crate::core::CertificateRequest;
use crate::core::IssuedCertificate;
use crate::core::Name;
use crate::core::RequestId;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Storage errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `NotFound` and `Conflict` are recoverable by the caller; backends never
///   retry them internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// No row matches the requested identifier.
    #[error("ca storage record not found: {0}")]
    NotFound(String),
    /// Insert collides with an existing request, certificate, or key name.
    #[error("ca storage conflict: {0}")]
    Conflict(String),
    /// Caller supplied inconsistent data.
    #[error("ca storage invalid data: {0}")]
    Invalid(String),
    /// Stored data could not be decoded.
    #[error("ca storage corruption: {0}")]
    Corrupt(String),
    /// Backend I/O failure.
    #[error("ca storage io error: {0}")]
    Io(String),
    /// Backend reported an error.
    #[error("ca storage error: {0}")]
    Store(String),
    /// Backend could not be opened or its schema applied.
    #[error("ca storage initialization failed: {0}")]
    Init(String),
}

impl StorageError {
    /// Returns true for [`StorageError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true for [`StorageError::Conflict`].
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

// ============================================================================
// SECTION: CA Storage
// ============================================================================

/// Persistence contract for pending requests and issued certificates.
pub trait CaStorage: Send + Sync {
    /// Loads a pending request.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when no request has `request_id`.
    fn get_request(&self, request_id: &RequestId) -> Result<CertificateRequest, StorageError>;

    /// Inserts a new pending request.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] when the request identifier exists,
    /// or when a pending request or issued certificate already holds the
    /// request's key name.
    fn add_request(&self, request: &CertificateRequest) -> Result<(), StorageError>;

    /// Persists the status and challenge state of a request (upsert).
    ///
    /// When no request has the identifier, the request is inserted with all
    /// of its fields under the same checks as [`CaStorage::add_request`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] when the insert path collides.
    fn update_request(&self, request: &CertificateRequest) -> Result<(), StorageError>;

    /// Deletes a pending request; a missing request is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] only for backend failures.
    fn delete_request(&self, request_id: &RequestId) -> Result<(), StorageError>;

    /// Loads an issued certificate.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when no certificate has `cert_id`.
    fn get_certificate(&self, cert_id: &CertId) -> Result<IssuedCertificate, StorageError>;

    /// Inserts an issued certificate.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] when `cert_id` exists, or when an
    /// issued certificate or pending request already holds the key name.
    fn add_certificate(
        &self,
        cert_id: &CertId,
        certificate: &Certificate,
    ) -> Result<(), StorageError>;

    /// Replaces an issued certificate wholesale (upsert).
    ///
    /// When no certificate has `cert_id`, the certificate is inserted under
    /// the same checks as [`CaStorage::add_certificate`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] when the new key name collides.
    fn update_certificate(
        &self,
        cert_id: &CertId,
        certificate: &Certificate,
    ) -> Result<(), StorageError>;

    /// Deletes an issued certificate; a missing certificate is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] only for backend failures.
    fn delete_certificate(&self, cert_id: &CertId) -> Result<(), StorageError>;

    /// Atomically replaces a pending request with its issued certificate.
    ///
    /// Nothing changes when the call fails.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when the request is absent,
    /// [`StorageError::Invalid`] when the certificate key name differs from
    /// the request's, and [`StorageError::Conflict`] when `cert_id` or the key
    /// name is already issued.
    fn promote_request(
        &self,
        request_id: &RequestId,
        cert_id: &CertId,
        certificate: &Certificate,
    ) -> Result<(), StorageError>;

    /// Lists all pending requests ordered by request identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when a row cannot be read or decoded.
    fn list_requests(&self) -> Result<Vec<CertificateRequest>, StorageError>;

    /// Lists pending requests targeting `ca_name`, ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when a row cannot be read or decoded.
    fn list_requests_for_ca(&self, ca_name: &Name)
    -> Result<Vec<CertificateRequest>, StorageError>;

    /// Lists all issued certificates ordered by certificate identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when a row cannot be read or decoded.
    fn list_certificates(&self) -> Result<Vec<IssuedCertificate>, StorageError>;
}

impl<T: CaStorage + ?Sized> CaStorage for Box<T> {
    fn get_request(&self, request_id: &RequestId) -> Result<CertificateRequest, StorageError> {
        (**self).get_request(request_id)
    }

    fn add_request(&self, request: &CertificateRequest) -> Result<(), StorageError> {
        (**self).add_request(request)
    }

    fn update_request(&self, request: &CertificateRequest) -> Result<(), StorageError> {
        (**self).update_request(request)
    }

    fn delete_request(&self, request_id: &RequestId) -> Result<(), StorageError> {
        (**self).delete_request(request_id)
    }

    fn get_certificate(&self, cert_id: &CertId) -> Result<IssuedCertificate, StorageError> {
        (**self).get_certificate(cert_id)
    }

    fn add_certificate(
        &self,
        cert_id: &CertId,
        certificate: &Certificate,
    ) -> Result<(), StorageError> {
        (**self).add_certificate(cert_id, certificate)
    }

    fn update_certificate(
        &self,
        cert_id: &CertId,
        certificate: &Certificate,
    ) -> Result<(), StorageError> {
        (**self).update_certificate(cert_id, certificate)
    }

    fn delete_certificate(&self, cert_id: &CertId) -> Result<(), StorageError> {
        (**self).delete_certificate(cert_id)
    }

    fn promote_request(
        &self,
        request_id: &RequestId,
        cert_id: &CertId,
        certificate: &Certificate,
    ) -> Result<(), StorageError> {
        (**self).promote_request(request_id, cert_id, certificate)
    }

    fn list_requests(&self) -> Result<Vec<CertificateRequest>, StorageError> {
        (**self).list_requests()
    }

    fn list_requests_for_ca(
        &self,
        ca_name: &Name,
    ) -> Result<Vec<CertificateRequest>, StorageError> {
        (**self).list_requests_for_ca(ca_name)
    }

    fn list_certificates(&self) -> Result<Vec<IssuedCertificate>, StorageError> {
        (**self).list_certificates()
    }
}

/// Boxed storage backend as produced by the registry.
pub type BoxedCaStorage = Box<dyn CaStorage>;

// crates/ca-ledger-core/src/runtime/store.rs
// ============================================================================
// Module: CA Ledger In-Memory Store
// Description: In-memory CaStorage backend for tests and ephemeral CAs.
// Purpose: Provide a dependency-free backend with the full contract semantics.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryCaStorage`] keeps requests and certificates in ordered maps
//! behind one mutex. It enforces the same uniqueness rules as the relational
//! backend and registers as [`MEMORY_STORAGE_TYPE`]. Contents are lost when
//! the value is dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::CertId;
use crate::core::Certificate;
use crate::core::CertificateRequest;
use crate::core::IssuedCertificate;
use crate::core::Name;
use crate::core::RequestId;
use crate::interfaces::CaStorage;
use crate::interfaces::StorageError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Registry name of the in-memory backend.
pub const MEMORY_STORAGE_TYPE: &str = "ca-storage-memory";

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Rows held by the in-memory backend.
#[derive(Debug, Default)]
struct MemoryTables {
    /// Pending requests keyed by request identifier.
    requests: BTreeMap<RequestId, CertificateRequest>,
    /// Issued certificates keyed by certificate identifier.
    certificates: BTreeMap<CertId, IssuedCertificate>,
}

impl MemoryTables {
    /// Returns true when a pending request holds `key_name`.
    fn request_holds_key(&self, key_name: &Name) -> bool {
        self.requests.values().any(|request| request.key_name() == key_name)
    }

    /// Returns true when an issued certificate other than `except` holds `key_name`.
    fn certificate_holds_key(&self, key_name: &Name, except: Option<&CertId>) -> bool {
        self.certificates
            .values()
            .any(|issued| issued.key_name() == key_name && Some(&issued.cert_id) != except)
    }

    /// Inserts a request after the uniqueness checks.
    fn insert_request(&mut self, request: &CertificateRequest) -> Result<(), StorageError> {
        let key_name = request.key_name();
        if self.request_holds_key(key_name) {
            return Err(StorageError::Conflict(format!("request for {key_name} already exists")));
        }
        if self.certificate_holds_key(key_name, None) {
            return Err(StorageError::Conflict(format!("cert for {key_name} already exists")));
        }
        if self.requests.contains_key(request.request_id()) {
            return Err(StorageError::Conflict(format!(
                "request {} already exists",
                request.request_id()
            )));
        }
        self.requests.insert(request.request_id().clone(), request.clone());
        Ok(())
    }

    /// Inserts a certificate after the uniqueness checks.
    fn insert_certificate(
        &mut self,
        cert_id: &CertId,
        certificate: &Certificate,
    ) -> Result<(), StorageError> {
        let key_name = certificate.key_name();
        if self.certificates.contains_key(cert_id) {
            return Err(StorageError::Conflict(format!("certificate {cert_id} already exists")));
        }
        if self.certificate_holds_key(key_name, None) {
            return Err(StorageError::Conflict(format!("cert for {key_name} already exists")));
        }
        if self.request_holds_key(key_name) {
            return Err(StorageError::Conflict(format!(
                "pending request for {key_name} exists"
            )));
        }
        self.certificates
            .insert(cert_id.clone(), IssuedCertificate::new(cert_id.clone(), certificate.clone()));
        Ok(())
    }
}

/// In-memory CA storage backend.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCaStorage {
    /// Request and certificate tables protected by a mutex.
    tables: Arc<Mutex<MemoryTables>>,
}

impl InMemoryCaStorage {
    /// Creates an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(MemoryTables::default())),
        }
    }

    /// Locks the tables.
    fn lock(&self) -> Result<MutexGuard<'_, MemoryTables>, StorageError> {
        self.tables.lock().map_err(|_| StorageError::Store("ca storage mutex poisoned".to_string()))
    }
}

impl CaStorage for InMemoryCaStorage {
    fn get_request(&self, request_id: &RequestId) -> Result<CertificateRequest, StorageError> {
        self.lock()?
            .requests
            .get(request_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("request {request_id}")))
    }

    fn add_request(&self, request: &CertificateRequest) -> Result<(), StorageError> {
        self.lock()?.insert_request(request)
    }

    fn update_request(&self, request: &CertificateRequest) -> Result<(), StorageError> {
        let mut tables = self.lock()?;
        if let Some(existing) = tables.requests.get_mut(request.request_id()) {
            existing.set_status(request.status().clone());
            existing.set_challenge(
                request.challenge_type().clone(),
                request.challenge_secrets().clone(),
            );
            return Ok(());
        }
        tables.insert_request(request)
    }

    fn delete_request(&self, request_id: &RequestId) -> Result<(), StorageError> {
        self.lock()?.requests.remove(request_id);
        Ok(())
    }

    fn get_certificate(&self, cert_id: &CertId) -> Result<IssuedCertificate, StorageError> {
        self.lock()?
            .certificates
            .get(cert_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("certificate {cert_id}")))
    }

    fn add_certificate(
        &self,
        cert_id: &CertId,
        certificate: &Certificate,
    ) -> Result<(), StorageError> {
        self.lock()?.insert_certificate(cert_id, certificate)
    }

    fn update_certificate(
        &self,
        cert_id: &CertId,
        certificate: &Certificate,
    ) -> Result<(), StorageError> {
        let mut tables = self.lock()?;
        let current_key = tables.certificates.get(cert_id).map(|issued| issued.key_name().clone());
        let Some(current_key) = current_key else {
            return tables.insert_certificate(cert_id, certificate);
        };
        let key_name = certificate.key_name();
        if tables.certificate_holds_key(key_name, Some(cert_id)) {
            return Err(StorageError::Conflict(format!("cert for {key_name} already exists")));
        }
        if &current_key != key_name && tables.request_holds_key(key_name) {
            return Err(StorageError::Conflict(format!("pending request for {key_name} exists")));
        }
        tables
            .certificates
            .insert(cert_id.clone(), IssuedCertificate::new(cert_id.clone(), certificate.clone()));
        Ok(())
    }

    fn delete_certificate(&self, cert_id: &CertId) -> Result<(), StorageError> {
        self.lock()?.certificates.remove(cert_id);
        Ok(())
    }

    fn promote_request(
        &self,
        request_id: &RequestId,
        cert_id: &CertId,
        certificate: &Certificate,
    ) -> Result<(), StorageError> {
        let mut tables = self.lock()?;
        let Some(request) = tables.requests.remove(request_id) else {
            return Err(StorageError::NotFound(format!("request {request_id}")));
        };
        if request.key_name() != certificate.key_name() {
            let message = format!(
                "certificate key {} does not match request key {}",
                certificate.key_name(),
                request.key_name()
            );
            tables.requests.insert(request_id.clone(), request);
            return Err(StorageError::Invalid(message));
        }
        if let Err(err) = tables.insert_certificate(cert_id, certificate) {
            tables.requests.insert(request_id.clone(), request);
            return Err(err);
        }
        Ok(())
    }

    fn list_requests(&self) -> Result<Vec<CertificateRequest>, StorageError> {
        Ok(self.lock()?.requests.values().cloned().collect())
    }

    fn list_requests_for_ca(
        &self,
        ca_name: &Name,
    ) -> Result<Vec<CertificateRequest>, StorageError> {
        Ok(self
            .lock()?
            .requests
            .values()
            .filter(|request| request.ca_name() == ca_name)
            .cloned()
            .collect())
    }

    fn list_certificates(&self) -> Result<Vec<IssuedCertificate>, StorageError> {
        Ok(self.lock()?.certificates.values().cloned().collect())
    }
}

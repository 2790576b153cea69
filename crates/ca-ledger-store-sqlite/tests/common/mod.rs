// crates/ca-ledger-store-sqlite/tests/common/mod.rs
// =============================================================================
// Module: SQLite Store Test Helpers
// Description: Shared fixtures for SQLite CA store tests.
// Purpose: Open throwaway stores and build request/certificate values.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(clippy::expect_used, reason = "Fixtures use fixed, valid inputs.")]

use std::path::PathBuf;

use ca_ledger_core::CertId;
use ca_ledger_core::Certificate;
use ca_ledger_core::CertificateRequest;
use ca_ledger_core::Name;
use ca_ledger_core::RequestId;
use ca_ledger_core::RequestStatus;
use ca_ledger_store_sqlite::DATABASE_FILE_NAME;
use ca_ledger_store_sqlite::SqliteCaStorage;
use tempfile::TempDir;

/// Opens a store in a fresh temporary directory.
pub fn temp_store() -> (TempDir, SqliteCaStorage) {
    let dir = TempDir::new().expect("temp dir");
    let store = open_in(&dir);
    (dir, store)
}

/// Opens the store located in `dir`.
pub fn open_in(dir: &TempDir) -> SqliteCaStorage {
    SqliteCaStorage::open(location(dir)).expect("open sqlite store")
}

/// Returns `dir` as a location hint.
pub fn location(dir: &TempDir) -> &str {
    dir.path().to_str().expect("utf-8 temp path")
}

/// Returns the database file inside `dir`.
pub fn database_path(dir: &TempDir) -> PathBuf {
    dir.path().join(DATABASE_FILE_NAME)
}

/// Parses a fixed test name.
pub fn name(uri: &str) -> Name {
    Name::parse(uri).expect("valid test name")
}

/// Returns an issued certificate payload for `key_name`.
pub fn certificate_for(key_name: &str, body: &str) -> Certificate {
    Certificate::new(name(key_name), body.as_bytes().to_vec())
}

/// Returns a `NEW` request with no challenge selected.
pub fn request(request_id: &str, ca_name: &str, key_name: &str) -> CertificateRequest {
    CertificateRequest::new(
        name(ca_name),
        RequestId::new(request_id),
        RequestStatus::new_request(),
        Certificate::new(name(key_name), format!("csr:{key_name}").into_bytes()),
    )
}

/// Shorthand for a request identifier.
pub fn rid(value: &str) -> RequestId {
    RequestId::new(value)
}

/// Shorthand for a certificate identifier.
pub fn cid(value: &str) -> CertId {
    CertId::new(value)
}

// crates/ca-ledger-core/tests/common/mod.rs
// =============================================================================
// Module: Core Test Helpers
// Description: Shared fixtures for request and certificate tests.
// Purpose: Reduce duplication across integration tests for ca-ledger-core.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(clippy::expect_used, reason = "Fixtures use fixed, valid names.")]

use ca_ledger_core::CertId;
use ca_ledger_core::Certificate;
use ca_ledger_core::CertificateRequest;
use ca_ledger_core::Name;
use ca_ledger_core::RequestId;
use ca_ledger_core::RequestStatus;

/// Parses a fixed test name.
pub fn name(uri: &str) -> Name {
    Name::parse(uri).expect("valid test name")
}

/// Returns an unsigned request payload for `key_name`.
pub fn cert_request_for(key_name: &str) -> Certificate {
    Certificate::new(name(key_name), format!("csr:{key_name}").into_bytes())
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
        cert_request_for(key_name),
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

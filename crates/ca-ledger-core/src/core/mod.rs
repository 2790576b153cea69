// crates/ca-ledger-core/src/core/mod.rs
// ============================================================================
// Module: CA Ledger Core Types
// Description: Names, identifiers, entities, and CA policy.
// Purpose: Group the value types shared by storage, registry, and config.
// Dependencies: crate::core::*
// ============================================================================

//! ## Overview
//! Core value types for the CA ledger: hierarchical names, opaque identifiers,
//! request and certificate entities, and the per-CA policy model.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod certificate;
pub mod identifiers;
pub mod name;
pub mod policy;
pub mod request;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use certificate::Certificate;
pub use certificate::IssuedCertificate;
pub use identifiers::CertId;
pub use identifiers::ChallengeType;
pub use identifiers::RequestId;
pub use identifiers::RequestStatus;
pub use identifiers::status;
pub use name::MAX_NAME_LENGTH;
pub use name::Name;
pub use name::NameError;
pub use policy::CaPolicy;
pub use policy::CaRecommendation;
pub use policy::DefaultProbeHandler;
pub use policy::DefaultRecommendCaHandler;
pub use policy::NoopRequestUpdateCallback;
pub use policy::PolicyError;
pub use policy::ProbeHandler;
pub use policy::RecommendCaHandler;
pub use policy::RequestUpdateCallback;
pub use request::CertificateRequest;
pub use request::ChallengeSecrets;
pub use request::decode_challenge_secrets;
pub use request::encode_challenge_secrets;

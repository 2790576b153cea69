// crates/ca-ledger-core/src/lib.rs
// ============================================================================
// Module: CA Ledger Core Library
// Description: Public API surface for the CA ledger core.
// Purpose: Expose entities, the storage contract, the registry, and policy.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! CA ledger core is the bookkeeping layer of a certificate authority. It
//! tracks pending signing requests through their challenge lifecycle, persists
//! issued certificates behind a pluggable storage contract, and carries the
//! per-CA policy consulted by the protocol layer. Wire protocol, signing, and
//! challenge algorithms live outside this crate.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::*;

pub use interfaces::BoxedCaStorage;
pub use interfaces::CaStorage;
pub use interfaces::StorageError;
pub use runtime::CaLedger;
pub use runtime::InMemoryCaStorage;
pub use runtime::LedgerError;
pub use runtime::MEMORY_STORAGE_TYPE;
pub use runtime::RegistryError;
pub use runtime::StorageFactory;
pub use runtime::StorageRegistry;
pub use runtime::global_registry;
pub use runtime::open_global_backend;
pub use runtime::register_global_backend;

// crates/ca-ledger-core/src/runtime/mod.rs
// ============================================================================
// Module: CA Ledger Runtime
// Description: Backend registry, in-memory backend, and ledger facade.
// Purpose: Wire storage backends and CA policy together at startup.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Runtime pieces used once the process starts: the backend registry that
//! turns a configured backend name into a [`crate::CaStorage`], the
//! in-memory backend, and [`CaLedger`], which pairs a backend with the CA
//! policy set.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod ledger;
pub mod registry;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use ledger::CaLedger;
pub use ledger::LedgerError;
pub use registry::RegistryError;
pub use registry::StorageFactory;
pub use registry::StorageRegistry;
pub use registry::global_registry;
pub use registry::open_global_backend;
pub use registry::register_global_backend;
pub use store::InMemoryCaStorage;
pub use store::MEMORY_STORAGE_TYPE;

// crates/ca-ledger-store-sqlite/src/lib.rs
// ============================================================================
// Module: CA Ledger SQLite Store Library
// Description: Public API surface for the SQLite storage backend.
// Purpose: Expose the backend, its configuration, and registry hooks.
// Dependencies: crate::store
// ============================================================================

//! ## Overview
//! Reference [`ca_ledger_core::CaStorage`] backend persisting pending
//! requests and issued certificates in a single `SQLite` file. The on-disk
//! schema is fixed so existing CA databases open unchanged.

pub mod store;

pub use store::DATABASE_FILE_NAME;
pub use store::DEFAULT_DIRECTORY_NAME;
pub use store::STORAGE_TYPE;
pub use store::SqliteCaStorage;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::register_backend;
pub use store::register_global_backend;

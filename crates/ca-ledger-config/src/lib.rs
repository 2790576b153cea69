// crates/ca-ledger-config/src/lib.rs
// ============================================================================
// Module: CA Ledger Config Library
// Description: Public API surface for CA policy configuration.
// Purpose: Expose the configuration model, loader, and errors.
// Dependencies: crate::config
// ============================================================================

//! ## Overview
//! Loads the CA configuration document (one section per CA plus an optional
//! storage backend selection) and turns it into [`ca_ledger_core::CaPolicy`]
//! values. Loading is read-only and all-or-nothing: any violation rejects the
//! whole document.

pub mod config;

pub use config::CONFIG_ENV_VAR;
pub use config::CaConfig;
pub use config::CaSection;
pub use config::ConfigError;
pub use config::DEFAULT_CONFIG_NAME;
pub use config::StorageConfig;
pub use config::load_policies;

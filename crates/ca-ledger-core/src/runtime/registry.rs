// crates/ca-ledger-core/src/runtime/registry.rs
// ============================================================================
// Module: Storage Backend Registry
// Description: Maps backend type names to storage constructors.
// Purpose: Select a CaStorage backend by configuration value.
// Dependencies: crate::interfaces, crate::runtime::store, tracing
// ============================================================================

//! ## Overview
//! [`StorageRegistry`] is ordinary data: a map from backend type name to a
//! constructor taking a location hint. Registration is append-only; a second
//! registration under the same name is rejected. Each backend crate registers
//! itself during process initialization, before any lookup, and the CA opens
//! its configured backend by name once at startup.
//!
//! A process-wide instance is available through [`global_registry`]; it is
//! created on first use with the built-in in-memory backend registered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::RwLock;

use thiserror::Error;
use tracing::debug;

use crate::interfaces::BoxedCaStorage;
use crate::interfaces::StorageError;
use crate::runtime::store::InMemoryCaStorage;
use crate::runtime::store::MEMORY_STORAGE_TYPE;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No constructor is registered under the requested name.
    #[error("unknown storage backend: {0}")]
    UnknownBackend(String),
    /// A constructor is already registered under the name.
    #[error("storage backend already registered: {0}")]
    AlreadyRegistered(String),
    /// The process-wide registry lock is poisoned.
    #[error("storage registry lock poisoned")]
    Poisoned,
    /// The constructor failed to open the backend.
    #[error(transparent)]
    Init(#[from] StorageError),
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Constructor signature: location hint to opened backend.
pub type StorageFactory = dyn Fn(&str) -> Result<BoxedCaStorage, StorageError> + Send + Sync;

/// Append-only map from backend type name to constructor.
#[derive(Default)]
pub struct StorageRegistry {
    /// Constructors keyed by backend type name.
    factories: BTreeMap<String, Arc<StorageFactory>>,
}

impl StorageRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Creates a registry with the built-in in-memory backend registered.
    #[must_use]
    pub fn with_builtin_backends() -> Self {
        let mut factories: BTreeMap<String, Arc<StorageFactory>> = BTreeMap::new();
        factories.insert(
            MEMORY_STORAGE_TYPE.to_string(),
            Arc::new(|_location: &str| -> Result<BoxedCaStorage, StorageError> {
                Ok(Box::new(InMemoryCaStorage::new()))
            }),
        );
        Self {
            factories,
        }
    }

    /// Registers a constructor under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyRegistered`] when `name` is taken.
    pub fn register_backend<F>(
        &mut self,
        name: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&str) -> Result<BoxedCaStorage, StorageError> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        debug!(backend = %name, "registered storage backend");
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Opens the backend registered under `name` at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownBackend`] for unregistered names and
    /// [`RegistryError::Init`] when the constructor fails.
    pub fn open(&self, name: &str, location: &str) -> Result<BoxedCaStorage, RegistryError> {
        let factory = self.factory(name)?;
        debug!(backend = %name, location = %location, "opening storage backend");
        Ok(factory(location)?)
    }

    /// Returns the constructor registered under `name`.
    fn factory(&self, name: &str) -> Result<Arc<StorageFactory>, RegistryError> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownBackend(name.to_string()))
    }

    /// Returns true when a constructor is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Returns the registered backend names in order.
    #[must_use]
    pub fn backend_names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageRegistry").field("backends", &self.backend_names()).finish()
    }
}

// ============================================================================
// SECTION: Process-Wide Registry
// ============================================================================

/// Process-wide registry instance.
static GLOBAL_REGISTRY: OnceLock<RwLock<StorageRegistry>> = OnceLock::new();

/// Returns the process-wide registry, creating it with built-in backends.
pub fn global_registry() -> &'static RwLock<StorageRegistry> {
    GLOBAL_REGISTRY.get_or_init(|| RwLock::new(StorageRegistry::with_builtin_backends()))
}

/// Registers a constructor in the process-wide registry.
///
/// # Errors
///
/// Returns [`RegistryError::AlreadyRegistered`] when `name` is taken and
/// [`RegistryError::Poisoned`] when the registry lock is poisoned.
pub fn register_global_backend<F>(name: impl Into<String>, factory: F) -> Result<(), RegistryError>
where
    F: Fn(&str) -> Result<BoxedCaStorage, StorageError> + Send + Sync + 'static,
{
    global_registry()
        .write()
        .map_err(|_| RegistryError::Poisoned)?
        .register_backend(name, factory)
}

/// Opens a backend from the process-wide registry.
///
/// The registry lock is released before the constructor runs.
///
/// # Errors
///
/// Returns [`RegistryError`] when the name is unknown, the lock is poisoned,
/// or the constructor fails.
pub fn open_global_backend(name: &str, location: &str) -> Result<BoxedCaStorage, RegistryError> {
    let factory = global_registry().read().map_err(|_| RegistryError::Poisoned)?.factory(name)?;
    debug!(backend = %name, location = %location, "opening storage backend");
    Ok(factory(location)?)
}

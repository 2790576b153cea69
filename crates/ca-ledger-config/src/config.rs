// crates/ca-ledger-config/src/config.rs
// ============================================================================
// Module: CA Ledger Configuration
// Description: Configuration loading and validation for CA policies.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: ca-ledger-core, serde, serde_json, toml, tracing
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file (or JSON, selected by a `.json`
//! extension) with strict size and path limits. Unknown fields are rejected,
//! every CA section is validated before any policy is built, and a single
//! violation fails the whole load so no partial policy set is ever used.
//! The source document is only read, never written back.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use ca_ledger_core::BoxedCaStorage;
use ca_ledger_core::CaPolicy;
use ca_ledger_core::ChallengeType;
use ca_ledger_core::Name;
use ca_ledger_core::RegistryError;
use ca_ledger_core::open_global_backend;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use tracing::info;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "ca-ledger.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CA_LEDGER_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of challenges per CA.
pub(crate) const MAX_CHALLENGES: usize = 64;
/// Maximum length of a challenge tag.
pub(crate) const MAX_CHALLENGE_LENGTH: usize = 64;
/// Maximum number of related CAs per CA.
pub(crate) const MAX_RELATED_CAS: usize = 256;
/// Maximum length of the optional descriptive strings.
pub(crate) const MAX_DESCRIPTION_LENGTH: usize = 4096;
/// Maximum length of a storage backend name.
pub(crate) const MAX_BACKEND_NAME_LENGTH: usize = 128;
/// Maximum certificate validity in days.
pub(crate) const MAX_VALIDITY_DAYS: u64 = 36_500;
/// Seconds per day.
const SECONDS_PER_DAY: u64 = 86_400;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// CA ledger configuration document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaConfig {
    /// Optional storage backend selection.
    #[serde(default)]
    pub storage: Option<StorageConfig>,
    /// One section per CA.
    #[serde(default)]
    pub ca: Vec<CaSection>,
}

impl CaConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: `path`, then [`CONFIG_ENV_VAR`], then
    /// [`DEFAULT_CONFIG_NAME`] in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config = if is_json_path(&resolved) {
            Self::from_json_str(content)?
        } else {
            Self::from_toml_str(content)?
        };
        info!(
            path = %resolved.display(),
            cas = config.ca.len(),
            "loaded ca configuration"
        );
        Ok(config)
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document with the same fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(storage) = &self.storage {
            storage.validate()?;
        }
        if self.ca.is_empty() {
            return Err(ConfigError::Invalid("at least one ca section is required".to_string()));
        }
        let mut seen = BTreeSet::new();
        for section in &self.ca {
            section.validate()?;
            if !seen.insert(&section.name) {
                return Err(ConfigError::Invalid(format!("duplicate ca name: {}", section.name)));
            }
        }
        Ok(())
    }

    /// Builds one policy per CA section, in document order.
    #[must_use]
    pub fn policies(&self) -> Vec<CaPolicy> {
        self.ca.iter().map(CaSection::to_policy).collect()
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Registered backend type name.
    pub backend: String,
    /// Backend location hint; empty selects the backend default.
    #[serde(default)]
    pub location: String,
}

impl StorageConfig {
    /// Validates the storage selection.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for empty or oversized values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let backend = self.backend.trim();
        if backend.is_empty() {
            return Err(ConfigError::Invalid("storage.backend must be non-empty".to_string()));
        }
        if backend.len() > MAX_BACKEND_NAME_LENGTH {
            return Err(ConfigError::Invalid("storage.backend exceeds max length".to_string()));
        }
        if !self.location.is_empty() {
            validate_path_string("storage.location", &self.location)?;
        }
        Ok(())
    }

    /// Opens the selected backend from the process-wide registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownBackend`] when the backend was never
    /// registered and [`RegistryError::Init`] when it cannot be opened.
    pub fn open(&self) -> Result<BoxedCaStorage, RegistryError> {
        debug!(backend = %self.backend, "opening configured storage backend");
        open_global_backend(self.backend.trim(), &self.location)
    }
}

/// Policy section for one CA.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaSection {
    /// CA name.
    pub name: Name,
    /// Related CA names offered by recommendation.
    #[serde(default)]
    pub related_cas: Vec<Name>,
    /// Freshness period in seconds.
    pub freshness_period_secs: u64,
    /// Certificate validity period in days.
    pub validity_period_days: u64,
    /// Supported challenge tags, in preference order.
    pub challenges: Vec<String>,
    /// Probe input format description; empty means probing is unsupported.
    #[serde(default)]
    pub probe: Option<String>,
    /// Targeted list format description.
    #[serde(default)]
    pub targeted_list: Option<String>,
    /// Free-form CA information.
    #[serde(default)]
    pub ca_info: Option<String>,
}

impl CaSection {
    /// Validates the section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = &self.name;
        if self.freshness_period_secs == 0 {
            return Err(ConfigError::Invalid(format!(
                "ca {name}: freshness_period_secs must be greater than zero"
            )));
        }
        if self.validity_period_days == 0 || self.validity_period_days > MAX_VALIDITY_DAYS {
            return Err(ConfigError::Invalid(format!(
                "ca {name}: validity_period_days must be between 1 and {MAX_VALIDITY_DAYS}"
            )));
        }
        self.validate_challenges()?;
        if self.related_cas.len() > MAX_RELATED_CAS {
            return Err(ConfigError::Invalid(format!("ca {name}: too many related_cas entries")));
        }
        if self.related_cas.contains(name) {
            return Err(ConfigError::Invalid(format!(
                "ca {name}: related_cas must not include the ca itself"
            )));
        }
        for (field, value) in [
            ("probe", &self.probe),
            ("targeted_list", &self.targeted_list),
            ("ca_info", &self.ca_info),
        ] {
            if value.as_ref().is_some_and(|text| text.len() > MAX_DESCRIPTION_LENGTH) {
                return Err(ConfigError::Invalid(format!("ca {name}: {field} exceeds max length")));
            }
        }
        Ok(())
    }

    /// Validates the challenge list.
    fn validate_challenges(&self) -> Result<(), ConfigError> {
        let name = &self.name;
        if self.challenges.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "ca {name}: at least one challenge is required"
            )));
        }
        if self.challenges.len() > MAX_CHALLENGES {
            return Err(ConfigError::Invalid(format!("ca {name}: too many challenges")));
        }
        let mut seen = BTreeSet::new();
        for challenge in &self.challenges {
            if challenge.is_empty() || challenge.len() > MAX_CHALLENGE_LENGTH {
                return Err(ConfigError::Invalid(format!(
                    "ca {name}: challenge tags must be 1 to {MAX_CHALLENGE_LENGTH} bytes"
                )));
            }
            if !challenge.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-') {
                return Err(ConfigError::Invalid(format!(
                    "ca {name}: invalid challenge tag {challenge}"
                )));
            }
            if !seen.insert(challenge.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "ca {name}: duplicate challenge {challenge}"
                )));
            }
        }
        Ok(())
    }

    /// Builds the policy with default handlers.
    #[must_use]
    pub fn to_policy(&self) -> CaPolicy {
        let mut policy = CaPolicy::new(
            self.name.clone(),
            Duration::from_secs(self.freshness_period_secs),
            Duration::from_secs(self.validity_period_days.saturating_mul(SECONDS_PER_DAY)),
            self.challenges.iter().map(ChallengeType::new).collect(),
        );
        policy.related_ca_names.clone_from(&self.related_cas);
        policy.probe_format = non_empty(self.probe.as_deref());
        policy.targeted_list_format = non_empty(self.targeted_list.as_deref());
        policy.ca_info = non_empty(self.ca_info.as_deref());
        policy
    }
}

/// Loads the configuration and returns its policies.
///
/// # Errors
///
/// Returns [`ConfigError`] when loading or validation fails; no policies are
/// returned in that case.
pub fn load_policies(path: Option<&Path>) -> Result<Vec<CaPolicy>, ConfigError> {
    Ok(CaConfig::load(path)?.policies())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// Document parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Returns true when the path selects the JSON document format.
fn is_json_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Maps empty optional strings to `None`.
fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|text| !text.is_empty()).map(str::to_string)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

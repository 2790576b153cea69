// crates/ca-ledger-core/src/core/policy.rs
// ============================================================================
// Module: CA Policy
// Description: Per-CA policy record and injectable policy handlers.
// Purpose: Expose challenge support and probe interpretation to the protocol layer.
// Dependencies: crate::core, thiserror, tracing
// ============================================================================

//! ## Overview
//! A [`CaPolicy`] is declarative CA data (name, related CAs, periods,
//! supported challenges, optional probe descriptions) plus three injected
//! behaviours:
//!
//! - [`ProbeHandler`] maps requester probe text to an identity name.
//! - [`RecommendCaHandler`] picks a related CA and identity for probe text.
//! - [`RequestUpdateCallback`] is notified whenever a request's persisted
//!   state changes.
//!
//! Each handler is a one-method trait implemented for matching closures, so a
//! policy author can pass a plain function. Handlers run synchronously on the
//! caller's thread and must not block indefinitely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::core::identifiers::ChallengeType;
use crate::core::name::Name;
use crate::core::request::CertificateRequest;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors reported by policy handlers.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// Requester probe text could not be interpreted.
    #[error("invalid probe input: {0}")]
    InvalidProbeInput(String),
    /// A request update callback failed.
    #[error("request update callback failed: {0}")]
    Callback(String),
}

// ============================================================================
// SECTION: Handler Traits
// ============================================================================

/// Maps requester probe text to an identity name.
pub trait ProbeHandler: Send + Sync {
    /// Returns the identity name for `requester_input`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidProbeInput`] when the input cannot be
    /// mapped.
    fn probe(&self, requester_input: &str) -> Result<String, PolicyError>;
}

impl<F> ProbeHandler for F
where
    F: Fn(&str) -> Result<String, PolicyError> + Send + Sync,
{
    fn probe(&self, requester_input: &str) -> Result<String, PolicyError> {
        self(requester_input)
    }
}

/// CA and identity chosen by a [`RecommendCaHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaRecommendation {
    /// Recommended CA name.
    pub ca_name: Name,
    /// Identity name to request under the recommended CA.
    pub identity: String,
}

/// Recommends one of the related CAs for requester probe text.
pub trait RecommendCaHandler: Send + Sync {
    /// Returns the chosen CA and identity name.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidProbeInput`] when no candidate fits.
    fn recommend(
        &self,
        requester_input: &str,
        candidates: &[Name],
    ) -> Result<CaRecommendation, PolicyError>;
}

impl<F> RecommendCaHandler for F
where
    F: Fn(&str, &[Name]) -> Result<CaRecommendation, PolicyError> + Send + Sync,
{
    fn recommend(
        &self,
        requester_input: &str,
        candidates: &[Name],
    ) -> Result<CaRecommendation, PolicyError> {
        self(requester_input, candidates)
    }
}

/// Notification hook for request state changes.
pub trait RequestUpdateCallback: Send + Sync {
    /// Observes the latest persisted state of `request`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] on failure; callers log and discard it.
    fn on_request_update(&self, request: &CertificateRequest) -> Result<(), PolicyError>;
}

impl<F> RequestUpdateCallback for F
where
    F: Fn(&CertificateRequest) -> Result<(), PolicyError> + Send + Sync,
{
    fn on_request_update(&self, request: &CertificateRequest) -> Result<(), PolicyError> {
        self(request)
    }
}

// ============================================================================
// SECTION: Default Handlers
// ============================================================================

/// Probe handler mapping input `x` to the identity `<ca_name>/x`.
#[derive(Debug, Clone)]
pub struct DefaultProbeHandler {
    /// CA name used as the identity prefix.
    ca_name: Name,
}

impl DefaultProbeHandler {
    /// Creates a default probe handler for `ca_name`.
    #[must_use]
    pub const fn new(ca_name: Name) -> Self {
        Self {
            ca_name,
        }
    }
}

impl ProbeHandler for DefaultProbeHandler {
    fn probe(&self, requester_input: &str) -> Result<String, PolicyError> {
        let input = requester_input.trim();
        if input.is_empty() {
            return Err(PolicyError::InvalidProbeInput("probe input is empty".to_string()));
        }
        let identity = self
            .ca_name
            .append(input)
            .map_err(|err| PolicyError::InvalidProbeInput(err.to_string()))?;
        Ok(identity.to_uri())
    }
}

/// Recommend handler choosing the longest candidate that prefixes the input name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRecommendCaHandler;

impl RecommendCaHandler for DefaultRecommendCaHandler {
    fn recommend(
        &self,
        requester_input: &str,
        candidates: &[Name],
    ) -> Result<CaRecommendation, PolicyError> {
        let requested = Name::parse(requester_input.trim())
            .map_err(|err| PolicyError::InvalidProbeInput(err.to_string()))?;
        let chosen = candidates
            .iter()
            .filter(|candidate| candidate.len() < requested.len())
            .filter(|candidate| candidate.is_prefix_of(&requested))
            .max_by_key(|candidate| candidate.len());
        let Some(ca_name) = chosen else {
            return Err(PolicyError::InvalidProbeInput(format!(
                "no related ca covers {requested}"
            )));
        };
        Ok(CaRecommendation {
            ca_name: ca_name.clone(),
            identity: requested.to_uri(),
        })
    }
}

/// Request update callback that only traces the update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRequestUpdateCallback;

impl RequestUpdateCallback for NoopRequestUpdateCallback {
    fn on_request_update(&self, request: &CertificateRequest) -> Result<(), PolicyError> {
        debug!(
            request_id = %request.request_id(),
            status = %request.status(),
            "request updated"
        );
        Ok(())
    }
}

// ============================================================================
// SECTION: CA Policy
// ============================================================================

/// Policy for one configured CA.
///
/// # Invariants
/// - `supported_challenges` is non-empty once loaded from configuration.
/// - `None` optional strings mean the feature is unsupported.
#[derive(Clone)]
pub struct CaPolicy {
    /// CA name; unique within a configuration set.
    pub ca_name: Name,
    /// CAs this CA can redirect or recommend to, in order.
    pub related_ca_names: Vec<Name>,
    /// Freshness period attached to issued certificate metadata.
    pub freshness_period: Duration,
    /// Validity period of issued certificates.
    pub validity_period: Duration,
    /// Challenge tags accepted by this CA, in preference order.
    pub supported_challenges: Vec<ChallengeType>,
    /// Description of the probe input format.
    pub probe_format: Option<String>,
    /// Description of the targeted list format.
    pub targeted_list_format: Option<String>,
    /// Free-form CA information.
    pub ca_info: Option<String>,
    /// Probe text to identity mapping.
    probe_handler: Arc<dyn ProbeHandler>,
    /// Related CA recommendation.
    recommend_ca_handler: Arc<dyn RecommendCaHandler>,
    /// Request update notification hook.
    request_update_callback: Arc<dyn RequestUpdateCallback>,
}

impl CaPolicy {
    /// Creates a policy with default handlers and no optional metadata.
    #[must_use]
    pub fn new(
        ca_name: Name,
        freshness_period: Duration,
        validity_period: Duration,
        supported_challenges: Vec<ChallengeType>,
    ) -> Self {
        Self {
            probe_handler: Arc::new(DefaultProbeHandler::new(ca_name.clone())),
            recommend_ca_handler: Arc::new(DefaultRecommendCaHandler),
            request_update_callback: Arc::new(NoopRequestUpdateCallback),
            ca_name,
            related_ca_names: Vec::new(),
            freshness_period,
            validity_period,
            supported_challenges,
            probe_format: None,
            targeted_list_format: None,
            ca_info: None,
        }
    }

    /// Replaces the probe handler.
    #[must_use]
    pub fn with_probe_handler(mut self, handler: impl ProbeHandler + 'static) -> Self {
        self.probe_handler = Arc::new(handler);
        self
    }

    /// Replaces the recommend handler.
    #[must_use]
    pub fn with_recommend_ca_handler(mut self, handler: impl RecommendCaHandler + 'static) -> Self {
        self.recommend_ca_handler = Arc::new(handler);
        self
    }

    /// Replaces the request update callback.
    #[must_use]
    pub fn with_request_update_callback(
        mut self,
        callback: impl RequestUpdateCallback + 'static,
    ) -> Self {
        self.request_update_callback = Arc::new(callback);
        self
    }

    /// Returns true when `challenge` is accepted by this CA.
    #[must_use]
    pub fn supports_challenge(&self, challenge: &ChallengeType) -> bool {
        self.supported_challenges.contains(challenge)
    }

    /// Returns true when the CA advertises a probe format.
    #[must_use]
    pub const fn supports_probe(&self) -> bool {
        self.probe_format.is_some()
    }

    /// Maps probe text to an identity name.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidProbeInput`] when the handler rejects the
    /// input.
    pub fn probe(&self, requester_input: &str) -> Result<String, PolicyError> {
        self.probe_handler.probe(requester_input)
    }

    /// Recommends one of the related CAs for probe text.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidProbeInput`] when no related CA fits.
    pub fn recommend_ca(&self, requester_input: &str) -> Result<CaRecommendation, PolicyError> {
        if self.related_ca_names.is_empty() {
            return Err(PolicyError::InvalidProbeInput(format!(
                "ca {} has no related cas",
                self.ca_name
            )));
        }
        self.recommend_ca_handler.recommend(requester_input, &self.related_ca_names)
    }

    /// Notifies the update callback, isolating its failures.
    ///
    /// Errors and panics raised by the callback are logged and discarded so
    /// that committed storage state is never rolled back by a hook.
    pub fn notify_request_update(&self, request: &CertificateRequest) {
        let callback = &self.request_update_callback;
        match catch_unwind(AssertUnwindSafe(|| callback.on_request_update(request))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(
                    ca = %self.ca_name,
                    request_id = %request.request_id(),
                    error = %err,
                    "request update callback failed"
                );
            }
            Err(_) => {
                warn!(
                    ca = %self.ca_name,
                    request_id = %request.request_id(),
                    "request update callback panicked"
                );
            }
        }
    }
}

impl fmt::Debug for CaPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaPolicy")
            .field("ca_name", &self.ca_name)
            .field("related_ca_names", &self.related_ca_names)
            .field("freshness_period", &self.freshness_period)
            .field("validity_period", &self.validity_period)
            .field("supported_challenges", &self.supported_challenges)
            .field("probe_format", &self.probe_format)
            .field("targeted_list_format", &self.targeted_list_format)
            .field("ca_info", &self.ca_info)
            .finish_non_exhaustive()
    }
}

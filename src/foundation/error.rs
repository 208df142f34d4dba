use crate::foundation::core::HandleId;
use std::time::Duration;

/// Convenience result type used across the bridge.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Top-level error taxonomy surfaced to the capture driver.
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    /// A pending handle outlived its deadline. Terminal for the current frame attempt.
    #[error(
        "handle timeout: {} ({id}) was not continued within {}ms",
        .label.as_deref().unwrap_or("delayRender()"),
        .timeout.as_millis()
    )]
    HandleTimeout {
        /// Handle that expired.
        id: HandleId,
        /// Diagnostic label supplied at registration.
        label: Option<String>,
        /// Budget the handle was given.
        timeout: Duration,
    },

    /// No composition with this id is registered.
    #[error("composition not found: '{name}' (available: {})", .available.join(", "))]
    CompositionNotFound {
        /// Requested composition id.
        name: String,
        /// Ids registered at the time of the lookup.
        available: Vec<String>,
    },

    /// Resolved props failed the composition's declared schema.
    #[error("schema validation error in '{composition}' at {path}: {message}")]
    SchemaValidation {
        /// Composition whose props were validated.
        composition: String,
        /// JSON path of the first violation (`$.a.b[2]`).
        path: String,
        /// All violations, newline separated.
        message: String,
    },

    /// The driver called the bridge in a state where the call is not allowed.
    #[error("protocol usage error: {0}")]
    ProtocolUsage(String),

    /// A handle was continued twice, or never existed. Diagnostic only.
    #[error("duplicate resolution of handle {id}: {reason}")]
    DuplicateResolution {
        /// Handle passed to `continue_render`/`cancel`.
        id: HandleId,
        /// Why the resolution was ignored.
        reason: String,
    },

    /// The page reported an unrecoverable rendering error.
    #[error("render cancelled: {0}")]
    Cancelled(String),

    /// Invalid driver- or composition-supplied data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing data crossing the process boundary.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BridgeError {
    /// Build a [`BridgeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`BridgeError::ProtocolUsage`] value.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolUsage(msg.into())
    }

    /// Build a [`BridgeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for failures that block readiness until an explicit reset.
    pub fn is_page_fatal(&self) -> bool {
        matches!(self, Self::HandleTimeout { .. } | Self::Cancelled(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

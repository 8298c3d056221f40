use std::path::PathBuf;

use common_errors::FailureClass;
use common_math::NumericContext;
use common_proxies::EnvironmentFault;
use common_structs::{DecimalParseError, FieldMismatch};

/// A scenario file that cannot be parsed or resolved. Reported per file.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("{source_id}: malformed scenario: {error}")]
    Malformed {
        source_id: String,
        #[source]
        error: serde_json::Error,
    },

    #[error("story {story}, action {action} ({name}): {reason}")]
    InvalidAction {
        story: usize,
        action: usize,
        name: String,
        reason: String,
    },
}

impl DefinitionError {
    pub(crate) fn invalid_action(story: usize, action: usize, name: &str, reason: impl Into<String>) -> Self {
        DefinitionError::InvalidAction {
            story,
            action,
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Why a story attempt stopped.
#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    /// Observed state diverged from the oracle. Never retried.
    #[error("action {action_index} ({action}): {mismatch}")]
    Mismatch {
        action_index: usize,
        action: String,
        mismatch: FieldMismatch,
    },

    /// The declared outcome of an action did not happen. Never retried.
    #[error("action {action_index} ({action}): {detail}")]
    ExpectationViolated {
        action_index: usize,
        action: String,
        detail: String,
    },

    /// Infrastructure trouble; the whole story may be re-run.
    #[error("transient fault: {0}")]
    Transient(String),
}

impl From<EnvironmentFault> for StoryError {
    /// Only used where a rejection cannot be part of the protocol contract
    /// (queries, snapshots); such failures are infrastructure trouble.
    fn from(fault: EnvironmentFault) -> Self {
        match fault {
            EnvironmentFault::Transient { reason } => StoryError::Transient(reason),
            EnvironmentFault::Reverted { reason } => StoryError::Transient(format!("query rejected: {reason}")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("gave up after {attempts} attempts, last transient fault: {last_fault}")]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_fault: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read scenario directory {path}: {error}")]
    UnreadableDirectory {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("cannot read scenario file {path}: {error}")]
    UnreadableFile {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read configuration {path}: {error}")]
    Unreadable {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    Malformed(#[from] toml::de::Error),

    #[error("reserve {asset}: {error}")]
    InvalidReserve {
        asset: String,
        #[source]
        error: DecimalParseError,
    },

    #[error("max_attempts must be at least 1")]
    NoAttempts,

    /// The oracle must compute at the protocol's scale and rounding, or its
    /// predictions drift from what the market stores.
    #[error("numeric context {found:?} differs from the protocol's {expected:?}")]
    NumericContextMismatch {
        expected: NumericContext,
        found: NumericContext,
    },
}

/// Parses a revert expectation given either as the protocol's message or as
/// the class name (`"InvalidAmount"`).
pub fn parse_failure_class(text: &str) -> Option<FailureClass> {
    FailureClass::from_reason(text).or_else(|| {
        FailureClass::ALL
            .iter()
            .copied()
            .find(|class| format!("{class:?}") == text.trim())
    })
}

/// Final verdict on a story that did not pass.
#[derive(Debug, thiserror::Error)]
pub enum StoryFailure {
    #[error(transparent)]
    Failed(StoryError),

    #[error(transparent)]
    Exhausted(#[from] RetryExhausted),
}

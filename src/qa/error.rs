use thiserror::Error;

use super::changes::ChangeKind;

#[derive(Debug, Error)]
pub enum QaError {
    #[error("rule {rule_id} failed while checking a {kind:?} change: {message}")]
    CheckerFailed {
        rule_id: String,
        kind: ChangeKind,
        message: String,
    },

    #[error("rule run aborted after {rule_id} failed: {message}")]
    RunAborted { rule_id: String, message: String },

    #[error("invalid severity override for {rule_id}: {value}")]
    InvalidSeverityOverride { rule_id: String, value: String },
}

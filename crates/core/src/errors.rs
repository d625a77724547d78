use thiserror::Error;

use crate::domain::order::{OrderId, OrderStatus, Phase};

/// Everything the procurement workflow can refuse to do, and the one
/// external effect it can fail at. No variant is retried inside the core;
/// callers decide retry and presentation policy.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    #[error("unknown order `{0}`")]
    UnknownOrder(OrderId),
    #[error("event `{event}` is not valid in status {status:?} at step {step}")]
    InvalidTransition { status: OrderStatus, step: u8, event: &'static str },
    #[error("step {step} is incomplete: {requirement}")]
    StepIncomplete { step: u8, requirement: String },
    #[error("invalid evidence for step {step}: {detail}")]
    InvalidEvidence { step: u8, detail: String },
    #[error("auditor `{user_id}` is not authorized for the {phase:?} audit")]
    Unauthorized { user_id: String, phase: Phase },
    #[error("order `{0}` is not pending audit")]
    NotPendingAudit(OrderId),
    #[error("a rejection reason is required")]
    MissingReason,
    #[error("inventory materialization failed: {0}")]
    MaterializationFailed(String),
    #[error("repository failure: {0}")]
    Repository(String),
}

impl From<crate::repository::RepositoryError> for WorkflowError {
    fn from(error: crate::repository::RepositoryError) -> Self {
        Self::Repository(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::WorkflowError;
    use crate::domain::order::{OrderId, OrderStatus};

    #[test]
    fn invalid_transition_names_status_step_and_event() {
        let error = WorkflowError::InvalidTransition {
            status: OrderStatus::PendingReceive,
            step: 1,
            event: "advance_step",
        };

        let message = error.to_string();
        assert!(message.contains("advance_step"));
        assert!(message.contains("PendingReceive"));
        assert!(message.contains("step 1"));
    }

    #[test]
    fn unknown_order_displays_the_id() {
        let error = WorkflowError::UnknownOrder(OrderId("o-404".to_string()));
        assert_eq!(error.to_string(), "unknown order `o-404`");
    }
}

use serde::{Deserialize, Serialize};

use crate::domain::order::{AuditStatus, OrderStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEvent {
    StartProcessing,
    AdvanceStep,
    SubmitInboundAudit,
    SubmitOutboundAudit,
    Approve,
    Reject,
}

impl WorkflowEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartProcessing => "start_processing",
            Self::AdvanceStep => "advance_step",
            Self::SubmitInboundAudit => "submit_inbound_audit",
            Self::SubmitOutboundAudit => "submit_outbound_audit",
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

/// Side effects a transition requires. The engine stays pure; the service
/// executes these against the ledger, the clock, and the device registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowAction {
    MarkStepComplete(u8),
    MaterializeInventory,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub event: WorkflowEvent,
    /// Step pointer after the transition. Never lower than before.
    pub current_step: u8,
    /// `None` leaves the order's audit status untouched.
    pub audit_status: Option<AuditStatus>,
    pub actions: Vec<WorkflowAction>,
}

use crate::domain::order::{AuditStatus, OrderStatus, ProcurementOrder};
use crate::domain::step::{
    STEP_ACKNOWLEDGE, STEP_INSPECTION, STEP_LOGISTICS, STEP_RECEIPT, STEP_STOCKING,
};
use crate::errors::WorkflowError;
use crate::workflow::states::{TransitionOutcome, WorkflowAction, WorkflowEvent};

/// The transition table for a procurement order.
///
/// Pure over `(status, current_step, ledger, event)`: it validates guards and
/// describes the next state plus the side effects to run, but mutates
/// nothing. Any `(state, event)` pair without a table entry is a caller
/// error and fails with `InvalidTransition`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkflowEngine;

impl WorkflowEngine {
    pub fn transition(
        &self,
        order: &ProcurementOrder,
        event: WorkflowEvent,
    ) -> Result<TransitionOutcome, WorkflowError> {
        use OrderStatus::{
            Completed, InboundProcessing, OutboundProcessing, PendingInboundAudit,
            PendingOutboundAudit, PendingReceive,
        };
        use WorkflowAction::{MarkStepComplete, MaterializeInventory};
        use WorkflowEvent::{
            AdvanceStep, Approve, Reject, StartProcessing, SubmitInboundAudit,
            SubmitOutboundAudit,
        };

        let status = order.status;
        let step = order.current_step;

        let (to, current_step, audit_status, actions) = match (status, event) {
            (PendingReceive, StartProcessing) => (
                InboundProcessing,
                STEP_STOCKING,
                None,
                vec![MarkStepComplete(STEP_ACKNOWLEDGE)],
            ),
            (InboundProcessing, AdvanceStep)
                if matches!(step, STEP_STOCKING | STEP_INSPECTION) =>
            {
                require_evidence(order, step)?;
                let next = if step == STEP_STOCKING { STEP_INSPECTION } else { step };
                (InboundProcessing, next, None, vec![MarkStepComplete(step)])
            }
            (InboundProcessing, SubmitInboundAudit) => {
                require_completed(order, STEP_INSPECTION)?;
                // Re-stamp so "update evidence then submit" refreshes the mark.
                (
                    PendingInboundAudit,
                    step,
                    Some(AuditStatus::Pending),
                    vec![MarkStepComplete(STEP_INSPECTION)],
                )
            }
            (PendingInboundAudit, Approve) => (
                OutboundProcessing,
                STEP_LOGISTICS,
                Some(AuditStatus::Approved),
                Vec::new(),
            ),
            (PendingInboundAudit, Reject) => {
                (InboundProcessing, step, Some(AuditStatus::Rejected), Vec::new())
            }
            (OutboundProcessing, AdvanceStep)
                if matches!(step, STEP_LOGISTICS | STEP_RECEIPT) =>
            {
                require_evidence(order, step)?;
                let next = if step == STEP_LOGISTICS { STEP_RECEIPT } else { step };
                (OutboundProcessing, next, None, vec![MarkStepComplete(step)])
            }
            (OutboundProcessing, SubmitOutboundAudit) => {
                require_completed(order, STEP_RECEIPT)?;
                (PendingOutboundAudit, step, Some(AuditStatus::Pending), Vec::new())
            }
            (PendingOutboundAudit, Approve) => {
                (Completed, step, Some(AuditStatus::Approved), vec![MaterializeInventory])
            }
            (PendingOutboundAudit, Reject) => {
                (OutboundProcessing, step, Some(AuditStatus::Rejected), Vec::new())
            }
            _ => {
                return Err(WorkflowError::InvalidTransition {
                    status,
                    step,
                    event: event.as_str(),
                });
            }
        };

        Ok(TransitionOutcome { from: status, to, event, current_step, audit_status, actions })
    }
}

fn require_evidence(order: &ProcurementOrder, step: u8) -> Result<(), WorkflowError> {
    match order.steps.unmet_requirement(step) {
        Some(requirement) => Err(WorkflowError::StepIncomplete { step, requirement }),
        None => Ok(()),
    }
}

fn require_completed(order: &ProcurementOrder, step: u8) -> Result<(), WorkflowError> {
    if order.steps.completion_time(step).is_none() {
        return Err(WorkflowError::StepIncomplete {
            step,
            requirement: "step must be completed before submitting for audit".to_string(),
        });
    }
    Ok(())
}

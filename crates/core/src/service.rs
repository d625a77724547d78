use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use crate::clock::Clock;
use crate::domain::order::{
    AuditStatus, OrderId, OrderItem, OrderType, Phase, ProcurementOrder, RegionId, StoreId,
    StoreSnapshot,
};
use crate::domain::step::{phase_of_step, EvidencePatch};
use crate::errors::WorkflowError;
use crate::gate::{AuditAuthorizer, AuditGate, AuditorContext, InventoryMaterializer};
use crate::repository::OrderRepository;
use crate::workflow::{TransitionOutcome, WorkflowAction, WorkflowEngine, WorkflowEvent};

/// Cart snapshot handed over at checkout. The core never re-queries the
/// store registry after this point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub store: StoreSnapshot,
    pub items: Vec<OrderItem>,
    pub order_type: OrderType,
    #[serde(default)]
    pub rent_duration_months: Option<u32>,
    #[serde(default)]
    pub expect_delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub remark: String,
}

/// The public command surface over procurement orders.
///
/// Every mutating command returns the authoritative new aggregate, so
/// callers never need a shadow copy. Mutations on one order are serialized
/// through a per-order lock; distinct orders proceed independently.
pub struct ProcurementService {
    repo: Arc<dyn OrderRepository>,
    gate: AuditGate,
    materializer: Arc<dyn InventoryMaterializer>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn AuditSink>,
    engine: WorkflowEngine,
    order_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProcurementService {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        authorizer: Arc<dyn AuditAuthorizer>,
        materializer: Arc<dyn InventoryMaterializer>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            repo,
            gate: AuditGate::new(authorizer),
            materializer,
            clock,
            sink,
            engine: WorkflowEngine,
            order_locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create(
        &self,
        request: CreateOrderRequest,
    ) -> Result<ProcurementOrder, WorkflowError> {
        let order = ProcurementOrder::create(
            OrderId(Uuid::new_v4().to_string()),
            request.store,
            request.items,
            request.order_type,
            request.rent_duration_months,
            request.expect_delivery_date,
            request.remark,
            self.clock.now(),
        )?;

        self.repo.create(order.clone()).await?;
        self.sink.emit(
            AuditEvent::new(
                Some(order.id.clone()),
                order.id.0.clone(),
                "order.created",
                AuditCategory::Order,
                "operator",
                AuditOutcome::Success,
            )
            .with_metadata("store_id", order.store.store_id.0.clone())
            .with_metadata("total_price", order.total_price.to_string()),
        );

        Ok(order)
    }

    pub async fn start_processing(
        &self,
        order_id: &OrderId,
    ) -> Result<ProcurementOrder, WorkflowError> {
        self.apply_event(order_id, WorkflowEvent::StartProcessing, "operator").await
    }

    pub async fn advance_step(
        &self,
        order_id: &OrderId,
    ) -> Result<ProcurementOrder, WorkflowError> {
        self.apply_event(order_id, WorkflowEvent::AdvanceStep, "operator").await
    }

    pub async fn submit_inbound_audit(
        &self,
        order_id: &OrderId,
    ) -> Result<ProcurementOrder, WorkflowError> {
        self.apply_event(order_id, WorkflowEvent::SubmitInboundAudit, "operator").await
    }

    pub async fn submit_outbound_audit(
        &self,
        order_id: &OrderId,
    ) -> Result<ProcurementOrder, WorkflowError> {
        self.apply_event(order_id, WorkflowEvent::SubmitOutboundAudit, "operator").await
    }

    /// Merges one evidence mutation into the step's record. Only steps of
    /// the phase being worked, or steps already completed, accept evidence;
    /// nothing is editable while the order awaits an audit decision or after
    /// completion.
    pub async fn record_evidence(
        &self,
        order_id: &OrderId,
        step: u8,
        patch: EvidencePatch,
    ) -> Result<ProcurementOrder, WorkflowError> {
        let lock = self.lock_for(order_id);
        let _guard = lock.lock().await;

        let mut order = self.load(order_id).await?;
        let frozen = order.status.pending_phase().is_some() || order.status.is_terminal();
        let in_active_phase = order
            .status
            .processing_phase()
            .is_some_and(|phase| phase_of_step(step) == Some(phase));
        if frozen || !(in_active_phase || order.steps.completion_time(step).is_some()) {
            return Err(WorkflowError::InvalidTransition {
                status: order.status,
                step,
                event: "record_evidence",
            });
        }

        order.steps.apply_patch(step, patch)?;
        self.repo.save(order.clone()).await?;
        self.sink.emit(
            AuditEvent::new(
                Some(order.id.clone()),
                order.id.0.clone(),
                "workflow.evidence_recorded",
                AuditCategory::Workflow,
                "operator",
                AuditOutcome::Success,
            )
            .with_metadata("step", step.to_string()),
        );

        Ok(order)
    }

    pub async fn approve(
        &self,
        order_id: &OrderId,
        auditor: &AuditorContext,
    ) -> Result<ProcurementOrder, WorkflowError> {
        let lock = self.lock_for(order_id);
        let _guard = lock.lock().await;

        let mut order = self.load(order_id).await?;
        let phase = match self.gate.authorize(&order, auditor) {
            Ok(phase) => phase,
            Err(error) => {
                self.emit_gate_refusal(&order, auditor, &error);
                return Err(error);
            }
        };
        let outcome = self.engine.transition(&order, WorkflowEvent::Approve)?;

        // The registry write is atomic with the approval: it runs against the
        // pre-flip order, and its failure leaves the audit pending.
        let materialize = outcome
            .actions
            .iter()
            .any(|action| matches!(action, WorkflowAction::MaterializeInventory));
        if materialize {
            if let Err(error) = self.materializer.materialize(&order).await {
                self.sink.emit(
                    AuditEvent::new(
                        Some(order.id.clone()),
                        order.id.0.clone(),
                        "inventory.materialization_failed",
                        AuditCategory::Inventory,
                        auditor.user_id.clone(),
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.0.clone()),
                );
                return Err(WorkflowError::MaterializationFailed(error.0));
            }
        }

        self.apply_outcome(&mut order, &outcome);
        self.repo.save(order.clone()).await?;
        self.emit_gate_decision(&order, auditor, phase, "gate.approved", None);
        if materialize {
            self.sink.emit(
                AuditEvent::new(
                    Some(order.id.clone()),
                    order.id.0.clone(),
                    "inventory.materialized",
                    AuditCategory::Inventory,
                    auditor.user_id.clone(),
                    AuditOutcome::Success,
                )
                .with_metadata("item_count", order.items.len().to_string()),
            );
        }

        Ok(order)
    }

    pub async fn reject(
        &self,
        order_id: &OrderId,
        auditor: &AuditorContext,
        reason: &str,
    ) -> Result<ProcurementOrder, WorkflowError> {
        let lock = self.lock_for(order_id);
        let _guard = lock.lock().await;

        let mut order = self.load(order_id).await?;
        let phase = match self.gate.authorize(&order, auditor) {
            Ok(phase) => phase,
            Err(error) => {
                self.emit_gate_refusal(&order, auditor, &error);
                return Err(error);
            }
        };
        let reason = AuditGate::validate_reason(reason)?;
        let outcome = self.engine.transition(&order, WorkflowEvent::Reject)?;

        self.apply_outcome(&mut order, &outcome);
        order.reject_reason = Some(reason.clone());
        self.repo.save(order.clone()).await?;
        self.emit_gate_decision(&order, auditor, phase, "gate.rejected", Some(&reason));

        Ok(order)
    }

    pub async fn get(&self, order_id: &OrderId) -> Result<ProcurementOrder, WorkflowError> {
        self.load(order_id).await
    }

    pub async fn list_by_store(
        &self,
        store_id: &StoreId,
    ) -> Result<Vec<ProcurementOrder>, WorkflowError> {
        Ok(self.repo.list_by_store(store_id).await?)
    }

    pub async fn list_by_region(
        &self,
        region_id: &RegionId,
    ) -> Result<Vec<ProcurementOrder>, WorkflowError> {
        Ok(self.repo.list_by_region(region_id).await?)
    }

    async fn apply_event(
        &self,
        order_id: &OrderId,
        event: WorkflowEvent,
        actor: &str,
    ) -> Result<ProcurementOrder, WorkflowError> {
        let lock = self.lock_for(order_id);
        let _guard = lock.lock().await;

        let mut order = self.load(order_id).await?;
        let outcome = match self.engine.transition(&order, event) {
            Ok(outcome) => outcome,
            Err(error) => {
                self.sink.emit(
                    AuditEvent::new(
                        Some(order.id.clone()),
                        order.id.0.clone(),
                        "workflow.transition_refused",
                        AuditCategory::Workflow,
                        actor,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("event", event.as_str())
                    .with_metadata("error", error.to_string()),
                );
                return Err(error);
            }
        };

        self.apply_outcome(&mut order, &outcome);
        self.repo.save(order.clone()).await?;
        self.emit_transition(&order, &outcome, actor);

        Ok(order)
    }

    fn apply_outcome(&self, order: &mut ProcurementOrder, outcome: &TransitionOutcome) {
        let now = self.clock.now();

        order.status = outcome.to;
        order.current_step = outcome.current_step;
        if let Some(audit_status) = outcome.audit_status {
            order.audit_status = audit_status;
            match audit_status {
                // A fresh submission supersedes the previous decision.
                AuditStatus::Pending => order.reject_reason = None,
                AuditStatus::Approved | AuditStatus::Rejected => order.audit_time = Some(now),
                AuditStatus::None => {}
            }
        }

        for action in &outcome.actions {
            if let WorkflowAction::MarkStepComplete(step) = action {
                order.steps.mark_complete(*step, now);
            }
        }
    }

    fn lock_for(&self, order_id: &OrderId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.order_locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(locks.entry(order_id.0.clone()).or_default())
    }

    async fn load(&self, order_id: &OrderId) -> Result<ProcurementOrder, WorkflowError> {
        self.repo
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| WorkflowError::UnknownOrder(order_id.clone()))
    }

    fn emit_transition(&self, order: &ProcurementOrder, outcome: &TransitionOutcome, actor: &str) {
        self.sink.emit(
            AuditEvent::new(
                Some(order.id.clone()),
                order.id.0.clone(),
                "workflow.transition_applied",
                AuditCategory::Workflow,
                actor,
                AuditOutcome::Success,
            )
            .with_metadata("from", outcome.from.as_str())
            .with_metadata("to", outcome.to.as_str())
            .with_metadata("event", outcome.event.as_str())
            .with_metadata("current_step", outcome.current_step.to_string()),
        );
    }

    fn emit_gate_decision(
        &self,
        order: &ProcurementOrder,
        auditor: &AuditorContext,
        phase: Phase,
        event_type: &str,
        reason: Option<&str>,
    ) {
        let mut event = AuditEvent::new(
            Some(order.id.clone()),
            order.id.0.clone(),
            event_type,
            AuditCategory::Gate,
            auditor.user_id.clone(),
            AuditOutcome::Success,
        )
        .with_metadata("phase", phase.as_str())
        .with_metadata("role", auditor.role.clone());
        if let Some(reason) = reason {
            event = event.with_metadata("reason", reason);
        }
        self.sink.emit(event);
    }

    fn emit_gate_refusal(
        &self,
        order: &ProcurementOrder,
        auditor: &AuditorContext,
        error: &WorkflowError,
    ) {
        self.sink.emit(
            AuditEvent::new(
                Some(order.id.clone()),
                order.id.0.clone(),
                "gate.refused",
                AuditCategory::Gate,
                auditor.user_id.clone(),
                AuditOutcome::Rejected,
            )
            .with_metadata("error", error.to_string()),
        );
    }
}

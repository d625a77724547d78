use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::order::{Phase, ProcurementOrder};
use crate::errors::WorkflowError;

/// Who is asking to approve or reject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditorContext {
    pub user_id: String,
    pub role: String,
}

/// Permission check delegated to the authorization collaborator. The domain
/// is fixed to procurement; only the phase varies.
pub trait AuditAuthorizer: Send + Sync {
    fn can_audit(&self, auditor: &AuditorContext, phase: Phase) -> bool;
}

/// Role-table authorizer: a set of role names per phase, `*` meaning any
/// role. Backed by the `[audit]` config section in the deployed binary.
#[derive(Clone, Debug, Default)]
pub struct StaticAuthorizer {
    inbound_roles: HashSet<String>,
    outbound_roles: HashSet<String>,
}

impl StaticAuthorizer {
    pub fn new(inbound_roles: Vec<String>, outbound_roles: Vec<String>) -> Self {
        Self {
            inbound_roles: inbound_roles.iter().map(|role| normalize_role(role)).collect(),
            outbound_roles: outbound_roles.iter().map(|role| normalize_role(role)).collect(),
        }
    }
}

impl AuditAuthorizer for StaticAuthorizer {
    fn can_audit(&self, auditor: &AuditorContext, phase: Phase) -> bool {
        let roles = match phase {
            Phase::Inbound => &self.inbound_roles,
            Phase::Outbound => &self.outbound_roles,
        };
        roles.contains("*") || roles.contains(&normalize_role(&auditor.role))
    }
}

fn normalize_role(role: &str) -> String {
    role.trim().to_ascii_lowercase()
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct MaterializationError(pub String);

/// Downstream device-registry hook, invoked exactly once per successful
/// outbound approval and never retried by the workflow.
#[async_trait::async_trait]
pub trait InventoryMaterializer: Send + Sync {
    async fn materialize(&self, order: &ProcurementOrder) -> Result<(), MaterializationError>;
}

/// The approve/reject checkpoint between phases. Validates, in order: the
/// order is actually pending an audit, the caller may audit that phase, and
/// (for rejections) a usable reason exists. All checks run before any state
/// mutation.
#[derive(Clone)]
pub struct AuditGate {
    authorizer: Arc<dyn AuditAuthorizer>,
}

impl AuditGate {
    pub fn new(authorizer: Arc<dyn AuditAuthorizer>) -> Self {
        Self { authorizer }
    }

    /// Checks the pending-audit protocol and the caller's permission,
    /// returning the phase under audit.
    pub fn authorize(
        &self,
        order: &ProcurementOrder,
        auditor: &AuditorContext,
    ) -> Result<Phase, WorkflowError> {
        let phase = order
            .status
            .pending_phase()
            .ok_or_else(|| WorkflowError::NotPendingAudit(order.id.clone()))?;

        if !self.authorizer.can_audit(auditor, phase) {
            return Err(WorkflowError::Unauthorized { user_id: auditor.user_id.clone(), phase });
        }

        Ok(phase)
    }

    /// Trims and validates a rejection reason.
    pub fn validate_reason(reason: &str) -> Result<String, WorkflowError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::MissingReason);
        }
        Ok(reason.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{AuditGate, AuditorContext, StaticAuthorizer};
    use crate::domain::order::{
        AuditStatus, OrderId, OrderItem, OrderStatus, OrderType, Phase, ProcurementOrder,
        ProductId, RegionId, StoreId, StoreSnapshot,
    };
    use crate::errors::WorkflowError;

    fn pending_inbound_order() -> ProcurementOrder {
        let mut order = ProcurementOrder::create(
            OrderId("o-1".to_string()),
            StoreSnapshot {
                store_id: StoreId("store-1".to_string()),
                store_name: "Lakeside Hotel".to_string(),
                region_id: RegionId("region-north".to_string()),
            },
            vec![OrderItem {
                product_id: ProductId("kettle".to_string()),
                product_name: "Electric Kettle".to_string(),
                price: Decimal::new(10_000, 2),
                image_url: "https://img.example/kettle.jpg".to_string(),
                quantity: 1,
            }],
            OrderType::Purchase,
            None,
            None,
            String::new(),
            Utc::now(),
        )
        .expect("valid order");
        order.status = OrderStatus::PendingInboundAudit;
        order.audit_status = AuditStatus::Pending;
        order
    }

    fn gate() -> AuditGate {
        AuditGate::new(Arc::new(StaticAuthorizer::new(
            vec!["procurement_auditor".to_string()],
            vec!["ops_admin".to_string()],
        )))
    }

    #[test]
    fn authorized_role_passes_for_its_phase() {
        let order = pending_inbound_order();
        let auditor = AuditorContext {
            user_id: "u-1".to_string(),
            role: "Procurement_Auditor".to_string(),
        };

        let phase = gate().authorize(&order, &auditor).expect("role is allowed");
        assert_eq!(phase, Phase::Inbound);
    }

    #[test]
    fn wrong_phase_role_is_unauthorized() {
        let order = pending_inbound_order();
        let auditor =
            AuditorContext { user_id: "u-2".to_string(), role: "ops_admin".to_string() };

        let error = gate().authorize(&order, &auditor).expect_err("outbound-only role");
        assert!(matches!(
            error,
            WorkflowError::Unauthorized { phase: Phase::Inbound, .. }
        ));
    }

    #[test]
    fn non_pending_order_is_a_conflict_not_a_noop() {
        let mut order = pending_inbound_order();
        order.status = OrderStatus::InboundProcessing;
        let auditor = AuditorContext {
            user_id: "u-1".to_string(),
            role: "procurement_auditor".to_string(),
        };

        let error = gate().authorize(&order, &auditor).expect_err("nothing pending");
        assert!(matches!(error, WorkflowError::NotPendingAudit(_)));
    }

    #[test]
    fn wildcard_role_table_allows_any_role() {
        let gate = AuditGate::new(Arc::new(StaticAuthorizer::new(
            vec!["*".to_string()],
            Vec::new(),
        )));
        let order = pending_inbound_order();
        let auditor =
            AuditorContext { user_id: "u-3".to_string(), role: "night_shift".to_string() };

        assert!(gate.authorize(&order, &auditor).is_ok());
    }

    #[test]
    fn blank_reasons_are_rejected_before_any_mutation() {
        assert!(matches!(
            AuditGate::validate_reason("   "),
            Err(WorkflowError::MissingReason)
        ));
        assert_eq!(
            AuditGate::validate_reason("  照片模糊 ").expect("valid reason"),
            "照片模糊"
        );
    }
}

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::step::{StepLedger, FIRST_STEP};
use crate::errors::WorkflowError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Purchase,
    Rent,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Rent => "rent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "purchase" => Some(Self::Purchase),
            "rent" => Some(Self::Rent),
            _ => None,
        }
    }
}

/// Which audited half of the lifecycle a state belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Inbound,
    Outbound,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inbound" => Some(Self::Inbound),
            "outbound" => Some(Self::Outbound),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingReceive,
    InboundProcessing,
    PendingInboundAudit,
    OutboundProcessing,
    PendingOutboundAudit,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReceive => "pending_receive",
            Self::InboundProcessing => "inbound_processing",
            Self::PendingInboundAudit => "pending_inbound_audit",
            Self::OutboundProcessing => "outbound_processing",
            Self::PendingOutboundAudit => "pending_outbound_audit",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending_receive" => Some(Self::PendingReceive),
            "inbound_processing" => Some(Self::InboundProcessing),
            "pending_inbound_audit" => Some(Self::PendingInboundAudit),
            "outbound_processing" => Some(Self::OutboundProcessing),
            "pending_outbound_audit" => Some(Self::PendingOutboundAudit),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// The phase being worked when this is a processing status.
    pub fn processing_phase(&self) -> Option<Phase> {
        match self {
            Self::InboundProcessing => Some(Phase::Inbound),
            Self::OutboundProcessing => Some(Phase::Outbound),
            _ => None,
        }
    }

    /// The phase awaiting a decision when this is a pending-audit status.
    pub fn pending_phase(&self) -> Option<Phase> {
        match self {
            Self::PendingInboundAudit => Some(Phase::Inbound),
            Self::PendingOutboundAudit => Some(Phase::Outbound),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    None,
    Pending,
    Approved,
    Rejected,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// One line of the cart snapshot frozen into the order at creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Decimal,
    pub image_url: String,
    pub quantity: u32,
}

/// Origin-store snapshot taken at creation and never refreshed afterwards.
/// `region_id` is denormalized alongside `store_name` so region queries stay
/// repository-local.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub store_id: StoreId,
    pub store_name: String,
    pub region_id: RegionId,
}

/// A procurement order moving through the staged fulfillment workflow.
///
/// `status` names the kind of state the order is in (processing vs.
/// pending-audit vs. terminal); `current_step` names the position within the
/// active phase. The items and totals are a snapshot of the cart at checkout
/// and are never recomputed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcurementOrder {
    pub id: OrderId,
    pub store: StoreSnapshot,
    pub items: Vec<OrderItem>,
    pub order_type: OrderType,
    pub rent_duration_months: Option<u32>,
    pub total_price: Decimal,
    pub expect_delivery_date: Option<NaiveDate>,
    pub remark: String,
    pub status: OrderStatus,
    pub current_step: u8,
    pub audit_status: AuditStatus,
    pub reject_reason: Option<String>,
    pub steps: StepLedger,
    pub audit_time: Option<DateTime<Utc>>,
    pub create_time: DateTime<Utc>,
}

impl ProcurementOrder {
    /// Validates the cart snapshot and freezes it into a new order in
    /// `pending_receive`. The total is computed here, once.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: OrderId,
        store: StoreSnapshot,
        items: Vec<OrderItem>,
        order_type: OrderType,
        rent_duration_months: Option<u32>,
        expect_delivery_date: Option<NaiveDate>,
        remark: String,
        create_time: DateTime<Utc>,
    ) -> Result<Self, WorkflowError> {
        if items.is_empty() {
            return Err(WorkflowError::InvalidOrder(
                "order must contain at least one item".to_string(),
            ));
        }
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(WorkflowError::InvalidOrder(format!(
                "item `{}` has zero quantity",
                item.product_id.0
            )));
        }
        match (order_type, rent_duration_months) {
            (OrderType::Rent, None) => {
                return Err(WorkflowError::InvalidOrder(
                    "rent orders require a rent duration".to_string(),
                ));
            }
            (OrderType::Rent, Some(0)) => {
                return Err(WorkflowError::InvalidOrder(
                    "rent duration must be at least one month".to_string(),
                ));
            }
            (OrderType::Purchase, Some(_)) => {
                return Err(WorkflowError::InvalidOrder(
                    "purchase orders must not carry a rent duration".to_string(),
                ));
            }
            _ => {}
        }

        let total_price = items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum();

        Ok(Self {
            id,
            store,
            items,
            order_type,
            rent_duration_months,
            total_price,
            expect_delivery_date,
            remark,
            status: OrderStatus::PendingReceive,
            current_step: FIRST_STEP,
            audit_status: AuditStatus::None,
            reject_reason: None,
            steps: StepLedger::default(),
            audit_time: None,
            create_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{
        OrderId, OrderItem, OrderStatus, OrderType, ProcurementOrder, ProductId, RegionId,
        StoreId, StoreSnapshot,
    };
    use crate::domain::step::FIRST_STEP;
    use crate::errors::WorkflowError;

    fn store() -> StoreSnapshot {
        StoreSnapshot {
            store_id: StoreId("store-7".to_string()),
            store_name: "Harbor View Hotel".to_string(),
            region_id: RegionId("region-east".to_string()),
        }
    }

    fn item(product: &str, price_cents: i64, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: ProductId(product.to_string()),
            product_name: product.to_string(),
            price: Decimal::new(price_cents, 2),
            image_url: format!("https://img.example/{product}.jpg"),
            quantity,
        }
    }

    #[test]
    fn creation_freezes_total_from_cart_lines() {
        let order = ProcurementOrder::create(
            OrderId("o-1".to_string()),
            store(),
            vec![item("kettle", 10_000, 3), item("iron", 5_000, 1)],
            OrderType::Purchase,
            None,
            None,
            String::new(),
            Utc::now(),
        )
        .expect("valid order");

        assert_eq!(order.total_price, Decimal::new(35_000, 2));
        assert_eq!(order.status, OrderStatus::PendingReceive);
        assert_eq!(order.current_step, FIRST_STEP);
    }

    #[test]
    fn creation_rejects_empty_cart() {
        let error = ProcurementOrder::create(
            OrderId("o-2".to_string()),
            store(),
            Vec::new(),
            OrderType::Purchase,
            None,
            None,
            String::new(),
            Utc::now(),
        )
        .expect_err("empty cart must fail");

        assert!(matches!(error, WorkflowError::InvalidOrder(_)));
    }

    #[test]
    fn creation_rejects_zero_quantity_line() {
        let error = ProcurementOrder::create(
            OrderId("o-3".to_string()),
            store(),
            vec![item("kettle", 10_000, 0)],
            OrderType::Purchase,
            None,
            None,
            String::new(),
            Utc::now(),
        )
        .expect_err("zero quantity must fail");

        assert!(matches!(error, WorkflowError::InvalidOrder(_)));
    }

    #[test]
    fn rent_orders_require_a_duration() {
        let error = ProcurementOrder::create(
            OrderId("o-4".to_string()),
            store(),
            vec![item("projector", 80_000, 1)],
            OrderType::Rent,
            None,
            None,
            String::new(),
            Utc::now(),
        )
        .expect_err("rent without duration must fail");

        assert!(matches!(error, WorkflowError::InvalidOrder(_)));

        let order = ProcurementOrder::create(
            OrderId("o-5".to_string()),
            store(),
            vec![item("projector", 80_000, 1)],
            OrderType::Rent,
            Some(6),
            None,
            String::new(),
            Utc::now(),
        )
        .expect("rent with duration is valid");
        assert_eq!(order.rent_duration_months, Some(6));
    }

    #[test]
    fn purchase_orders_reject_a_rent_duration() {
        let error = ProcurementOrder::create(
            OrderId("o-6".to_string()),
            store(),
            vec![item("kettle", 10_000, 1)],
            OrderType::Purchase,
            Some(3),
            None,
            String::new(),
            Utc::now(),
        )
        .expect_err("purchase with duration must fail");

        assert!(matches!(error, WorkflowError::InvalidOrder(_)));
    }

    #[test]
    fn status_encodings_round_trip() {
        let statuses = [
            OrderStatus::PendingReceive,
            OrderStatus::InboundProcessing,
            OrderStatus::PendingInboundAudit,
            OrderStatus::OutboundProcessing,
            OrderStatus::PendingOutboundAudit,
            OrderStatus::Completed,
        ];
        for status in statuses {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("shipped"), None);
    }
}

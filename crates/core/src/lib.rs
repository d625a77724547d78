pub mod audit;
pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod gate;
pub mod repository;
pub mod service;
pub mod workflow;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    AppConfig, AuditConfig, ConfigError, LoadOptions, LogFormat, LoggingConfig, ServerConfig,
};
pub use domain::device::{Device, DeviceId};
pub use domain::order::{
    AuditStatus, OrderId, OrderItem, OrderStatus, OrderType, Phase, ProcurementOrder, ProductId,
    RegionId, StoreId, StoreSnapshot,
};
pub use domain::step::{
    EvidencePatch, LogisticsItem, LogisticsItemId, StepEvidence, StepLedger, StepRecord,
    STEP_ACKNOWLEDGE, STEP_INSPECTION, STEP_LOGISTICS, STEP_RECEIPT, STEP_STOCKING,
};
pub use errors::WorkflowError;
pub use gate::{
    AuditAuthorizer, AuditGate, AuditorContext, InventoryMaterializer, MaterializationError,
    StaticAuthorizer,
};
pub use repository::{DeviceRepository, OrderRepository, RepositoryError};
pub use service::{CreateOrderRequest, ProcurementService};
pub use workflow::{TransitionOutcome, WorkflowAction, WorkflowEngine, WorkflowEvent};

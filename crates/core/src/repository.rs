use async_trait::async_trait;
use thiserror::Error;

use crate::domain::device::Device;
use crate::domain::order::{OrderId, ProcurementOrder, RegionId, StoreId};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("duplicate order id `{0}`")]
    DuplicateId(OrderId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Keyed collection of order aggregates. Orders are never deleted; completed
/// orders remain as the audit record.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts a new order; fails on id collision.
    async fn create(&self, order: ProcurementOrder) -> Result<(), RepositoryError>;

    /// Replaces the stored aggregate for an existing order.
    async fn save(&self, order: ProcurementOrder) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<ProcurementOrder>, RepositoryError>;

    async fn list_by_store(
        &self,
        store_id: &StoreId,
    ) -> Result<Vec<ProcurementOrder>, RepositoryError>;

    async fn list_by_region(
        &self,
        region_id: &RegionId,
    ) -> Result<Vec<ProcurementOrder>, RepositoryError>;
}

/// The device registry fed by outbound approvals.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn save_all(&self, devices: Vec<Device>) -> Result<(), RepositoryError>;

    async fn list_by_store(&self, store_id: &StoreId) -> Result<Vec<Device>, RepositoryError>;
}

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use opsdesk_core::domain::device::Device;
use opsdesk_core::domain::order::{OrderId, ProcurementOrder, RegionId, StoreId};
use opsdesk_core::repository::{DeviceRepository, OrderRepository, RepositoryError};

/// Order store backing the deployed console. Aggregates are replaced whole on
/// every save; listings come back newest-first.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, ProcurementOrder>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut orders: Vec<ProcurementOrder>) -> Vec<ProcurementOrder> {
        orders.sort_by(|a, b| b.create_time.cmp(&a.create_time).then(a.id.0.cmp(&b.id.0)));
        orders
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: ProcurementOrder) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id.0) {
            return Err(RepositoryError::DuplicateId(order.id.clone()));
        }
        orders.insert(order.id.0.clone(), order);
        Ok(())
    }

    async fn save(&self, order: ProcurementOrder) -> Result<(), RepositoryError> {
        self.orders.write().await.insert(order.id.0.clone(), order);
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<ProcurementOrder>, RepositoryError> {
        Ok(self.orders.read().await.get(&id.0).cloned())
    }

    async fn list_by_store(
        &self,
        store_id: &StoreId,
    ) -> Result<Vec<ProcurementOrder>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(Self::sorted(
            orders
                .values()
                .filter(|order| &order.store.store_id == store_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_by_region(
        &self,
        region_id: &RegionId,
    ) -> Result<Vec<ProcurementOrder>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(Self::sorted(
            orders
                .values()
                .filter(|order| &order.store.region_id == region_id)
                .cloned()
                .collect(),
        ))
    }
}

/// Device registry fed by outbound approvals.
#[derive(Default)]
pub struct InMemoryDeviceRepository {
    devices: RwLock<Vec<Device>>,
}

impl InMemoryDeviceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn save_all(&self, devices: Vec<Device>) -> Result<(), RepositoryError> {
        self.devices.write().await.extend(devices);
        Ok(())
    }

    async fn list_by_store(&self, store_id: &StoreId) -> Result<Vec<Device>, RepositoryError> {
        Ok(self
            .devices
            .read()
            .await
            .iter()
            .filter(|device| &device.store_id == store_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use opsdesk_core::domain::order::{
        OrderId, OrderItem, OrderType, ProcurementOrder, ProductId, RegionId, StoreId,
        StoreSnapshot,
    };
    use opsdesk_core::repository::{OrderRepository, RepositoryError};

    use super::InMemoryOrderRepository;

    fn order(id: &str, store: &str, offset_hours: i64) -> ProcurementOrder {
        let created = Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap()
            + Duration::hours(offset_hours);
        ProcurementOrder::create(
            OrderId(id.to_string()),
            StoreSnapshot {
                store_id: StoreId(store.to_string()),
                store_name: format!("{store} Hotel"),
                region_id: RegionId("region-north".to_string()),
            },
            vec![OrderItem {
                product_id: ProductId("kettle".to_string()),
                product_name: "Electric Kettle".to_string(),
                price: Decimal::new(9_900, 2),
                image_url: "https://img.example/kettle.jpg".to_string(),
                quantity: 2,
            }],
            OrderType::Purchase,
            None,
            None,
            String::new(),
            created,
        )
        .expect("valid order")
    }

    #[tokio::test]
    async fn create_refuses_duplicate_ids() {
        let repo = InMemoryOrderRepository::new();
        repo.create(order("o-1", "store-1", 0)).await.expect("first insert");

        let error = repo.create(order("o-1", "store-1", 1)).await.expect_err("collision");
        assert!(matches!(error, RepositoryError::DuplicateId(_)));
    }

    #[tokio::test]
    async fn store_listing_is_newest_first() {
        let repo = InMemoryOrderRepository::new();
        repo.create(order("o-old", "store-1", 0)).await.expect("insert");
        repo.create(order("o-new", "store-1", 5)).await.expect("insert");
        repo.create(order("o-other", "store-2", 3)).await.expect("insert");

        let listed = repo
            .list_by_store(&StoreId("store-1".to_string()))
            .await
            .expect("list");
        let ids: Vec<&str> = listed.iter().map(|order| order.id.0.as_str()).collect();
        assert_eq!(ids, vec!["o-new", "o-old"]);
    }

    #[tokio::test]
    async fn region_listing_spans_stores() {
        let repo = InMemoryOrderRepository::new();
        repo.create(order("o-1", "store-1", 0)).await.expect("insert");
        repo.create(order("o-2", "store-2", 1)).await.expect("insert");

        let listed = repo
            .list_by_region(&RegionId("region-north".to_string()))
            .await
            .expect("list");
        assert_eq!(listed.len(), 2);
    }
}

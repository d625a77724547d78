use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use opsdesk_core::clock::Clock;
use opsdesk_core::domain::device::{Device, DeviceId};
use opsdesk_core::domain::order::ProcurementOrder;
use opsdesk_core::gate::{InventoryMaterializer, MaterializationError};
use opsdesk_core::repository::DeviceRepository;

/// Expands an approved order into store inventory: one device row per unit
/// of each line item, all written in a single batch.
pub struct DeviceRegistryMaterializer {
    devices: Arc<dyn DeviceRepository>,
    clock: Arc<dyn Clock>,
}

impl DeviceRegistryMaterializer {
    pub fn new(devices: Arc<dyn DeviceRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { devices, clock }
    }
}

#[async_trait]
impl InventoryMaterializer for DeviceRegistryMaterializer {
    async fn materialize(&self, order: &ProcurementOrder) -> Result<(), MaterializationError> {
        let acquired_at = self.clock.now();
        let mut batch = Vec::new();
        for item in &order.items {
            for _ in 0..item.quantity {
                batch.push(Device {
                    id: DeviceId(Uuid::new_v4().to_string()),
                    product_id: item.product_id.clone(),
                    product_name: item.product_name.clone(),
                    image_url: item.image_url.clone(),
                    store_id: order.store.store_id.clone(),
                    source_order_id: order.id.clone(),
                    acquired_at,
                });
            }
        }

        self.devices
            .save_all(batch)
            .await
            .map_err(|error| MaterializationError(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use opsdesk_core::clock::FixedClock;
    use opsdesk_core::domain::order::{
        OrderId, OrderItem, OrderType, ProcurementOrder, ProductId, RegionId, StoreId,
        StoreSnapshot,
    };
    use opsdesk_core::gate::InventoryMaterializer;
    use opsdesk_core::repository::DeviceRepository;

    use super::DeviceRegistryMaterializer;
    use crate::memory::InMemoryDeviceRepository;

    #[tokio::test]
    async fn one_device_per_unit_lands_in_the_registry() {
        let now = Utc.with_ymd_and_hms(2026, 6, 2, 10, 0, 0).unwrap();
        let devices = Arc::new(InMemoryDeviceRepository::new());
        let materializer = DeviceRegistryMaterializer::new(
            Arc::clone(&devices) as Arc<dyn DeviceRepository>,
            Arc::new(FixedClock::at(now)),
        );

        let order = ProcurementOrder::create(
            OrderId("o-42".to_string()),
            StoreSnapshot {
                store_id: StoreId("store-7".to_string()),
                store_name: "Harbor Hotel".to_string(),
                region_id: RegionId("region-east".to_string()),
            },
            vec![
                OrderItem {
                    product_id: ProductId("kettle".to_string()),
                    product_name: "Electric Kettle".to_string(),
                    price: Decimal::new(9_900, 2),
                    image_url: "https://img.example/kettle.jpg".to_string(),
                    quantity: 3,
                },
                OrderItem {
                    product_id: ProductId("iron".to_string()),
                    product_name: "Steam Iron".to_string(),
                    price: Decimal::new(4_900, 2),
                    image_url: "https://img.example/iron.jpg".to_string(),
                    quantity: 1,
                },
            ],
            OrderType::Purchase,
            None,
            None,
            String::new(),
            now,
        )
        .expect("valid order");

        materializer.materialize(&order).await.expect("registry write");

        let registered = devices
            .list_by_store(&StoreId("store-7".to_string()))
            .await
            .expect("list devices");
        assert_eq!(registered.len(), 4);
        assert_eq!(
            registered.iter().filter(|device| device.product_id.0 == "kettle").count(),
            3
        );
        assert!(registered
            .iter()
            .all(|device| device.source_order_id.0 == "o-42" && device.acquired_at == now));
    }
}

use rust_decimal::Decimal;

use opsdesk_core::domain::order::{
    OrderId, OrderItem, OrderType, ProductId, RegionId, StoreId, StoreSnapshot,
};
use opsdesk_core::domain::step::{EvidencePatch, STEP_INSPECTION, STEP_STOCKING};
use opsdesk_core::errors::WorkflowError;
use opsdesk_core::service::{CreateOrderRequest, ProcurementService};

struct SeedStore {
    store_id: &'static str,
    store_name: &'static str,
    region_id: &'static str,
}

struct SeedItem {
    product_id: &'static str,
    product_name: &'static str,
    price_cents: i64,
    image_url: &'static str,
    quantity: u32,
}

/// Demo stores covering two regions so both listing queries have data.
const SEED_STORES: &[SeedStore] = &[
    SeedStore {
        store_id: "store-lakeside",
        store_name: "Lakeside Hotel",
        region_id: "region-north",
    },
    SeedStore {
        store_id: "store-harbor",
        store_name: "Harbor Hotel",
        region_id: "region-east",
    },
];

const SEED_CART: &[SeedItem] = &[
    SeedItem {
        product_id: "prod-kettle",
        product_name: "Electric Kettle",
        price_cents: 9_900,
        image_url: "https://img.example/kettle.jpg",
        quantity: 4,
    },
    SeedItem {
        product_id: "prod-iron",
        product_name: "Steam Iron",
        price_cents: 5_900,
        image_url: "https://img.example/iron.jpg",
        quantity: 2,
    },
    SeedItem {
        product_id: "prod-hairdryer",
        product_name: "Hair Dryer",
        price_cents: 7_500,
        image_url: "https://img.example/hairdryer.jpg",
        quantity: 3,
    },
];

/// Ids of the orders created by [`seed_demo_orders`], in creation order.
#[derive(Clone, Debug)]
pub struct SeedSummary {
    pub fresh: OrderId,
    pub in_progress: OrderId,
    pub awaiting_audit: OrderId,
}

fn snapshot(store: &SeedStore) -> StoreSnapshot {
    StoreSnapshot {
        store_id: StoreId(store.store_id.to_string()),
        store_name: store.store_name.to_string(),
        region_id: RegionId(store.region_id.to_string()),
    }
}

fn cart() -> Vec<OrderItem> {
    SEED_CART
        .iter()
        .map(|item| OrderItem {
            product_id: ProductId(item.product_id.to_string()),
            product_name: item.product_name.to_string(),
            price: Decimal::new(item.price_cents, 2),
            image_url: item.image_url.to_string(),
            quantity: item.quantity,
        })
        .collect()
}

fn request(store: &SeedStore, remark: &str) -> CreateOrderRequest {
    CreateOrderRequest {
        store: snapshot(store),
        items: cart(),
        order_type: OrderType::Purchase,
        rent_duration_months: None,
        expect_delivery_date: None,
        remark: remark.to_string(),
    }
}

/// Seeds three demo orders at different lifecycle positions: one untouched,
/// one mid-inbound, and one waiting on the inbound audit desk. Only operator
/// commands are used, so seeding works under any audit role table.
pub async fn seed_demo_orders(
    service: &ProcurementService,
) -> Result<SeedSummary, WorkflowError> {
    let fresh = service
        .create(request(&SEED_STORES[0], "demo: freshly placed"))
        .await?;

    let in_progress = service
        .create(request(&SEED_STORES[1], "demo: stocking in progress"))
        .await?;
    service.start_processing(&in_progress.id).await?;
    service
        .record_evidence(
            &in_progress.id,
            STEP_STOCKING,
            EvidencePatch::AddImage { url: "https://img.example/demo/stocking-1.jpg".to_string() },
        )
        .await?;

    let awaiting = service
        .create(request(&SEED_STORES[0], "demo: awaiting inbound audit"))
        .await?;
    service.start_processing(&awaiting.id).await?;
    service
        .record_evidence(
            &awaiting.id,
            STEP_STOCKING,
            EvidencePatch::AddImage { url: "https://img.example/demo/stocking-2.jpg".to_string() },
        )
        .await?;
    service.advance_step(&awaiting.id).await?;
    service
        .record_evidence(
            &awaiting.id,
            STEP_INSPECTION,
            EvidencePatch::AddImage {
                url: "https://img.example/demo/inspection-1.jpg".to_string(),
            },
        )
        .await?;
    service.advance_step(&awaiting.id).await?;
    service.submit_inbound_audit(&awaiting.id).await?;

    Ok(SeedSummary {
        fresh: fresh.id,
        in_progress: in_progress.id,
        awaiting_audit: awaiting.id,
    })
}

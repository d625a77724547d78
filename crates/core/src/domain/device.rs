use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::order::{OrderId, ProductId, StoreId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

/// One physical equipment unit in the device registry. Materialized from a
/// procurement order when its outbound audit is approved; one record per
/// ordered unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub product_id: ProductId,
    pub product_name: String,
    pub image_url: String,
    pub store_id: StoreId,
    pub source_order_id: OrderId,
    pub acquired_at: DateTime<Utc>,
}

pub mod fixtures;
pub mod materializer;
pub mod memory;

pub use fixtures::{seed_demo_orders, SeedSummary};
pub use materializer::DeviceRegistryMaterializer;
pub use memory::{InMemoryDeviceRepository, InMemoryOrderRepository};

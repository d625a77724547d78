pub mod device;
pub mod order;
pub mod step;

pub mod device;
pub mod dtos;

pub use device::{AuthId, Device, DeviceId, DeviceStatus};

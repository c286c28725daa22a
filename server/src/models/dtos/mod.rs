pub mod device;
pub mod tenant;

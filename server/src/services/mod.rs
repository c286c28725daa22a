pub mod admission;
pub mod scoped;

pub use admission::{AdmissionCoordinator, AdmissionError, DeviceAdmission};
pub use scoped::{RequestContext, ScopedCoordinator};

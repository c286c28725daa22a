pub mod deviceauth;

pub use deviceauth::{ClientConfig, ClientFactory, DevAuthError};

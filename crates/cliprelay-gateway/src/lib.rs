pub mod connection;
pub mod error;
pub mod registry;
pub mod relay;
pub mod session;

pub use error::GatewayError;
pub use registry::{ConnId, ConnectionRegistry};
pub use relay::Relay;

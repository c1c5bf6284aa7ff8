mod core;
mod gateway;
mod observability;
mod policy;
mod review;
mod signing;

pub use self::core::{Config, default_policies};
pub use gateway::GatewayConfig;
pub use observability::ObservabilityConfig;
pub use policy::PolicyConfig;
pub use review::{ReviewBackend, ReviewConfig};
pub use signing::SigningConfig;

pub mod schema;

pub use schema::{
    Config, GatewayConfig, ObservabilityConfig, PolicyConfig, ReviewBackend, ReviewConfig,
    SigningConfig, default_policies,
};

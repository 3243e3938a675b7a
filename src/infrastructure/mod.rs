// Infrastructure layer - Prediction service adapter and configuration
pub mod config;
pub mod http_client;
pub mod wire;

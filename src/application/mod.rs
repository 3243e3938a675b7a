// Application layer - polling and reconciliation engine
pub mod prediction_client;
pub mod scheduler;
pub mod session;
pub mod store;

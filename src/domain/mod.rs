// Domain layer - plain data and pure derivations
pub mod dashboard;
pub mod features;
pub mod location;
pub mod risk;
pub mod snapshot;

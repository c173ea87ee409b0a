// Domain layer: event/measurement models and the ports the platform
// adapters implement.

pub mod model;
pub mod ports;

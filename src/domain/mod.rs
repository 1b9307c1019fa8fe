// Domain layer: core models and ports (interfaces) for the extraction flow.

pub mod model;
pub mod ports;

// Domain layer: plain data and the ports the pipelines are written against.

pub mod model;
pub mod ports;

// Domain layer: records exchanged with the backend, request forms and ports.

pub mod forms;
pub mod model;
pub mod ports;

pub mod catalog;
pub mod channel;
pub mod errors;
pub mod offer;
pub mod order;
pub mod ports;

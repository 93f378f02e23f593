// Adapters layer: concrete implementations of the domain ports.

pub mod credential;
pub mod epub;
pub mod http;
pub mod memory;
pub mod progress;
pub mod storage;

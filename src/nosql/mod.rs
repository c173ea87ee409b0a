pub mod memory;
pub mod proxy;

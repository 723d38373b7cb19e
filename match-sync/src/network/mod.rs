//! Zenoh transport of the store

pub mod keyexpr;
pub mod zenoh_store;

pub use keyexpr::{StoreKey, StoreKeyexpr};
pub use zenoh_store::ZenohStore;

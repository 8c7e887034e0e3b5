//! Storage device parameters, bound enforcement, and the physical store capability.

pub mod bounds;
pub mod params;
/// Physical store trait and the reference battery model.
pub mod store;

pub use params::{StorageConfig, StorageConfigBuilder, StorageParams};
pub use store::{Battery, PhysicalStore, StoreState};

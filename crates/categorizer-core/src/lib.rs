pub mod category;
pub mod classify;
pub mod config;
pub mod controller;
pub mod engine;
pub mod manager;
pub mod storage;
pub mod store;

pub use category::{
  ALL,
  CategoryMap,
  OTHER
};
pub use config::CategorizerConfig;
pub use controller::{
  Host,
  MountController,
  MountOutcome,
  MountState
};
pub use manager::CategoryDraft;
pub use storage::{
  KeyValueStore,
  MemoryStore,
  StorageError
};
pub use store::CategoryStore;

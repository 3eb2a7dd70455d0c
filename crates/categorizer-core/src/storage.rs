use std::cell::{
  Cell,
  RefCell
};
use std::collections::BTreeMap;
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failures reported by a key-value
/// backend. None of them are retried.
#[derive(
  Debug, Clone, PartialEq, Eq, Error,
)]
pub enum StorageError {
  #[error(
    "failed to read `{key}` from storage: \
     {reason}"
  )]
  Read { key: String, reason: String },

  #[error(
    "failed to write `{key}` to storage: \
     {reason}"
  )]
  Write { key: String, reason: String },

  #[error(
    "stored value under `{key}` is \
     malformed: {reason}"
  )]
  Decode { key: String, reason: String },

  #[error("storage backend unavailable: {0}")]
  Unavailable(String)
}

impl StorageError {
  pub fn read(
    key: &str,
    reason: impl ToString
  ) -> Self {
    Self::Read {
      key:    key.to_string(),
      reason: reason.to_string()
    }
  }

  pub fn write(
    key: &str,
    reason: impl ToString
  ) -> Self {
    Self::Write {
      key:    key.to_string(),
      reason: reason.to_string()
    }
  }

  pub fn decode(
    key: &str,
    reason: impl ToString
  ) -> Self {
    Self::Decode {
      key:    key.to_string(),
      reason: reason.to_string()
    }
  }
}

/// Asynchronous, process-external
/// key-value store.
///
/// Futures are not required to be `Send`:
/// browser backends resolve JS promises on
/// the page's event loop.
#[async_trait(?Send)]
pub trait KeyValueStore {
  async fn get(
    &self,
    key: &str
  ) -> Result<Option<Value>, StorageError>;

  async fn set(
    &self,
    key: &str,
    value: Value
  ) -> Result<(), StorageError>;
}

#[async_trait(?Send)]
impl<T> KeyValueStore for Rc<T>
where
  T: KeyValueStore + ?Sized
{
  async fn get(
    &self,
    key: &str
  ) -> Result<Option<Value>, StorageError> {
    (**self).get(key).await
  }

  async fn set(
    &self,
    key: &str,
    value: Value
  ) -> Result<(), StorageError> {
    (**self).set(key, value).await
  }
}

/// Session-only store. Used when the page
/// offers no durable storage, and in
/// tests, where reads and writes can be
/// made to fail on demand.
#[derive(Debug, Default)]
pub struct MemoryStore {
  values:      RefCell<BTreeMap<String, Value>>,
  fail_reads:  Cell<bool>,
  fail_writes: Cell<bool>
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_fail_reads(&self, fail: bool) {
    self.fail_reads.set(fail);
  }

  pub fn set_fail_writes(
    &self,
    fail: bool
  ) {
    self.fail_writes.set(fail);
  }

  pub fn raw(
    &self,
    key: &str
  ) -> Option<Value> {
    self.values.borrow().get(key).cloned()
  }

  pub fn insert_raw(
    &self,
    key: &str,
    value: Value
  ) {
    self
      .values
      .borrow_mut()
      .insert(key.to_string(), value);
  }
}

#[async_trait(?Send)]
impl KeyValueStore for MemoryStore {
  async fn get(
    &self,
    key: &str
  ) -> Result<Option<Value>, StorageError> {
    if self.fail_reads.get() {
      return Err(StorageError::read(
        key,
        "reads disabled"
      ));
    }
    Ok(self.raw(key))
  }

  async fn set(
    &self,
    key: &str,
    value: Value
  ) -> Result<(), StorageError> {
    if self.fail_writes.get() {
      return Err(StorageError::write(
        key,
        "quota exceeded"
      ));
    }
    self.insert_raw(key, value);
    Ok(())
  }
}

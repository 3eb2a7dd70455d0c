use serde_json::Value;
use tracing::{
  debug,
  info,
  warn
};

use crate::category::{
  ALL,
  CategoryMap
};
use crate::config::StorageConfig;
use crate::storage::{
  KeyValueStore,
  StorageError
};

pub const CATEGORIES_KEY: &str =
  "user_categories";
pub const ACTIVE_FILTER_KEY: &str =
  "active_filter";

/// Persistence contract for the category
/// map and the active filter, on top of
/// any [`KeyValueStore`].
#[derive(Debug)]
pub struct CategoryStore<S> {
  backend:           S,
  categories_key:    String,
  active_filter_key: String,
  defaults:          CategoryMap
}

impl<S> CategoryStore<S>
where
  S: KeyValueStore
{
  pub fn new(
    backend: S,
    config: &StorageConfig
  ) -> Self {
    Self {
      backend,
      categories_key: config
        .key(CATEGORIES_KEY),
      active_filter_key: config
        .key(ACTIVE_FILTER_KEY),
      defaults: CategoryMap::builtin()
    }
  }

  /// Overrides the map written on first
  /// run.
  pub fn with_defaults(
    mut self,
    mut defaults: CategoryMap
  ) -> Self {
    defaults.ensure_reserved();
    self.defaults = defaults;
    self
  }

  pub fn defaults(&self) -> &CategoryMap {
    &self.defaults
  }

  /// Reads the persisted map, seeding the
  /// defaults when nothing (or an empty
  /// map) is stored.
  #[tracing::instrument(skip(self))]
  pub async fn load(
    &self
  ) -> Result<CategoryMap, StorageError> {
    let key = &self.categories_key;
    let stored =
      self.backend.get(key).await?;

    let map = match stored {
      | None | Some(Value::Null) => None,
      | Some(value) => Some(
        serde_json::from_value::<CategoryMap>(
          value
        )
        .map_err(|err| {
          StorageError::decode(key, err)
        })?
      )
    };

    match map {
      | Some(mut map) if !map.is_empty() => {
        map.ensure_reserved();
        debug!(
          count = map.len(),
          "loaded categories"
        );
        Ok(map)
      }
      | _ => {
        info!(
          key = %key,
          "no stored categories; seeding \
           defaults"
        );
        self.save(&self.defaults).await?;
        Ok(self.defaults.clone())
      }
    }
  }

  /// Replaces the persisted map wholesale.
  #[tracing::instrument(
    skip(self, map),
    fields(count = map.len())
  )]
  pub async fn save(
    &self,
    map: &CategoryMap
  ) -> Result<(), StorageError> {
    let key = &self.categories_key;
    let value = serde_json::to_value(map)
      .map_err(|err| {
        StorageError::write(key, err)
      })?;
    self.backend.set(key, value).await?;
    debug!("saved categories");
    Ok(())
  }

  #[tracing::instrument(skip(self))]
  pub async fn active_filter(
    &self
  ) -> Result<String, StorageError> {
    let key = &self.active_filter_key;
    match self.backend.get(key).await? {
      | None | Some(Value::Null) => {
        Ok(ALL.to_string())
      }
      | Some(Value::String(name))
        if !name.trim().is_empty() =>
      {
        Ok(name)
      }
      | Some(Value::String(_)) => {
        Ok(ALL.to_string())
      }
      | Some(other) => {
        warn!(
          value = %other,
          "active filter is not a string"
        );
        Err(StorageError::decode(
          key,
          "expected a string"
        ))
      }
    }
  }

  #[tracing::instrument(skip(self))]
  pub async fn set_active_filter(
    &self,
    name: &str
  ) -> Result<(), StorageError> {
    self
      .backend
      .set(
        &self.active_filter_key,
        Value::String(name.to_string())
      )
      .await?;
    debug!(name, "saved active filter");
    Ok(())
  }
}

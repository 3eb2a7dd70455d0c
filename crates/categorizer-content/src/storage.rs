use async_trait::async_trait;
use categorizer_core::storage::{
  KeyValueStore,
  MemoryStore,
  StorageError
};
use gloo::storage::errors::StorageError as LocalStorageError;
use gloo::storage::{
  LocalStorage,
  Storage
};
use js_sys::{
  Object,
  Promise,
  Reflect
};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
  #[wasm_bindgen(
    catch,
    js_namespace = ["browser", "storage", "local"],
    js_name = get
  )]
  fn extension_get(
    keys: &JsValue
  ) -> Result<Promise, JsValue>;

  #[wasm_bindgen(
    catch,
    js_namespace = ["browser", "storage", "local"],
    js_name = set
  )]
  fn extension_set(
    items: &JsValue
  ) -> Result<Promise, JsValue>;

  #[wasm_bindgen(
    catch,
    js_namespace = GM,
    js_name = getValue
  )]
  fn gm_get_value(
    key: &str
  ) -> Result<Promise, JsValue>;

  #[wasm_bindgen(
    catch,
    js_namespace = GM,
    js_name = setValue
  )]
  fn gm_set_value(
    key: &str,
    value: &str
  ) -> Result<Promise, JsValue>;
}

/// Storage backend picked from what the
/// page context offers.
pub enum BrowserStorage {
  /// WebExtension `browser.storage.local`.
  Extension,
  /// Userscript manager `GM.getValue` /
  /// `GM.setValue`.
  Userscript,
  /// `window.localStorage` of the host
  /// page.
  Local,
  /// Nothing durable; state lasts for the
  /// page's lifetime.
  Session(MemoryStore)
}

impl BrowserStorage {
  pub fn detect() -> Self {
    let global = js_sys::global();
    if has_path(&global, &[
      "browser", "storage", "local"
    ]) {
      BrowserStorage::Extension
    } else if has_path(&global, &[
      "GM", "getValue"
    ]) {
      BrowserStorage::Userscript
    } else if web_sys::window()
      .and_then(|window| {
        window.local_storage().ok().flatten()
      })
      .is_some()
    {
      BrowserStorage::Local
    } else {
      BrowserStorage::Session(
        MemoryStore::new()
      )
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      | BrowserStorage::Extension => {
        "extension"
      }
      | BrowserStorage::Userscript => {
        "userscript"
      }
      | BrowserStorage::Local => "local",
      | BrowserStorage::Session(_) => {
        "session"
      }
    }
  }
}

#[async_trait(?Send)]
impl KeyValueStore for BrowserStorage {
  async fn get(
    &self,
    key: &str
  ) -> Result<Option<Value>, StorageError> {
    match self {
      | BrowserStorage::Extension => {
        let promise =
          extension_get(&JsValue::from_str(key))
            .map_err(|err| unavailable(&err))?;
        let items = JsFuture::from(promise)
          .await
          .map_err(|err| {
            StorageError::read(key, describe(&err))
          })?;
        let value =
          Reflect::get(&items, &JsValue::from_str(key))
            .map_err(|err| {
              StorageError::read(key, describe(&err))
            })?;
        from_js(key, value)
      }
      | BrowserStorage::Userscript => {
        let promise = gm_get_value(key)
          .map_err(|err| unavailable(&err))?;
        let value = JsFuture::from(promise)
          .await
          .map_err(|err| {
            StorageError::read(key, describe(&err))
          })?;

        // Older script versions stored bare
        // strings rather than JSON text.
        match value.as_string() {
          | Some(text) => {
            Ok(Some(
              serde_json::from_str(&text)
                .unwrap_or(Value::String(text))
            ))
          }
          | None => from_js(key, value)
        }
      }
      | BrowserStorage::Local => {
        match LocalStorage::get::<Value>(key) {
          | Ok(value) => Ok(Some(value)),
          | Err(
            LocalStorageError::KeyNotFound(_)
          ) => Ok(None),
          | Err(
            LocalStorageError::SerdeError(err)
          ) => Err(StorageError::decode(key, err)),
          | Err(err) => {
            Err(StorageError::read(key, err))
          }
        }
      }
      | BrowserStorage::Session(memory) => {
        memory.get(key).await
      }
    }
  }

  async fn set(
    &self,
    key: &str,
    value: Value
  ) -> Result<(), StorageError> {
    match self {
      | BrowserStorage::Extension => {
        let items = Object::new();
        Reflect::set(
          &items,
          &JsValue::from_str(key),
          &to_js(key, &value)?
        )
        .map_err(|err| {
          StorageError::write(key, describe(&err))
        })?;
        let promise = extension_set(&items)
          .map_err(|err| unavailable(&err))?;
        JsFuture::from(promise)
          .await
          .map_err(|err| {
            StorageError::write(key, describe(&err))
          })?;
        Ok(())
      }
      | BrowserStorage::Userscript => {
        let text = serde_json::to_string(&value)
          .map_err(|err| {
            StorageError::write(key, err)
          })?;
        let promise = gm_set_value(key, &text)
          .map_err(|err| unavailable(&err))?;
        JsFuture::from(promise)
          .await
          .map_err(|err| {
            StorageError::write(key, describe(&err))
          })?;
        Ok(())
      }
      | BrowserStorage::Local => {
        LocalStorage::set(key, &value)
          .map_err(|err| {
            StorageError::write(key, err)
          })
      }
      | BrowserStorage::Session(memory) => {
        memory.set(key, value).await
      }
    }
  }
}

fn has_path(
  root: &JsValue,
  path: &[&str]
) -> bool {
  let mut current = root.clone();
  for segment in path {
    match Reflect::get(
      &current,
      &JsValue::from_str(segment)
    ) {
      | Ok(next)
        if !next.is_undefined()
          && !next.is_null() =>
      {
        current = next;
      }
      | _ => return false
    }
  }
  true
}

fn from_js(
  key: &str,
  value: JsValue
) -> Result<Option<Value>, StorageError> {
  if value.is_undefined() || value.is_null() {
    return Ok(None);
  }
  serde_wasm_bindgen::from_value(value)
    .map(Some)
    .map_err(|err| StorageError::decode(key, err))
}

fn to_js(
  key: &str,
  value: &Value
) -> Result<JsValue, StorageError> {
  value
    .serialize(
      &serde_wasm_bindgen::Serializer::json_compatible()
    )
    .map_err(|err| StorageError::write(key, err))
}

/// The storage API threw before handing
/// back a promise.
fn unavailable(err: &JsValue) -> StorageError {
  StorageError::Unavailable(describe(err))
}

fn describe(err: &JsValue) -> String {
  err
    .as_string()
    .or_else(|| {
      Reflect::get(err, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
    })
    .unwrap_or_else(|| format!("{err:?}"))
}

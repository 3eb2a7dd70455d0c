mod components;
mod dom;
mod observer;
mod storage;
mod styles;

use std::rc::Rc;

use categorizer_core::{
  CategorizerConfig,
  CategoryStore,
  MountController
};
use wasm_bindgen::prelude::*;

use crate::dom::{
  Controller,
  WebHost
};
use crate::storage::BrowserStorage;

const CONFIG_TOML: &str =
  include_str!("../assets/categorizer.toml");

#[wasm_bindgen(start)]
pub fn start() {
  console_error_panic_hook::set_once();
  let mut tracing_config =
    wasm_tracing::WasmLayerConfig::new();
  tracing_config
    .set_max_level(tracing::Level::INFO);
  let _ = wasm_tracing::set_as_global_default_with_config(
    tracing_config
  );

  tracing::info!(
    "starting NotebookLM categorizer"
  );

  if let Err(error) = run() {
    tracing::error!(
      ?error,
      "categorizer failed to start"
    );
  }
}

fn run() -> Result<(), JsValue> {
  let cfg = CategorizerConfig::from_toml_or_default(
    CONFIG_TOML
  );

  let document = web_sys::window()
    .and_then(|window| window.document())
    .ok_or_else(|| {
      JsValue::from_str("no document to attach to")
    })?;

  styles::inject(
    &document,
    &cfg.selectors.filter_bar
  )?;

  let backend = BrowserStorage::detect();
  tracing::info!(
    backend = backend.kind(),
    "selected storage backend"
  );
  let store = CategoryStore::new(
    backend,
    &cfg.storage
  )
  .with_defaults(cfg.default_categories());

  let selectors = cfg.selectors.clone();
  let host_document = document.clone();
  let controller: Rc<Controller> =
    Rc::new_cyclic(|weak| {
      MountController::new(
        store,
        WebHost::new(
          host_document,
          selectors,
          weak.clone()
        )
      )
    });

  observer::watch(
    &document,
    &cfg.selectors,
    controller
  )
}

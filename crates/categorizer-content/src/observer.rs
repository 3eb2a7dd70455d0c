use std::rc::Rc;

use categorizer_core::MountOutcome;
use categorizer_core::config::SelectorConfig;
use tracing::{
  debug,
  info,
  warn
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
  Document,
  Element,
  MutationObserver,
  MutationObserverInit,
  MutationRecord,
  NodeList
};

use crate::dom::Controller;

const SEEN_ATTR: &str = "data-categorizer-seen";

/// An added or removed node, as far as the
/// observer cares.
pub trait ChangedNode {
  /// Whether the node itself, or anything
  /// below it, matches `selector`.
  fn touches(&self, selector: &str) -> bool;
}

impl ChangedNode for Element {
  fn touches(&self, selector: &str) -> bool {
    self.matches(selector).unwrap_or(false)
      || self
        .query_selector(selector)
        .ok()
        .flatten()
        .is_some()
  }
}

/// Whether a batch of added and removed
/// nodes can change the container or the
/// project list. Anything else, our own
/// filter bar included, is ignored.
pub fn affects_projects<N: ChangedNode>(
  nodes: &[N],
  selectors: &SelectorConfig
) -> bool {
  nodes.iter().any(|node| {
    node.touches(&selectors.container)
      || node.touches(&selectors.projects)
  })
}

/// Watches the document for the projects
/// container. A newly inserted container
/// triggers a full mount; project nodes
/// coming or going while mounted trigger a
/// refresh.
pub fn watch(
  document: &Document,
  selectors: &SelectorConfig,
  controller: Rc<Controller>
) -> Result<(), JsValue> {
  let root = document
    .document_element()
    .ok_or_else(|| {
      JsValue::from_str("document has no root element")
    })?;

  scan(document, &selectors.container, &controller);

  let document = document.clone();
  let watched = selectors.clone();
  let callback = Closure::<
    dyn FnMut(js_sys::Array, MutationObserver)
  >::new(
    move |records: js_sys::Array,
          _observer: MutationObserver| {
      let nodes = changed_elements(&records);
      if affects_projects(&nodes, &watched) {
        scan(&document, &watched.container, &controller);
      }
    }
  );

  let observer = MutationObserver::new(
    callback.as_ref().unchecked_ref()
  )?;
  let options = MutationObserverInit::new();
  options.set_child_list(true);
  options.set_subtree(true);
  observer
    .observe_with_options(&root, &options)?;

  // Lives for the page.
  callback.forget();
  debug!(
    selector = %selectors.container,
    "watching page for project container"
  );
  Ok(())
}

fn changed_elements(
  records: &js_sys::Array
) -> Vec<Element> {
  let mut nodes = Vec::new();
  for record in records.iter() {
    let Ok(record) =
      record.dyn_into::<MutationRecord>()
    else {
      continue;
    };
    collect_elements(&record.added_nodes(), &mut nodes);
    collect_elements(&record.removed_nodes(), &mut nodes);
  }
  nodes
}

fn collect_elements(
  list: &NodeList,
  into: &mut Vec<Element>
) {
  into.extend(
    (0..list.length())
      .filter_map(|idx| list.item(idx))
      .filter_map(|node| {
        node.dyn_into::<Element>().ok()
      })
  );
}

fn scan(
  document: &Document,
  selector: &str,
  controller: &Rc<Controller>
) {
  let container = match document
    .query_selector(selector)
  {
    | Ok(found) => found,
    | Err(error) => {
      warn!(selector, ?error, "invalid container selector");
      return;
    }
  };

  match container {
    | Some(container)
      if !container.has_attribute(SEEN_ATTR) =>
    {
      arrive(container, controller);
    }
    | Some(_) => {
      if controller.host().container_connected() {
        controller.refresh();
      }
    }
    | None => {}
  }
}

fn arrive(
  container: Element,
  controller: &Rc<Controller>
) {
  if let Err(error) =
    container.set_attribute(SEEN_ATTR, "")
  {
    warn!(?error, "failed to mark container");
  }
  controller.host().set_container(container);
  info!("project container appeared");

  let controller = Rc::clone(controller);
  wasm_bindgen_futures::spawn_local(
    async move {
      match controller.mount().await {
        | MountOutcome::Mounted => {}
        | MountOutcome::Superseded => {
          debug!("mount superseded by a newer one");
        }
        | MountOutcome::NoContainer => {
          debug!("container gone before mount finished");
        }
      }
    }
  );
}

use std::cell::RefCell;
use std::rc::Weak;

use categorizer_core::config::SelectorConfig;
use categorizer_core::controller::Host;
use categorizer_core::engine::{
  FilterBarModel,
  ProjectRecord,
  Visibility
};
use categorizer_core::{
  CategoryDraft,
  CategoryMap,
  MountController
};
use tracing::{
  debug,
  warn
};
use wasm_bindgen::JsCast;
use web_sys::{
  Document,
  Element
};
use yew::{
  AppHandle,
  Callback
};

use crate::components::{
  FilterBar,
  FilterBarProps
};
use crate::storage::BrowserStorage;

pub type Controller =
  MountController<BrowserStorage, WebHost>;

const FILTERED_ATTR: &str = "data-filtered";

struct MountedBar {
  root:       Element,
  handle:     AppHandle<FilterBar>,
  model:      FilterBarModel,
  categories: CategoryMap
}

impl MountedBar {
  fn teardown(self) {
    self.handle.destroy();
    self.root.remove();
  }
}

/// The host page as seen by the mount
/// controller.
pub struct WebHost {
  document:   Document,
  selectors:  SelectorConfig,
  controller: Weak<Controller>,
  container:  RefCell<Option<Element>>,
  projects:   RefCell<Vec<Element>>,
  bar:        RefCell<Option<MountedBar>>
}

impl WebHost {
  pub fn new(
    document: Document,
    selectors: SelectorConfig,
    controller: Weak<Controller>
  ) -> Self {
    Self {
      document,
      selectors,
      controller,
      container: RefCell::new(None),
      projects: RefCell::new(Vec::new()),
      bar: RefCell::new(None)
    }
  }

  pub fn set_container(
    &self,
    container: Element
  ) {
    *self.container.borrow_mut() =
      Some(container);
  }

  pub fn container_connected(&self) -> bool {
    self
      .container
      .borrow()
      .as_ref()
      .is_some_and(|container| {
        container.is_connected()
      })
  }

  fn query_all(
    &self,
    root: &Element,
    selector: &str
  ) -> Vec<Element> {
    let list = match root
      .query_selector_all(selector)
    {
      | Ok(list) => list,
      | Err(error) => {
        warn!(
          selector,
          ?error,
          "invalid selector"
        );
        return Vec::new();
      }
    };

    (0..list.length())
      .filter_map(|idx| list.item(idx))
      .filter_map(|node| {
        node.dyn_into::<Element>().ok()
      })
      .collect()
  }

  fn props(
    &self,
    model: &FilterBarModel,
    categories: &CategoryMap
  ) -> FilterBarProps {
    let select_handle = self.controller.clone();
    let on_select =
      Callback::from(move |name: String| {
        let Some(controller) =
          select_handle.upgrade()
        else {
          return;
        };
        wasm_bindgen_futures::spawn_local(
          async move {
            if let Err(error) =
              controller.select(&name).await
            {
              warn!(%error, "filter selection kept in memory only");
            }
          }
        );
      });

    let save_handle = self.controller.clone();
    let on_save = Callback::from(
      move |draft: CategoryDraft| {
        let Some(controller) =
          save_handle.upgrade()
        else {
          return;
        };
        wasm_bindgen_futures::spawn_local(
          async move {
            if let Err(error) =
              controller.commit(&draft).await
            {
              warn!(%error, "category changes kept in memory only");
            }
          }
        );
      }
    );

    FilterBarProps {
      model: model.clone(),
      categories: categories.clone(),
      on_select,
      on_save
    }
  }

  fn insert_root(
    &self,
    container: &Element,
    root: &Element
  ) -> bool {
    let anchor = if self
      .selectors
      .anchor
      .trim()
      .is_empty()
    {
      None
    } else {
      container
        .query_selector(&self.selectors.anchor)
        .ok()
        .flatten()
    };

    let inserted = match anchor
      .as_ref()
      .and_then(|anchor| {
        anchor.parent_node().map(|parent| {
          (parent, anchor)
        })
      }) {
      | Some((parent, anchor)) => {
        parent.insert_before(root, Some(anchor))
      }
      | None => {
        container.insert_before(
          root,
          container.first_child().as_ref()
        )
      }
    };

    if let Err(error) = inserted {
      warn!(?error, "failed to insert filter bar");
      return false;
    }
    true
  }
}

impl Host for WebHost {
  fn projects(&self) -> Vec<ProjectRecord> {
    let Some(root) =
      self.document.document_element()
    else {
      return Vec::new();
    };
    let elements =
      self.query_all(&root, &self.selectors.projects);

    let records = elements
      .iter()
      .map(|element| {
        let title = element
          .query_selector(&self.selectors.title)
          .ok()
          .flatten()
          .map(|node| {
            node.text_content().unwrap_or_default()
          });
        if title.is_none() {
          debug!(
            tag = %element.tag_name(),
            "no title found in project element"
          );
        }
        ProjectRecord {
          title
        }
      })
      .collect();

    *self.projects.borrow_mut() = elements;
    records
  }

  fn apply_visibility(
    &self,
    visibility: &[Visibility]
  ) {
    let projects = self.projects.borrow();
    for (element, state) in
      projects.iter().zip(visibility)
    {
      if element
        .get_attribute(FILTERED_ATTR)
        .as_deref()
        == Some(state.attribute_value())
      {
        continue;
      }
      if let Err(error) = element.set_attribute(
        FILTERED_ATTR,
        state.attribute_value()
      ) {
        warn!(?error, "failed to mark project");
      }
    }
  }

  fn remove_filter_bar(&self) {
    if let Some(bar) = self.bar.borrow_mut().take()
    {
      bar.teardown();
    }

    let Some(root) =
      self.document.document_element()
    else {
      return;
    };
    let strays = self.query_all(
      &root,
      &format!(".{}", self.selectors.filter_bar)
    );
    if !strays.is_empty() {
      debug!(
        count = strays.len(),
        "removing leftover filter bars"
      );
    }
    for stray in strays {
      stray.remove();
    }
  }

  fn render_filter_bar(
    &self,
    model: &FilterBarModel,
    categories: &CategoryMap
  ) -> bool {
    let mut slot = self.bar.borrow_mut();

    if let Some(bar) = slot.as_mut()
      && bar.root.is_connected()
    {
      if bar.model != *model
        || bar.categories != *categories
      {
        bar
          .handle
          .update(self.props(model, categories));
        bar.model = model.clone();
        bar.categories = categories.clone();
      }
      return true;
    }

    if let Some(detached) = slot.take() {
      debug!("filter bar detached by page; rebuilding");
      detached.teardown();
    }

    let Some(container) = self
      .container
      .borrow()
      .clone()
      .filter(|container| container.is_connected())
    else {
      return false;
    };

    let root =
      match self.document.create_element("div") {
        | Ok(root) => root,
        | Err(error) => {
          warn!(?error, "failed to create filter bar");
          return false;
        }
      };
    root.set_class_name(&self.selectors.filter_bar);
    if !self.insert_root(&container, &root) {
      return false;
    }

    let handle = yew::Renderer::<FilterBar>::with_root_and_props(
      root.clone(),
      self.props(model, categories)
    )
    .render();

    *slot = Some(MountedBar {
      root,
      handle,
      model: model.clone(),
      categories: categories.clone()
    });
    true
  }
}

use tracing::debug;
use wasm_bindgen::JsValue;
use web_sys::{
  Document,
  Element
};

const STYLE_ID: &str = "notebooklm-categorizer-styles";
const STYLESHEET: &str =
  include_str!("../assets/categorizer.css");

/// Adds the categorizer stylesheet to the
/// page head once, scoped to the
/// configured filter bar class.
pub fn inject(
  document: &Document,
  filter_bar_class: &str
) -> Result<(), JsValue> {
  if document.get_element_by_id(STYLE_ID).is_some() {
    debug!("stylesheet already present");
    return Ok(());
  }

  let style = document.create_element("style")?;
  style.set_id(STYLE_ID);
  style.set_text_content(Some(&render(
    filter_bar_class
  )));

  let parent: Element = match document.head() {
    | Some(head) => head.into(),
    | None => {
      document.document_element().ok_or_else(
        || {
          JsValue::from_str(
            "document has no root element"
          )
        }
      )?
    }
  };
  parent.append_child(&style)?;
  Ok(())
}

fn render(filter_bar_class: &str) -> String {
  STYLESHEET.replace("__FILTER_BAR__", filter_bar_class)
}

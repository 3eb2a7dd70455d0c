use categorizer_core::engine::FilterBarModel;
use categorizer_core::{
  CategoryDraft,
  CategoryMap
};
use tracing::warn;
use web_sys::{
  HtmlInputElement,
  InputEvent,
  MouseEvent
};
use yew::{
  Callback,
  Html,
  NodeRef,
  Properties,
  TargetCast,
  classes,
  function_component,
  html,
  use_effect_with,
  use_node_ref,
  use_state
};

#[derive(Properties, PartialEq)]
pub struct FilterBarProps {
  pub model:      FilterBarModel,
  pub categories: CategoryMap,
  pub on_select:  Callback<String>,
  pub on_save:    Callback<CategoryDraft>
}

#[function_component(FilterBar)]
pub fn filter_bar(
  props: &FilterBarProps
) -> Html {
  let draft =
    use_state(|| None::<CategoryDraft>);

  let on_open = {
    let draft = draft.clone();
    let categories = props.categories.clone();
    Callback::from(move |_: MouseEvent| {
      draft.set(Some(CategoryDraft::open(
        &categories
      )));
    })
  };

  let on_close = {
    let draft = draft.clone();
    Callback::from(move |_: ()| {
      if let Some(current) = (*draft).clone() {
        current.cancel();
      }
      draft.set(None);
    })
  };

  let on_change = {
    let draft = draft.clone();
    Callback::from(
      move |next: CategoryDraft| {
        draft.set(Some(next));
      }
    )
  };

  let on_commit = {
    let draft = draft.clone();
    let on_save = props.on_save.clone();
    Callback::from(move |_: ()| {
      if let Some(current) = (*draft).clone() {
        on_save.emit(current);
      }
      draft.set(None);
    })
  };

  html! {
      <>
          {
              for props.model.buttons.iter().map(|button| {
                  let name = button.name.clone();
                  let on_select = props.on_select.clone();
                  html! {
                      <button
                          type="button"
                          class={classes!("category-filter-button", button.active.then_some("active"))}
                          data-category={button.name.clone()}
                          onclick={move |_| on_select.emit(name.clone())}
                      >
                          { button.label() }
                      </button>
                  }
              })
          }
          <button
              type="button"
              id="open-category-manager-btn"
              class="category-manager-open"
              title="Manage Categories"
              onclick={on_open}
          >
              <svg viewBox="0 0 24 24" width="18" height="18" aria-hidden="true">
                  <circle cx="12" cy="12" r="3" fill="none" stroke="currentColor" stroke-width="2" />
                  <path
                      fill="none"
                      stroke="currentColor"
                      stroke-width="2"
                      stroke-linecap="round"
                      d="M12 2v3M12 19v3M2 12h3M19 12h3M4.9 4.9l2.1 2.1M17 17l2.1 2.1M4.9 19.1L7 17M17 7l2.1-2.1"
                  />
              </svg>
          </button>
          {
              if let Some(notice) = &props.model.notice {
                  html! { <span class="category-filter-notice">{ notice }</span> }
              } else {
                  html! {}
              }
          }
          {
              if let Some(current) = &*draft {
                  html! {
                      <CategoryManager
                          draft={current.clone()}
                          on_change={on_change}
                          on_cancel={on_close}
                          on_save={on_commit}
                      />
                  }
              } else {
                  html! {}
              }
          }
      </>
  }
}

/// Row whose name input should take focus
/// once the draft has rendered `rows` rows.
fn focus_due(
  target: Option<usize>,
  rows: usize
) -> Option<usize> {
  target.filter(|&row| row < rows)
}

#[derive(Properties, PartialEq)]
pub struct CategoryManagerProps {
  pub draft:     CategoryDraft,
  pub on_change: Callback<CategoryDraft>,
  pub on_cancel: Callback<()>,
  pub on_save:   Callback<()>
}

#[function_component(CategoryManager)]
pub fn category_manager(
  props: &CategoryManagerProps
) -> Html {
  let new_name_input = use_node_ref();
  let focus_row = use_state(|| None::<usize>);

  {
    let new_name_input = new_name_input.clone();
    let focus_row = focus_row.clone();
    use_effect_with(
      (*focus_row, props.draft.entries().len()),
      move |&(target, rows)| {
        if focus_due(target, rows).is_some() {
          if let Some(input) = new_name_input
            .cast::<HtmlInputElement>()
            && let Err(error) = input.focus()
          {
            warn!(?error, "failed to focus new category");
          }
          focus_row.set(None);
        }
      }
    );
  }

  let on_backdrop = {
    let on_cancel = props.on_cancel.clone();
    Callback::from(move |_: MouseEvent| {
      on_cancel.emit(())
    })
  };
  let on_cancel = {
    let on_cancel = props.on_cancel.clone();
    Callback::from(move |_: MouseEvent| {
      on_cancel.emit(())
    })
  };
  let on_save = {
    let on_save = props.on_save.clone();
    Callback::from(move |_: MouseEvent| {
      on_save.emit(())
    })
  };
  let on_add = {
    let draft = props.draft.clone();
    let on_change = props.on_change.clone();
    let focus_row = focus_row.clone();
    Callback::from(move |_: MouseEvent| {
      let mut next = draft.clone();
      focus_row.set(Some(next.add()));
      on_change.emit(next);
    })
  };

  let focus_target = *focus_row;

  let rows = props
    .draft
    .entries()
    .iter()
    .enumerate()
    .map(|(index, entry)| {
      let on_name = {
        let draft = props.draft.clone();
        let on_change = props.on_change.clone();
        Callback::from(move |e: InputEvent| {
          let input: HtmlInputElement =
            e.target_unchecked_into();
          let mut next = draft.clone();
          if next.set_name(index, &input.value())
          {
            on_change.emit(next);
          }
        })
      };
      let on_keywords = {
        let draft = props.draft.clone();
        let on_change = props.on_change.clone();
        Callback::from(move |e: InputEvent| {
          let input: HtmlInputElement =
            e.target_unchecked_into();
          let mut next = draft.clone();
          if next
            .set_keywords(index, &input.value())
          {
            on_change.emit(next);
          }
        })
      };
      let on_delete = {
        let draft = props.draft.clone();
        let on_change = props.on_change.clone();
        Callback::from(move |_: MouseEvent| {
          let mut next = draft.clone();
          if next.delete(index).is_some() {
            on_change.emit(next);
          }
        })
      };

      html! {
          <div class="category-manager-row" key={index}>
              <input
                  class="category-name-input"
                  ref={if focus_target == Some(index) { new_name_input.clone() } else { NodeRef::default() }}
                  value={entry.name.clone()}
                  placeholder="Category name"
                  oninput={on_name}
              />
              <input
                  class="category-keywords-input"
                  value={entry.keywords.clone()}
                  placeholder="Keywords, comma separated"
                  oninput={on_keywords}
              />
              <button type="button" class="category-delete-btn" title="Delete" onclick={on_delete}>
                  { "\u{00d7}" }
              </button>
          </div>
      }
    });

  html! {
      <div class="category-manager-overlay" onclick={on_backdrop}>
          <div class="category-manager-modal" onclick={Callback::from(|e: MouseEvent| e.stop_propagation())}>
              <div class="category-manager-header">{ "Manage Categories" }</div>
              <div class="category-manager-list">
                  { for rows }
              </div>
              <button type="button" class="category-manager-add" onclick={on_add}>
                  { "Add New Category" }
              </button>
              <div class="category-manager-footer">
                  <button type="button" class="btn" onclick={on_cancel}>{ "Cancel" }</button>
                  <button type="button" class="btn primary" onclick={on_save}>{ "Save and Close" }</button>
              </div>
          </div>
      </div>
  }
}

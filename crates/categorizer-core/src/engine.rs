use tracing::trace;

use crate::category::{
  ALL,
  CategoryMap
};
use crate::classify::classify;

/// Ephemeral view over one rendered
/// project. Rebuilt on every pass.
#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub struct ProjectRecord {
  pub title: Option<String>
}

impl ProjectRecord {
  pub fn titled(
    title: impl Into<String>
  ) -> Self {
    Self {
      title: Some(title.into())
    }
  }

  pub fn untitled() -> Self {
    Self {
      title: None
    }
  }

  pub fn category<'a>(
    &self,
    categories: &'a CategoryMap
  ) -> &'a str {
    classify(self.title.as_deref(), categories)
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Visibility {
  Visible,
  Hidden
}

impl Visibility {
  /// Value written to the project's
  /// `data-filtered` attribute.
  pub fn attribute_value(
    self
  ) -> &'static str {
    match self {
      | Visibility::Visible => "visible",
      | Visibility::Hidden => "hidden"
    }
  }
}

/// Per-category project counts, in
/// category map order.
#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub struct CategoryCounts {
  entries: Vec<(String, usize)>
}

impl CategoryCounts {
  pub fn get(
    &self,
    name: &str
  ) -> Option<usize> {
    self
      .entries
      .iter()
      .find(|(entry, _)| entry == name)
      .map(|(_, count)| *count)
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&str, usize)>
  {
    self
      .entries
      .iter()
      .map(|(name, count)| {
        (name.as_str(), *count)
      })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterButton {
  pub name:   String,
  pub count:  usize,
  pub active: bool
}

impl FilterButton {
  pub fn label(&self) -> String {
    format!("{} ({})", self.name, self.count)
  }
}

/// Everything the filter bar needs to
/// draw itself.
#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub struct FilterBarModel {
  pub buttons: Vec<FilterButton>,
  pub active:  String,
  pub notice:  Option<String>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPass {
  pub visibility: Vec<Visibility>,
  pub counts:     CategoryCounts,
  pub bar:        FilterBarModel
}

/// Falls back to `All` when `selected`
/// names a category that no longer
/// exists.
pub fn resolve_active(
  selected: &str,
  categories: &CategoryMap
) -> String {
  if categories.contains(selected) {
    selected.to_string()
  } else {
    ALL.to_string()
  }
}

pub fn compute_visibility(
  projects: &[ProjectRecord],
  selected: &str,
  categories: &CategoryMap
) -> Vec<Visibility> {
  let assigned =
    classify_all(projects, categories);
  visibility_of(&assigned, selected)
}

pub fn compute_counts(
  projects: &[ProjectRecord],
  categories: &CategoryMap
) -> CategoryCounts {
  let assigned =
    classify_all(projects, categories);
  counts_of(&assigned, categories)
}

/// Classifies each project once and
/// derives visibility, counts and the
/// button models for `selected`.
#[tracing::instrument(
  level = "debug",
  skip(projects, categories),
  fields(projects = projects.len())
)]
pub fn run_pass(
  projects: &[ProjectRecord],
  categories: &CategoryMap,
  selected: &str
) -> FilterPass {
  let assigned =
    classify_all(projects, categories);
  let visibility =
    visibility_of(&assigned, selected);
  let counts =
    counts_of(&assigned, categories);

  let buttons = counts
    .iter()
    .map(|(name, count)| FilterButton {
      name: name.to_string(),
      count,
      active: name == selected
    })
    .collect();

  trace!(?counts, "filter pass computed");

  FilterPass {
    visibility,
    counts,
    bar: FilterBarModel {
      buttons,
      active: selected.to_string(),
      notice: None
    }
  }
}

fn classify_all<'a>(
  projects: &[ProjectRecord],
  categories: &'a CategoryMap
) -> Vec<&'a str> {
  projects
    .iter()
    .map(|project| {
      project.category(categories)
    })
    .collect()
}

fn visibility_of(
  assigned: &[&str],
  selected: &str
) -> Vec<Visibility> {
  assigned
    .iter()
    .map(|category| {
      if selected == ALL
        || *category == selected
      {
        Visibility::Visible
      } else {
        Visibility::Hidden
      }
    })
    .collect()
}

fn counts_of(
  assigned: &[&str],
  categories: &CategoryMap
) -> CategoryCounts {
  let entries = categories
    .names()
    .map(|name| {
      let count = if name == ALL {
        assigned.len()
      } else {
        assigned
          .iter()
          .filter(|category| **category == name)
          .count()
      };
      (name.to_string(), count)
    })
    .collect();

  CategoryCounts {
    entries
  }
}

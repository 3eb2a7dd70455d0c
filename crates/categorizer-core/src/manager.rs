use tracing::debug;

use crate::category::{
  ALL,
  CategoryMap
};

/// One editable row: the raw text of the
/// name and keyword fields.
#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub struct DraftEntry {
  pub name:     String,
  pub keywords: String
}

/// Editing session over a copy of the
/// category map. Nothing reaches storage
/// until the built map is committed.
#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub struct CategoryDraft {
  entries: Vec<DraftEntry>
}

impl CategoryDraft {
  /// One entry per category except the
  /// implicit `All`.
  pub fn open(map: &CategoryMap) -> Self {
    let entries = map
      .iter()
      .filter(|category| category.name != ALL)
      .map(|category| DraftEntry {
        name:     category.name.clone(),
        keywords: category.keywords.join(", ")
      })
      .collect();
    Self {
      entries
    }
  }

  pub fn entries(&self) -> &[DraftEntry] {
    &self.entries
  }

  /// Appends a blank entry and returns its
  /// index.
  pub fn add(&mut self) -> usize {
    self.entries.push(DraftEntry::default());
    self.entries.len() - 1
  }

  pub fn delete(
    &mut self,
    index: usize
  ) -> Option<DraftEntry> {
    (index < self.entries.len())
      .then(|| self.entries.remove(index))
  }

  pub fn set_name(
    &mut self,
    index: usize,
    name: impl Into<String>
  ) -> bool {
    match self.entries.get_mut(index) {
      | Some(entry) => {
        entry.name = name.into();
        true
      }
      | None => false
    }
  }

  pub fn set_keywords(
    &mut self,
    index: usize,
    keywords: impl Into<String>
  ) -> bool {
    match self.entries.get_mut(index) {
      | Some(entry) => {
        entry.keywords = keywords.into();
        true
      }
      | None => false
    }
  }

  /// Index of the entry whose trimmed name
  /// equals `name`, last one first.
  pub fn position(
    &self,
    name: &str
  ) -> Option<usize> {
    self
      .entries
      .iter()
      .rposition(|entry| entry.name.trim() == name)
  }

  /// Builds the replacement map.
  ///
  /// `All` always comes first. Entries with
  /// a blank name are dropped. When two
  /// entries share a name the later one's
  /// keywords win and the earlier one's
  /// position is kept. `Other` is appended
  /// when no entry provided it. An entry
  /// named `All` cannot give it keywords.
  pub fn build(&self) -> CategoryMap {
    let mut map = CategoryMap::new();
    map.insert(ALL, vec![]);

    for entry in &self.entries {
      let name = entry.name.trim();
      if name.is_empty() {
        continue;
      }
      map.insert(
        name,
        split_keywords(&entry.keywords)
      );
    }

    map.ensure_reserved();
    debug!(
      count = map.len(),
      "built category map from draft"
    );
    map
  }

  pub fn cancel(self) {
    debug!(
      entries = self.entries.len(),
      "discarded category draft"
    );
  }
}

pub fn split_keywords(
  text: &str
) -> Vec<String> {
  text
    .split(',')
    .map(str::trim)
    .filter(|keyword| !keyword.is_empty())
    .map(ToString::to_string)
    .collect()
}

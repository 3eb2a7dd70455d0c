use std::fmt;

use serde::de::{
  MapAccess,
  Visitor
};
use serde::ser::SerializeMap;
use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  Serializer
};
use serde_json::Value;
use tracing::debug;

/// Pass-through selector. Never matched
/// against titles.
pub const ALL: &str = "All";

/// Catch-all bucket for titles no other
/// category claims.
pub const OTHER: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
  pub name:     String,
  pub keywords: Vec<String>
}

/// Ordered category name -> keyword list
/// mapping.
///
/// Iteration order is insertion order and
/// is significant: the classifier gives
/// earlier categories priority. Inserting
/// an existing name replaces its keywords
/// in place, so the first occurrence keeps
/// its position.
#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub struct CategoryMap {
  entries: Vec<Category>
}

impl CategoryMap {
  pub fn new() -> Self {
    Self::default()
  }

  /// Map written on first run.
  pub fn builtin() -> Self {
    Self::from_pairs([
      (ALL, vec![]),
      (
        "Tutorial",
        vec![
          "How to", "Course", "Lecture",
          "Tutorial",
        ]
      ),
      (
        "Finance",
        vec![
          "Investing", "Gold", "Stocks",
          "Bonds", "Funds",
        ]
      ),
      (OTHER, vec![])
    ])
  }

  pub fn from_pairs<I, N, K>(
    pairs: I
  ) -> Self
  where
    I: IntoIterator<Item = (N, Vec<K>)>,
    N: Into<String>,
    K: Into<String>
  {
    let mut map = Self::new();
    for (name, keywords) in pairs {
      map.insert(
        name,
        keywords
          .into_iter()
          .map(Into::into)
          .collect()
      );
    }
    map
  }

  pub fn insert(
    &mut self,
    name: impl Into<String>,
    keywords: Vec<String>
  ) {
    let name = name.into();
    if let Some(existing) = self
      .entries
      .iter_mut()
      .find(|entry| entry.name == name)
    {
      existing.keywords = keywords;
    } else {
      self.entries.push(Category {
        name,
        keywords
      });
    }
  }

  pub fn get(
    &self,
    name: &str
  ) -> Option<&[String]> {
    self
      .entries
      .iter()
      .find(|entry| entry.name == name)
      .map(|entry| entry.keywords.as_slice())
  }

  pub fn contains(
    &self,
    name: &str
  ) -> bool {
    self.get(name).is_some()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = &Category> {
    self.entries.iter()
  }

  pub fn names(
    &self
  ) -> impl Iterator<Item = &str> {
    self
      .entries
      .iter()
      .map(|entry| entry.name.as_str())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn has_reserved(&self) -> bool {
    self.get(ALL).is_some_and(<[String]>::is_empty)
      && self.contains(OTHER)
  }

  /// Restores the `All`/`Other`
  /// invariants: `All` exists with no
  /// keywords (added at the front when
  /// missing) and `Other` exists (added at
  /// the back when missing).
  pub fn ensure_reserved(&mut self) {
    match self
      .entries
      .iter_mut()
      .find(|entry| entry.name == ALL)
    {
      | Some(all) => all.keywords.clear(),
      | None => {
        self.entries.insert(0, Category {
          name:     ALL.to_string(),
          keywords: vec![]
        });
      }
    }

    if !self.contains(OTHER) {
      self.entries.push(Category {
        name:     OTHER.to_string(),
        keywords: vec![]
      });
    }
  }
}

impl Serialize for CategoryMap {
  fn serialize<S>(
    &self,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    let mut map = serializer
      .serialize_map(Some(self.entries.len()))?;
    for entry in &self.entries {
      map.serialize_entry(
        &entry.name,
        &entry.keywords
      )?;
    }
    map.end()
  }
}

impl<'de> Deserialize<'de> for CategoryMap {
  fn deserialize<D>(
    deserializer: D
  ) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>
  {
    deserializer
      .deserialize_map(CategoryMapVisitor)
  }
}

struct CategoryMapVisitor;

impl<'de> Visitor<'de> for CategoryMapVisitor {
  type Value = CategoryMap;

  fn expecting(
    &self,
    f: &mut fmt::Formatter
  ) -> fmt::Result {
    f.write_str(
      "an object of category name to \
       keyword list"
    )
  }

  fn visit_map<A>(
    self,
    mut access: A
  ) -> Result<Self::Value, A::Error>
  where
    A: MapAccess<'de>
  {
    let mut map = CategoryMap::new();
    while let Some((name, value)) =
      access.next_entry::<String, Value>()?
    {
      let name = name.trim();
      if name.is_empty() {
        continue;
      }
      map.insert(name, lenient_keywords(value));
    }
    Ok(map)
  }
}

/// Keeps the string keywords of a stored
/// list. `null` and non-list values count
/// as no keywords.
fn lenient_keywords(value: Value) -> Vec<String> {
  match value {
    | Value::Array(items) => {
      items
        .into_iter()
        .filter_map(|item| match item {
          | Value::String(keyword) => {
            Some(keyword)
          }
          | _ => None
        })
        .collect()
    }
    | Value::Null => Vec::new(),
    | other => {
      debug!(
        kind = ?other,
        "ignoring keywords that are not a list"
      );
      Vec::new()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::{
    ALL,
    CategoryMap,
    OTHER
  };

  #[test]
  fn insert_existing_keeps_position() {
    let mut map = CategoryMap::from_pairs([
      ("Work", vec!["a"]),
      ("Home", vec!["b"])
    ]);
    map.insert("Work", vec!["c".to_string()]);

    let names: Vec<_> = map.names().collect();
    assert_eq!(names, ["Work", "Home"]);
    assert_eq!(
      map.get("Work"),
      Some(&["c".to_string()][..])
    );
  }

  #[test]
  fn ensure_reserved_adds_all_first_and_other_last()
   {
    let mut map = CategoryMap::from_pairs([
      ("Work", vec!["a"])
    ]);
    map.ensure_reserved();

    let names: Vec<_> = map.names().collect();
    assert_eq!(names, [ALL, "Work", OTHER]);
    assert!(map.has_reserved());
  }

  #[test]
  fn ensure_reserved_clears_all_keywords() {
    let mut map = CategoryMap::from_pairs([
      (ALL, vec!["oops"]),
      (OTHER, vec!["misc"])
    ]);
    map.ensure_reserved();

    assert_eq!(map.get(ALL), Some(&[][..]));
    assert_eq!(
      map.get(OTHER),
      Some(&["misc".to_string()][..])
    );
  }

  #[test]
  fn json_preserves_declaration_order() {
    let raw = r#"{"Zeta":["z"],"All":[],"Alpha":["a"],"Other":[]}"#;
    let map: CategoryMap =
      serde_json::from_str(raw).unwrap();

    let names: Vec<_> = map.names().collect();
    assert_eq!(
      names,
      ["Zeta", "All", "Alpha", "Other"]
    );
    assert_eq!(
      serde_json::to_string(&map).unwrap(),
      raw
    );
  }

  #[test]
  fn json_skips_blank_names() {
    let map: CategoryMap = serde_json::from_str(
      r#"{"  ":["x"],"Work":["w"]}"#
    )
    .unwrap();
    assert_eq!(map.len(), 1);
    assert!(map.contains("Work"));
  }

  #[test]
  fn json_keeps_only_string_keywords() {
    let map: CategoryMap = serde_json::from_str(
      r#"{"All":[],"Work":["meeting",1,null,"standup"],"Home":null,"Misc":"x","Other":[]}"#
    )
    .unwrap();

    let names: Vec<_> = map.names().collect();
    assert_eq!(
      names,
      [ALL, "Work", "Home", "Misc", OTHER]
    );
    assert_eq!(
      map.get("Work"),
      Some(
        &[
          "meeting".to_string(),
          "standup".to_string()
        ][..]
      )
    );
    assert_eq!(map.get("Home"), Some(&[][..]));
    assert_eq!(map.get("Misc"), Some(&[][..]));
  }
}

use tracing::{
  debug,
  trace
};

use crate::category::{
  ALL,
  CategoryMap,
  OTHER
};

/// Which branch of the scan produced a
/// classification.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum MatchPath {
  /// No title could be read from the
  /// project element.
  MissingTitle,
  /// A keyword of a regular category
  /// matched.
  Keyword,
  /// One of `Other`'s own keywords
  /// matched.
  ExplicitOther,
  /// Nothing matched.
  CatchAll
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification<'a> {
  pub category: &'a str,
  pub path:     MatchPath,
  pub keyword:  Option<&'a str>
}

pub fn classify<'a>(
  title: Option<&str>,
  categories: &'a CategoryMap
) -> &'a str {
  classify_detailed(title, categories)
    .category
}

/// Assigns exactly one category to a
/// title.
///
/// Categories are scanned in declaration
/// order (skipping `All` and `Other`),
/// keywords in list order, and the first
/// case-insensitive substring hit wins.
/// `Other`'s own keywords are checked
/// last; everything else falls through to
/// `Other`.
pub fn classify_detailed<'a>(
  title: Option<&str>,
  categories: &'a CategoryMap
) -> Classification<'a> {
  let Some(title) = title else {
    debug!(
      "project has no title element; \
       classifying as Other"
    );
    return Classification {
      category: OTHER,
      path:     MatchPath::MissingTitle,
      keyword:  None
    };
  };

  let normalized = title.to_lowercase();
  let normalized = normalized.trim();

  for category in categories.iter() {
    if category.name == ALL
      || category.name == OTHER
    {
      continue;
    }

    if let Some(keyword) = first_match(
      normalized,
      &category.keywords
    ) {
      trace!(
        title = normalized,
        category = %category.name,
        keyword,
        "keyword matched"
      );
      return Classification {
        category: &category.name,
        path:     MatchPath::Keyword,
        keyword:  Some(keyword)
      };
    }
  }

  if let Some(keyword) = categories
    .get(OTHER)
    .and_then(|keywords| {
      first_match(normalized, keywords)
    })
  {
    return Classification {
      category: OTHER,
      path:     MatchPath::ExplicitOther,
      keyword:  Some(keyword)
    };
  }

  Classification {
    category: OTHER,
    path:     MatchPath::CatchAll,
    keyword:  None
  }
}

fn first_match<'k>(
  normalized_title: &str,
  keywords: &'k [String]
) -> Option<&'k str> {
  keywords
    .iter()
    .map(|keyword| keyword.trim())
    .filter(|keyword| !keyword.is_empty())
    .find(|keyword| {
      normalized_title
        .contains(&keyword.to_lowercase())
    })
}

#[cfg(test)]
mod tests {
  use super::{
    MatchPath,
    classify,
    classify_detailed
  };
  use crate::category::{
    ALL,
    CategoryMap,
    OTHER
  };

  #[test]
  fn first_declared_category_wins() {
    let map = CategoryMap::from_pairs([
      (ALL, vec![]),
      ("Tutorial", vec!["how"]),
      ("Finance", vec!["how to invest"]),
      (OTHER, vec![])
    ]);

    assert_eq!(
      classify(Some("How to invest"), &map),
      "Tutorial"
    );
  }

  #[test]
  fn keyword_order_decides_within_category()
   {
    let map = CategoryMap::from_pairs([
      (ALL, vec![]),
      ("Finance", vec!["gold", "invest"]),
      (OTHER, vec![])
    ]);

    let hit = classify_detailed(
      Some("Investing in gold"),
      &map
    );
    assert_eq!(hit.category, "Finance");
    assert_eq!(hit.keyword, Some("gold"));
  }

  #[test]
  fn unrelated_title_is_caught_by_other() {
    let map = CategoryMap::builtin();
    let hit = classify_detailed(
      Some("Random unrelated topic"),
      &map
    );
    assert_eq!(hit.category, OTHER);
    assert_eq!(hit.path, MatchPath::CatchAll);
  }

  #[test]
  fn other_keywords_take_explicit_branch() {
    let map = CategoryMap::from_pairs([
      (ALL, vec![]),
      ("Finance", vec!["stocks"]),
      (OTHER, vec!["misc"])
    ]);

    let hit = classify_detailed(
      Some("Misc notes"),
      &map
    );
    assert_eq!(hit.category, OTHER);
    assert_eq!(
      hit.path,
      MatchPath::ExplicitOther
    );
    assert_eq!(hit.keyword, Some("misc"));
  }

  #[test]
  fn missing_title_short_circuits() {
    let map = CategoryMap::from_pairs([
      (ALL, vec![]),
      (OTHER, vec![""])
    ]);
    let hit = classify_detailed(None, &map);
    assert_eq!(hit.category, OTHER);
    assert_eq!(
      hit.path,
      MatchPath::MissingTitle
    );
  }

  #[test]
  fn matching_ignores_case_and_padding() {
    let map = CategoryMap::builtin();
    assert_eq!(
      classify(
        Some("   GOLD price outlook  "),
        &map
      ),
      "Finance"
    );
    assert_eq!(
      classify(
        Some("Intro lecture notes"),
        &map
      ),
      "Tutorial"
    );
  }

  #[test]
  fn blank_keywords_never_match() {
    let map = CategoryMap::from_pairs([
      (ALL, vec![]),
      ("Empty", vec!["", "   "]),
      (OTHER, vec![])
    ]);
    let hit = classify_detailed(
      Some("anything"),
      &map
    );
    assert_eq!(hit.category, OTHER);
    assert_eq!(hit.path, MatchPath::CatchAll);
  }

  #[test]
  fn keywords_are_trimmed_before_matching() {
    let map = CategoryMap::from_pairs([
      (ALL, vec![]),
      ("Work", vec!["  meeting "]),
      (OTHER, vec![])
    ]);
    assert_eq!(
      classify(Some("Weekly meeting"), &map),
      "Work"
    );
  }

  #[test]
  fn all_keywords_are_never_consulted() {
    let map = CategoryMap::from_pairs([
      (ALL, vec!["notes"]),
      (OTHER, vec![])
    ]);
    assert_eq!(
      classify(Some("notes"), &map),
      OTHER
    );
  }

  #[test]
  fn result_is_always_a_known_name() {
    let map = CategoryMap::from_pairs([
      (ALL, vec![]),
      ("Tutorial", vec!["how to"]),
      ("Finance", vec!["gold"]),
      (OTHER, vec!["misc"])
    ]);
    let titles = [
      None,
      Some(""),
      Some("How to bake"),
      Some("gold"),
      Some("misc"),
      Some("nothing here"),
      Some("ÉCOLE how TO")
    ];
    for title in titles {
      let name = classify(title, &map);
      assert!(map.contains(name), "{name}");
      assert_ne!(name, ALL);
    }
  }
}

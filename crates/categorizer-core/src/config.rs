use anyhow::{
  Context,
  anyhow
};
use serde::Deserialize;
use tracing::{
  debug,
  error,
  info
};

use crate::category::{
  ALL,
  CategoryMap
};

#[derive(
  Debug, Clone, PartialEq, Default,
  Deserialize,
)]
#[serde(default)]
pub struct CategorizerConfig {
  pub storage:   StorageConfig,
  pub selectors: SelectorConfig,
  /// Replaces the built-in first-run
  /// categories when present.
  pub defaults:  Option<Vec<CategorySeed>>
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
  pub key_prefix: String
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self {
      key_prefix: "notebooklm_".to_string()
    }
  }
}

impl StorageConfig {
  pub fn key(
    &self,
    logical: &str
  ) -> String {
    format!("{}{logical}", self.key_prefix)
  }
}

/// Host page markup contract. Everything
/// here breaks when the page's markup
/// changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
  pub container:  String,
  pub anchor:     String,
  pub projects:   String,
  pub title:      String,
  pub filter_bar: String
}

impl Default for SelectorConfig {
  fn default() -> Self {
    Self {
      container:  ".all-projects-container"
        .to_string(),
      anchor:     ".featured-projects-container"
        .to_string(),
      projects:   "project-button, \
                   tr.mat-mdc-row"
        .to_string(),
      title:      ".project-button-title, \
                   .project-table-title"
        .to_string(),
      filter_bar: "category-filter-container"
        .to_string()
    }
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategorySeed {
  pub name:     String,
  #[serde(default)]
  pub keywords: Vec<String>
}

impl CategorizerConfig {
  #[tracing::instrument(skip(text))]
  pub fn from_toml_str(
    text: &str
  ) -> anyhow::Result<Self> {
    let cfg: Self = toml::from_str(text)
      .context(
        "failed to parse categorizer \
         config"
      )?;
    cfg.validate()?;
    debug!(?cfg, "parsed config");
    Ok(cfg)
  }

  /// Parses `text`, logging and falling
  /// back to defaults when it is invalid.
  pub fn from_toml_or_default(
    text: &str
  ) -> Self {
    match Self::from_toml_str(text) {
      | Ok(cfg) => {
        info!(
          prefix = %cfg.storage.key_prefix,
          container = %cfg.selectors.container,
          "loaded categorizer config"
        );
        cfg
      }
      | Err(error) => {
        error!(error = %format!("{error:#}"), "invalid categorizer config; using defaults");
        Self::default()
      }
    }
  }

  /// First-run category map, with the
  /// `All`/`Other` invariants applied.
  pub fn default_categories(
    &self
  ) -> CategoryMap {
    let Some(seeds) = &self.defaults else {
      return CategoryMap::builtin();
    };

    let mut map = CategoryMap::new();
    map.insert(ALL, vec![]);
    for seed in seeds {
      let name = seed.name.trim();
      if name.is_empty() {
        continue;
      }
      map.insert(
        name,
        seed
          .keywords
          .iter()
          .map(|keyword| keyword.trim())
          .filter(|keyword| !keyword.is_empty())
          .map(ToString::to_string)
          .collect()
      );
    }
    map.ensure_reserved();
    map
  }

  fn validate(&self) -> anyhow::Result<()> {
    let selectors = [
      ("container", &self.selectors.container),
      ("projects", &self.selectors.projects),
      ("title", &self.selectors.title),
      (
        "filter_bar",
        &self.selectors.filter_bar
      )
    ];
    for (field, value) in selectors {
      if value.trim().is_empty() {
        return Err(anyhow!(
          "selectors.{field} cannot be \
           empty"
        ));
      }
    }

    if self
      .selectors
      .filter_bar
      .chars()
      .any(char::is_whitespace)
    {
      return Err(anyhow!(
        "selectors.filter_bar must be a \
         single class name"
      ));
    }

    Ok(())
  }
}

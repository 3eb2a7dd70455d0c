use std::io::{BufRead, Write};

use anyhow::{Context, anyhow, bail};
use categorizer_core::classify::{MatchPath, classify_detailed};
use categorizer_core::engine::{ProjectRecord, Visibility, compute_counts, compute_visibility, resolve_active};
use categorizer_core::{ALL, CategoryDraft, CategoryMap, CategoryStore, KeyValueStore};
use tracing::info;

use crate::cli::{CategoriesCommand, Command};

#[tracing::instrument(skip(store, input, out))]
pub async fn dispatch<S, R, W>(store: &CategoryStore<S>, command: Command, input: R, out: &mut W) -> anyhow::Result<()>
where
    S: KeyValueStore,
    R: BufRead,
    W: Write,
{
    match command {
        Command::Classify { titles } => classify_titles(store, &titles, out).await,
        Command::Counts { filter } => count_titles(store, input, filter.as_deref(), out).await,
        Command::Categories(sub) => categories(store, sub, out).await,
        Command::Filter { name } => filter(store, name.as_deref(), out).await,
    }
}

async fn load<S: KeyValueStore>(store: &CategoryStore<S>) -> anyhow::Result<CategoryMap> {
    store.load().await.context("failed to load categories")
}

async fn classify_titles<S: KeyValueStore, W: Write>(
    store: &CategoryStore<S>,
    titles: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    let map = load(store).await?;
    for title in titles {
        let hit = classify_detailed(Some(title.as_str()), &map);
        let why = match (hit.path, hit.keyword) {
            (MatchPath::Keyword, Some(keyword)) => format!("keyword `{keyword}`"),
            (MatchPath::ExplicitOther, Some(keyword)) => format!("Other keyword `{keyword}`"),
            (MatchPath::MissingTitle, _) => "no title".to_string(),
            _ => "no match".to_string(),
        };
        writeln!(out, "{}\t{}\t({})", hit.category, title, why)?;
    }
    Ok(())
}

async fn count_titles<S: KeyValueStore, R: BufRead, W: Write>(
    store: &CategoryStore<S>,
    input: R,
    filter: Option<&str>,
    out: &mut W,
) -> anyhow::Result<()> {
    let map = load(store).await?;

    let mut projects = Vec::new();
    for line in input.lines() {
        let line = line.context("failed reading titles from stdin")?;
        let title = line.trim();
        projects.push(if title.is_empty() {
            ProjectRecord::untitled()
        } else {
            ProjectRecord::titled(title)
        });
    }

    for (name, count) in compute_counts(&projects, &map).iter() {
        writeln!(out, "{name}\t{count}")?;
    }

    if let Some(selected) = filter {
        let selected = resolve_active(selected, &map);
        writeln!(out, "-- {selected}")?;
        let visibility = compute_visibility(&projects, &selected, &map);
        for (project, shown) in projects.iter().zip(visibility) {
            if shown == Visibility::Visible {
                writeln!(out, "{}", project.title.as_deref().unwrap_or("<untitled>"))?;
            }
        }
    }
    Ok(())
}

async fn categories<S: KeyValueStore, W: Write>(
    store: &CategoryStore<S>,
    command: CategoriesCommand,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        CategoriesCommand::List => {
            let map = load(store).await?;
            for category in map.iter().filter(|category| category.name != ALL) {
                writeln!(out, "{}: {}", category.name, category.keywords.join(", "))?;
            }
            Ok(())
        }
        CategoriesCommand::Put { name, keywords } => {
            let name = name.trim();
            if name.is_empty() {
                bail!("category name cannot be empty");
            }
            if name == ALL {
                bail!("`{ALL}` is a pass-through selector and takes no keywords");
            }

            let mut draft = CategoryDraft::open(&load(store).await?);
            let idx = match draft.position(name) {
                Some(idx) => idx,
                None => {
                    let idx = draft.add();
                    draft.set_name(idx, name);
                    idx
                }
            };
            draft.set_keywords(idx, keywords);
            commit(store, &draft).await?;
            info!(name, "category saved");
            writeln!(out, "saved {name}")?;
            Ok(())
        }
        CategoriesCommand::Remove { name } => {
            let mut draft = CategoryDraft::open(&load(store).await?);
            let idx = draft
                .position(name.trim())
                .ok_or_else(|| anyhow!("no category named `{name}`"))?;
            draft.delete(idx);
            commit(store, &draft).await?;
            writeln!(out, "removed {name}")?;
            Ok(())
        }
        CategoriesCommand::Reset => {
            store.save(store.defaults()).await.context("failed to save categories")?;
            writeln!(out, "restored default categories")?;
            Ok(())
        }
    }
}

async fn commit<S: KeyValueStore>(store: &CategoryStore<S>, draft: &CategoryDraft) -> anyhow::Result<()> {
    store.save(&draft.build()).await.context("failed to save categories")
}

async fn filter<S: KeyValueStore, W: Write>(
    store: &CategoryStore<S>,
    name: Option<&str>,
    out: &mut W,
) -> anyhow::Result<()> {
    let map = load(store).await?;
    match name {
        None => {
            let stored = store.active_filter().await.context("failed to read active filter")?;
            writeln!(out, "{}", resolve_active(&stored, &map))?;
        }
        Some(name) => {
            if !map.contains(name) {
                bail!("no category named `{name}`");
            }
            store
                .set_active_filter(name)
                .await
                .context("failed to save active filter")?;
            writeln!(out, "{name}")?;
        }
    }
    Ok(())
}

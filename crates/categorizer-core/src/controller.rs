use std::cell::{
  Cell,
  RefCell
};

use tracing::{
  debug,
  info,
  warn
};

use crate::category::{
  ALL,
  CategoryMap
};
use crate::engine::{
  FilterBarModel,
  ProjectRecord,
  Visibility,
  resolve_active,
  run_pass
};
use crate::manager::CategoryDraft;
use crate::store::CategoryStore;
use crate::storage::{
  KeyValueStore,
  StorageError
};

const WRITE_FAILED_NOTICE: &str =
  "Changes could not be saved and will \
   be lost on reload.";

/// The page the filter bar is mounted
/// into.
///
/// All methods are synchronous; the
/// controller calls them back to back
/// with no await in between, so the page
/// cannot change under a single pass.
pub trait Host {
  /// Currently rendered projects, in a
  /// stable order that
  /// [`Host::apply_visibility`] follows.
  fn projects(&self) -> Vec<ProjectRecord>;

  fn apply_visibility(
    &self,
    visibility: &[Visibility]
  );

  /// Removes every filter bar from the
  /// page.
  fn remove_filter_bar(&self);

  /// Creates the filter bar, or updates
  /// the existing one. Returns `false`
  /// when there is no container to render
  /// into.
  fn render_filter_bar(
    &self,
    model: &FilterBarModel,
    categories: &CategoryMap
  ) -> bool;
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum MountState {
  Unmounted,
  Mounted
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum MountOutcome {
  Mounted,
  /// A newer mount or commit started
  /// while this one awaited storage; it
  /// left the page untouched.
  Superseded,
  /// The host had nowhere to render.
  NoContainer
}

/// Owns the in-memory category cache, the
/// active filter and the filter bar.
///
/// Every mount or commit takes a new
/// generation. A mount that finds its
/// generation outdated after awaiting
/// storage returns without touching the
/// page, so overlapping container
/// arrivals never interleave into a
/// half-built bar.
pub struct MountController<S, H> {
  store:      CategoryStore<S>,
  host:       H,
  categories: RefCell<CategoryMap>,
  active:     RefCell<String>,
  notice:     RefCell<Option<String>>,
  state:      Cell<MountState>,
  generation: Cell<u64>,
  selections: Cell<u64>
}

impl<S, H> MountController<S, H>
where
  S: KeyValueStore,
  H: Host
{
  pub fn new(
    store: CategoryStore<S>,
    host: H
  ) -> Self {
    let categories = store.defaults().clone();
    Self {
      store,
      host,
      categories: RefCell::new(categories),
      active: RefCell::new(ALL.to_string()),
      notice: RefCell::new(None),
      state: Cell::new(MountState::Unmounted),
      generation: Cell::new(0),
      selections: Cell::new(0)
    }
  }

  pub fn host(&self) -> &H {
    &self.host
  }

  pub fn store(&self) -> &CategoryStore<S> {
    &self.store
  }

  pub fn state(&self) -> MountState {
    self.state.get()
  }

  pub fn categories(&self) -> CategoryMap {
    self.categories.borrow().clone()
  }

  pub fn active_filter(&self) -> String {
    self.active.borrow().clone()
  }

  pub fn notice(&self) -> Option<String> {
    self.notice.borrow().clone()
  }

  /// Handles a container appearance:
  /// reload state from storage, then tear
  /// down any previous bar and build a new
  /// one with the persisted filter.
  #[tracing::instrument(skip(self))]
  pub async fn mount(&self) -> MountOutcome {
    let generation = self.next_generation();

    match self.store.load().await {
      | Ok(map) => {
        if self.is_stale(generation) {
          return self.superseded(generation);
        }
        *self.categories.borrow_mut() = map;
      }
      | Err(error) => {
        warn!(
          %error,
          "using cached categories"
        );
      }
    }

    let selections = self.selections.get();
    let active =
      self.store.active_filter().await;
    if self.is_stale(generation) {
      return self.superseded(generation);
    }
    match active {
      | Ok(_)
        if self.selections.get() != selections =>
      {
        debug!(
          "filter selected during mount; \
           ignoring stored filter"
        );
      }
      | Ok(name) => {
        *self.active.borrow_mut() = name;
      }
      | Err(error) => {
        warn!(
          %error,
          "using cached active filter"
        );
      }
    }

    if !self.rebuild() {
      debug!("container vanished before mount");
      return MountOutcome::NoContainer;
    }
    info!(
      active = %self.active.borrow(),
      categories = self.categories.borrow().len(),
      "filter bar mounted"
    );

    let active = self.active_filter();
    let _ = self.persist_active(&active).await;
    MountOutcome::Mounted
  }

  /// Applies `name` as the active filter
  /// and persists it. The page updates
  /// before the write completes.
  #[tracing::instrument(skip(self))]
  pub async fn select(
    &self,
    name: &str
  ) -> Result<(), StorageError> {
    self.selections.set(self.selections.get() + 1);
    let active = {
      let categories = self.categories.borrow();
      resolve_active(name, &categories)
    };
    *self.active.borrow_mut() = active.clone();
    self.refresh();
    self.persist_active(&active).await
  }

  /// Saves the map built from `draft`,
  /// replacing the cache and rebuilding the
  /// bar even when the write fails.
  #[tracing::instrument(skip(self, draft))]
  pub async fn commit(
    &self,
    draft: &CategoryDraft
  ) -> Result<(), StorageError> {
    let map = draft.build();
    self.next_generation();
    *self.categories.borrow_mut() = map.clone();

    let result = self.store.save(&map).await;
    self.record_write(&result);
    self.rebuild();

    match &result {
      | Ok(()) => {
        info!(
          categories = map.len(),
          "categories saved"
        )
      }
      | Err(error) => {
        warn!(%error, "categories kept in memory only")
      }
    }
    result
  }

  /// Recomputes visibility and counts for
  /// the projects currently on the page.
  /// No-op while unmounted.
  pub fn refresh(&self) {
    if self.state.get() != MountState::Mounted
    {
      return;
    }
    self.render();
  }

  fn rebuild(&self) -> bool {
    self.host.remove_filter_bar();
    {
      let categories = self.categories.borrow();
      let resolved = resolve_active(
        &self.active.borrow(),
        &categories
      );
      *self.active.borrow_mut() = resolved;
    }

    let rendered = self.render();
    self.state.set(if rendered {
      MountState::Mounted
    } else {
      MountState::Unmounted
    });
    rendered
  }

  fn render(&self) -> bool {
    let categories = self.categories.borrow();
    let active = self.active.borrow();
    let projects = self.host.projects();

    let mut pass =
      run_pass(&projects, &categories, &active);
    pass.bar.notice = self.notice.borrow().clone();

    self.host.apply_visibility(&pass.visibility);
    self
      .host
      .render_filter_bar(&pass.bar, &categories)
  }

  async fn persist_active(
    &self,
    name: &str
  ) -> Result<(), StorageError> {
    let result =
      self.store.set_active_filter(name).await;
    if let Err(error) = &result {
      warn!(%error, "active filter not persisted");
    }
    if self.record_write(&result) {
      self.refresh();
    }
    result
  }

  /// Updates the user-facing notice after
  /// a write. Returns whether it changed.
  fn record_write(
    &self,
    result: &Result<(), StorageError>
  ) -> bool {
    let next = result
      .as_ref()
      .err()
      .map(|_| WRITE_FAILED_NOTICE.to_string());
    let mut notice = self.notice.borrow_mut();
    if *notice == next {
      return false;
    }
    *notice = next;
    true
  }

  fn next_generation(&self) -> u64 {
    let generation = self.generation.get() + 1;
    self.generation.set(generation);
    generation
  }

  fn is_stale(&self, generation: u64) -> bool {
    self.generation.get() != generation
  }

  fn superseded(
    &self,
    generation: u64
  ) -> MountOutcome {
    debug!(
      generation,
      current = self.generation.get(),
      "mount superseded"
    );
    MountOutcome::Superseded
  }
}

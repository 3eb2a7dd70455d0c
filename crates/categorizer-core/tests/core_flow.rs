use std::cell::{
    Cell,
    RefCell
};
use std::rc::Rc;

use async_trait::async_trait;
use categorizer_core::config::StorageConfig;
use categorizer_core::engine::{
    FilterBarModel,
    ProjectRecord,
    Visibility
};
use categorizer_core::{
    ALL,
    CategoryDraft,
    CategoryMap,
    CategoryStore,
    Host,
    KeyValueStore,
    MemoryStore,
    MountController,
    MountOutcome,
    MountState,
    OTHER,
    StorageError
};
use serde_json::{Value, json};
use tokio::sync::Notify;

#[derive(Default)]
struct FakePage {
    titles: RefCell<Vec<Option<String>>>,
    filtered: RefCell<Vec<Visibility>>,
    bars: RefCell<Vec<FilterBarModel>>,
    builds: Cell<usize>,
    no_container: Cell<bool>
}

impl FakePage {
    fn with_titles(titles: &[Option<&str>]) -> Rc<Self> {
        let page = Rc::new(Self::default());
        *page.titles.borrow_mut() = titles
            .iter()
            .map(|title| title.map(str::to_string))
            .collect();
        page
    }

    fn bar(&self) -> FilterBarModel {
        let bars = self.bars.borrow();
        assert_eq!(bars.len(), 1, "expected exactly one filter bar");
        bars[0].clone()
    }

    fn labels(&self) -> Vec<String> {
        self.bar().buttons.iter().map(|b| b.label()).collect()
    }

    fn visible(&self) -> usize {
        self.filtered
            .borrow()
            .iter()
            .filter(|v| **v == Visibility::Visible)
            .count()
    }
}

struct PageHost(Rc<FakePage>);

impl Host for PageHost {
    fn projects(&self) -> Vec<ProjectRecord> {
        self.0
            .titles
            .borrow()
            .iter()
            .map(|title| ProjectRecord { title: title.clone() })
            .collect()
    }

    fn apply_visibility(&self, visibility: &[Visibility]) {
        *self.0.filtered.borrow_mut() = visibility.to_vec();
    }

    fn remove_filter_bar(&self) {
        self.0.bars.borrow_mut().clear();
    }

    fn render_filter_bar(&self, model: &FilterBarModel, _categories: &CategoryMap) -> bool {
        if self.0.no_container.get() {
            return false;
        }
        let mut bars = self.0.bars.borrow_mut();
        match bars.first_mut() {
            Some(existing) => *existing = model.clone(),
            None => {
                bars.push(model.clone());
                self.0.builds.set(self.0.builds.get() + 1);
            }
        }
        true
    }
}

/// Yields once before every read so that
/// concurrent mounts interleave.
struct SlowStore(Rc<MemoryStore>);

#[async_trait(?Send)]
impl KeyValueStore for SlowStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        tokio::task::yield_now().await;
        self.0.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.0.set(key, value).await
    }
}

/// Reads the active filter, then holds the
/// answer until `release` is notified.
struct HeldFilterStore {
    inner: Rc<MemoryStore>,
    reached: Rc<Notify>,
    release: Rc<Notify>,
}

#[async_trait(?Send)]
impl KeyValueStore for HeldFilterStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let value = self.inner.get(key).await;
        if key.ends_with("active_filter") {
            self.reached.notify_one();
            self.release.notified().await;
        }
        value
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.inner.set(key, value).await
    }
}

type Controller = MountController<Rc<MemoryStore>, PageHost>;

fn controller(backend: &Rc<MemoryStore>, page: &Rc<FakePage>) -> Controller {
    let store = CategoryStore::new(backend.clone(), &StorageConfig::default());
    MountController::new(store, PageHost(page.clone()))
}

const TITLES: &[Option<&str>] = &[
    Some("How to knit"),
    Some("Gold outlook"),
    Some("Bonds 101"),
    Some("Holiday plans"),
    None,
];

#[tokio::test]
async fn first_mount_seeds_defaults_and_shows_all() {
    let backend = Rc::new(MemoryStore::new());
    let page = FakePage::with_titles(TITLES);
    let ctl = controller(&backend, &page);

    assert_eq!(ctl.mount().await, MountOutcome::Mounted);
    assert_eq!(ctl.state(), MountState::Mounted);
    assert_eq!(
        page.labels(),
        ["All (5)", "Tutorial (1)", "Finance (2)", "Other (2)"]
    );
    assert_eq!(page.bar().active, ALL);
    assert_eq!(page.visible(), 5);
    assert_eq!(
        backend.raw("notebooklm_active_filter"),
        Some(Value::String(ALL.to_string()))
    );
    assert!(backend.raw("notebooklm_user_categories").is_some());
}

#[tokio::test]
async fn repeated_mounts_leave_one_bar() {
    let backend = Rc::new(MemoryStore::new());
    let page = FakePage::with_titles(TITLES);
    let ctl = controller(&backend, &page);

    ctl.mount().await;
    ctl.mount().await;

    assert_eq!(page.bars.borrow().len(), 1);
    assert_eq!(page.builds.get(), 2);
}

#[tokio::test]
async fn selection_survives_a_fresh_mount() {
    let backend = Rc::new(MemoryStore::new());
    let page = FakePage::with_titles(TITLES);
    let ctl = controller(&backend, &page);
    ctl.mount().await;

    ctl.select("Finance").await.unwrap();
    assert_eq!(page.visible(), 2);
    assert_eq!(page.bar().active, "Finance");

    let reloaded_page = FakePage::with_titles(TITLES);
    let reloaded = controller(&backend, &reloaded_page);
    reloaded.mount().await;

    assert_eq!(reloaded.active_filter(), "Finance");
    assert_eq!(reloaded_page.bar().active, "Finance");
    assert_eq!(reloaded_page.visible(), 2);
}

#[tokio::test]
async fn selecting_unknown_category_falls_back_to_all() {
    let backend = Rc::new(MemoryStore::new());
    let page = FakePage::with_titles(TITLES);
    let ctl = controller(&backend, &page);
    ctl.mount().await;

    ctl.select("Gardening").await.unwrap();
    assert_eq!(ctl.active_filter(), ALL);
    assert_eq!(page.visible(), 5);
}

#[tokio::test]
async fn stale_persisted_filter_resolves_to_all() {
    let backend = Rc::new(MemoryStore::new());
    backend.insert_raw(
        "notebooklm_active_filter",
        Value::String("Removed".to_string()),
    );
    let page = FakePage::with_titles(TITLES);
    let ctl = controller(&backend, &page);
    ctl.mount().await;

    assert_eq!(ctl.active_filter(), ALL);
    assert_eq!(
        backend.raw("notebooklm_active_filter"),
        Some(Value::String(ALL.to_string()))
    );
}

#[tokio::test]
async fn commit_replaces_map_and_rebuilds() {
    let backend = Rc::new(MemoryStore::new());
    let page = FakePage::with_titles(TITLES);
    let ctl = controller(&backend, &page);
    ctl.mount().await;
    ctl.select("Finance").await.unwrap();

    let mut draft = CategoryDraft::open(&ctl.categories());
    let finance = draft.position("Finance").unwrap();
    draft.delete(finance);
    let travel = draft.add();
    draft.set_name(travel, "Travel");
    draft.set_keywords(travel, "holiday, trip");

    ctl.commit(&draft).await.unwrap();

    let stored = ctl.store().load().await.unwrap();
    assert!(!stored.contains("Finance"));
    assert_eq!(stored, ctl.categories());
    assert_eq!(page.builds.get(), 2);
    assert_eq!(
        page.labels(),
        ["All (5)", "Tutorial (1)", "Other (3)", "Travel (1)"]
    );
    assert_eq!(ctl.active_filter(), ALL);
}

#[tokio::test]
async fn failed_commit_still_updates_page() {
    let backend = Rc::new(MemoryStore::new());
    let page = FakePage::with_titles(TITLES);
    let ctl = controller(&backend, &page);
    ctl.mount().await;

    backend.set_fail_writes(true);
    let mut draft = CategoryDraft::open(&ctl.categories());
    let idx = draft.add();
    draft.set_name(idx, "Travel");
    draft.set_keywords(idx, "holiday");

    let err = ctl.commit(&draft).await.unwrap_err();
    assert!(matches!(err, StorageError::Write { .. }));
    assert!(ctl.categories().contains("Travel"));
    assert!(page.labels().contains(&"Travel (1)".to_string()));
    assert!(page.bar().notice.is_some());
    assert_eq!(ctl.notice(), page.bar().notice);

    backend.set_fail_writes(false);
    ctl.select("Travel").await.unwrap();
    assert!(page.bar().notice.is_none());
    assert_eq!(ctl.notice(), None);
    assert_eq!(page.visible(), 1);
}

#[tokio::test]
async fn unreadable_storage_degrades_to_defaults() {
    let backend = Rc::new(MemoryStore::new());
    backend.set_fail_reads(true);
    let page = FakePage::with_titles(TITLES);
    let ctl = controller(&backend, &page);

    assert_eq!(ctl.mount().await, MountOutcome::Mounted);
    assert_eq!(ctl.categories(), CategoryMap::builtin());
    assert_eq!(page.bar().buttons.len(), 4);
}

#[tokio::test]
async fn missing_container_never_mounts() {
    let backend = Rc::new(MemoryStore::new());
    let page = FakePage::with_titles(TITLES);
    page.no_container.set(true);
    let ctl = controller(&backend, &page);

    assert_eq!(ctl.mount().await, MountOutcome::NoContainer);
    assert_eq!(ctl.state(), MountState::Unmounted);
    ctl.refresh();
    assert!(page.bars.borrow().is_empty());
}

#[tokio::test]
async fn refresh_tracks_new_projects() {
    let backend = Rc::new(MemoryStore::new());
    let page = FakePage::with_titles(TITLES);
    let ctl = controller(&backend, &page);
    ctl.mount().await;

    page.titles.borrow_mut().push(Some("Lecture on stocks".to_string()));
    ctl.refresh();

    assert_eq!(
        page.labels(),
        ["All (6)", "Tutorial (2)", "Finance (2)", "Other (2)"]
    );
    assert_eq!(page.builds.get(), 1);
}

#[tokio::test]
async fn overlapping_mounts_build_once() {
    let backend = Rc::new(MemoryStore::new());
    let page = FakePage::with_titles(TITLES);
    let store = CategoryStore::new(SlowStore(backend.clone()), &StorageConfig::default());
    let ctl = MountController::new(store, PageHost(page.clone()));

    let (first, second) = tokio::join!(ctl.mount(), ctl.mount());

    assert_eq!(first, MountOutcome::Superseded);
    assert_eq!(second, MountOutcome::Mounted);
    assert_eq!(page.builds.get(), 1);
    assert_eq!(page.bars.borrow().len(), 1);
}

#[tokio::test]
async fn explicit_other_keywords_count_as_other() {
    let backend = Rc::new(MemoryStore::new());
    let page = FakePage::with_titles(&[Some("misc ideas"), Some("Gold")]);
    let ctl = controller(&backend, &page);
    ctl.mount().await;

    let mut draft = CategoryDraft::open(&ctl.categories());
    let other = draft.position(OTHER).unwrap();
    draft.set_keywords(other, "misc");
    ctl.commit(&draft).await.unwrap();
    ctl.select(OTHER).await.unwrap();

    assert_eq!(page.visible(), 1);
    assert_eq!(page.filtered.borrow()[0], Visibility::Visible);
}

#[tokio::test]
async fn click_during_mount_beats_stored_filter() {
    let backend = Rc::new(MemoryStore::new());
    backend.insert_raw("notebooklm_active_filter", json!("Tutorial"));
    let reached = Rc::new(Notify::new());
    let release = Rc::new(Notify::new());
    let page = FakePage::with_titles(TITLES);
    let store = CategoryStore::new(
        HeldFilterStore {
            inner: backend.clone(),
            reached: reached.clone(),
            release: release.clone(),
        },
        &StorageConfig::default(),
    );
    let ctl = MountController::new(store, PageHost(page.clone()));

    let click = async {
        reached.notified().await;
        ctl.select("Finance").await.unwrap();
        release.notify_one();
    };
    let (outcome, ()) = tokio::join!(ctl.mount(), click);

    assert_eq!(outcome, MountOutcome::Mounted);
    assert_eq!(ctl.active_filter(), "Finance");
    assert_eq!(page.visible(), 2);
    assert_eq!(backend.raw("notebooklm_active_filter"), Some(json!("Finance")));
}

//! The poll / diff / render cycle.
//!
//! One cycle fetches `data/structure.json`, rebuilds the table skeleton
//! when the structure changed, then fetches every cell document and patches
//! the matching cell. Failures are logged and otherwise ignored; the next
//! cycle is the only retry.

use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::sleep;

use crate::logging::{
    log, log_fetch_attempt, log_fetch_failed, log_skeleton_rebuilt, log_stale_discarded, obj, v_str,
    Domain, Level,
};
use crate::model::{cell_id, detail_placeholder, structures_equal, CellStatus, Structure};
use crate::page::Page;
use crate::sequence::Admission;
use crate::source::{FetchError, JsonSource};
use crate::state::{Config, SyncState};
use crate::template::{Templates, BODY_TEMPLATE, MODAL_TEMPLATE};

pub const STRUCTURE_PATH: &str = "data/structure.json";
const STRUCTURE_KEY: &str = "structure.json";

pub fn document_path(id: &str) -> String {
    format!("data/{}.json", id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureOutcome {
    /// Document missing or unreadable; page untouched.
    FetchFailed,
    /// A response to a later request was already applied.
    Stale,
    Unchanged,
    Rebuilt,
    /// Rows or columns empty: notice shown, table cleared.
    Emptied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOutcome {
    Applied,
    FetchFailed,
    Stale,
    /// No element carries the document's id.
    NoElement,
}

struct Inner {
    source: Arc<dyn JsonSource>,
    cfg: Config,
    templates: Templates,
    state: Mutex<SyncState>,
}

/// Keeps a [`Page`] in sync with a dashboard's JSON documents.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct DashboardSync {
    inner: Arc<Inner>,
}

impl DashboardSync {
    pub fn new(source: Arc<dyn JsonSource>, cfg: Config) -> Self {
        Self::with_templates(source, cfg, Templates::default())
    }

    pub fn with_templates(source: Arc<dyn JsonSource>, cfg: Config, templates: Templates) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                cfg,
                templates,
                state: Mutex::new(SyncState::new()),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        // state stays consistent between statements, so a poisoned lock is still usable
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> Page {
        self.lock().page.clone()
    }

    pub fn cached_structure(&self) -> Option<Structure> {
        self.lock().cache.clone()
    }

    pub fn with_page<R>(&self, f: impl FnOnce(&Page) -> R) -> R {
        f(&self.lock().page)
    }

    async fn load(&self, domain: Domain, path: &str) -> Result<Value, FetchError> {
        log_fetch_attempt(domain, path);
        let delay = self.inner.cfg.fetch_delay;
        if !delay.is_zero() {
            sleep(delay).await;
        }
        self.inner.source.fetch_json(path).await
    }

    async fn load_typed<T: DeserializeOwned>(&self, domain: Domain, path: &str) -> Option<T> {
        let value = match self.load(domain, path).await {
            Ok(v) => v,
            Err(e) => {
                log_fetch_failed(domain, path, &e.to_string());
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(t) => Some(t),
            Err(e) => {
                log_fetch_failed(domain, path, &format!("unexpected shape: {}", e));
                None
            }
        }
    }

    /// One full cycle: structure first, then every cell of the fetched structure.
    pub async fn refresh_structure(&self) -> StructureOutcome {
        let ticket = self.lock().sequencer.issue();
        let Some(structure) = self.load_typed::<Structure>(Domain::Structure, STRUCTURE_PATH).await else {
            return StructureOutcome::FetchFailed;
        };

        let outcome = {
            let mut st = self.lock();
            if let Admission::Stale(last) = st.sequencer.admit(STRUCTURE_KEY, ticket) {
                log_stale_discarded(Domain::Structure, STRUCTURE_KEY, ticket, last);
                return StructureOutcome::Stale;
            }
            self.apply_structure(&mut st, &structure)
        };

        self.refresh_cells(&structure).await;
        outcome
    }

    fn apply_structure(&self, st: &mut SyncState, structure: &Structure) -> StructureOutcome {
        let changed = st
            .cache
            .as_ref()
            .map_or(true, |cached| !structures_equal(cached, structure));
        if !changed && !structure.is_empty() {
            return StructureOutcome::Unchanged;
        }

        if structure.is_empty() {
            st.page.set_titles(&self.inner.cfg.title_prefix, &structure.name);
            st.page.show_empty_notice();
            // the cleared table is now what is rendered
            st.cache = Some(structure.clone());
            log(
                Level::Warn,
                Domain::Structure,
                "empty_structure",
                obj(&[
                    ("msg", v_str("There is nothing to show")),
                    ("name", v_str(&structure.name)),
                    ("rows", json!(structure.rows.len())),
                    ("columns", json!(structure.columns.len())),
                ]),
            );
            return StructureOutcome::Emptied;
        }

        render_into(&mut st.page, &self.inner.cfg.title_prefix, structure);
        st.cache = Some(structure.clone());
        log_skeleton_rebuilt(
            &structure.name,
            structure.rows.len(),
            structure.columns.len(),
            &structure.fingerprint(),
        );
        StructureOutcome::Rebuilt
    }

    /// Rebuild titles and table markup from scratch. Cell contents are lost.
    pub fn render_skeleton(&self, structure: &Structure) {
        let mut st = self.lock();
        render_into(&mut st.page, &self.inner.cfg.title_prefix, structure);
    }

    /// Fetch every cell of `structure` concurrently.
    pub async fn refresh_cells(&self, structure: &Structure) -> Vec<CellOutcome> {
        let pending = structure.rows.iter().flat_map(|r| {
            structure
                .columns
                .iter()
                .map(move |c| self.refresh_cell(&r.id, &c.id))
        });
        join_all(pending).await
    }

    pub async fn refresh_cell(&self, row_id: &str, col_id: &str) -> CellOutcome {
        let key = cell_id(row_id, col_id);
        let path = document_path(&key);
        let ticket = self.lock().sequencer.issue();
        let Some(status) = self.load_typed::<CellStatus>(Domain::Cell, &path).await else {
            return CellOutcome::FetchFailed;
        };

        let mut st = self.lock();
        if let Admission::Stale(last) = st.sequencer.admit(&key, ticket) {
            log_stale_discarded(Domain::Cell, &key, ticket, last);
            return CellOutcome::Stale;
        }
        // the document names its own target element
        let Some(cell) = st.page.cell_mut(&status.id) else {
            log(
                Level::Debug,
                Domain::Cell,
                "element_not_found",
                obj(&[("cell_id", v_str(&status.id)), ("path", v_str(&path))]),
            );
            return CellOutcome::NoElement;
        };
        cell.style = status.css_text();
        cell.class = status.class_name();
        cell.inner_html = status.text;
        CellOutcome::Applied
    }

    /// Open the modal for `id`. A missing document shows a placeholder.
    /// Returns the modal markup.
    pub async fn open_detail(&self, id: &str) -> String {
        log(
            Level::Info,
            Domain::Detail,
            "open",
            obj(&[("msg", v_str(&format!("Loading cell {}", id))), ("cell_id", v_str(id))]),
        );
        let path = document_path(id);
        let data = match self.load(Domain::Detail, &path).await {
            Ok(v) => v,
            Err(e) => {
                log_fetch_failed(Domain::Detail, &path, &e.to_string());
                detail_placeholder()
            }
        };
        let markup = self
            .inner
            .templates
            .render(MODAL_TEMPLATE, &data)
            .unwrap_or_else(|e| {
                log(Level::Error, Domain::Detail, "template_failed", obj(&[("msg", v_str(&e.to_string()))]));
                String::new()
            });
        self.lock().page.show_modal(markup.clone());
        markup
    }

    /// Render `data/{id}.json` into the body area. Returns false when
    /// nothing was rendered.
    pub async fn load_content(&self, id: &str) -> bool {
        let path = document_path(id);
        let data = match self.load(Domain::Content, &path).await {
            Ok(v) => v,
            Err(e) => {
                log_fetch_failed(Domain::Content, &path, &e.to_string());
                return false;
            }
        };
        match self.inner.templates.render(BODY_TEMPLATE, &json!({ "contents": data })) {
            Ok(markup) => {
                self.lock().page.body = markup;
                true
            }
            Err(e) => {
                log(Level::Error, Domain::Content, "template_failed", obj(&[("msg", v_str(&e.to_string()))]));
                false
            }
        }
    }
}

fn render_into(page: &mut Page, title_prefix: &str, structure: &Structure) {
    page.set_titles(title_prefix, &structure.name);
    page.rebuild_table(structure);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AxisEntry;
    use crate::source::MemorySource;

    fn sync_over(src: Arc<MemorySource>) -> DashboardSync {
        DashboardSync::new(src, Config::immediate())
    }

    #[tokio::test]
    async fn render_skeleton_does_not_touch_cache() {
        let sync = sync_over(Arc::new(MemorySource::new()));
        let s = Structure {
            name: "Ops".into(),
            rows: vec![AxisEntry::new("r1", "R")],
            columns: vec![AxisEntry::new("c1", "C")],
        };
        sync.render_skeleton(&s);
        assert!(sync.cached_structure().is_none());
        let page = sync.snapshot();
        assert_eq!(page.title, "Palantir | Ops");
        assert_eq!(page.nav_title, "Ops");
        assert!(page.cell("r1-c1").is_some());
    }

    #[tokio::test]
    async fn malformed_cell_document_is_a_fetch_failure() {
        let src = Arc::new(MemorySource::new());
        src.insert("data/r1-c1.json", json!({"color": "#fff"}));
        let sync = sync_over(src);
        assert_eq!(sync.refresh_cell("r1", "c1").await, CellOutcome::FetchFailed);
    }

    #[tokio::test]
    async fn cell_without_element_is_a_no_op() {
        let src = Arc::new(MemorySource::new());
        src.insert("data/r1-c1.json", json!({"id": "r1-c1", "text": "x"}));
        let sync = sync_over(src);
        assert_eq!(sync.refresh_cell("r1", "c1").await, CellOutcome::NoElement);
    }

    #[tokio::test]
    async fn content_renders_into_body() {
        let src = Arc::new(MemorySource::new());
        src.insert("data/about.json", json!({"title": "About", "content": "<pre>x</pre>"}));
        let sync = sync_over(src);
        assert!(sync.load_content("about").await);
        assert!(sync.snapshot().body.contains("<pre>x</pre>"));
        assert!(!sync.load_content("missing").await);
        assert!(sync.snapshot().body.contains("About"));
    }
}

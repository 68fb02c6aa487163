//! Out-of-order responses: a slow early request must not overwrite a
//! faster later one.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use palantir::model::{AxisEntry, Structure};
use palantir::source::{FetchError, JsonSource};
use palantir::state::Config;
use palantir::sync::{CellOutcome, DashboardSync, StructureOutcome, STRUCTURE_PATH};

/// Each fetch of a path takes the next gate and waits until the test
/// releases it with a value.
#[derive(Default)]
struct GatedSource {
    gates: Mutex<HashMap<String, VecDeque<oneshot::Receiver<Value>>>>,
}

impl GatedSource {
    fn gate(&self, path: &str) -> oneshot::Sender<Value> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().entry(path.to_string()).or_default().push_back(rx);
        tx
    }

    fn pending(&self, path: &str) -> usize {
        self.gates.lock().unwrap().get(path).map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl JsonSource for GatedSource {
    async fn fetch_json(&self, path: &str) -> Result<Value, FetchError> {
        let gate = self.gates.lock().unwrap().get_mut(path).and_then(VecDeque::pop_front);
        match gate {
            Some(rx) => rx.await.map_err(|_| FetchError::Empty { path: path.to_string() }),
            None => Err(FetchError::NotFound { path: path.to_string() }),
        }
    }

    fn describe(&self) -> String {
        "gated".to_string()
    }
}

async fn wait_until_taken(src: &GatedSource, path: &str, remaining: usize) {
    while src.pending(path) > remaining {
        tokio::task::yield_now().await;
    }
}

fn one_by_one(name: &str) -> Structure {
    Structure {
        name: name.to_string(),
        rows: vec![AxisEntry::new("r1", "R")],
        columns: vec![AxisEntry::new("c1", "C")],
    }
}

fn status(text: &str) -> Value {
    json!({"id": "r1-c1", "color": "#000", "bgcolor": "#fff", "animation": "none", "text": text})
}

#[tokio::test]
async fn slow_cell_response_is_discarded() {
    let src = Arc::new(GatedSource::default());
    let sync = DashboardSync::new(src.clone(), Config::immediate());
    sync.render_skeleton(&one_by_one("Ops"));

    let path = "data/r1-c1.json";
    let early = src.gate(path);
    let late = src.gate(path);

    let s1 = sync.clone();
    let first = tokio::spawn(async move { s1.refresh_cell("r1", "c1").await });
    wait_until_taken(&src, path, 1).await;
    let s2 = sync.clone();
    let second = tokio::spawn(async move { s2.refresh_cell("r1", "c1").await });
    wait_until_taken(&src, path, 0).await;

    late.send(status("fresh")).unwrap();
    assert_eq!(second.await.unwrap(), CellOutcome::Applied);
    early.send(status("outdated")).unwrap();
    assert_eq!(first.await.unwrap(), CellOutcome::Stale);

    assert_eq!(sync.snapshot().cell("r1-c1").unwrap().inner_html, "fresh");
}

#[tokio::test]
async fn in_order_cell_responses_both_apply() {
    let src = Arc::new(GatedSource::default());
    let sync = DashboardSync::new(src.clone(), Config::immediate());
    sync.render_skeleton(&one_by_one("Ops"));

    let path = "data/r1-c1.json";
    src.gate(path).send(status("one")).unwrap();
    assert_eq!(sync.refresh_cell("r1", "c1").await, CellOutcome::Applied);
    src.gate(path).send(status("two")).unwrap();
    assert_eq!(sync.refresh_cell("r1", "c1").await, CellOutcome::Applied);
    assert_eq!(sync.snapshot().cell("r1-c1").unwrap().inner_html, "two");
}

#[tokio::test]
async fn slow_structure_response_does_not_roll_back_layout() {
    let src = Arc::new(GatedSource::default());
    let sync = DashboardSync::new(src.clone(), Config::immediate());

    let early = src.gate(STRUCTURE_PATH);
    let late = src.gate(STRUCTURE_PATH);

    let s1 = sync.clone();
    let first = tokio::spawn(async move { s1.refresh_structure().await });
    wait_until_taken(&src, STRUCTURE_PATH, 1).await;
    let s2 = sync.clone();
    let second = tokio::spawn(async move { s2.refresh_structure().await });
    wait_until_taken(&src, STRUCTURE_PATH, 0).await;

    late.send(serde_json::to_value(one_by_one("New")).unwrap()).unwrap();
    assert_eq!(second.await.unwrap(), StructureOutcome::Rebuilt);
    early.send(serde_json::to_value(one_by_one("Old")).unwrap()).unwrap();
    assert_eq!(first.await.unwrap(), StructureOutcome::Stale);

    assert_eq!(sync.snapshot().nav_title, "New");
    assert_eq!(sync.cached_structure().unwrap().name, "New");
}

//! End-to-end behaviour of one poll cycle against an in-memory source.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use palantir::page::EMPTY_NOTICE;
use palantir::source::MemorySource;
use palantir::state::Config;
use palantir::sync::{CellOutcome, DashboardSync, StructureOutcome, STRUCTURE_PATH};

fn grid(rows: &[(&str, &str)], cols: &[(&str, &str)]) -> Value {
    let entries = |items: &[(&str, &str)]| -> Vec<Value> {
        items.iter().map(|(id, text)| json!({"id": id, "text": text})).collect()
    };
    json!({"name": "Ops", "rows": entries(rows), "columns": entries(cols)})
}

fn cell(id: &str, animation: &str, text: &str) -> Value {
    json!({"id": id, "color": "#fff", "bgcolor": "#000", "animation": animation, "text": text})
}

fn setup(structure: Value) -> (Arc<MemorySource>, DashboardSync) {
    let src = Arc::new(MemorySource::new());
    src.insert(STRUCTURE_PATH, structure);
    let sync = DashboardSync::new(src.clone(), Config::immediate());
    (src, sync)
}

#[tokio::test]
async fn single_cell_cycle_renders_and_patches() {
    let (src, sync) = setup(grid(&[("r1", "Row One")], &[("c1", "Col One")]));
    src.insert("data/r1-c1.json", cell("r1-c1", "none", "OK"));

    assert_eq!(sync.refresh_structure().await, StructureOutcome::Rebuilt);

    let page = sync.snapshot();
    assert_eq!(page.title, "Palantir | Ops");
    assert_eq!(page.nav_title, "Ops");
    assert_eq!(page.notice, "");
    assert_eq!(
        page.table_html(),
        concat!(
            r#"<tr><th id="column_headers" class="statuscell text-center darker"></th>"#,
            r#"<th class="statuscell text-center darker" title="ID: c1">Col One</th></tr>"#,
            r#"<tr><th class="statuscell text-center darker" title="ID: r1">Row One</th>"#,
            r#"<td class="statuscell" id="r1-c1" style="color: #fff; background-color: #000" onclick="loadmodal(id)">OK</td></tr>"#,
        )
    );
    let patched = page.cell("r1-c1").unwrap();
    assert_eq!(patched.class, "statuscell");
    assert_eq!(patched.inner_html, "OK");
    assert_eq!(patched.style, "color: #fff; background-color: #000");
}

#[tokio::test]
async fn animation_adds_suffix_class() {
    let (src, sync) = setup(grid(&[("r1", "R")], &[("c1", "C")]));
    src.insert("data/r1-c1.json", cell("r1-c1", "blink", "OK"));
    sync.refresh_structure().await;
    assert_eq!(sync.snapshot().cell("r1-c1").unwrap().class, "statuscell statuscell-blink");
}

#[tokio::test]
async fn equal_structure_keeps_skeleton() {
    let (src, sync) = setup(grid(&[("r1", "R")], &[("c1", "C")]));
    src.insert("data/r1-c1.json", cell("r1-c1", "none", "first"));
    assert_eq!(sync.refresh_structure().await, StructureOutcome::Rebuilt);

    src.insert("data/r1-c1.json", cell("r1-c1", "none", "second"));
    src.clear_requests();
    assert_eq!(sync.refresh_structure().await, StructureOutcome::Unchanged);
    assert_eq!(src.requests(), [STRUCTURE_PATH, "data/r1-c1.json"]);

    let page = sync.snapshot();
    assert_eq!(page.skeleton_builds, 1);
    assert_eq!(page.cell("r1-c1").unwrap().inner_html, "second");
}

#[tokio::test]
async fn unchanged_structure_keeps_cell_when_cell_fetch_fails() {
    let (src, sync) = setup(grid(&[("r1", "R")], &[("c1", "C")]));
    src.insert("data/r1-c1.json", cell("r1-c1", "wave", "up"));
    sync.refresh_structure().await;

    src.remove("data/r1-c1.json");
    sync.refresh_structure().await;
    let page = sync.snapshot();
    assert_eq!(page.cell("r1-c1").unwrap().inner_html, "up");
    assert_eq!(page.cell("r1-c1").unwrap().class, "statuscell statuscell-wave");
}

#[tokio::test]
async fn changed_structure_rebuilds() {
    let (src, sync) = setup(grid(&[("r1", "R")], &[("c1", "C")]));
    sync.refresh_structure().await;
    src.insert(STRUCTURE_PATH, grid(&[("r1", "R"), ("r2", "R2")], &[("c1", "C")]));
    assert_eq!(sync.refresh_structure().await, StructureOutcome::Rebuilt);
    let page = sync.snapshot();
    assert_eq!(page.skeleton_builds, 2);
    assert!(page.cell("r2-c1").is_some());
    assert_eq!(sync.cached_structure().unwrap().rows.len(), 2);
}

#[tokio::test]
async fn empty_axis_shows_notice_and_clears_table() {
    let (src, sync) = setup(grid(&[("r1", "R")], &[("c1", "C")]));
    sync.refresh_structure().await;

    src.insert(STRUCTURE_PATH, grid(&[], &[("c1", "C")]));
    assert_eq!(sync.refresh_structure().await, StructureOutcome::Emptied);
    let page = sync.snapshot();
    assert_eq!(page.notice, EMPTY_NOTICE);
    assert_eq!(page.table_html(), "");
    assert!(sync.cached_structure().unwrap().rows.is_empty());

    // same empty document again: still handled, not short-circuited
    assert_eq!(sync.refresh_structure().await, StructureOutcome::Emptied);

    src.insert(STRUCTURE_PATH, grid(&[("r1", "R")], &[]));
    assert_eq!(sync.refresh_structure().await, StructureOutcome::Emptied);
}

#[tokio::test]
async fn empty_first_load_sets_titles() {
    let (_src, sync) = setup(json!({"name": "Fresh", "rows": [], "columns": []}));
    assert_eq!(sync.refresh_structure().await, StructureOutcome::Emptied);
    let page = sync.snapshot();
    assert_eq!(page.nav_title, "Fresh");
    assert_eq!(page.notice, EMPTY_NOTICE);
    assert_eq!(sync.cached_structure().unwrap().name, "Fresh");
}

#[tokio::test]
async fn restoring_the_previous_structure_after_emptying_rebuilds() {
    let (src, sync) = setup(grid(&[("r1", "R")], &[("c1", "C")]));
    src.insert("data/r1-c1.json", cell("r1-c1", "none", "OK"));
    assert_eq!(sync.refresh_structure().await, StructureOutcome::Rebuilt);

    src.insert(STRUCTURE_PATH, grid(&[], &[("c1", "C")]));
    assert_eq!(sync.refresh_structure().await, StructureOutcome::Emptied);

    src.insert(STRUCTURE_PATH, grid(&[("r1", "R")], &[("c1", "C")]));
    assert_eq!(sync.refresh_structure().await, StructureOutcome::Rebuilt);
    let page = sync.snapshot();
    assert_eq!(page.notice, "");
    assert_eq!(page.skeleton_builds, 2);
    assert_eq!(page.cell("r1-c1").unwrap().inner_html, "OK");
    assert_eq!(sync.refresh_cell("r1", "c1").await, CellOutcome::Applied);
}

#[tokio::test]
async fn missing_structure_leaves_table_alone() {
    let (src, sync) = setup(grid(&[("r1", "R")], &[("c1", "C")]));
    src.insert("data/r1-c1.json", cell("r1-c1", "none", "OK"));
    sync.refresh_structure().await;
    let before = sync.snapshot();

    src.remove(STRUCTURE_PATH);
    assert_eq!(sync.refresh_structure().await, StructureOutcome::FetchFailed);
    assert_eq!(sync.snapshot(), before);

    src.insert(STRUCTURE_PATH, Value::Null);
    assert_eq!(sync.refresh_structure().await, StructureOutcome::FetchFailed);
    assert_eq!(sync.snapshot(), before);
}

#[tokio::test]
async fn missing_structure_on_first_load_shows_nothing() {
    let src = Arc::new(MemorySource::new());
    let sync = DashboardSync::new(src, Config::immediate());
    assert_eq!(sync.refresh_structure().await, StructureOutcome::FetchFailed);
    let page = sync.snapshot();
    assert!(page.table.is_none());
    assert_eq!(page.title, "");
}

#[tokio::test]
async fn structure_is_requested_before_cells() {
    let (src, sync) = setup(grid(&[("r1", "R"), ("r2", "R")], &[("c1", "C"), ("c2", "C")]));
    sync.refresh_structure().await;
    let requests = src.requests();
    assert_eq!(requests[0], STRUCTURE_PATH);
    let mut cells: Vec<_> = requests[1..].to_vec();
    cells.sort();
    assert_eq!(
        cells,
        ["data/r1-c1.json", "data/r1-c2.json", "data/r2-c1.json", "data/r2-c2.json"]
    );
}

#[tokio::test]
async fn cols_field_is_accepted() {
    let (src, sync) = setup(json!({
        "name": "Legacy",
        "rows": [{"id": "r1", "text": "R"}],
        "cols": [{"id": "c1", "text": "C"}]
    }));
    src.insert("data/r1-c1.json", cell("r1-c1", "none", "OK"));
    assert_eq!(sync.refresh_structure().await, StructureOutcome::Rebuilt);
    assert_eq!(sync.snapshot().cell("r1-c1").unwrap().inner_html, "OK");
}

#[tokio::test]
async fn markup_is_interpolated_verbatim() {
    let (src, sync) = setup(grid(&[("r1", "<b>Row</b>")], &[("c1", "Col \"quoted\"")]));
    src.insert("data/r1-c1.json", cell("r1-c1", "none", "<script>alert(1)</script>"));
    sync.refresh_structure().await;
    let html = sync.snapshot().table_html();
    assert!(html.contains("<b>Row</b>"));
    assert!(html.contains(r#">Col "quoted"</th>"#));
    assert!(html.contains("<script>alert(1)</script>"));
}

#[tokio::test]
async fn cell_document_targets_its_own_id() {
    let (src, sync) = setup(grid(&[("r1", "R"), ("r2", "R")], &[("c1", "C")]));
    // document fetched for r1-c1 names r2-c1 as its element
    src.insert("data/r1-c1.json", cell("r2-c1", "none", "moved"));
    sync.refresh_structure().await;
    let page = sync.snapshot();
    assert_eq!(page.cell("r1-c1").unwrap().inner_html, "");
    assert_eq!(page.cell("r2-c1").unwrap().inner_html, "moved");
}

#[tokio::test]
async fn refresh_cell_reports_outcomes() {
    let (src, sync) = setup(grid(&[("r1", "R")], &[("c1", "C")]));
    sync.refresh_structure().await;
    assert_eq!(sync.refresh_cell("r1", "c1").await, CellOutcome::FetchFailed);
    src.insert("data/r1-c1.json", cell("r1-c1", "none", "OK"));
    assert_eq!(sync.refresh_cell("r1", "c1").await, CellOutcome::Applied);
    src.insert("data/r9-c1.json", cell("r9-c1", "none", "OK"));
    assert_eq!(sync.refresh_cell("r9", "c1").await, CellOutcome::NoElement);
}

#[tokio::test]
async fn detail_falls_back_to_placeholder() {
    let (src, sync) = setup(grid(&[("r1", "R")], &[("c1", "C")]));
    let markup = sync.open_detail("r1-c1").await;
    assert!(markup.contains("Under Construction"));
    assert!(markup.contains("None"));
    let page = sync.snapshot();
    assert!(page.modal.visible);
    assert_eq!(page.modal.markup, markup);

    src.insert("data/r1-c1.json", json!({"title": "Disk usage", "content": "<em>91%</em>"}));
    let markup = sync.open_detail("r1-c1").await;
    assert!(markup.contains("Disk usage"));
    assert!(markup.contains("<em>91%</em>"));
}

#[tokio::test]
async fn detail_tolerates_missing_fields() {
    let (src, sync) = setup(grid(&[("r1", "R")], &[("c1", "C")]));
    src.insert("data/r1-c1.json", json!({"unrelated": 1}));
    let markup = sync.open_detail("r1-c1").await;
    assert!(sync.snapshot().modal.visible);
    assert!(!markup.contains("Under Construction"));
}

#[tokio::test(start_paused = true)]
async fn every_fetch_waits_for_the_configured_delay() {
    let src = Arc::new(MemorySource::new());
    src.insert(STRUCTURE_PATH, grid(&[("r1", "R")], &[("c1", "C")]));
    let cfg = Config { fetch_delay: Duration::from_millis(100), ..Config::default() };
    let sync = DashboardSync::new(src, cfg);

    let started = tokio::time::Instant::now();
    sync.refresh_structure().await;
    // structure fetch, then the cell fetch
    assert!(started.elapsed() >= Duration::from_millis(200));
}

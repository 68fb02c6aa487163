//! Authoring side of a dashboard directory.
//!
//! Layout:
//!
//! ```text
//! <root>/data/structure.json        grid name, rows, columns
//! <root>/data/{row}-{col}.json      one status document per cell
//! <root>/images/                    images attached to cells
//! <root>/templates/*.html           modal / body templates
//! ```

use chrono::Local;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::logging::{log, obj, v_str, Domain, Level};
use crate::model::{cell_id, AxisEntry, CellStatus, Note, Structure};
use crate::sync::{document_path, STRUCTURE_PATH};
use crate::template::{Templates, BODY_TEMPLATE, MODAL_TEMPLATE};

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("'{}' already exists", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("document '{}' does not exist", path.display())]
    MissingDocument { path: PathBuf },

    #[error("io error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid json in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("a dashboard needs at least one row and one column; no changes were made")]
    EmptyGrid,

    #[error("update not completed; check that your input parameters were correct")]
    Unchanged,
}

impl BoardError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        BoardError::Io { path: path.to_path_buf(), source }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    None,
    Wave,
    Toggle,
    Bars,
}

impl Animation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Animation::None => "none",
            Animation::Wave => "wave",
            Animation::Toggle => "toggle",
            Animation::Bars => "bars",
        }
    }
}

impl FromStr for Animation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Animation::None),
            "wave" => Ok(Animation::Wave),
            "toggle" => Ok(Animation::Toggle),
            "bars" => Ok(Animation::Bars),
            other => Err(format!("unknown animation '{}'", other)),
        }
    }
}

/// Keep only characters that are safe in a file name and an element id.
pub fn idify(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect()
}

/// `#` followed by three to six hex digits.
pub fn is_hex_color(s: &str) -> bool {
    match s.strip_prefix('#') {
        Some(hex) => (3..=6).contains(&hex.len()) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// `true`/`false`/`none` in lower or title case. `Some(None)` clears the flag.
pub fn parse_flag(s: &str) -> Option<Option<bool>> {
    match s {
        "true" | "True" => Some(Some(true)),
        "false" | "False" => Some(Some(false)),
        "none" | "None" => Some(None),
        _ => None,
    }
}

/// Normalise a user-supplied dashboard path: drop a leading `=`, a
/// trailing `/`, and expand `~`.
pub fn cleaned_path(raw: &str) -> PathBuf {
    let mut s = raw.strip_prefix('=').unwrap_or(raw);
    if s.len() > 1 {
        s = s.strip_suffix('/').unwrap_or(s);
    }
    if let Some(rest) = s.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(format!("{}{}", home, rest));
        }
    }
    PathBuf::from(s)
}

#[derive(Debug, Clone, Default)]
pub struct StructureUpdate {
    pub add_rows: Vec<String>,
    pub remove_rows: Vec<String>,
    pub add_columns: Vec<String>,
    pub remove_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub added_cells: Vec<String>,
    pub removed_cells: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CellEdit {
    pub text: Option<String>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub boolean: Option<String>,
    pub animation: Option<String>,
    pub add_image: Option<PathBuf>,
    pub remove_image: Option<usize>,
    pub add_note: Option<String>,
}

pub struct Board {
    root: PathBuf,
}

impl Board {
    pub fn open(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lay out an empty dashboard. Fails if `root` already exists.
    pub fn create(root: impl AsRef<Path>, name: &str) -> Result<Self, BoardError> {
        let root = root.as_ref();
        if root.exists() {
            return Err(BoardError::AlreadyExists { path: root.to_path_buf() });
        }
        for dir in [root.to_path_buf(), root.join("data"), root.join("images"), root.join("templates")] {
            fs::create_dir_all(&dir).map_err(|e| BoardError::io(&dir, e))?;
        }

        let templates = Templates::default();
        for tpl in [MODAL_TEMPLATE, BODY_TEMPLATE] {
            let path = root.join("templates").join(format!("{}.html", tpl));
            let body = templates.get(tpl).unwrap_or_default();
            fs::write(&path, body).map_err(|e| BoardError::io(&path, e))?;
        }

        let board = Self::open(root);
        board.write_json(STRUCTURE_PATH, &Structure::new(name))?;
        log(
            Level::Info,
            Domain::Board,
            "created",
            obj(&[("path", v_str(&root.display().to_string())), ("name", v_str(name))]),
        );
        Ok(board)
    }

    fn write_json<T: Serialize>(&self, rel: &str, value: &T) -> Result<(), BoardError> {
        let path = self.root.join(rel);
        // Value maps are ordered, so keys come out sorted
        let value = serde_json::to_value(value).map_err(|e| BoardError::Json { path: path.clone(), source: e })?;
        let mut buf = Vec::new();
        let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
        value
            .serialize(&mut ser)
            .map_err(|e| BoardError::Json { path: path.clone(), source: e })?;
        fs::write(&path, buf).map_err(|e| BoardError::io(&path, e))
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, rel: &str) -> Result<T, BoardError> {
        let path = self.root.join(rel);
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BoardError::MissingDocument { path: path.clone() },
            _ => BoardError::io(&path, e),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| BoardError::Json { path, source: e })
    }

    pub fn structure(&self) -> Result<Structure, BoardError> {
        self.read_json(STRUCTURE_PATH)
    }

    pub fn cell(&self, row_id: &str, col_id: &str) -> Result<CellStatus, BoardError> {
        self.read_json(&document_path(&cell_id(row_id, col_id)))
    }

    /// Add and remove rows/columns by display name. New cells get a
    /// placeholder document, cells of removed rows/columns are deleted.
    pub fn update(&self, update: &StructureUpdate) -> Result<UpdateReport, BoardError> {
        let original = self.structure()?;
        let mut working = original.clone();

        let added_rows = add_entries(&mut working.rows, &update.add_rows);
        let added_cols = add_entries(&mut working.columns, &update.add_columns);
        let removed_rows = remove_entries(&mut working.rows, &update.remove_rows);
        let removed_cols = remove_entries(&mut working.columns, &update.remove_columns);

        if working.is_empty() {
            return Err(BoardError::EmptyGrid);
        }
        if working == original {
            return Err(BoardError::Unchanged);
        }

        let mut report = UpdateReport::default();
        let mut removed = BTreeSet::new();
        for col in &removed_cols {
            removed.extend(original.rows.iter().map(|r| cell_id(&r.id, col)));
        }
        for row in &removed_rows {
            removed.extend(original.columns.iter().map(|c| cell_id(row, &c.id)));
        }
        for id in removed {
            let path = self.root.join(document_path(&id));
            if fs::remove_file(&path).is_ok() {
                report.removed_cells.push(id);
            }
        }

        // an id added and removed in the same update has no cells
        let mut added = BTreeSet::new();
        for row in added_rows.iter().filter(|id| working.rows.iter().any(|r| &r.id == *id)) {
            added.extend(working.columns.iter().map(|c| cell_id(row, &c.id)));
        }
        for col in added_cols.iter().filter(|id| working.columns.iter().any(|c| &c.id == *id)) {
            added.extend(working.rows.iter().map(|r| cell_id(&r.id, col)));
        }
        for id in added {
            self.write_json(&document_path(&id), &CellStatus::placeholder(id.clone()))?;
            report.added_cells.push(id);
        }

        self.write_json(STRUCTURE_PATH, &working)?;
        log(
            Level::Info,
            Domain::Board,
            "structure_updated",
            obj(&[
                ("rows", json!(working.rows.len())),
                ("columns", json!(working.columns.len())),
                ("added_cells", json!(report.added_cells.len())),
                ("removed_cells", json!(report.removed_cells.len())),
            ]),
        );
        Ok(report)
    }

    /// Apply `edit` to one cell. Invalid colors, flags and animations are
    /// ignored; failing image operations are skipped.
    pub fn edit_cell(&self, row_id: &str, col_id: &str, edit: &CellEdit) -> Result<CellStatus, BoardError> {
        let id = cell_id(row_id, col_id);
        let original = self.cell(row_id, col_id)?;
        let mut cell = original.clone();

        if let Some(text) = &edit.text {
            cell.text = text.clone();
        }
        if let Some(bg) = edit.background_color.as_deref().filter(|c| is_hex_color(c)) {
            cell.bgcolor = bg.to_string();
        }
        if let Some(fg) = edit.text_color.as_deref().filter(|c| is_hex_color(c)) {
            cell.color = fg.to_string();
        }
        if let Some(flag) = edit.boolean.as_deref().and_then(parse_flag) {
            cell.boolean = flag;
        }
        if let Some(anim) = edit.animation.as_deref().and_then(|a| a.parse::<Animation>().ok()) {
            cell.animation = anim.as_str().to_string();
        }
        if let Some(note) = &edit.add_note {
            cell.notes.insert(
                0,
                Note {
                    timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
                    text: note.clone(),
                },
            );
        }
        if let Some(index) = edit.remove_image {
            self.remove_image(&mut cell, index);
        }
        if let Some(src) = &edit.add_image {
            self.attach_image(&mut cell, src);
        }

        if cell == original {
            return Err(BoardError::Unchanged);
        }
        self.write_json(&document_path(&id), &cell)?;
        log(Level::Info, Domain::Board, "cell_updated", obj(&[("cell_id", v_str(&id))]));
        Ok(cell)
    }

    fn remove_image(&self, cell: &mut CellStatus, index: usize) {
        let Some(rel) = cell.images.get(index).cloned() else {
            return;
        };
        match fs::remove_file(self.root.join(&rel)) {
            Ok(()) => {
                cell.images.remove(index);
            }
            Err(e) => log(
                Level::Warn,
                Domain::Board,
                "image_remove_failed",
                obj(&[("path", v_str(&rel)), ("reason", v_str(&e.to_string()))]),
            ),
        }
    }

    fn attach_image(&self, cell: &mut CellStatus, src: &Path) {
        let Some(file_name) = src.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        let rel = format!("images/{}", file_name);
        match fs::copy(src, self.root.join(&rel)) {
            Ok(_) => cell.images.push(rel),
            Err(e) => log(
                Level::Warn,
                Domain::Board,
                "image_copy_failed",
                obj(&[("path", v_str(&src.display().to_string())), ("reason", v_str(&e.to_string()))]),
            ),
        }
    }
}

/// Append entries whose idified name is new. Names without any id
/// characters are skipped. Returns the added ids.
fn add_entries(entries: &mut Vec<AxisEntry>, names: &[String]) -> Vec<String> {
    let mut added = Vec::new();
    for name in names {
        let id = idify(name);
        if id.is_empty() {
            log(
                Level::Warn,
                Domain::Board,
                "name_skipped",
                obj(&[("msg", v_str("name has no id characters")), ("name", v_str(name))]),
            );
            continue;
        }
        if entries.iter().any(|e| e.id == id) {
            continue;
        }
        entries.push(AxisEntry::new(id.clone(), name.clone()));
        added.push(id);
    }
    added
}

/// Drop entries matching the idified names. Returns the removed ids.
fn remove_entries(entries: &mut Vec<AxisEntry>, names: &[String]) -> Vec<String> {
    let mut removed = Vec::new();
    for name in names {
        let id = idify(name);
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() != before {
            removed.push(id);
        }
    }
    removed
}

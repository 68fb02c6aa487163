use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// One row or column of the grid. `id` anchors cell element ids, `text` is the label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisEntry {
    pub id: String,
    pub text: String,
}

impl AxisEntry {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into() }
    }
}

/// Grid layout document (`data/structure.json`).
///
/// Older dashboards write the column list under `cols`; it is read as an
/// alias and always written back as `columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<AxisEntry>,
    #[serde(default, alias = "cols")]
    pub columns: Vec<AxisEntry>,
}

impl Structure {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), rows: Vec::new(), columns: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    /// Composite cell ids in row-major order.
    pub fn cell_ids(&self) -> Vec<String> {
        self.rows
            .iter()
            .flat_map(|r| self.columns.iter().map(move |c| cell_id(&r.id, &c.id)))
            .collect()
    }

    /// SHA-256 over the canonical JSON form.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        hex::encode(hasher.finalize())
    }
}

/// Full value equality over two structures; order of rows and columns matters.
pub fn structures_equal(a: &Structure, b: &Structure) -> bool {
    a == b
}

pub fn cell_id(row_id: &str, col_id: &str) -> String {
    format!("{}-{}", row_id, col_id)
}

pub const NO_ANIMATION: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub timestamp: String,
    pub text: String,
}

/// Per-cell status document (`data/{row}-{col}.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellStatus {
    pub id: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub bgcolor: String,
    #[serde(default = "default_animation")]
    pub animation: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub boolean: Option<bool>,
}

// Older cell documents store the unset flag as the string "none".
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn default_animation() -> String {
    NO_ANIMATION.to_string()
}

impl CellStatus {
    /// Status written for freshly added cells.
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            color: "#969696".to_string(),
            bgcolor: "#F0F0F0".to_string(),
            animation: default_animation(),
            text: String::new(),
            images: Vec::new(),
            notes: Vec::new(),
            boolean: None,
        }
    }

    pub fn css_text(&self) -> String {
        format!("color: {}; background-color: {}", self.color, self.bgcolor)
    }

    pub fn class_name(&self) -> String {
        if self.animation == NO_ANIMATION {
            "statuscell".to_string()
        } else {
            format!("statuscell statuscell-{}", self.animation)
        }
    }
}

/// Payload shown in the modal when a detail document is missing.
pub fn detail_placeholder() -> Value {
    serde_json::json!({ "title": "Under Construction", "content": "None" })
}

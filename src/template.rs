use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const MODAL_TEMPLATE: &str = "modalcontent";
pub const BODY_TEMPLATE: &str = "bodycontent";

const DEFAULT_MODAL: &str = r#"<div class="modal-dialog"><div class="modal-content">
<div class="modal-header"><h4 class="modal-title">{{title}}</h4></div>
<div class="modal-body">{{content}}</div>
</div></div>
"#;

const DEFAULT_BODY: &str = r#"<div class="container">
<h2>{{contents.title}}</h2>
<div>{{contents.content}}</div>
</div>
"#;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown template '{0}'")]
    Unknown(String),

    #[error("failed to read templates from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Named markup templates with `{{dotted.path}}` placeholders.
///
/// Values are substituted raw. Missing keys render as the empty string.
#[derive(Debug, Clone)]
pub struct Templates {
    named: HashMap<String, String>,
}

impl Default for Templates {
    fn default() -> Self {
        let mut named = HashMap::new();
        named.insert(MODAL_TEMPLATE.to_string(), DEFAULT_MODAL.to_string());
        named.insert(BODY_TEMPLATE.to_string(), DEFAULT_BODY.to_string());
        Self { named }
    }
}

impl Templates {
    /// Built-in templates overridden by every `*.html` file in `dir`
    /// (template name is the file stem).
    pub fn load_dir(dir: &Path) -> Result<Self, TemplateError> {
        let io_err = |source: std::io::Error| TemplateError::Io { path: dir.to_path_buf(), source };
        let mut templates = Self::default();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let body = std::fs::read_to_string(&path)
                .map_err(|source| TemplateError::Io { path: path.clone(), source })?;
            templates.named.insert(stem.to_string(), body);
        }
        Ok(templates)
    }

    pub fn insert(&mut self, name: impl Into<String>, body: impl Into<String>) {
        self.named.insert(name.into(), body.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    pub fn render(&self, name: &str, data: &Value) -> Result<String, TemplateError> {
        let template = self
            .named
            .get(name)
            .ok_or_else(|| TemplateError::Unknown(name.to_string()))?;
        Ok(interpolate(template, data))
    }
}

fn interpolate(template: &str, data: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                out.push_str(&lookup(data, after[..end].trim()));
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn lookup(data: &Value, path: &str) -> String {
    let mut cur = data;
    for key in path.split('.').filter(|k| !k.is_empty()) {
        cur = match cur {
            Value::Object(map) => match map.get(key) {
                Some(v) => v,
                None => return String::new(),
            },
            Value::Array(items) => match key.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(v) => v,
                None => return String::new(),
            },
            _ => return String::new(),
        };
    }
    match cur {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

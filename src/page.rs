//! In-memory stand-in for the dashboard document.
//!
//! The sync loop only ever touches a handful of regions: the two titles,
//! the notice area, the status table, the modal and the body content.
//! Markup is assembled by plain interpolation; nothing is escaped.

use std::collections::HashMap;

use crate::model::{cell_id, Structure};

pub const EMPTY_NOTICE: &str = r#"<div class="alert alert-warning" role="alert">There is nothing to show! Add columns or rows to get started!</div>"#;
const HEADER_CLASS: &str = "statuscell text-center darker";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub id: Option<String>,
    pub title: Option<String>,
    pub text: String,
}

impl HeaderCell {
    fn to_html(&self) -> String {
        let mut out = String::from("<th");
        if let Some(id) = &self.id {
            out.push_str(&format!(r#" id="{}""#, id));
        }
        out.push_str(&format!(r#" class="{}""#, HEADER_CLASS));
        if let Some(title) = &self.title {
            out.push_str(&format!(r#" title="{}""#, title));
        }
        out.push('>');
        out.push_str(&self.text);
        out.push_str("</th>");
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataCell {
    pub id: String,
    pub class: String,
    pub style: String,
    pub inner_html: String,
}

impl DataCell {
    fn empty(id: String) -> Self {
        Self {
            id,
            class: "statuscell".to_string(),
            style: String::new(),
            inner_html: String::new(),
        }
    }

    fn to_html(&self) -> String {
        let style = if self.style.is_empty() {
            String::new()
        } else {
            format!(r#" style="{}""#, self.style)
        };
        format!(
            r#"<td class="{}" id="{}"{} onclick="loadmodal(id)">{}</td>"#,
            self.class, self.id, style, self.inner_html
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub label: HeaderCell,
    pub cells: Vec<DataCell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<HeaderCell>,
    pub rows: Vec<TableRow>,
    // cell id -> (row, column) of the first element carrying it
    index: HashMap<String, (usize, usize)>,
}

impl Table {
    pub fn from_structure(structure: &Structure) -> Self {
        let mut header = vec![HeaderCell {
            id: Some("column_headers".to_string()),
            title: None,
            text: String::new(),
        }];
        header.extend(structure.columns.iter().map(|c| HeaderCell {
            id: None,
            title: Some(format!("ID: {}", c.id)),
            text: c.text.clone(),
        }));

        let mut index = HashMap::new();
        let rows = structure
            .rows
            .iter()
            .enumerate()
            .map(|(ri, r)| {
                let cells = structure
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(ci, c)| {
                        let id = cell_id(&r.id, &c.id);
                        index.entry(id.clone()).or_insert((ri, ci));
                        DataCell::empty(id)
                    })
                    .collect();
                TableRow {
                    label: HeaderCell {
                        id: None,
                        title: Some(format!("ID: {}", r.id)),
                        text: r.text.clone(),
                    },
                    cells,
                }
            })
            .collect();

        Self { header, rows, index }
    }

    pub fn cell(&self, id: &str) -> Option<&DataCell> {
        let (r, c) = *self.index.get(id)?;
        self.rows.get(r)?.cells.get(c)
    }

    pub fn cell_mut(&mut self, id: &str) -> Option<&mut DataCell> {
        let (r, c) = *self.index.get(id)?;
        self.rows.get_mut(r)?.cells.get_mut(c)
    }

    pub fn to_html(&self) -> String {
        let mut out = String::from("<tr>");
        for h in &self.header {
            out.push_str(&h.to_html());
        }
        out.push_str("</tr>");
        for row in &self.rows {
            out.push_str("<tr>");
            out.push_str(&row.label.to_html());
            for cell in &row.cells {
                out.push_str(&cell.to_html());
            }
            out.push_str("</tr>");
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Modal {
    pub markup: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub title: String,
    pub nav_title: String,
    pub notice: String,
    pub table: Option<Table>,
    pub modal: Modal,
    pub body: String,
    /// Number of times the table skeleton was rebuilt from a structure.
    pub skeleton_builds: u64,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_titles(&mut self, prefix: &str, name: &str) {
        self.title = format!("{} | {}", prefix, name);
        self.nav_title = name.to_string();
    }

    pub fn show_empty_notice(&mut self) {
        self.notice = EMPTY_NOTICE.to_string();
        self.table = None;
    }

    pub fn rebuild_table(&mut self, structure: &Structure) {
        self.notice.clear();
        self.table = Some(Table::from_structure(structure));
        self.skeleton_builds += 1;
    }

    pub fn cell(&self, id: &str) -> Option<&DataCell> {
        self.table.as_ref()?.cell(id)
    }

    pub fn cell_mut(&mut self, id: &str) -> Option<&mut DataCell> {
        self.table.as_mut()?.cell_mut(id)
    }

    pub fn show_modal(&mut self, markup: String) {
        self.modal = Modal { markup, visible: true };
    }

    pub fn table_html(&self) -> String {
        self.table.as_ref().map(Table::to_html).unwrap_or_default()
    }

    /// Complete standalone document with every region filled in.
    pub fn to_html(&self) -> String {
        let modal_class = if self.modal.visible { "modal show" } else { "modal" };
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title id="title">{title}</title>
</head>
<body>
<nav class="navbar"><span id="navbartitle" class="navbar-brand">{nav}</span></nav>
<div id="notice">{notice}</div>
<table id="table" class="table">{table}</table>
<div id="bodycontent">{body}</div>
<div id="modalcontent" class="{modal_class}">{modal}</div>
</body>
</html>
"#,
            title = self.title,
            nav = self.nav_title,
            notice = self.notice,
            table = self.table_html(),
            body = self.body,
            modal_class = modal_class,
            modal = self.modal.markup,
        )
    }
}

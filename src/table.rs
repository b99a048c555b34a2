//! Record schemas and the typed, tabular views they project.
//!
//! A [`Schema`] is a plain value: builtin fields shared by every topology
//! record, the entity's declared [`Field`]s, the column used as the row index
//! and an optional secondary sort. [`Records::project`] applies it to raw
//! records. Projecting nothing yields a view with no table at all, and every
//! renderer short-circuits on that with [`NO_DATA`].

use std::cmp::Ordering;
use std::collections::HashSet;

use comfy_table::{ContentArrangement, Table as TextTable};
use lazy_static::lazy_static;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Result, SkynetError};
use crate::field::{self, Field};

/// Rendered in place of an empty view.
pub const NO_DATA: &str = "No data";

lazy_static! {
    /// Identity and provenance attributes present on every topology node.
    pub static ref BUILTIN_FIELDS: Vec<Field> = vec![
        Field::new("ID"),
        Field::new("Host"),
        Field::new("CreatedAt").transform(field::timestamp),
        Field::new("UpdatedAt").transform(field::timestamp),
        Field::new("DeletedAt").transform(field::timestamp),
    ];
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(column: &str) -> Self {
        Self { column: column.to_string(), descending: false }
    }
    pub fn desc(column: &str) -> Self {
        Self { column: column.to_string(), descending: true }
    }
}

#[derive(Clone, Debug)]
pub struct Schema {
    name: &'static str,
    builtins: Vec<Field>,
    fields: Vec<Field>,
    index: String,
    sort: Vec<SortKey>,
}

impl Schema {
    /// A schema without builtin fields.
    pub fn new(name: &'static str, index: &str) -> Self {
        Self {
            name,
            builtins: Vec::new(),
            fields: Vec::new(),
            index: index.to_string(),
            sort: Vec::new(),
        }
    }
    /// A schema for topology nodes, carrying [`BUILTIN_FIELDS`].
    pub fn topology(name: &'static str, index: &str) -> Self {
        Self {
            builtins: BUILTIN_FIELDS.clone(),
            ..Self::new(name, index)
        }
    }
    pub fn fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }
    /// Append further fields, e.g. the type specific part of an interface.
    pub fn extend(mut self, fields: &[Field]) -> Self {
        self.fields.extend_from_slice(fields);
        self
    }
    pub fn sort_by(mut self, keys: Vec<SortKey>) -> Self {
        self.sort = keys;
        self
    }
    pub fn name(&self) -> &'static str {
        self.name
    }
    pub fn index(&self) -> &str {
        &self.index
    }
    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort
    }

    /// Output keys in column order; a key declared twice keeps its first position.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for field in self.builtins.iter().chain(self.fields.iter()) {
            if !keys.iter().any(|k| k == field.key()) {
                keys.push(field.key().to_string());
            }
        }
        keys
    }

    fn extract(&self, record: &Value, keys: &[String]) -> Result<Vec<Value>> {
        let mut cells = vec![Value::Null; keys.len()];
        // later declarations overwrite earlier ones with the same key
        for field in self.builtins.iter().chain(self.fields.iter()) {
            let position = keys
                .iter()
                .position(|k| k == field.key())
                .ok_or_else(|| SkynetError::Projection {
                    field: field.key().to_string(),
                    message: "key missing from schema".into(),
                })?;
            cells[position] = field.value(record)?;
        }
        Ok(cells)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    index: Value,
    cells: Vec<Value>,
}

impl Row {
    pub fn index(&self) -> &Value {
        &self.index
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    index: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn index(&self) -> &str {
        &self.index
    }
    /// Columns excluding the index column.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    /// Cell of `row` in `column`; the index column is addressable too.
    pub fn get<'t>(&self, row: &'t Row, column: &str) -> Option<&'t Value> {
        if column == self.index {
            return Some(&row.index);
        }
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &row.cells[i])
    }
    /// Row as a JSON object including its index.
    pub fn object(&self, row: &Row) -> Map<String, Value> {
        let mut object = Map::new();
        object.insert(self.index.clone(), row.index.clone());
        for (column, cell) in self.columns.iter().zip(row.cells.iter()) {
            object.insert(column.clone(), cell.clone());
        }
        object
    }

    fn sort(&mut self, keys: &[SortKey]) {
        let positions: Vec<(Option<usize>, bool)> = keys
            .iter()
            .map(|k| (self.columns.iter().position(|c| *c == k.column), k.descending))
            .collect();
        // Vec::sort_by is stable: ties keep their input order
        self.rows.sort_by(|a, b| {
            for &(position, descending) in &positions {
                let Some(i) = position else { continue };
                let ordering = compare(&a.cells[i], &b.cells[i], descending);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
}

/// Nulls sort last in either direction.
fn compare(a: &Value, b: &Value, descending: bool) -> Ordering {
    let ordering = match (a, b) {
        (Value::Null, Value::Null) => return Ordering::Equal,
        (Value::Null, _) => return Ordering::Greater,
        (_, Value::Null) => return Ordering::Less,
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (x, y) => x.to_string().cmp(&y.to_string()),
    };
    if descending { ordering.reverse() } else { ordering }
}

/// A projected set of records: the typed view every provider returns.
#[derive(Clone, Debug, PartialEq)]
pub struct Records {
    schema: &'static str,
    table: Option<Table>,
}

impl Records {
    pub fn project(raw: &[Value], schema: &Schema) -> Result<Self> {
        if raw.is_empty() {
            return Ok(Self::empty(schema));
        }
        let keys = schema.keys();
        let index_position = keys
            .iter()
            .position(|k| *k == schema.index)
            .ok_or_else(|| SkynetError::Projection {
                field: schema.index.clone(),
                message: format!("index is not a column of {}", schema.name),
            })?;
        let mut seen = HashSet::new();
        let mut rows = Vec::with_capacity(raw.len());
        for record in raw {
            let mut cells = schema.extract(record, &keys)?;
            let index = cells.remove(index_position);
            if !seen.insert(index.to_string()) {
                return Err(SkynetError::DuplicateIndex {
                    key: schema.index.clone(),
                    value: display(&index),
                });
            }
            rows.push(Row { index, cells });
        }
        let mut columns = keys;
        columns.remove(index_position);
        let mut table = Table { index: schema.index.clone(), columns, rows };
        if !schema.sort.is_empty() {
            table.sort(&schema.sort);
        }
        Ok(Self { schema: schema.name, table: Some(table) })
    }

    pub fn empty(schema: &Schema) -> Self {
        Self { schema: schema.name, table: None }
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_none()
    }
    pub fn schema(&self) -> &'static str {
        self.schema
    }
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }
    pub fn len(&self) -> usize {
        self.table.as_ref().map_or(0, Table::len)
    }
    pub fn rows(&self) -> &[Row] {
        match &self.table {
            Some(table) => table.rows(),
            None => &[],
        }
    }
    /// First row, when there is one. Detail views hold a single entity.
    pub fn first(&self) -> Option<&Row> {
        self.rows().first()
    }
    /// Index values in row order.
    pub fn ids(&self) -> Vec<String> {
        self.rows().iter().map(|r| display(&r.index)).collect()
    }
    pub fn get<'r>(&self, row: &'r Row, column: &str) -> Option<&'r Value> {
        self.table.as_ref().and_then(|t| t.get(row, column))
    }

    /// Text table of the index plus `columns` (all columns when `None`).
    pub fn to_text(&self, columns: Option<&[&str]>) -> String {
        let Some(table) = &self.table else {
            return NO_DATA.to_string();
        };
        let selected = selection(table, columns);
        let mut text = TextTable::new();
        text.set_content_arrangement(ContentArrangement::Dynamic);
        let mut header = vec![table.index.clone()];
        header.extend(selected.iter().cloned());
        text.set_header(header);
        for row in &table.rows {
            let mut line = vec![display(&row.index)];
            line.extend(
                selected
                    .iter()
                    .map(|c| table.get(row, c).map(display).unwrap_or_default()),
            );
            text.add_row(line);
        }
        text.to_string()
    }

    /// JSON array with one object per row.
    pub fn to_json(&self, columns: Option<&[&str]>) -> Result<String> {
        let Some(table) = &self.table else {
            return Ok(NO_DATA.to_string());
        };
        let selected = selection(table, columns);
        let objects: Vec<Value> = table
            .rows
            .iter()
            .map(|row| {
                let mut object = Map::new();
                object.insert(table.index.clone(), row.index.clone());
                for column in &selected {
                    let cell = table.get(row, column).cloned().unwrap_or(Value::Null);
                    object.insert(column.clone(), cell);
                }
                Value::Object(object)
            })
            .collect();
        Ok(serde_json::to_string(&objects)?)
    }

    pub fn to_html(&self, columns: Option<&[&str]>) -> String {
        let Some(table) = &self.table else {
            return NO_DATA.to_string();
        };
        let selected = selection(table, columns);
        let mut html = String::from("<table border=\"1\" class=\"dataframe\">\n");
        html.push_str("  <thead>\n    <tr>");
        html.push_str(&format!("<th>{}</th>", escape_html(&table.index)));
        for column in &selected {
            html.push_str(&format!("<th>{}</th>", escape_html(column)));
        }
        html.push_str("</tr>\n  </thead>\n  <tbody>\n");
        for row in &table.rows {
            html.push_str(&format!("    <tr><th>{}</th>", escape_html(&display(&row.index))));
            for column in &selected {
                let cell = table.get(row, column).map(display).unwrap_or_default();
                html.push_str(&format!("<td>{}</td>", escape_html(&cell)));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("  </tbody>\n</table>");
        html
    }
}

/// Requested columns that exist, in request order; the index is always shown.
fn selection(table: &Table, columns: Option<&[&str]>) -> Vec<String> {
    let Some(columns) = columns else {
        return table.columns.clone();
    };
    columns
        .iter()
        .filter(|c| **c != table.index)
        .filter(|c| {
            let known = table.columns.iter().any(|k| k == *c);
            if !known {
                warn!(column = %c, "no such column, skipped");
            }
            known
        })
        .map(|c| c.to_string())
        .collect()
}

/// Human readable cell: strings unquoted, nulls as `-`, the rest as compact JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

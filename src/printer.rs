//! Domain specific renderings of projected records.
//!
//! [`details`] prints each record as an aligned key/value block. The two dump
//! formats mimic the native tools: [`openflow`] prints OpenFlow rules the way
//! `ovs-ofctl dump-flows` does and [`logical_flows`] groups logical flows per
//! datapath and pipeline like `ovn-sbctl lflow-list`. Every printer returns
//! [`NO_DATA`] for an empty view.

use serde_json::Value;

use crate::table::{self, NO_DATA, Records, Row};

const INDENT: &str = " ";
/// Shown for a logical flow without a priority.
const MAX_PRIORITY: i64 = 65535;

fn indent(text: &str, width: usize) -> String {
    let pad = INDENT.repeat(width);
    text.lines()
        .map(|line| format!("{pad}{line}\n"))
        .collect()
}

fn pretty(value: &Value) -> String {
    match value {
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => table::display(other),
    }
}

fn cell<'r>(records: &Records, row: &'r Row, column: &str) -> &'r Value {
    records.get(row, column).unwrap_or(&Value::Null)
}

/// One record as a header followed by aligned ` - key: value` lines.
pub fn detail(records: &Records, row: &Row, indentation: usize) -> String {
    let Some(table) = records.table() else {
        return NO_DATA.to_string();
    };
    let name = cell(records, row, "Name");
    let kind = cell(records, row, "Type");
    let header_value = |v: &Value| if v.is_null() { "_".to_string() } else { table::display(v) };
    let mut out = format!(
        "|Name: {}\n|Type: {}\n|ID: {}\n",
        header_value(name),
        header_value(kind),
        table::display(row.index())
    );
    let width = table.columns().iter().map(String::len).max().unwrap_or(0) + 4;
    for column in table.columns() {
        let pad = width - column.len();
        let value = pretty(cell(records, row, column));
        if value.contains('\n') {
            let nested = indent(&value, column.len() + 4 + pad);
            out.push_str(&format!(" - {column}:\n{nested}"));
        } else {
            out.push_str(&format!(" - {column}:{}{value}\n", INDENT.repeat(pad)));
        }
    }
    indent(&out, indentation)
}

/// Every record as a [`detail`] block, separated by blank lines.
pub fn details(records: &Records) -> String {
    if records.is_empty() {
        return NO_DATA.to_string();
    }
    records
        .rows()
        .iter()
        .map(|row| detail(records, row, 0))
        .collect::<Vec<_>>()
        .join("\n")
}

// ------------- OpenFlow -------------

fn ct_state(state: &str) -> String {
    match state {
        "Established" => "est".to_string(),
        "Tracked" => "trk".to_string(),
        "New" => "new".to_string(),
        "Related" => "rel".to_string(),
        "ReplyDir" => "rpl".to_string(),
        "Invalid" => "inv".to_string(),
        "SrcNat" => "snat".to_string(),
        "DstNat" => "dnat".to_string(),
        other => format!("UNKNOWN!:{other}"),
    }
}

fn match_field(entry: &Value) -> String {
    let kind = entry.get("Type").and_then(Value::as_str).unwrap_or_default();
    let value = entry.get("Value").unwrap_or(&Value::Null);
    let mask = entry.get("Mask").unwrap_or(&Value::Null);
    match kind {
        "conn_tracking_state_masked" => {
            let mut states: Vec<&str> = match mask {
                Value::Object(map) => map.keys().map(String::as_str).collect(),
                Value::Array(list) => list.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };
            states.sort_unstable();
            let flags: String = states
                .iter()
                .map(|state| {
                    let set = value.get(*state) == Some(&Value::Bool(true));
                    let sign = if set { '+' } else { '-' };
                    format!("{sign}{}", ct_state(state))
                })
                .collect();
            format!("ct_state={flags}")
        }
        "conn_tracking_label_masked" => {
            let part = |v: &Value, k: &str| v.get(k).map(table::display).unwrap_or_default();
            format!(
                "ct_label=0x{}{}/0x{}{}",
                part(value, "Hi"),
                part(value, "Lo"),
                part(mask, "Hi"),
                part(mask, "Lo")
            )
        }
        _ => format!("{kind}={}", table::display(value)),
    }
}

fn action(entry: &Value) -> String {
    let kind = entry.get("Type").and_then(Value::as_str).unwrap_or_default();
    let arguments = entry.get("Arguments");
    if kind == "resubmit" {
        let table = arguments.and_then(|a| a.get("Table")).map(table::display).unwrap_or_default();
        return format!("resubmit(,{table})");
    }
    match arguments.and_then(Value::as_object) {
        Some(arguments) if !arguments.is_empty() => {
            let arguments: Vec<String> = arguments
                .iter()
                .map(|(k, v)| format!("{k}={}", table::display(v)))
                .collect();
            format!("{kind}:{}", arguments.join(","))
        }
        _ => kind.to_string(),
    }
}

fn joined(value: &Value, render: fn(&Value) -> String) -> String {
    value
        .as_array()
        .map(|list| list.iter().map(render).collect::<Vec<_>>().join(","))
        .unwrap_or_default()
}

/// One OpenFlow rule in `ovs-ofctl dump-flows` syntax.
pub fn openflow_rule(records: &Records, row: &Row) -> String {
    let cookie = match cell(records, row, "Cookie") {
        // stored as int64, so the top bit shows up as a negative number
        Value::Number(n) => match (n.as_u64(), n.as_i64()) {
            (Some(cookie), _) => format!("0x{cookie:x}"),
            (None, Some(cookie)) => format!("0x{:x}", cookie as u64),
            _ => n.to_string(),
        },
        other => table::display(other),
    };
    let metric = cell(records, row, "Metric");
    let counter = |key: &str| metric.get(key).and_then(Value::as_i64).unwrap_or(0);
    let filters = joined(cell(records, row, "Filters"), match_field);
    let separator = if filters.is_empty() { "" } else { "," };
    format!(
        "cookie={cookie}, duration=TBD, table={}, n_packets={}, n_bytes={}, \
         priority={}{separator}{filters} actions={}",
        table::display(cell(records, row, "Table")),
        counter("RxPackets"),
        counter("RxBytes"),
        table::display(cell(records, row, "Priority")),
        joined(cell(records, row, "Actions"), action),
    )
}

pub fn openflow(records: &Records) -> String {
    if records.is_empty() {
        return NO_DATA.to_string();
    }
    records
        .rows()
        .iter()
        .map(|row| openflow_rule(records, row))
        .collect::<Vec<_>>()
        .join("\n")
}

// ------------- Logical flows -------------

/// One logical flow in `ovn-sbctl lflow-list` syntax.
pub fn logical_flow(records: &Records, row: &Row) -> String {
    let table = cell(records, row, "Table").as_i64().unwrap_or(0);
    let priority = cell(records, row, "Priority").as_i64().unwrap_or(MAX_PRIORITY);
    format!(
        "  table={table:<2} ({:<19}), priority={priority:<5}, match=({}), action=({})",
        table::display(cell(records, row, "Stage")),
        table::display(cell(records, row, "Match")),
        table::display(cell(records, row, "Actions")),
    )
}

/// Logical flows grouped by datapath, then pipeline, in row order.
pub fn logical_flows(records: &Records) -> String {
    if records.is_empty() {
        return NO_DATA.to_string();
    }
    let mut out = String::new();
    let mut current: Option<(String, String)> = None;
    for row in records.rows() {
        let group = (
            table::display(cell(records, row, "Datapath")),
            table::display(cell(records, row, "Pipeline")),
        );
        if current.as_ref() != Some(&group) {
            out.push_str(&format!("Datapath: ({}), Pipeline: {}\n", group.0, group.1));
            current = Some(group);
        }
        out.push_str(&logical_flow(records, row));
        out.push('\n');
    }
    out.trim_end().to_string()
}

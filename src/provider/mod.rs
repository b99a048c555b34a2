//! Per-entity query builders.
//!
//! Every provider borrows the shared [`QueryRunner`] and composes its queries
//! the same way: optional ancestor scope, the entity's type tag, the compiled
//! native predicate. Raw answers are pruned by post filters and projected
//! through the entity's [`Schema`].

pub mod capture;
pub mod host;
pub mod k8s;
pub mod ovn;
pub mod ovs;
pub mod platform;

use serde_json::Value;

use crate::error::Result;
use crate::field::METADATA;
use crate::filter::CompiledFilter;
use crate::gremlin::{Ancestor, Traversal};
use crate::remote::QueryRunner;
use crate::table::{Records, Schema};

/// `V()`, scoped below `ancestor` when one is given, restricted to `kind`.
pub fn typed(kind: &str, ancestor: Option<Ancestor>) -> Traversal {
    let traversal = Traversal::vertices();
    let traversal = match ancestor {
        Some(ancestor) => traversal.within(&ancestor),
        None => traversal,
    };
    traversal.has_type(kind)
}

/// Run `traversal` with the native predicate appended, apply the post filters
/// and project the survivors.
pub fn list(
    runner: &QueryRunner,
    traversal: Traversal,
    filter: &CompiledFilter,
    schema: &Schema,
) -> Result<Records> {
    let raw = runner.records(&traversal.filtered(filter))?;
    let raw = filter.apply_post_filters(raw);
    Records::project(&raw, schema)
}

/// The `Metadata.Type` of a raw record.
pub fn record_type(record: &Value) -> Option<&str> {
    record.get(METADATA)?.get("Type")?.as_str()
}

/// Records whose type is `kind`, in input order.
pub fn of_type(records: &[Value], kind: &str) -> Vec<Value> {
    records
        .iter()
        .filter(|r| record_type(r) == Some(kind))
        .cloned()
        .collect()
}

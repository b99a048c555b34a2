//! Builder for the Gremlin-like traversal language spoken by the topology service.
//!
//! A [`Traversal`] is the query body (`V().Has(...).Out()...`). The graph
//! handle and the optional time-travel step are added when a
//! [`RequestContext`](crate::context::RequestContext) renders it.

use std::fmt;

use crate::filter::{CompiledFilter, Literal};

/// An ancestor to scope a listing to: the node of type `kind` whose `id_key`
/// or `Name` equals `value`.
#[derive(Clone, Copy, Debug)]
pub struct Ancestor<'a> {
    pub kind: &'static str,
    pub id_key: &'static str,
    pub value: &'a str,
}

impl<'a> Ancestor<'a> {
    pub fn new(kind: &'static str, id_key: &'static str, value: &'a str) -> Self {
        Self { kind, id_key, value }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Traversal {
    query: String,
}

impl Traversal {
    /// `V()`: every vertex.
    pub fn vertices() -> Self {
        Self { query: "V()".to_string() }
    }
    /// `V('<id>')`: a single vertex by its node identifier.
    pub fn vertex(id: &str) -> Self {
        Self { query: format!("V({})", Literal::string(id)) }
    }
    /// `Flows()`: captured flows rather than topology nodes.
    pub fn flows() -> Self {
        Self { query: "Flows()".to_string() }
    }

    pub fn has(mut self, pairs: &[(&str, Literal)]) -> Self {
        let pairs: Vec<String> = pairs
            .iter()
            .map(|(key, literal)| format!("{}, {literal}", Literal::string(key)))
            .collect();
        self.query.push_str(&format!(".Has({})", pairs.join(", ")));
        self
    }
    pub fn has_type(self, kind: &str) -> Self {
        self.has(&[("Type", Literal::string(kind))])
    }
    pub fn has_either(mut self, first: (&str, Literal), second: (&str, Literal)) -> Self {
        self.query.push_str(&format!(
            ".HasEither({}, {}, {}, {})",
            Literal::string(first.0),
            first.1,
            Literal::string(second.0),
            second.1
        ));
        self
    }
    /// Selects `ancestor` and steps out to its children.
    pub fn within(self, ancestor: &Ancestor) -> Self {
        self.has_type(ancestor.kind)
            .has_either(
                (ancestor.id_key, Literal::string(ancestor.value)),
                ("Name", Literal::string(ancestor.value)),
            )
            .out()
    }
    /// Appends the native predicate of a compiled filter, if it has any.
    pub fn filtered(mut self, filter: &CompiledFilter) -> Self {
        self.query.push_str(&filter.to_query_predicate());
        self
    }

    pub fn out(self) -> Self {
        self.step("Out")
    }
    pub fn out_e(self) -> Self {
        self.step("OutE")
    }
    pub fn both(self) -> Self {
        self.step("Both")
    }
    pub fn descendants(self) -> Self {
        self.step("Descendants")
    }
    pub fn count(self) -> Self {
        self.step("Count")
    }
    pub fn subgraph(self) -> Self {
        self.step("Subgraph")
    }

    fn step(mut self, name: &str) -> Self {
        self.query.push('.');
        self.query.push_str(name);
        self.query.push_str("()");
        self
    }

    pub fn as_str(&self) -> &str {
        &self.query
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query)
    }
}

//! Skynet – a troubleshooting client for OVN, OvS and Kubernetes networks
//! whose state is mirrored into a Skydive topology graph.
//!
//! Skynet never evaluates anything itself. It composes Gremlin-like
//! traversal strings, hands them to the topology service and turns the JSON
//! that comes back into typed, tabular views:
//! * A [`field::Field`] pulls one (possibly nested, possibly transformed)
//!   value out of a raw record and names the column it lands in.
//! * A [`table::Schema`] is a set of fields plus an index column and an
//!   optional secondary sort; [`table::Records`] is what applying it yields.
//! * A [`filter::FilterSet`] turns a `key=value,key=value` string into native
//!   `Has(...)` predicates and in-process post filters.
//! * A [`provider`] per entity family composes the traversals and projects
//!   the answers.
//!
//! ## Modules
//! * [`error`] – The [`SkynetError`] type and the crate wide [`Result`] alias.
//! * [`field`] – Field extraction and projection transforms.
//! * [`table`] – Schemas, projected tables and their text/JSON/HTML renderings.
//! * [`filter`] – The filter grammar and its compiled form.
//! * [`gremlin`] – The traversal builder.
//! * [`context`] – Layered [`context::Settings`] and the immutable
//!   [`context::RequestContext`] carrying the time-travel point.
//! * [`remote`] – The [`remote::Lookup`] seam, the shared
//!   [`remote::QueryRunner`] and the REST client.
//! * [`provider`] – OVN, OvS, Kubernetes, host, platform and capture providers.
//! * [`printer`] – Record details plus `ovs-ofctl` and `ovn-sbctl` style dumps.
//! * [`summary`] – The deployment overview.
//!
//! ## Time travel
//! Every query can be scoped to a point in the past. The raw time string is
//! passed through untouched as a leading `At('<time>').` step; the service
//! interprets it.
//!
//! ## Quick Start
//! ```
//! use serde_json::{json, Value};
//! use skynet::context::RequestContext;
//! use skynet::provider::ovn::{OvnProvider, LOGICAL_FLOW_FILTERS};
//! use skynet::remote::{Lookup, QueryRunner};
//!
//! struct Canned;
//! impl Lookup for Canned {
//!     fn lookup(&self, query: &str) -> skynet::Result<Value> {
//!         assert_eq!(query, "G.V().Has('Type', 'logical_flow').Has('OVN.Table', 3)");
//!         Ok(json!([{ "ID": "n1", "Metadata": { "Name": "lf1", "OVN": { "Table": 3 } } }]))
//!     }
//! }
//!
//! let runner = QueryRunner::new(&Canned, RequestContext::new());
//! let filter = LOGICAL_FLOW_FILTERS.parse("Table=3").unwrap();
//! let flows = OvnProvider::new(&runner).logical_flows(&filter).unwrap();
//! assert_eq!(flows.ids(), vec!["lf1"]);
//! ```

pub mod context;
pub mod error;
pub mod field;
pub mod filter;
pub mod gremlin;
pub mod printer;
pub mod provider;
pub mod remote;
pub mod summary;
pub mod table;

pub use error::{Result, SkynetError};

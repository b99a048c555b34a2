//! The topology service seam.
//!
//! Everything that talks to Skydive goes through [`Lookup`]: a query string
//! in, JSON out. [`QueryRunner`] is the one helper providers share; it renders
//! traversals with the request context, dispatches them and checks the shape
//! of what comes back. [`RestClient`] is the production implementation over
//! the analyzer's REST API.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::context::{RequestContext, Settings};
use crate::error::{Result, SkynetError};
use crate::gremlin::Traversal;

pub trait Lookup {
    /// Run a topology query and return the raw JSON answer.
    fn lookup(&self, query: &str) -> Result<Value>;
}

/// Packet capture management, which is plain REST rather than a query.
pub trait CaptureApi {
    fn list_captures(&self) -> Result<Vec<Value>>;
    fn create_capture(&self, request: &CaptureRequest) -> Result<Value>;
    fn delete_capture(&self, id: &str) -> Result<()>;
}

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CaptureRequest {
    pub gremlin_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "BPFFilter", skip_serializing_if = "Option::is_none")]
    pub bpf_filter: Option<String>,
}

/// Nodes and edges returned by a `Subgraph()` query.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Subgraph {
    #[serde(default)]
    nodes: Option<Vec<Value>>,
    #[serde(default)]
    edges: Option<Vec<Value>>,
}

impl Subgraph {
    pub fn nodes(&self) -> &[Value] {
        self.nodes.as_deref().unwrap_or_default()
    }
    pub fn edges(&self) -> &[Value] {
        self.edges.as_deref().unwrap_or_default()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes().is_empty()
    }
    /// Nodes that are the `Child` of an edge whose `Parent` is `parent`.
    pub fn children(&self, parent: &str) -> Vec<Value> {
        let child_ids: Vec<&str> = self
            .edges()
            .iter()
            .filter(|e| e.get("Parent").and_then(Value::as_str) == Some(parent))
            .filter_map(|e| e.get("Child").and_then(Value::as_str))
            .collect();
        self.nodes()
            .iter()
            .filter(|n| {
                n.get("ID")
                    .and_then(Value::as_str)
                    .is_some_and(|id| child_ids.contains(&id))
            })
            .cloned()
            .collect()
    }
}

/// Shared query helper: a lookup collaborator plus the request context.
pub struct QueryRunner<'a> {
    lookup: &'a dyn Lookup,
    context: RequestContext,
}

impl<'a> QueryRunner<'a> {
    pub fn new(lookup: &'a dyn Lookup, context: RequestContext) -> Self {
        Self { lookup, context }
    }
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    fn run(&self, traversal: &Traversal) -> Result<Value> {
        let query = self.context.render(traversal);
        debug!(%query, "lookup");
        self.lookup.lookup(&query)
    }

    /// A query answering with a list of records.
    pub fn records(&self, traversal: &Traversal) -> Result<Vec<Value>> {
        match self.run(traversal)? {
            Value::Array(records) => {
                debug!(count = records.len(), "records received");
                Ok(records)
            }
            other => Err(SkynetError::shape("array of records", &other)),
        }
    }

    /// A `Count()` query.
    pub fn count(&self, traversal: &Traversal) -> Result<i64> {
        let value = self.run(traversal)?;
        value
            .as_i64()
            .ok_or_else(|| SkynetError::shape("integer count", &value))
    }

    /// A `Subgraph()` query; `None` when the service found nothing.
    pub fn subgraph(&self, traversal: &Traversal) -> Result<Option<Subgraph>> {
        let mut records = self.records(traversal)?;
        if records.is_empty() {
            return Ok(None);
        }
        let graph: Subgraph = serde_json::from_value(records.swap_remove(0))?;
        Ok((!graph.is_empty()).then_some(graph))
    }
}

// ------------- REST -------------

pub struct RestClient {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl RestClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url(),
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_ref()),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<reqwest::blocking::Response> {
        let response = self.authorize(request).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SkynetError::Transport(format!("http error {status}: {body}")));
        }
        Ok(response)
    }
}

impl Lookup for RestClient {
    fn lookup(&self, query: &str) -> Result<Value> {
        let url = format!("{}/api/topology", self.base_url);
        let request = self.client.post(&url).json(&json!({ "GremlinQuery": query }));
        Ok(self.send(request)?.json::<Value>()?)
    }
}

impl CaptureApi for RestClient {
    fn list_captures(&self) -> Result<Vec<Value>> {
        let url = format!("{}/api/capture", self.base_url);
        match self.send(self.client.get(&url))?.json::<Value>()? {
            // keyed by capture id
            Value::Object(captures) => Ok(captures.into_iter().map(|(_, c)| c).collect()),
            Value::Null => Ok(Vec::new()),
            other => Err(SkynetError::shape("map of captures", &other)),
        }
    }

    fn create_capture(&self, request: &CaptureRequest) -> Result<Value> {
        let url = format!("{}/api/capture", self.base_url);
        Ok(self.send(self.client.post(&url).json(request))?.json::<Value>()?)
    }

    fn delete_capture(&self, id: &str) -> Result<()> {
        let url = format!("{}/api/capture/{id}", self.base_url);
        self.send(self.client.delete(&url))?;
        Ok(())
    }
}

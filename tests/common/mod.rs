#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use serde_json::{Value, json};
use skynet::Result;
use skynet::remote::{CaptureApi, CaptureRequest, Lookup};

/// Stores every query it is asked and replays canned answers in order.
/// Once the answers run out it keeps answering with an empty list.
#[derive(Default)]
pub struct RecordingLookup {
    queries: RefCell<Vec<String>>,
    answers: RefCell<VecDeque<Value>>,
}

impl RecordingLookup {
    pub fn new(answers: Vec<Value>) -> Self {
        Self {
            queries: RefCell::new(Vec::new()),
            answers: RefCell::new(answers.into()),
        }
    }
    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
    pub fn last_query(&self) -> String {
        self.queries.borrow().last().cloned().unwrap_or_default()
    }
}

impl Lookup for RecordingLookup {
    fn lookup(&self, query: &str) -> Result<Value> {
        self.queries.borrow_mut().push(query.to_string());
        Ok(self.answers.borrow_mut().pop_front().unwrap_or_else(|| json!([])))
    }
}

/// In-memory capture endpoint.
#[derive(Default)]
pub struct FakeCaptures {
    pub created: RefCell<Vec<CaptureRequest>>,
    pub deleted: RefCell<Vec<String>>,
    pub existing: Vec<Value>,
}

impl CaptureApi for FakeCaptures {
    fn list_captures(&self) -> Result<Vec<Value>> {
        Ok(self.existing.clone())
    }
    fn create_capture(&self, request: &CaptureRequest) -> Result<Value> {
        self.created.borrow_mut().push(request.clone());
        Ok(json!({
            "UUID": "cap-1",
            "GremlinQuery": request.gremlin_query,
            "Name": request.name,
            "Description": request.description,
            "Count": 0,
        }))
    }
    fn delete_capture(&self, id: &str) -> Result<()> {
        self.deleted.borrow_mut().push(id.to_string());
        Ok(())
    }
}

/// A topology node: `ID` and `Host` at the top, the rest in `Metadata`.
pub fn node(id: &str, metadata: Value) -> Value {
    json!({
        "ID": id,
        "Host": "node-1",
        "CreatedAt": 1_600_000_000_000_i64,
        "Metadata": metadata,
    })
}

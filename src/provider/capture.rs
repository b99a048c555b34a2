//! Packet captures and the flows they record.

use lazy_static::lazy_static;
use tracing::info;

use crate::context::RequestContext;
use crate::error::Result;
use crate::field::Field;
use crate::filter::Literal;
use crate::gremlin::Traversal;
use crate::remote::{CaptureApi, CaptureRequest, QueryRunner};
use crate::table::{Records, Schema};

lazy_static! {
    pub static ref CAPTURE_SCHEMA: Schema = Schema::new("capture", "UUID").fields(vec![
        Field::new("UUID"),
        Field::new("GremlinQuery"),
        Field::new("LayerKeyMode"),
        Field::new("Count"),
        Field::new("PollingInterval"),
        Field::new("Name"),
        Field::new("Description"),
    ]);
    pub static ref FLOW_SCHEMA: Schema = Schema::new("flow", "UUID").fields(vec![
        Field::new("UUID"),
        Field::new("LayersPath"),
        Field::new("Application"),
        Field::new("Link.Protocol").key_name("LinkProtocol"),
        Field::new("Link.A").key_name("LinkSrc"),
        Field::new("Link.B").key_name("LinkDst"),
        Field::new("Network.Protocol").key_name("NetworkProtocol"),
        Field::new("Network.A").key_name("NetworkSrc"),
        Field::new("Network.B").key_name("NetworkDst"),
        Field::new("Transport.Protocol").key_name("TransportProtocol"),
        Field::new("Transport.A").key_name("TransportSrc"),
        Field::new("Transport.B").key_name("TransportDst"),
        Field::new("Metric.ABPackets").key_name("Packets"),
        Field::new("Metric.ABBytes").key_name("Bytes"),
        Field::new("Metric.BAPackets").key_name("ReturnPackets"),
        Field::new("Metric.BABytes").key_name("ReturnBytes"),
        Field::new("Start"),
        Field::new("Last"),
        Field::new("TrackingID"),
        Field::new("L3TrackingID"),
        Field::new("NodeTID"),
        Field::new("CaptureID"),
    ]);
}

/// Columns worth showing for captured flows.
pub const FLOW_COLUMNS: [&str; 15] = [
    "LayersPath",
    "LinkProtocol",
    "LinkSrc",
    "LinkDst",
    "NetworkProtocol",
    "NetworkSrc",
    "NetworkDst",
    "TransportProtocol",
    "TransportSrc",
    "TransportDst",
    "Packets",
    "Bytes",
    "ReturnPackets",
    "ReturnBytes",
    "Application",
];

/// What to capture on: a port or interface by name and type.
#[derive(Clone, Debug, Default)]
pub struct NewCapture<'a> {
    pub interface: &'a str,
    /// `ovsport`, `veth` or `internal`.
    pub kind: &'a str,
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub bpf: Option<&'a str>,
}

pub struct CaptureProvider<'r> {
    runner: &'r QueryRunner<'r>,
    api: &'r dyn CaptureApi,
}

impl<'r> CaptureProvider<'r> {
    pub fn new(runner: &'r QueryRunner<'r>, api: &'r dyn CaptureApi) -> Self {
        Self { runner, api }
    }

    pub fn list(&self) -> Result<Records> {
        Records::project(&self.api.list_captures()?, &CAPTURE_SCHEMA)
    }

    /// Start capturing. The node selection is always against the live topology.
    pub fn create(&self, capture: &NewCapture) -> Result<Records> {
        let selector = Traversal::vertices().has(&[
            ("Name", Literal::string(capture.interface)),
            ("Type", Literal::string(capture.kind)),
        ]);
        let request = CaptureRequest {
            gremlin_query: RequestContext::new().render(&selector),
            name: capture.name.map(str::to_string),
            description: capture.description.map(str::to_string),
            bpf_filter: capture.bpf.map(str::to_string),
        };
        info!(query = %request.gremlin_query, "creating capture");
        let created = self.api.create_capture(&request)?;
        Records::project(std::slice::from_ref(&created), &CAPTURE_SCHEMA)
    }

    /// Flows recorded by the capture with this UUID.
    pub fn flows(&self, id: &str) -> Result<Records> {
        let traversal = Traversal::flows().has(&[("CaptureID", Literal::string(id))]);
        Records::project(&self.runner.records(&traversal)?, &FLOW_SCHEMA)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        info!(id, "deleting capture");
        self.api.delete_capture(id)
    }
}

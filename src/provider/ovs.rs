//! Open vSwitch bridges, ports, interfaces and OpenFlow rules.

use std::sync::Arc;

use lazy_static::lazy_static;
use serde_json::Value;

use crate::error::{Result, SkynetError};
use crate::field::{Field, METADATA};
use crate::filter::{
    self, CompiledFilter, FilterSet, FilterSpec, Literal, PostFilterSpec, PostPredicate,
};
use crate::gremlin::{Ancestor, Traversal};
use crate::provider::{self, host, of_type, record_type, typed};
use crate::remote::QueryRunner;
use crate::table::{self, Records, Schema, SortKey};

pub const BRIDGE: &str = "ovsbridge";
pub const PORT: &str = "ovsport";
pub const OFRULE: &str = "ofrule";
pub const PATCH: &str = "patch";
pub const GENEVE: &str = "geneve";
pub const INTERNAL: &str = "internal";
pub const VETH: &str = "veth";
pub const INTERFACE_TYPES: [&str; 4] = [GENEVE, PATCH, INTERNAL, VETH];

lazy_static! {
    pub static ref BRIDGE_SCHEMA: Schema = Schema::topology(BRIDGE, "ID").fields(vec![
        Field::metadata("Type"),
        Field::metadata("Name"),
        Field::metadata("ExtID.bridge-id").key_name("BridgeID"),
        Field::metadata("ExtID.bridge-uplink").key_name("BridgeUplink"),
        Field::metadata("ExtID"),
    ]);
    pub static ref PORT_SCHEMA: Schema = Schema::topology(PORT, "ID").fields(vec![
        Field::metadata("Type"),
        Field::metadata("Name"),
        Field::metadata("ExtID"),
        Field::metadata("ExtID.ovn-chassis-id").key_name("ChassisID"),
    ]);
    static ref INTERFACE_FIELDS: Vec<Field> = vec![
        Field::metadata("Type"),
        Field::metadata("Name"),
        Field::metadata("ExtID"),
        Field::metadata("MAC"),
        Field::metadata("Ovs"),
        Field::metadata("OfPort"),
    ];
    pub static ref INTERFACE_SCHEMA: Schema =
        Schema::topology("interface", "ID").fields(INTERFACE_FIELDS.clone());
    pub static ref PATCH_SCHEMA: Schema = INTERFACE_SCHEMA.clone().extend(&[
        Field::metadata("Ovs.Options.peer").key_name("Peer"),
        Field::metadata("ExtID.ovn-local-port").key_name("LocalPort"),
    ]);
    pub static ref GENEVE_SCHEMA: Schema = INTERFACE_SCHEMA.clone().extend(&[
        Field::metadata("RemoteIP"),
        Field::metadata("IfIndex"),
        Field::metadata("MTU"),
        Field::metadata("EncapType"),
        Field::metadata("TunEgressIfaceCarrier"),
        Field::metadata("TunEgressIface"),
        Field::metadata("Ovs.Options").key_name("Options"),
    ]);
    pub static ref INTERNAL_SCHEMA: Schema = INTERFACE_SCHEMA.clone().extend(&[
        Field::metadata("Neighbours"),
        Field::metadata("EncapType"),
        Field::metadata("IPV4"),
        Field::metadata("MTU"),
        Field::metadata("RoutingTables"),
        Field::metadata("Metric"),
        Field::metadata("FDB"),
        Field::metadata("LinkFlags"),
        Field::metadata("Features"),
    ]);
    pub static ref VETH_SCHEMA: Schema = INTERFACE_SCHEMA.clone().extend(&[
        Field::metadata("PeerIFIndex"),
        Field::metadata("Features"),
        Field::metadata("State"),
        Field::metadata("LinkNetNsID"),
        Field::metadata("Metric"),
        Field::metadata("LinkNetNsName"),
        Field::metadata("LinkFlags"),
        Field::metadata("Speed"),
        Field::metadata("IfIndex"),
        Field::metadata("FDB"),
        Field::metadata("MasterIndex"),
        Field::metadata("ParentIndex"),
        Field::metadata("ExtID.ip_address").key_name("IPAddress"),
        Field::metadata("ExtID.attached_mac").key_name("AttachedMAC"),
        Field::metadata("ExtID.sandbox").key_name("Sandbox"),
        Field::metadata("ExtID.iface-id").key_name("IfaceID"),
    ]);
    /// Sorted by table, highest priority first, like ovs-ofctl dump-flows.
    pub static ref OFRULE_SCHEMA: Schema = Schema::topology(OFRULE, "ID")
        .fields(vec![
            Field::metadata("Type"),
            Field::metadata("Name"),
            Field::metadata("Cookie"),
            Field::metadata("Actions"),
            Field::metadata("Metric"),
            Field::metadata("Filters"),
            Field::metadata("Table"),
            Field::metadata("Priority"),
        ])
        .sort_by(vec![SortKey::asc("Table"), SortKey::desc("Priority")]);
    pub static ref OFRULE_FILTERS: FilterSet = FilterSet::new(
        vec![
            FilterSpec::new("Table", filter::integer),
            FilterSpec::new("Cookie", filter::hex),
            FilterSpec::new("Priority", filter::integer),
            FilterSpec::new("Host", filter::string),
        ],
        vec![
            match_filter("eth_src", filter::post_string),
            match_filter("eth_dst", filter::post_string),
            match_filter("ipv4_src", filter::post_string),
            match_filter("ipv4_dst", filter::post_string),
            match_filter("eth_type", filter::post_string),
            match_filter("ip_proto", filter::post_string),
            match_filter("tcp_src", filter::post_integer),
            match_filter("tcp_dst", filter::post_integer),
            match_filter("in_port", filter::post_integer),
        ],
    );
}

/// Post filter on an OpenFlow match field: the rule's `Metadata.Filters` list
/// must hold an entry of that `Type` with an equal `Value`.
fn match_filter(field: &'static str, transform: filter::PostTransform) -> PostFilterSpec {
    let predicate: PostPredicate =
        Arc::new(move |record: &Value, value: &Value| has_match(record, field, value));
    PostFilterSpec::new(field, predicate, transform)
}

pub fn has_match(record: &Value, field: &str, value: &Value) -> bool {
    let Some(filters) = record
        .get(METADATA)
        .and_then(|m| m.get("Filters"))
        .and_then(Value::as_array)
    else {
        return false;
    };
    filters.iter().any(|entry| {
        entry.get("Type").and_then(Value::as_str) == Some(field)
            && entry
                .get("Value")
                .is_some_and(|v| v == value || table::display(v) == table::display(value))
    })
}

/// Interface schema for an interface type.
pub fn interface_schema(kind: &str) -> Result<&'static Schema> {
    match kind {
        PATCH => Ok(&*PATCH_SCHEMA),
        GENEVE => Ok(&*GENEVE_SCHEMA),
        INTERNAL => Ok(&*INTERNAL_SCHEMA),
        VETH => Ok(&*VETH_SCHEMA),
        other => Err(SkynetError::Projection {
            field: "Type".to_string(),
            message: format!("unknown interface type {other}"),
        }),
    }
}

/// Interfaces are projected with the schema of the first one's type.
pub fn project_interfaces(raw: &[Value]) -> Result<Records> {
    let Some(first) = raw.first() else {
        return Ok(Records::empty(&INTERFACE_SCHEMA));
    };
    let kind = record_type(first).unwrap_or_default();
    Records::project(raw, interface_schema(kind)?)
}

/// A port and its interfaces.
#[derive(Clone, Debug)]
pub struct OvsPort {
    pub port: Records,
    pub ifaces: Records,
}

impl OvsPort {
    fn from_raw(port: &[Value], children: &[Value]) -> Result<Self> {
        let ifaces: Vec<Value> = children
            .iter()
            .filter(|c| record_type(c).is_some_and(|t| INTERFACE_TYPES.contains(&t)))
            .cloned()
            .collect();
        Ok(Self {
            port: Records::project(port, &PORT_SCHEMA)?,
            ifaces: project_interfaces(&ifaces)?,
        })
    }
}

/// A bridge with its full port and interface hierarchy.
#[derive(Clone, Debug)]
pub struct OvsBridge {
    pub bridge: Records,
    pub ports: Vec<OvsPort>,
}

pub struct OvsProvider<'r> {
    runner: &'r QueryRunner<'r>,
}

impl<'r> OvsProvider<'r> {
    pub fn new(runner: &'r QueryRunner<'r>) -> Self {
        Self { runner }
    }

    /// Bridges, optionally only those on the host with this ID or name.
    pub fn bridges(&self, host: Option<&str>) -> Result<Records> {
        let scope = host.map(|h| Ancestor::new(host::HOST, "ID", h));
        provider::list(
            self.runner,
            typed(BRIDGE, scope),
            &CompiledFilter::default(),
            &BRIDGE_SCHEMA,
        )
    }

    /// Ports, optionally only those of the bridge with this ID or name.
    pub fn ports(&self, bridge: Option<&str>) -> Result<Records> {
        let scope = bridge.map(|b| Ancestor::new(BRIDGE, "ID", b));
        provider::list(self.runner, typed(PORT, scope), &CompiledFilter::default(), &PORT_SCHEMA)
    }

    pub fn port(&self, id: &str) -> Result<OvsPort> {
        let port = self.runner.records(&Traversal::vertex(id).has_type(PORT))?;
        if port.is_empty() {
            return Err(SkynetError::NotFound { kind: "OvS port", id: id.to_string() });
        }
        let descendants = self.runner.records(&Traversal::vertex(id).descendants())?;
        OvsPort::from_raw(&port, &descendants)
    }

    pub fn bridge(&self, id: &str) -> Result<OvsBridge> {
        let traversal = Traversal::vertex(id)
            .descendants()
            .has_either(("Type", Literal::string(PORT)), ("Type", Literal::string(BRIDGE)))
            .out_e()
            .has(&[("RelationType", Literal::string("layer2"))])
            .subgraph();
        let not_found = || SkynetError::NotFound { kind: "OvS bridge", id: id.to_string() };
        let graph = self.runner.subgraph(&traversal)?.ok_or_else(not_found)?;
        let bridge = of_type(graph.nodes(), BRIDGE);
        if bridge.is_empty() {
            return Err(not_found());
        }
        let ports = of_type(graph.nodes(), PORT)
            .into_iter()
            .map(|port| {
                let id = port.get("ID").and_then(Value::as_str).unwrap_or_default();
                let children = graph.children(id);
                OvsPort::from_raw(std::slice::from_ref(&port), &children)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(OvsBridge {
            bridge: Records::project(&bridge[..1], &BRIDGE_SCHEMA)?,
            ports,
        })
    }

    /// Every bridge on a host, in full detail. One query per bridge.
    pub fn bridges_on_host(&self, host: &str) -> Result<Vec<OvsBridge>> {
        let bridges = self.bridges(Some(host))?;
        if bridges.is_empty() {
            return Err(SkynetError::NotFound { kind: "Bridges on host", id: host.to_string() });
        }
        bridges.ids().iter().map(|id| self.bridge(id)).collect()
    }

    pub fn port_count(&self, bridge: &str) -> Result<i64> {
        self.runner.count(&bridge_children(bridge, PORT))
    }

    pub fn flow_count(&self, bridge: &str) -> Result<i64> {
        self.runner.count(&bridge_children(bridge, OFRULE))
    }

    /// OpenFlow rules, optionally scoped to a host and/or a bridge.
    pub fn flows(
        &self,
        host: Option<&str>,
        bridge: Option<&str>,
        filter: &CompiledFilter,
    ) -> Result<Records> {
        let mut traversal = Traversal::vertices();
        if let Some(host) = host {
            traversal = traversal.within(&Ancestor::new(host::HOST, "ID", host));
        }
        match bridge {
            Some(bridge) => traversal = traversal.within(&Ancestor::new(BRIDGE, "ID", bridge)),
            // host -> bridges -> rules
            None if host.is_some() => traversal = traversal.out(),
            None => {}
        }
        provider::list(self.runner, traversal.has_type(OFRULE), filter, &OFRULE_SCHEMA)
    }
}

fn bridge_children(bridge: &str, kind: &str) -> Traversal {
    Traversal::vertices()
        .has(&[("Type", Literal::string(BRIDGE)), ("ID", Literal::string(bridge))])
        .out()
        .has_type(kind)
        .count()
}

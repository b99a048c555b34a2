//! OVN northbound and southbound entities.

use lazy_static::lazy_static;
use serde_json::Value;

use crate::error::{Result, SkynetError};
use crate::field::Field;
use crate::filter::{self, CompiledFilter, FilterSet, FilterSpec, Literal};
use crate::gremlin::Ancestor;
use crate::provider::{self, k8s, of_type, ovs, typed};
use crate::remote::QueryRunner;
use crate::table::{Records, Schema, SortKey};

pub const LOGICAL_SWITCH: &str = "logical_switch";
pub const LOGICAL_SWITCH_PORT: &str = "logical_switch_port";
pub const LOGICAL_ROUTER: &str = "logical_router";
pub const LOGICAL_ROUTER_PORT: &str = "logical_router_port";
pub const ACL: &str = "acl";
pub const LOGICAL_FLOW: &str = "logical_flow";
pub const DATAPATH_BINDING: &str = "datapath_binding";

lazy_static! {
    pub static ref SWITCH_SCHEMA: Schema = Schema::topology(LOGICAL_SWITCH, "UUID").fields(vec![
        Field::metadata("Type"),
        Field::metadata("Name"),
        Field::metadata("UUID"),
        Field::metadata("OVN.ExtID").key_name("ExtID"),
    ]);
    pub static ref SWITCH_PORT_SCHEMA: Schema =
        Schema::topology(LOGICAL_SWITCH_PORT, "UUID").fields(vec![
            Field::metadata("Type"),
            Field::metadata("Name"),
            Field::metadata("UUID"),
            Field::metadata("OVN.Options").key_name("Options"),
            Field::metadata("OVN.Addresses").key_name("Addresses"),
            Field::metadata("OVN.Type").key_name("PortType"),
            Field::metadata("OVN.ExtID").key_name("ExtID"),
        ]);
    pub static ref ROUTER_SCHEMA: Schema = Schema::topology(LOGICAL_ROUTER, "UUID").fields(vec![
        Field::metadata("Type"),
        Field::metadata("Name"),
        Field::metadata("UUID"),
        Field::metadata("OVN.ExtID").key_name("ExtID"),
    ]);
    pub static ref ROUTER_PORT_SCHEMA: Schema =
        Schema::topology(LOGICAL_ROUTER_PORT, "UUID").fields(vec![
            Field::metadata("Type"),
            Field::metadata("Name"),
            Field::metadata("UUID"),
            Field::metadata("Enabled"),
            Field::metadata("MAC"),
            Field::metadata("OVN.Networks").key_name("Networks"),
        ]);
    pub static ref ACL_SCHEMA: Schema = Schema::topology(ACL, "ID").fields(vec![
        Field::metadata("Type"),
        Field::metadata("Name"),
        Field::metadata("OVN.Action").key_name("Action"),
        Field::metadata("OVN.Match").key_name("Match"),
        Field::metadata("OVN.Direction").key_name("Direction"),
    ]);
    /// Sorted the way ovn-sbctl lists flows.
    pub static ref LOGICAL_FLOW_SCHEMA: Schema = Schema::topology(LOGICAL_FLOW, "Name")
        .fields(vec![
            Field::metadata("Type"),
            Field::metadata("Name"),
            Field::metadata("OVN.LFActions").key_name("Actions"),
            Field::metadata("OVN.LFMatch").key_name("Match"),
            Field::metadata("OVN.LFPriority").key_name("Priority"),
            Field::metadata("OVN.Pipeline").key_name("Pipeline"),
            Field::metadata("OVN.Table").key_name("Table"),
            Field::metadata("OVN.ExtID.stage-name").key_name("Stage"),
            Field::metadata("OVN.ExtID.source").key_name("Source"),
            Field::metadata("OVN.LogicalDataPath")
                .key_name("Datapath")
                .transform(datapath_prefix),
        ])
        .sort_by(vec![
            SortKey::asc("Datapath"),
            SortKey::asc("Pipeline"),
            SortKey::asc("Table"),
            SortKey::desc("Priority"),
        ]);
    pub static ref LOGICAL_FLOW_FILTERS: FilterSet = FilterSet::new(
        vec![
            FilterSpec::new("Table", filter::integer).key("OVN.Table"),
            FilterSpec::new("Pipeline", filter::string).key("OVN.Pipeline"),
            FilterSpec::new("Datapath", filter::prefix).key("OVN.LogicalDataPath"),
            FilterSpec::new("Match", filter::regex).key("OVN.LFMatch"),
            FilterSpec::new("Actions", filter::regex).key("OVN.LFActions"),
        ],
        vec![],
    );
    pub static ref DATAPATH_SCHEMA: Schema = Schema::topology(DATAPATH_BINDING, "Name").fields(vec![
        Field::metadata("Type"),
        Field::metadata("Name"),
        Field::metadata("OVN.TunnelKey").key_name("TunnelKey"),
        Field::metadata("OVN.ExtID").key_name("ExtID"),
    ]);
    pub static ref DATAPATH_FILTERS: FilterSet = FilterSet::new(
        vec![
            FilterSpec::new("TunnelKey", filter::integer).key("OVN.TunnelKey"),
            FilterSpec::new("Switch", filter::string).key("OVN.ExtID.logical-switch"),
            FilterSpec::new("Router", filter::string).key("OVN.ExtID.logical-router"),
        ],
        vec![],
    );
}

/// Logical datapath UUIDs are shown abbreviated to their first 8 characters.
fn datapath_prefix(value: &Value) -> std::result::Result<Value, String> {
    let datapath = value
        .as_str()
        .ok_or_else(|| format!("expected a datapath UUID, found {value}"))?;
    Ok(Value::String(datapath.chars().take(8).collect()))
}

/// A logical switch port and whatever it is wired to.
#[derive(Clone, Debug)]
pub struct SwitchPortDetail {
    pub port: Records,
    pub switch: Records,
    pub pod: Records,
    pub iface: Records,
    pub router_port: Records,
}

pub struct OvnProvider<'r> {
    runner: &'r QueryRunner<'r>,
}

impl<'r> OvnProvider<'r> {
    pub fn new(runner: &'r QueryRunner<'r>) -> Self {
        Self { runner }
    }

    pub fn switches(&self) -> Result<Records> {
        provider::list(
            self.runner,
            typed(LOGICAL_SWITCH, None),
            &CompiledFilter::default(),
            &SWITCH_SCHEMA,
        )
    }

    /// Switch ports, optionally only those of the switch with this UUID or name.
    pub fn switch_ports(&self, switch: Option<&str>) -> Result<Records> {
        let scope = switch.map(|s| Ancestor::new(LOGICAL_SWITCH, "UUID", s));
        provider::list(
            self.runner,
            typed(LOGICAL_SWITCH_PORT, scope),
            &CompiledFilter::default(),
            &SWITCH_PORT_SCHEMA,
        )
    }

    pub fn switch_port(&self, uuid: &str) -> Result<SwitchPortDetail> {
        let selector = typed(LOGICAL_SWITCH_PORT, None).has(&[("UUID", Literal::string(uuid))]);
        let port = self.runner.records(&selector)?;
        if port.is_empty() {
            return Err(SkynetError::NotFound { kind: "Logical switch port", id: uuid.to_string() });
        }
        let neighbors = self.runner.records(&selector.both())?;
        Ok(SwitchPortDetail {
            port: Records::project(&port, &SWITCH_PORT_SCHEMA)?,
            switch: Records::project(&of_type(&neighbors, LOGICAL_SWITCH), &SWITCH_SCHEMA)?,
            pod: Records::project(&of_type(&neighbors, k8s::POD), &k8s::POD_SCHEMA)?,
            iface: ovs::project_interfaces(&of_type(&neighbors, ovs::VETH))?,
            router_port: Records::project(
                &of_type(&neighbors, LOGICAL_ROUTER_PORT),
                &ROUTER_PORT_SCHEMA,
            )?,
        })
    }

    pub fn routers(&self) -> Result<Records> {
        provider::list(
            self.runner,
            typed(LOGICAL_ROUTER, None),
            &CompiledFilter::default(),
            &ROUTER_SCHEMA,
        )
    }

    /// Router ports, optionally only those of the router with this UUID or name.
    pub fn router_ports(&self, router: Option<&str>) -> Result<Records> {
        let scope = router.map(|r| Ancestor::new(LOGICAL_ROUTER, "UUID", r));
        provider::list(
            self.runner,
            typed(LOGICAL_ROUTER_PORT, scope),
            &CompiledFilter::default(),
            &ROUTER_PORT_SCHEMA,
        )
    }

    pub fn acls(&self) -> Result<Records> {
        provider::list(self.runner, typed(ACL, None), &CompiledFilter::default(), &ACL_SCHEMA)
    }

    pub fn logical_flows(&self, filter: &CompiledFilter) -> Result<Records> {
        provider::list(self.runner, typed(LOGICAL_FLOW, None), filter, &LOGICAL_FLOW_SCHEMA)
    }

    pub fn datapaths(&self, filter: &CompiledFilter) -> Result<Records> {
        provider::list(self.runner, typed(DATAPATH_BINDING, None), filter, &DATAPATH_SCHEMA)
    }
}

//! Kubernetes objects as mirrored into the topology by the Skydive k8s collector.

use lazy_static::lazy_static;

use crate::error::{Result, SkynetError};
use crate::field::Field;
use crate::filter::{self, CompiledFilter, FilterSet, FilterSpec, Literal};
use crate::gremlin::Traversal;
use crate::provider::{self, of_type, ovn, ovs, typed};
use crate::remote::QueryRunner;
use crate::table::{Records, Schema};

pub const MANAGER: &str = "k8s";
pub const POD: &str = "pod";
pub const CONTAINER: &str = "container";
pub const NODE: &str = "node";

lazy_static! {
    pub static ref POD_SCHEMA: Schema = Schema::topology(POD, "ID").fields(vec![
        Field::metadata("Type"),
        Field::metadata("Name"),
        Field::metadata("K8s.Namespace").key_name("Namespace"),
        Field::metadata("K8s.Status").key_name("Status"),
        Field::metadata("K8s.IP").key_name("IP"),
        Field::metadata("K8s.Node").key_name("Node"),
        Field::metadata("K8s.Extra.HostNetwork").key_name("HostNetwork"),
        Field::metadata("K8s.Extra.Status.HostIP").key_name("HostIP"),
    ]);
    pub static ref CONTAINER_SCHEMA: Schema = Schema::topology(CONTAINER, "ID").fields(vec![
        Field::metadata("Type"),
        Field::metadata("Name"),
        Field::metadata("K8s.Namespace").key_name("Namespace"),
        Field::metadata("K8s.Pod").key_name("Pod"),
        Field::metadata("K8s.Extra.Ports").key_name("Ports"),
    ]);
    pub static ref NODE_SCHEMA: Schema = Schema::topology(NODE, "ID").fields(vec![
        Field::metadata("Type"),
        Field::metadata("Name"),
        Field::metadata("UUID"),
        Field::metadata("ClusterName"),
        Field::metadata("K8s.Kernel").key_name("Kernel"),
        Field::metadata("K8s.InternalIP").key_name("InternalIP"),
        Field::metadata("K8s.Hostname").key_name("Hostname"),
    ]);
    pub static ref K8S_FILTERS: FilterSet = FilterSet::new(
        vec![
            FilterSpec::new("Namespace", filter::string).key("K8s.Namespace"),
            FilterSpec::new("Pod", filter::string).key("K8s.Pod"),
        ],
        vec![],
    );
}

/// A pod with its containers and its network attachment.
#[derive(Clone, Debug)]
pub struct PodDetail {
    pub pod: Records,
    pub containers: Records,
    pub lsp: Records,
    pub iface: Records,
}

fn managed(kind: &str) -> Traversal {
    Traversal::vertices()
        .has(&[("Manager", Literal::string(MANAGER)), ("Type", Literal::string(kind))])
}

pub struct K8sProvider<'r> {
    runner: &'r QueryRunner<'r>,
}

impl<'r> K8sProvider<'r> {
    pub fn new(runner: &'r QueryRunner<'r>) -> Self {
        Self { runner }
    }

    pub fn pods(&self, filter: &CompiledFilter) -> Result<Records> {
        provider::list(self.runner, managed(POD), filter, &POD_SCHEMA)
    }

    pub fn containers(&self, filter: &CompiledFilter) -> Result<Records> {
        provider::list(self.runner, managed(CONTAINER), filter, &CONTAINER_SCHEMA)
    }

    pub fn nodes(&self) -> Result<Records> {
        provider::list(self.runner, typed(NODE, None), &CompiledFilter::default(), &NODE_SCHEMA)
    }

    /// A pod by node ID, plus its neighbors split by type.
    pub fn pod(&self, id: &str) -> Result<PodDetail> {
        let pod = self.runner.records(&Traversal::vertex(id).has_type(POD))?;
        if pod.is_empty() {
            return Err(SkynetError::NotFound { kind: "Pod", id: id.to_string() });
        }
        let neighbors = self.runner.records(&Traversal::vertex(id).both())?;
        Ok(PodDetail {
            pod: Records::project(&pod, &POD_SCHEMA)?,
            containers: Records::project(&of_type(&neighbors, CONTAINER), &CONTAINER_SCHEMA)?,
            lsp: Records::project(
                &of_type(&neighbors, ovn::LOGICAL_SWITCH_PORT),
                &ovn::SWITCH_PORT_SCHEMA,
            )?,
            iface: ovs::project_interfaces(&of_type(&neighbors, ovs::VETH))?,
        })
    }
}

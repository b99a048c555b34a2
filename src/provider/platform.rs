//! Which orchestration platform the topology belongs to.

use std::fmt;

use lazy_static::lazy_static;
use tracing::debug;

use crate::error::Result;
use crate::field::{self, Field};
use crate::filter::{CompiledFilter, Literal};
use crate::gremlin::Traversal;
use crate::provider::{self, k8s};
use crate::remote::QueryRunner;
use crate::table::{Records, Schema};

lazy_static! {
    /// The ovn-kubernetes `ovn-config` ConfigMap.
    pub static ref K8S_CONFIG_SCHEMA: Schema = Schema::topology("ovn-config", "ID").fields(vec![
        Field::metadata("K8s.Extra.Data.mtu").key_name("MTU").transform(field::integer),
        Field::metadata("K8s.Extra.Data.net_cidr").key_name("NetCIDR"),
        Field::metadata("K8s.Extra.Data.svc_cidr").key_name("SvcCIDR"),
    ]);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    K8s,
    Unknown,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::K8s => f.write_str("K8S"),
            Platform::Unknown => f.write_str("Unknown"),
        }
    }
}

pub struct PlatformProvider<'r> {
    runner: &'r QueryRunner<'r>,
}

impl<'r> PlatformProvider<'r> {
    pub fn new(runner: &'r QueryRunner<'r>) -> Self {
        Self { runner }
    }

    pub fn k8s_config(&self) -> Result<Records> {
        let traversal = Traversal::vertices().has(&[
            ("Manager", Literal::string(k8s::MANAGER)),
            ("Name", Literal::string("ovn-config")),
        ]);
        provider::list(self.runner, traversal, &CompiledFilter::default(), &K8S_CONFIG_SCHEMA)
    }

    /// Kubernetes as soon as any node is managed by the k8s collector.
    pub fn platform_type(&self) -> Result<Platform> {
        let count = self.runner.count(
            &Traversal::vertices()
                .has(&[("Manager", Literal::string(k8s::MANAGER))])
                .count(),
        )?;
        debug!(count, "k8s managed nodes");
        Ok(if count > 0 { Platform::K8s } else { Platform::Unknown })
    }
}

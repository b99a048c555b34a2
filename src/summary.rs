//! A one-screen overview of the deployment: platform, hosts and the OvS
//! bridges on each host with their port and flow counts.
//!
//! Built with one lookup per host and two per bridge.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::provider::host::HostProvider;
use crate::provider::ovs::OvsProvider;
use crate::provider::platform::{Platform, PlatformProvider};
use crate::remote::QueryRunner;
use crate::table::{self, Records, Row};

#[derive(Clone, Debug, PartialEq)]
pub struct BridgeSummary {
    pub id: String,
    pub name: String,
    pub ports: i64,
    pub flows: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HostSummary {
    pub id: String,
    pub hostname: String,
    pub platform_family: String,
    pub platform_version: String,
    pub bridges: Vec<BridgeSummary>,
}

/// The ovn-kubernetes network settings.
#[derive(Clone, Debug, PartialEq)]
pub struct K8sConfig {
    pub mtu: String,
    pub net_cidr: String,
    pub svc_cidr: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub platform: Platform,
    /// Only looked up on Kubernetes; `None` when the ConfigMap is missing.
    pub k8s_config: Option<K8sConfig>,
    pub hosts: Vec<HostSummary>,
}

fn text(records: &Records, row: &Row, column: &str) -> String {
    table::display(records.get(row, column).unwrap_or(&Value::Null))
}

impl Summary {
    pub fn collect(runner: &QueryRunner) -> Result<Self> {
        let platform_provider = PlatformProvider::new(runner);
        let platform = platform_provider.platform_type()?;
        let k8s_config = match platform {
            Platform::K8s => {
                let config = platform_provider.k8s_config()?;
                config.first().map(|row| K8sConfig {
                    mtu: text(&config, row, "MTU"),
                    net_cidr: text(&config, row, "NetCIDR"),
                    svc_cidr: text(&config, row, "SvcCIDR"),
                })
            }
            Platform::Unknown => None,
        };

        let ovs = OvsProvider::new(runner);
        let hosts = HostProvider::new(runner).hosts()?;
        let mut summaries = Vec::with_capacity(hosts.len());
        for row in hosts.rows() {
            let id = table::display(row.index());
            let bridges = ovs.bridges(Some(&id))?;
            debug!(host = %id, bridges = bridges.len(), "summarizing host");
            let bridges = bridges
                .rows()
                .iter()
                .map(|bridge| {
                    let bridge_id = table::display(bridge.index());
                    Ok(BridgeSummary {
                        name: text(&bridges, bridge, "Name"),
                        ports: ovs.port_count(&bridge_id)?,
                        flows: ovs.flow_count(&bridge_id)?,
                        id: bridge_id,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            summaries.push(HostSummary {
                hostname: text(&hosts, row, "Hostname"),
                platform_family: text(&hosts, row, "PlatformFamily"),
                platform_version: text(&hosts, row, "PlatformVersion"),
                id,
                bridges,
            });
        }
        Ok(Self { platform, k8s_config, hosts: summaries })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Platform: {}", self.platform)?;
        if self.platform == Platform::K8s {
            writeln!(f, "-----K8s Config-----")?;
            match &self.k8s_config {
                Some(config) => {
                    writeln!(f, "MTU      {}", config.mtu)?;
                    writeln!(f, "NetCIDR  {}", config.net_cidr)?;
                    writeln!(f, "SvcCIDR  {}", config.svc_cidr)?;
                }
                None => writeln!(f, "Unknown")?,
            }
        }
        if self.hosts.is_empty() {
            return writeln!(f, "No hosts");
        }
        writeln!(f, "-----Hosts ({})-----", self.hosts.len())?;
        for host in &self.hosts {
            writeln!(f, "  Hostname         {}", host.hostname)?;
            writeln!(f, "  PlatformFamily   {}", host.platform_family)?;
            writeln!(f, "  PlatformVersion  {}", host.platform_version)?;
            if host.bridges.is_empty() {
                writeln!(f, "  No ovs info")?;
                continue;
            }
            writeln!(f, "  {} OvS bridges", host.bridges.len())?;
            for bridge in &host.bridges {
                writeln!(f, "    Bridge {}", bridge.name)?;
                writeln!(f, "       Ports: {}", bridge.ports)?;
                writeln!(f, "       Flows: {}", bridge.flows)?;
            }
        }
        Ok(())
    }
}

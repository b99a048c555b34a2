use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, error::ErrorKind};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use skynet::context::{Overrides, Settings};
use skynet::printer;
use skynet::provider::capture::{CaptureProvider, FLOW_COLUMNS, NewCapture};
use skynet::provider::host::HostProvider;
use skynet::provider::k8s::{K8S_FILTERS, K8sProvider};
use skynet::provider::ovn::{DATAPATH_FILTERS, LOGICAL_FLOW, LOGICAL_FLOW_FILTERS, OvnProvider};
use skynet::provider::ovs::{OFRULE, OFRULE_FILTERS, OvsProvider};
use skynet::remote::{QueryRunner, RestClient};
use skynet::summary::Summary;
use skynet::table::Records;
use skynet::Result;

#[derive(Parser)]
#[command(name = "skynet")]
#[command(
    author,
    version,
    about = "Troubleshoot OVN, OvS and Kubernetes networking through Skydive"
)]
struct Cli {
    /// Skydive analyzer address (host:port)
    #[arg(long, global = true)]
    address: Option<String>,
    /// Query the topology as of this time (timestamp, date or duration)
    #[arg(long, global = true)]
    at: Option<String>,
    /// Settings file (defaults to ./skynet.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log every query sent to the analyzer
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Text,
    Json,
    Html,
    /// OpenFlow rules only, as printed by ovs-ofctl
    Ovs,
    /// Logical flows only, as printed by ovn-sbctl
    Ovn,
}

#[derive(Args)]
struct Output {
    #[arg(long, value_enum, default_value = "table")]
    format: Format,
}

#[derive(Subcommand)]
enum Commands {
    /// OVN logical entities
    Ovn {
        #[command(subcommand)]
        command: OvnCommands,
    },
    /// Open vSwitch bridges, ports and OpenFlow rules
    Ovs {
        #[command(subcommand)]
        command: OvsCommands,
    },
    /// Kubernetes pods, containers and nodes
    K8s {
        #[command(subcommand)]
        command: K8sCommands,
    },
    /// Hosts running a Skydive agent
    Host {
        #[command(flatten)]
        output: Output,
    },
    /// Create and inspect packet captures
    Capture {
        #[command(subcommand)]
        command: CaptureCommands,
    },
    /// Overview of the platform, hosts and bridges
    Summary,
}

#[derive(Subcommand)]
enum OvnCommands {
    /// Logical switches
    Ls {
        #[command(flatten)]
        output: Output,
    },
    /// Logical switch ports; SWITCH is a switch UUID or name
    Lsp {
        switch: Option<String>,
        #[command(flatten)]
        output: Output,
    },
    /// Logical switch port detail with its switch, pod, interface and router port
    LspGet { uuid: String },
    /// Logical routers
    Lr {
        #[command(flatten)]
        output: Output,
    },
    /// Logical router ports; ROUTER is a router UUID or name
    Lrp {
        router: Option<String>,
        #[command(flatten)]
        output: Output,
    },
    /// ACLs
    Acl {
        #[command(flatten)]
        output: Output,
    },
    /// Logical flows; FILTER is "Key1=Value1,Key2=Value2,..."
    Lflow {
        #[arg(default_value = "")]
        filter: String,
        #[command(flatten)]
        output: Output,
    },
    /// Datapath bindings; FILTER is "Key1=Value1,Key2=Value2,..."
    Datapath {
        #[arg(default_value = "")]
        filter: String,
        #[command(flatten)]
        output: Output,
    },
}

#[derive(Subcommand)]
enum OvsCommands {
    /// Bridges, optionally on one host (ID or name)
    Bridge {
        #[arg(long)]
        host: Option<String>,
        #[command(flatten)]
        output: Output,
    },
    /// Bridge detail with its ports and interfaces
    BridgeGet { id: String },
    /// Every bridge on a host in detail
    BridgeDump { host: String },
    /// Ports, optionally of one bridge (ID or name)
    Port {
        #[arg(long)]
        bridge: Option<String>,
        #[command(flatten)]
        output: Output,
    },
    /// Port detail with its interfaces
    PortGet { id: String },
    /// OpenFlow rules; FILTER is "Key1=Value1,Key2=Value2,..."
    Flows {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        bridge: Option<String>,
        #[arg(default_value = "")]
        filter: String,
        #[command(flatten)]
        output: Output,
    },
}

#[derive(Subcommand)]
enum K8sCommands {
    /// Pods; FILTER is "Namespace=...,Pod=..."
    Pod {
        #[arg(default_value = "")]
        filter: String,
        #[command(flatten)]
        output: Output,
    },
    /// Pod detail with its containers, switch port and interface
    PodGet { id: String },
    /// Containers; FILTER is "Namespace=...,Pod=..."
    Container {
        #[arg(default_value = "")]
        filter: String,
        #[command(flatten)]
        output: Output,
    },
    /// Cluster nodes
    Node {
        #[command(flatten)]
        output: Output,
    },
}

#[derive(Subcommand)]
enum CaptureCommands {
    /// Active captures
    List {
        #[command(flatten)]
        output: Output,
    },
    /// Start capturing on a port or interface by name
    Create {
        interface: String,
        /// ovsport, veth or internal
        #[arg(long = "type", default_value = "ovsport")]
        kind: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        bpf: Option<String>,
    },
    /// Flows recorded by a capture
    Get {
        id: String,
        #[command(flatten)]
        output: Output,
    },
    /// Stop and remove a capture
    Delete { id: String },
}

fn dump_only(format: &str, schema: &str) -> String {
    Cli::command()
        .error(
            ErrorKind::InvalidValue,
            format!("--format {format} only applies to {schema} listings"),
        )
        .exit()
}

fn render(records: &Records, format: Format, columns: Option<&[&str]>) -> Result<String> {
    Ok(match format {
        Format::Table => records.to_text(columns),
        Format::Text => printer::details(records),
        Format::Json => records.to_json(columns)?,
        Format::Html => records.to_html(columns),
        Format::Ovs if records.schema() == OFRULE => printer::openflow(records),
        Format::Ovn if records.schema() == LOGICAL_FLOW => printer::logical_flows(records),
        Format::Ovs => dump_only("ovs", OFRULE),
        Format::Ovn => dump_only("ovn", LOGICAL_FLOW),
    })
}

fn section(title: &str, records: &Records) -> String {
    format!("{title}:\n{}", printer::details(records))
}

fn run(cli: Cli) -> Result<String> {
    let settings = Settings::load(
        cli.config.as_deref(),
        Overrides { address: cli.address, at: cli.at },
    )?;
    debug!(address = %settings.address, at = ?settings.at, "settings loaded");
    let client = RestClient::new(&settings)?;
    let runner = QueryRunner::new(&client, settings.context());

    match cli.command {
        Commands::Ovn { command } => {
            let ovn = OvnProvider::new(&runner);
            match command {
                OvnCommands::Ls { output } => render(&ovn.switches()?, output.format, None),
                OvnCommands::Lsp { switch, output } => {
                    render(&ovn.switch_ports(switch.as_deref())?, output.format, None)
                }
                OvnCommands::LspGet { uuid } => {
                    let detail = ovn.switch_port(&uuid)?;
                    Ok([
                        section("Logical Switch Port", &detail.port),
                        section("Logical Switch", &detail.switch),
                        section("Pod", &detail.pod),
                        section("Interface", &detail.iface),
                        section("Logical Router Port", &detail.router_port),
                    ]
                    .join("\n"))
                }
                OvnCommands::Lr { output } => render(&ovn.routers()?, output.format, None),
                OvnCommands::Lrp { router, output } => {
                    render(&ovn.router_ports(router.as_deref())?, output.format, None)
                }
                OvnCommands::Acl { output } => render(&ovn.acls()?, output.format, None),
                OvnCommands::Lflow { filter, output } => {
                    let filter = LOGICAL_FLOW_FILTERS.parse(&filter)?;
                    let columns = [
                        "Datapath", "Pipeline", "Table", "Priority", "Stage", "Match", "Actions",
                    ];
                    render(&ovn.logical_flows(&filter)?, output.format, Some(&columns[..]))
                }
                OvnCommands::Datapath { filter, output } => {
                    let filter = DATAPATH_FILTERS.parse(&filter)?;
                    render(&ovn.datapaths(&filter)?, output.format, None)
                }
            }
        }
        Commands::Ovs { command } => {
            let ovs = OvsProvider::new(&runner);
            match command {
                OvsCommands::Bridge { host, output } => {
                    render(&ovs.bridges(host.as_deref())?, output.format, None)
                }
                OvsCommands::BridgeGet { id } => {
                    let bridge = ovs.bridge(&id)?;
                    let mut out = vec![section("Bridge", &bridge.bridge)];
                    for port in &bridge.ports {
                        out.push(section("Port", &port.port));
                        out.push(section("Interfaces", &port.ifaces));
                    }
                    Ok(out.join("\n"))
                }
                OvsCommands::BridgeDump { host } => Ok(ovs
                    .bridges_on_host(&host)?
                    .iter()
                    .map(|b| {
                        let ports: Vec<String> =
                            b.ports.iter().map(|p| printer::details(&p.port)).collect();
                        format!("{}\n{}", section("Bridge", &b.bridge), ports.join("\n"))
                    })
                    .collect::<Vec<_>>()
                    .join("\n")),
                OvsCommands::Port { bridge, output } => {
                    render(&ovs.ports(bridge.as_deref())?, output.format, None)
                }
                OvsCommands::PortGet { id } => {
                    let port = ovs.port(&id)?;
                    Ok(format!(
                        "{}\n{}",
                        section("Port", &port.port),
                        section("Interfaces", &port.ifaces)
                    ))
                }
                OvsCommands::Flows { host, bridge, filter, output } => {
                    let filter = OFRULE_FILTERS.parse(&filter)?;
                    let flows = ovs.flows(host.as_deref(), bridge.as_deref(), &filter)?;
                    let columns = ["Host", "Table", "Priority", "Cookie", "Filters", "Actions"];
                    render(&flows, output.format, Some(&columns[..]))
                }
            }
        }
        Commands::K8s { command } => {
            let k8s = K8sProvider::new(&runner);
            match command {
                K8sCommands::Pod { filter, output } => {
                    let filter = K8S_FILTERS.parse(&filter)?;
                    render(&k8s.pods(&filter)?, output.format, None)
                }
                K8sCommands::PodGet { id } => {
                    let detail = k8s.pod(&id)?;
                    Ok([
                        section("Pod", &detail.pod),
                        section("Containers", &detail.containers),
                        section("Logical Switch Port", &detail.lsp),
                        section("Interface", &detail.iface),
                    ]
                    .join("\n"))
                }
                K8sCommands::Container { filter, output } => {
                    let filter = K8S_FILTERS.parse(&filter)?;
                    render(&k8s.containers(&filter)?, output.format, None)
                }
                K8sCommands::Node { output } => render(&k8s.nodes()?, output.format, None),
            }
        }
        Commands::Host { output } => {
            render(&HostProvider::new(&runner).hosts()?, output.format, None)
        }
        Commands::Capture { command } => {
            let captures = CaptureProvider::new(&runner, &client);
            match command {
                CaptureCommands::List { output } => render(&captures.list()?, output.format, None),
                CaptureCommands::Create { interface, kind, name, description, bpf } => {
                    let created = captures.create(&NewCapture {
                        interface: &interface,
                        kind: &kind,
                        name: name.as_deref(),
                        description: description.as_deref(),
                        bpf: bpf.as_deref(),
                    })?;
                    Ok(printer::details(&created))
                }
                CaptureCommands::Get { id, output } => {
                    render(&captures.flows(&id)?, output.format, Some(&FLOW_COLUMNS[..]))
                }
                CaptureCommands::Delete { id } => {
                    captures.delete(&id)?;
                    Ok(format!("Capture {id} deleted"))
                }
            }
        }
        Commands::Summary => Ok(Summary::collect(&runner)?.to_string()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match run(cli) {
        Ok(out) => {
            println!("{out}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

mod common;

use serde_json::json;
use skynet::context::RequestContext;
use skynet::provider::platform::Platform;
use skynet::remote::QueryRunner;
use skynet::summary::Summary;

use common::{RecordingLookup, node};

#[test]
fn walks_hosts_and_bridges() {
    let lookup = RecordingLookup::new(vec![
        json!(7),
        json!([node("cm1", json!({ "Name": "ovn-config", "K8s": { "Extra": { "Data": { "mtu": "1400", "net_cidr": "10.244.0.0/16", "svc_cidr": "10.96.0.0/12" } } } }))]),
        json!([node("h1", json!({ "Type": "host", "Hostname": "node1", "PlatformFamily": "rhel", "PlatformVersion": "8.2" }))]),
        json!([node("br1", json!({ "Type": "ovsbridge", "Name": "br-int" }))]),
        json!(3),
        json!(42),
    ]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());
    let summary = Summary::collect(&runner).expect("summary");

    assert_eq!(summary.platform, Platform::K8s);
    assert_eq!(summary.k8s_config.as_ref().map(|c| c.mtu.as_str()), Some("1400"));
    assert_eq!(summary.hosts.len(), 1);
    let bridge = &summary.hosts[0].bridges[0];
    assert_eq!((bridge.name.as_str(), bridge.ports, bridge.flows), ("br-int", 3, 42));

    let queries = lookup.queries();
    assert_eq!(queries.len(), 6);
    assert_eq!(
        queries[3],
        "G.V().Has('Type', 'host').HasEither('ID', 'h1', 'Name', 'h1').Out().Has('Type', 'ovsbridge')"
    );
    assert_eq!(
        queries[5],
        "G.V().Has('Type', 'ovsbridge', 'ID', 'br1').Out().Has('Type', 'ofrule').Count()"
    );

    let text = summary.to_string();
    assert!(text.contains("-----Hosts (1)-----"));
    assert!(text.contains("Bridge br-int"));
    assert!(text.contains("Ports: 3"));
    assert!(text.contains("Flows: 42"));
}

#[test]
fn unknown_platform_without_hosts() {
    let lookup = RecordingLookup::new(vec![json!(0), json!([])]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());
    let summary = Summary::collect(&runner).expect("summary");
    assert_eq!(summary.platform, Platform::Unknown);
    assert!(summary.k8s_config.is_none());
    assert!(summary.hosts.is_empty());
    // no config lookup off Kubernetes
    assert_eq!(lookup.queries().len(), 2);
    assert!(summary.to_string().contains("No hosts"));
}

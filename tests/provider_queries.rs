mod common;

use serde_json::json;
use skynet::SkynetError;
use skynet::context::RequestContext;
use skynet::filter::CompiledFilter;
use skynet::provider::host::HostProvider;
use skynet::provider::k8s::{K8S_FILTERS, K8sProvider};
use skynet::provider::ovn::{DATAPATH_FILTERS, OvnProvider};
use skynet::provider::ovs::{OFRULE_FILTERS, OvsProvider};
use skynet::provider::platform::{Platform, PlatformProvider};
use skynet::remote::QueryRunner;

use common::{RecordingLookup, node};

#[test]
fn plain_listing() {
    let lookup = RecordingLookup::new(vec![json!([node("n1", json!({ "Type": "logical_router", "Name": "lr0", "UUID": "r1" }))])]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());
    let routers = OvnProvider::new(&runner).routers().expect("routers");
    assert_eq!(routers.ids(), vec!["r1"]);
    assert_eq!(lookup.queries(), vec!["G.V().Has('Type', 'logical_router')"]);
}

#[test]
fn ancestor_scope_precedes_type_and_predicate() {
    let lookup = RecordingLookup::new(vec![]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());
    let ports = OvnProvider::new(&runner).switch_ports(Some("sw0")).expect("ports");
    assert!(ports.is_empty());
    assert_eq!(
        lookup.last_query(),
        "G.V().Has('Type', 'logical_switch').HasEither('UUID', 'sw0', 'Name', 'sw0').Out().Has('Type', 'logical_switch_port')"
    );
}

#[test]
fn time_travel_prefix() {
    let lookup = RecordingLookup::new(vec![]);
    let filter = DATAPATH_FILTERS.parse("TunnelKey=3").expect("parse");

    let runner = QueryRunner::new(&lookup, RequestContext::at("1h"));
    OvnProvider::new(&runner).datapaths(&filter).expect("datapaths");
    assert_eq!(
        lookup.last_query(),
        "G.At('1h').V().Has('Type', 'datapath_binding').Has('OVN.TunnelKey', 3)"
    );

    let runner = QueryRunner::new(&lookup, RequestContext::at(""));
    assert_eq!(runner.context().time(), None);
    OvnProvider::new(&runner).datapaths(&filter).expect("datapaths");
    assert_eq!(
        lookup.last_query(),
        "G.V().Has('Type', 'datapath_binding').Has('OVN.TunnelKey', 3)"
    );
}

#[test]
fn switch_port_detail_partitions_neighbors() {
    let port = node("n-lsp", json!({ "Type": "logical_switch_port", "Name": "default_web", "UUID": "u-lsp" }));
    let neighbors = json!([
        node("n-ls", json!({ "Type": "logical_switch", "Name": "node1", "UUID": "u-ls" })),
        node("n-pod", json!({ "Type": "pod", "Name": "web", "K8s": { "Namespace": "default" } })),
        node("n-veth", json!({ "Type": "veth", "Name": "abcdef", "ExtID": { "iface-id": "default_web" } })),
        node("n-other", json!({ "Type": "host", "Name": "node1" })),
    ]);
    let lookup = RecordingLookup::new(vec![json!([port]), neighbors]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());
    let detail = OvnProvider::new(&runner).switch_port("u-lsp").expect("detail");

    assert_eq!(
        lookup.queries(),
        vec![
            "G.V().Has('Type', 'logical_switch_port').Has('UUID', 'u-lsp')",
            "G.V().Has('Type', 'logical_switch_port').Has('UUID', 'u-lsp').Both()",
        ]
    );
    assert_eq!(detail.port.ids(), vec!["u-lsp"]);
    assert_eq!(detail.switch.ids(), vec!["u-ls"]);
    assert_eq!(detail.pod.ids(), vec!["n-pod"]);
    assert_eq!(detail.iface.ids(), vec!["n-veth"]);
    let iface = detail.iface.first().expect("iface");
    assert_eq!(detail.iface.get(iface, "IfaceID"), Some(&json!("default_web")));
    assert!(detail.router_port.is_empty());
}

#[test]
fn missing_entities_are_not_found() {
    let lookup = RecordingLookup::new(vec![]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());

    let err = OvnProvider::new(&runner).switch_port("nope").unwrap_err();
    assert!(matches!(err, SkynetError::NotFound { ref id, .. } if id == "nope"));
    // no neighbor lookup once the entity is missing
    assert_eq!(lookup.queries().len(), 1);

    assert!(matches!(OvsProvider::new(&runner).port("p0").unwrap_err(), SkynetError::NotFound { .. }));
    assert!(matches!(OvsProvider::new(&runner).bridge("br0").unwrap_err(), SkynetError::NotFound { .. }));
    assert!(matches!(K8sProvider::new(&runner).pod("pod0").unwrap_err(), SkynetError::NotFound { .. }));
    let err = OvsProvider::new(&runner).bridges_on_host("h0").unwrap_err();
    assert!(format!("{}", err).contains("h0"));
}

#[test]
fn bridge_subgraph_grouped_by_port() {
    let graph = json!([{
        "Nodes": [
            node("br1", json!({ "Type": "ovsbridge", "Name": "br-int" })),
            node("p1", json!({ "Type": "ovsport", "Name": "patch-br-int-to-br-ex" })),
            node("p2", json!({ "Type": "ovsport", "Name": "ovn-k8s-mp0" })),
            node("i1", json!({ "Type": "patch", "Name": "patch-br-int-to-br-ex", "Ovs": { "Options": { "peer": "patch-br-ex-to-br-int" } } })),
            node("i2", json!({ "Type": "internal", "Name": "ovn-k8s-mp0", "MTU": 1400 })),
        ],
        "Edges": [
            { "ID": "e1", "Parent": "br1", "Child": "p1", "Metadata": { "RelationType": "layer2" } },
            { "ID": "e2", "Parent": "br1", "Child": "p2", "Metadata": { "RelationType": "layer2" } },
            { "ID": "e3", "Parent": "p1", "Child": "i1", "Metadata": { "RelationType": "layer2" } },
            { "ID": "e4", "Parent": "p2", "Child": "i2", "Metadata": { "RelationType": "layer2" } },
        ]
    }]);
    let lookup = RecordingLookup::new(vec![graph]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());
    let bridge = OvsProvider::new(&runner).bridge("br1").expect("bridge");

    assert_eq!(
        lookup.last_query(),
        "G.V('br1').Descendants().HasEither('Type', 'ovsport', 'Type', 'ovsbridge').OutE().Has('RelationType', 'layer2').Subgraph()"
    );
    assert_eq!(bridge.bridge.ids(), vec!["br1"]);
    assert_eq!(bridge.ports.len(), 2);
    let patch = &bridge.ports[0];
    assert_eq!(patch.port.ids(), vec!["p1"]);
    let iface = patch.ifaces.first().expect("iface");
    assert_eq!(patch.ifaces.get(iface, "Peer"), Some(&json!("patch-br-ex-to-br-int")));
    let internal = &bridge.ports[1];
    let iface = internal.ifaces.first().expect("iface");
    assert_eq!(internal.ifaces.get(iface, "MTU"), Some(&json!(1400)));
}

#[test]
fn port_detail_with_unknown_interface_type() {
    let lookup = RecordingLookup::new(vec![
        json!([node("p1", json!({ "Type": "ovsport", "Name": "vxlan0" }))]),
        json!([node("i1", json!({ "Type": "vxlan", "Name": "vxlan0" }))]),
    ]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());
    // not one of the known interface types: no interfaces
    let port = OvsProvider::new(&runner).port("p1").expect("port");
    assert!(port.ifaces.is_empty());
    assert_eq!(lookup.last_query(), "G.V('p1').Descendants()");
}

#[test]
fn counts_expect_a_scalar() {
    let lookup = RecordingLookup::new(vec![json!(3), json!([1, 2])]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());
    let ovs = OvsProvider::new(&runner);
    assert_eq!(ovs.port_count("br1").expect("count"), 3);
    assert_eq!(
        lookup.last_query(),
        "G.V().Has('Type', 'ovsbridge', 'ID', 'br1').Out().Has('Type', 'ovsport').Count()"
    );
    let err = ovs.flow_count("br1").unwrap_err();
    assert!(matches!(err, SkynetError::UnexpectedShape { .. }));
}

#[test]
fn listings_expect_an_array() {
    let lookup = RecordingLookup::new(vec![json!({ "unexpected": true })]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());
    let err = HostProvider::new(&runner).hosts().unwrap_err();
    assert!(format!("{}", err).contains("object"));
}

#[test]
fn flows_scoped_to_host_and_bridge() {
    let lookup = RecordingLookup::new(vec![]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());
    let ovs = OvsProvider::new(&runner);
    let filter = OFRULE_FILTERS.parse("Table=0").expect("parse");

    ovs.flows(Some("h1"), Some("br-int"), &filter).expect("flows");
    assert_eq!(
        lookup.last_query(),
        "G.V().Has('Type', 'host').HasEither('ID', 'h1', 'Name', 'h1').Out()\
         .Has('Type', 'ovsbridge').HasEither('ID', 'br-int', 'Name', 'br-int').Out()\
         .Has('Type', 'ofrule').Has('Table', 0)"
    );

    ovs.flows(Some("h1"), None, &CompiledFilter::default()).expect("flows");
    assert_eq!(
        lookup.last_query(),
        "G.V().Has('Type', 'host').HasEither('ID', 'h1', 'Name', 'h1').Out().Out().Has('Type', 'ofrule')"
    );

    ovs.flows(None, None, &CompiledFilter::default()).expect("flows");
    assert_eq!(lookup.last_query(), "G.V().Has('Type', 'ofrule')");
}

#[test]
fn flows_post_filtered_in_process() {
    let rule = |id: &str, port: i64| {
        node(id, json!({ "Type": "ofrule", "Table": 0, "Priority": 10, "Filters": [{ "Type": "in_port", "Value": port }] }))
    };
    let lookup = RecordingLookup::new(vec![json!([rule("r1", 1), rule("r2", 2)])]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());
    let filter = OFRULE_FILTERS.parse("in_port=2").expect("parse");
    let flows = OvsProvider::new(&runner).flows(None, None, &filter).expect("flows");
    assert_eq!(flows.ids(), vec!["r2"]);
    // post filters never reach the query
    assert_eq!(lookup.last_query(), "G.V().Has('Type', 'ofrule')");
}

#[test]
fn pods_filtered_by_namespace() {
    let lookup = RecordingLookup::new(vec![]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());
    let filter = K8S_FILTERS.parse("Namespace=default").expect("parse");
    K8sProvider::new(&runner).pods(&filter).expect("pods");
    assert_eq!(
        lookup.last_query(),
        "G.V().Has('Manager', 'k8s', 'Type', 'pod').Has('K8s.Namespace', 'default')"
    );
}

#[test]
fn pod_detail() {
    let lookup = RecordingLookup::new(vec![
        json!([node("pod1", json!({ "Type": "pod", "Name": "web", "K8s": { "IP": "10.244.0.5" } }))]),
        json!([
            node("c1", json!({ "Type": "container", "Name": "nginx" })),
            node("lsp1", json!({ "Type": "logical_switch_port", "Name": "default_web", "UUID": "u-lsp" })),
        ]),
    ]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());
    let detail = K8sProvider::new(&runner).pod("pod1").expect("pod");
    assert_eq!(lookup.queries(), vec!["G.V('pod1').Has('Type', 'pod')", "G.V('pod1').Both()"]);
    let pod = detail.pod.first().expect("pod");
    assert_eq!(detail.pod.get(pod, "IP"), Some(&json!("10.244.0.5")));
    assert_eq!(detail.containers.ids(), vec!["c1"]);
    assert_eq!(detail.lsp.ids(), vec!["u-lsp"]);
    assert!(detail.iface.is_empty());
}

#[test]
fn platform_detection() {
    let lookup = RecordingLookup::new(vec![json!(12), json!(0)]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());
    let platform = PlatformProvider::new(&runner);
    assert_eq!(platform.platform_type().expect("platform"), Platform::K8s);
    assert_eq!(lookup.last_query(), "G.V().Has('Manager', 'k8s').Count()");
    assert_eq!(platform.platform_type().expect("platform"), Platform::Unknown);
}

#[test]
fn k8s_config_values() {
    let config = node(
        "cm1",
        json!({ "Name": "ovn-config", "K8s": { "Extra": { "Data": { "mtu": "1400", "net_cidr": "10.244.0.0/16", "svc_cidr": "10.96.0.0/12" } } } }),
    );
    let lookup = RecordingLookup::new(vec![json!([config])]);
    let runner = QueryRunner::new(&lookup, RequestContext::new());
    let records = PlatformProvider::new(&runner).k8s_config().expect("config");
    let row = records.first().expect("row");
    assert_eq!(records.get(row, "MTU"), Some(&json!(1400)));
    assert_eq!(records.get(row, "SvcCIDR"), Some(&json!("10.96.0.0/12")));
    assert_eq!(lookup.last_query(), "G.V().Has('Manager', 'k8s', 'Name', 'ovn-config')");
}

#[test]
fn every_query_of_a_detail_get_is_time_scoped() {
    let lookup = RecordingLookup::new(vec![
        json!([node("pod1", json!({ "Type": "pod", "Name": "web" }))]),
        json!([]),
    ]);
    let runner = QueryRunner::new(&lookup, RequestContext::at("2021-01-01T00:00:00Z"));
    K8sProvider::new(&runner).pod("pod1").expect("pod");
    let queries = lookup.queries();
    assert_eq!(queries.len(), 2);
    for query in queries {
        assert!(query.starts_with("G.At('2021-01-01T00:00:00Z').V('pod1')"), "{query}");
    }
}

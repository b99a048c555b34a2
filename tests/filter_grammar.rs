use serde_json::json;
use skynet::SkynetError;
use skynet::filter::{self, Literal};
use skynet::provider::ovn::{DATAPATH_FILTERS, LOGICAL_FLOW_FILTERS};
use skynet::provider::ovs::OFRULE_FILTERS;

#[test]
fn empty_string_compiles_to_nothing() {
    let compiled = DATAPATH_FILTERS.parse("").expect("parse");
    assert!(compiled.is_empty());
    assert_eq!(compiled.to_query_predicate(), "");
    let compiled = DATAPATH_FILTERS.parse("   ").expect("parse");
    assert!(compiled.is_empty());
}

#[test]
fn integer_filter_renders_unquoted() {
    let compiled = DATAPATH_FILTERS.parse("TunnelKey=3").expect("parse");
    assert_eq!(compiled.predicates(), [("OVN.TunnelKey".to_string(), Literal::Int(3))]);
    assert_eq!(compiled.to_query_predicate(), ".Has('OVN.TunnelKey', 3)");
    assert_eq!(compiled.post_filter_count(), 0);
}

#[test]
fn unknown_key_aborts_whole_string() {
    let err = DATAPATH_FILTERS.parse("TunnelKey=3,Bogus=1").unwrap_err();
    assert!(matches!(err, SkynetError::UnknownFilter { ref key } if key == "Bogus"));
    assert!(format!("{}", err).contains("Bogus"));
}

#[test]
fn malformed_tokens() {
    for input in ["TunnelKey", "=3", "TunnelKey=", "TunnelKey=3,,Switch=a"] {
        let err = DATAPATH_FILTERS.parse(input).unwrap_err();
        assert!(
            matches!(err, SkynetError::MalformedFilter { .. }),
            "{input} should be malformed, got {err}"
        );
    }
}

#[test]
fn value_may_contain_equals() {
    let compiled = LOGICAL_FLOW_FILTERS.parse("Match=reg0=1").expect("parse");
    assert_eq!(
        compiled.predicate("OVN.LFMatch"),
        Some(&Literal::Regex("(?i).*reg0=1.*".to_string()))
    );
    assert_eq!(
        compiled.to_query_predicate(),
        ".Has('OVN.LFMatch', Regex('(?i).*reg0=1.*'))"
    );
}

#[test]
fn repeated_key_keeps_last_value() {
    let compiled = DATAPATH_FILTERS.parse("TunnelKey=3,Switch=sw0,TunnelKey=7").expect("parse");
    assert_eq!(
        compiled.to_query_predicate(),
        ".Has('OVN.TunnelKey', 7, 'OVN.ExtID.logical-switch', 'sw0')"
    );
}

#[test]
fn rejected_values_are_reported() {
    let err = DATAPATH_FILTERS.parse("TunnelKey=three").unwrap_err();
    assert!(matches!(err, SkynetError::InvalidFilterValue { ref key, .. } if key == "TunnelKey"));
    let err = LOGICAL_FLOW_FILTERS.parse("Match=(unclosed").unwrap_err();
    assert!(matches!(err, SkynetError::InvalidFilterValue { .. }));
}

#[test]
fn single_quotes_are_rejected() {
    for input in ["Pipeline=in'gress", "Match=ip4'", "Datapath=ab'c"] {
        let err = LOGICAL_FLOW_FILTERS.parse(input).unwrap_err();
        assert!(
            matches!(err, SkynetError::InvalidFilterValue { .. }),
            "{input} should be rejected, got {err}"
        );
        assert!(format!("{}", err).contains("single quotes"));
    }
}

#[test]
fn datapath_prefix_keeps_uuid_verbatim() {
    let compiled = LOGICAL_FLOW_FILTERS.parse("Datapath=f5d8e1c2-1234").expect("parse");
    assert_eq!(
        compiled.to_query_predicate(),
        ".Has('OVN.LogicalDataPath', Regex('f5d8e1c2-1234.*'))"
    );
}

#[test]
fn regex_backslashes_reach_the_query_once() {
    let compiled = LOGICAL_FLOW_FILTERS.parse(r"Match=ip4\.dst").expect("parse");
    assert_eq!(
        compiled.to_query_predicate(),
        r".Has('OVN.LFMatch', Regex('(?i).*ip4\.dst.*'))"
    );
}

#[test]
fn cookie_accepts_hex() {
    let compiled = OFRULE_FILTERS.parse("Cookie=0x1f,Table=2").expect("parse");
    assert_eq!(compiled.predicate("Cookie"), Some(&Literal::Int(31)));
    assert_eq!(compiled.predicate("Table"), Some(&Literal::Int(2)));
}

#[test]
fn cookie_accepts_full_64_bits() {
    let compiled = OFRULE_FILTERS.parse("Cookie=0xffffffffffffffff").expect("parse");
    assert_eq!(compiled.predicate("Cookie"), Some(&Literal::Int(-1)));
    let compiled = OFRULE_FILTERS.parse("Cookie=0x8000000000000000").expect("parse");
    assert_eq!(compiled.predicate("Cookie"), Some(&Literal::Int(i64::MIN)));
    assert!(OFRULE_FILTERS.parse("Cookie=0x10000000000000000").is_err());
}

#[test]
fn value_transforms() {
    assert_eq!(filter::identity("Within(1, 2)").expect("raw").to_string(), "Within(1, 2)");
    assert_eq!(filter::hex("FF").expect("hex"), Literal::Int(255));
    assert!(filter::integer("1.5").is_err());
    assert_eq!(filter::post_integer(" 80 ").expect("int"), json!(80));
}

#[test]
fn post_filters_are_conjunctive() {
    let compiled = OFRULE_FILTERS.parse("Table=0,eth_type=0x0800,tcp_dst=80").expect("parse");
    assert_eq!(compiled.to_query_predicate(), ".Has('Table', 0)");
    assert_eq!(compiled.post_filter_count(), 2);

    let rule = |filters: serde_json::Value| json!({ "ID": "r", "Metadata": { "Filters": filters } });
    let both = rule(json!([
        { "Type": "eth_type", "Value": "0x0800" },
        { "Type": "tcp_dst", "Value": 80, "Mask": 65535 },
    ]));
    let one = rule(json!([{ "Type": "eth_type", "Value": "0x0800" }]));
    let none = json!({ "ID": "r" });
    assert!(compiled.accepts(&both));
    assert!(!compiled.accepts(&one));
    assert!(!compiled.accepts(&none));

    let kept = compiled.apply_post_filters(vec![one, both.clone(), none]);
    assert_eq!(kept, vec![both]);
}

#[test]
fn filter_names_listed_native_first() {
    let names = OFRULE_FILTERS.names();
    assert_eq!(&names[..4], ["Table", "Cookie", "Priority", "Host"]);
    assert!(names.contains(&"in_port"));
}

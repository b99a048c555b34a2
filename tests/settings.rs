use std::fs;

use skynet::context::{DEFAULT_ADDRESS, Overrides, RequestContext, Settings};
use skynet::gremlin::Traversal;

#[test]
fn defaults_without_file() {
    let settings = Settings::load(None, Overrides::default()).expect("settings");
    assert_eq!(settings.address, DEFAULT_ADDRESS);
    assert_eq!(settings.base_url(), "http://localhost:8082");
    assert_eq!(settings.context(), RequestContext::new());
}

#[test]
fn file_then_command_line() {
    let path = std::env::temp_dir().join(format!("skynet-settings-{}.toml", std::process::id()));
    fs::write(&path, "address = \"analyzer:8082\"\nscheme = \"https\"\ntimeout_secs = 5\nat = \"1h\"\n")
        .expect("write settings");

    let settings = Settings::load(Some(&path), Overrides::default()).expect("settings");
    assert_eq!(settings.base_url(), "https://analyzer:8082");
    assert_eq!(settings.timeout_secs, 5);
    assert_eq!(settings.context().time(), Some("1h"));

    let overrides = Overrides { address: Some("other:9000".into()), at: Some("2020-01-01".into()) };
    let settings = Settings::load(Some(&path), overrides).expect("settings");
    assert_eq!(settings.address, "other:9000");
    assert_eq!(settings.context().time(), Some("2020-01-01"));
    let _ = fs::remove_file(&path);
}

#[test]
fn missing_explicit_file_is_an_error() {
    let path = std::env::temp_dir().join("skynet-does-not-exist.toml");
    let err = Settings::load(Some(&path), Overrides::default()).unwrap_err();
    assert!(format!("{}", err).starts_with("Config error"));
}

#[test]
fn time_scope_is_quoted() {
    let context = RequestContext::at("Mon, 02 Jan 2006 15:04:05 MST");
    assert_eq!(context.scope(), "At('Mon, 02 Jan 2006 15:04:05 MST').");
    assert_eq!(
        context.render(&Traversal::vertices().count()),
        "G.At('Mon, 02 Jan 2006 15:04:05 MST').V().Count()"
    );
}

//! Invocation wide settings and the per-request context threaded through
//! every query.
//!
//! [`Settings`] are layered with the `config` crate: defaults, then an
//! optional `skynet.toml` (or an explicit file), then `SKYNET_*` environment
//! variables, then command line overrides. The only part queries care about,
//! the time-travel point, is lifted into an immutable [`RequestContext`].

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::filter::Literal;
use crate::gremlin::Traversal;

pub const DEFAULT_ADDRESS: &str = "localhost:8082";

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    /// `host:port` of the Skydive analyzer.
    pub address: String,
    pub scheme: String,
    pub timeout_secs: u64,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Time-travel point, passed through to the service untouched.
    pub at: Option<String>,
}

/// Values given on the command line; they win over every other layer.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub address: Option<String>,
    pub at: Option<String>,
}

impl Settings {
    pub fn load(file: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("address", DEFAULT_ADDRESS)?
            .set_default("scheme", "http")?
            .set_default("timeout_secs", 30_i64)?;
        builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("skynet").required(false)),
        };
        let settings = builder
            .add_source(Environment::with_prefix("SKYNET").try_parsing(true))
            .set_override_option("address", overrides.address)?
            .set_override_option("at", overrides.at)?
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn context(&self) -> RequestContext {
        match self.at.as_deref() {
            Some(at) => RequestContext::at(at),
            None => RequestContext::new(),
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.address)
    }
}

/// Immutable per-invocation query context.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    at: Option<String>,
}

impl RequestContext {
    /// Queries the live topology.
    pub fn new() -> Self {
        Self { at: None }
    }
    /// Queries the topology as of `time` (timestamp, RFC 1123 date or Go duration).
    pub fn at(time: &str) -> Self {
        let time = time.trim();
        Self {
            at: (!time.is_empty()).then(|| time.to_string()),
        }
    }
    pub fn time(&self) -> Option<&str> {
        self.at.as_deref()
    }

    /// The time-travel step including its trailing dot, or nothing.
    pub fn scope(&self) -> String {
        match &self.at {
            Some(at) => format!("At({}).", Literal::string(at)),
            None => String::new(),
        }
    }

    /// Full query for `traversal`: graph handle, time scope, traversal.
    pub fn render(&self, traversal: &Traversal) -> String {
        format!("G.{}{}", self.scope(), traversal)
    }
}

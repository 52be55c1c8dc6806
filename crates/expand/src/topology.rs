//! Topology document: the compact authoring format for nodes and links.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use topo_core::{Condition, ObjectMeta};
use topo_schema::{Location, Relationship};

pub const TOPO_API_VERSION: &str = "topo.kubenet.dev/v1alpha1";
pub const TOPOLOGY_KIND: &str = "Topology";

/// Sparse node descriptor. Every field may be absent and filled from defaults.
///
/// `None` means absent (or `null` in the document); `Some("")` is an explicit
/// empty value and wins over a default like any other value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyNode {
    /// Node name; ignored in the `defaults` section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl TopologyNode {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Default::default() }
    }

    /// Own set fields win, unset fields fall back to `defaults`. The default `name` is never inherited.
    pub fn overlay(&self, defaults: &TopologyNode) -> TopologyNode {
        fn pick<T: Clone>(own: &Option<T>, default: &Option<T>) -> Option<T> {
            own.as_ref().or(default.as_ref()).cloned()
        }
        TopologyNode {
            name: self.name.clone(),
            region: pick(&self.region, &defaults.region),
            site: pick(&self.site, &defaults.site),
            rack: pick(&self.rack, &defaults.rack),
            position: pick(&self.position, &defaults.position),
            labels: pick(&self.labels, &defaults.labels),
            type_: pick(&self.type_, &defaults.type_),
            provider: pick(&self.provider, &defaults.provider),
            version: pick(&self.version, &defaults.version),
            location: pick(&self.location, &defaults.location),
        }
    }
}

/// Link endpoint as authored. Kept loose so every schema problem is reported
/// with its location instead of failing the whole decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_bay: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adaptor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<i64>,
}

impl TopologyEndpoint {
    pub fn new(node: impl Into<String>, port: i64) -> Self {
        Self { node: Some(node.into()), port: Some(port), ..Default::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<TopologyEndpoint>>,
}

impl TopologyLink {
    pub fn between(a: TopologyEndpoint, b: TopologyEndpoint) -> Self {
        Self { endpoints: Some(vec![a, b]) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<TopologyNode>,
    #[serde(default)]
    pub nodes: Vec<TopologyNode>,
    #[serde(default)]
    pub links: Vec<TopologyLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<Relationship>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    #[serde(default = "topo_api_version")]
    pub api_version: String,
    #[serde(default = "topology_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<TopologySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TopologyStatus>,
}

fn topo_api_version() -> String { TOPO_API_VERSION.to_string() }
fn topology_kind() -> String { TOPOLOGY_KIND.to_string() }

impl Topology {
    pub fn new(metadata: ObjectMeta, spec: TopologySpec) -> Self {
        Self { api_version: topo_api_version(), kind: topology_kind(), metadata, spec: Some(spec), status: None }
    }
}

topo_schema::impl_namespaced_resource!(Topology, group = "topo.kubenet.dev", version = "v1alpha1", kind = "Topology", plural = "topologies");

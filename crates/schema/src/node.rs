//! Node resource: a unit implementing compute, storage and/or networking.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use topo_core::meta::{validate_conditions, validate_object_meta};
use topo_core::{Condition, FieldPath, Issues, ObjectMeta};

use crate::location::Location;
use crate::physical::PhysicalInfraModel;
use crate::{INFRA_API_VERSION, NODE_KIND};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    /// Short name of the node, unique within its topology.
    pub node: String,
    #[serde(flatten)]
    pub infra: PhysicalInfraModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Software provider implementing the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Version of the provider implementation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack: Option<String>,
    /// Position inside the rack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

impl NodeSpec {
    pub fn validate(&self, path: &FieldPath, issues: &mut Issues) {
        self.infra.validate(path, issues);
        if let Some(loc) = &self.location {
            loc.validate(&path.key("location"), issues);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
    #[serde(rename = "systemID", default, skip_serializing_if = "Option::is_none")]
    pub system_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default = "infra_api_version")]
    pub api_version: String,
    #[serde(default = "node_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<NodeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
}

fn infra_api_version() -> String { INFRA_API_VERSION.to_string() }
fn node_kind() -> String { NODE_KIND.to_string() }

impl Node {
    pub fn new(metadata: ObjectMeta, spec: NodeSpec) -> Self {
        Self { api_version: infra_api_version(), kind: node_kind(), metadata, spec: Some(spec), status: None }
    }

    pub fn validate(&self, issues: &mut Issues) {
        let root = FieldPath::root();
        validate_object_meta(&self.metadata, &root.key("metadata"), issues);
        if let Some(spec) = &self.spec {
            spec.validate(&root.key("spec"), issues);
        }
        if let Some(conds) = self.status.as_ref().and_then(|s| s.conditions.as_deref()) {
            validate_conditions(conds, &root.key("status").key("conditions"), issues);
        }
    }
}

crate::impl_namespaced_resource!(Node, group = "infra.kuid.dev", version = "v1alpha1", kind = "Node", plural = "nodes");

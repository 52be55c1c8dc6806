//! Link resource: a point-to-point attachment between two node endpoints.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use topo_core::meta::{validate_conditions, validate_object_meta};
use topo_core::{Condition, FieldPath, Issues, ObjectMeta};

use crate::physical::{validate_relationships, AdminState, Relationship};
use crate::{INFRA_API_VERSION, LINK_KIND};

/// One side of a link. Ids are unsigned, so `>= 0` holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEndpoint {
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_bay: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<u32>,
    pub port: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adaptor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<u32>,
}

impl LinkEndpoint {
    pub fn new(node: impl Into<String>, port: u32) -> Self {
        Self { node: node.into(), module_bay: None, module: None, port, adaptor: None, endpoint: None }
    }

    /// Values of the set fields in declaration order. Empty strings count as set.
    pub fn name_parts(&self) -> Vec<String> {
        let mut parts = Vec::with_capacity(6);
        parts.push(self.node.clone());
        if let Some(v) = self.module_bay { parts.push(v.to_string()); }
        if let Some(v) = self.module { parts.push(v.to_string()); }
        parts.push(self.port.to_string());
        if let Some(v) = &self.adaptor { parts.push(v.clone()); }
        if let Some(v) = self.endpoint { parts.push(v.to_string()); }
        parts
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSpec {
    /// Always exactly two; a list of any other length fails to decode.
    pub endpoints: [LinkEndpoint; 2],
    pub admin_state: AdminState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<Relationship>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

impl LinkSpec {
    pub fn new(a: LinkEndpoint, b: LinkEndpoint) -> Self {
        Self { endpoints: [a, b], admin_state: AdminState::Enabled, relationships: None, labels: None }
    }

    /// Name suffix built from both endpoints, e.g. `leaf1.1.leaf2.2`.
    pub fn canonical_name(&self) -> String {
        self.endpoints.iter().flat_map(LinkEndpoint::name_parts).collect::<Vec<_>>().join(".")
    }

    pub fn validate(&self, path: &FieldPath, issues: &mut Issues) {
        for (i, ep) in self.endpoints.iter().enumerate() {
            issues.min_len(&path.key("endpoints").index(i).key("node"), &ep.node, 1);
        }
        if let Some(rels) = self.relationships.as_deref() {
            validate_relationships(rels, &path.key("relationships"), issues);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(default = "infra_api_version")]
    pub api_version: String,
    #[serde(default = "link_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<LinkSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LinkStatus>,
}

fn infra_api_version() -> String { INFRA_API_VERSION.to_string() }
fn link_kind() -> String { LINK_KIND.to_string() }

impl Link {
    pub fn new(metadata: ObjectMeta, spec: LinkSpec) -> Self {
        Self { api_version: infra_api_version(), kind: link_kind(), metadata, spec: Some(spec), status: None }
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

crate::impl_namespaced_resource!(Link, group = "infra.kuid.dev", version = "v1alpha1", kind = "Link", plural = "links");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_name_joins_set_fields_in_order() {
        let spec = LinkSpec::new(LinkEndpoint::new("leaf1", 1), LinkEndpoint::new("leaf2", 2));
        assert_eq!(spec.canonical_name(), "leaf1.1.leaf2.2");
        // stable across calls
        assert_eq!(spec.canonical_name(), spec.canonical_name());
    }

    #[test]
    fn canonical_name_includes_optional_and_empty_fields() {
        let a = LinkEndpoint {
            node: "spine1".into(),
            module_bay: Some(0),
            module: Some(3),
            port: 49,
            adaptor: Some(String::new()),
            endpoint: Some(1),
        };
        let b = LinkEndpoint { adaptor: Some("qsfp28".into()), ..LinkEndpoint::new("leaf1", 1) };
        assert_eq!(LinkSpec::new(a, b).canonical_name(), "spine1.0.3.49..1.leaf1.1.qsfp28");
    }

    #[test]
    fn endpoint_cardinality_is_enforced_on_decode() {
        let three = serde_json::json!({
            "endpoints": [
                {"node": "a", "port": 1},
                {"node": "b", "port": 2},
                {"node": "c", "port": 3}
            ],
            "adminState": "enable"
        });
        assert!(serde_json::from_value::<LinkSpec>(three).is_err());

        let two = serde_json::json!({
            "endpoints": [{"node": "a", "port": 1}, {"node": "b", "port": 2}],
            "adminState": "enable"
        });
        let spec: LinkSpec = serde_json::from_value(two).unwrap();
        assert_eq!(spec.endpoints[1].node, "b");
    }

    #[test]
    fn negative_port_does_not_decode() {
        let v = serde_json::json!({"node": "a", "port": -1});
        assert!(serde_json::from_value::<LinkEndpoint>(v).is_err());
    }

    #[test]
    fn link_serializes_without_absent_fields() {
        let link = Link::new(
            topo_core::meta::child_meta("fabric1.leaf1.1.leaf2.2".into(), "prod"),
            LinkSpec::new(LinkEndpoint::new("leaf1", 1), LinkEndpoint::new("leaf2", 2)),
        );
        let v = serde_json::to_value(&link).unwrap();
        assert_eq!(v, serde_json::json!({
            "apiVersion": "infra.kuid.dev/v1alpha1",
            "kind": "Link",
            "metadata": {"name": "fabric1.leaf1.1.leaf2.2", "namespace": "prod"},
            "spec": {
                "endpoints": [{"node": "leaf1", "port": 1}, {"node": "leaf2", "port": 2}],
                "adminState": "enable"
            }
        }));
    }
}

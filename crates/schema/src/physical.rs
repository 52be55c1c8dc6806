//! Physical value objects shared by infra resources.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use topo_core::{FieldPath, Issues};

/// Manufacturer facts about a physical item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalModel {
    pub serial_number: String,
    pub manufacturer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<DateTime<Utc>>,
    /// Manufacturer specific type.
    #[serde(rename = "type")]
    pub type_: String,
}

/// Administrative state of an infra resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdminState {
    #[default]
    #[serde(rename = "enable", alias = "Enabled")]
    Enabled,
    #[serde(rename = "maintenance", alias = "Maintenance")]
    Maintenance,
    #[serde(rename = "decomissioned", alias = "Decommissioned", alias = "decommissioned")]
    Decommissioned,
    #[serde(rename = "standby", alias = "Standby")]
    Standby,
}

impl AdminState {
    pub const ALL: [AdminState; 4] = [AdminState::Enabled, AdminState::Maintenance, AdminState::Decommissioned, AdminState::Standby];

    /// Wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminState::Enabled => "enable",
            AdminState::Maintenance => "maintenance",
            AdminState::Decommissioned => "decomissioned",
            AdminState::Standby => "standby",
        }
    }
}

impl fmt::Display for AdminState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Typed weak reference to another resource. Never an ownership edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Relation descriptor, e.g. `connectedTo`.
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

impl Relationship {
    pub fn validate(&self, path: &FieldPath, issues: &mut Issues) {
        for (key, value) in [("apiVersion", &self.api_version), ("kind", &self.kind), ("name", &self.name), ("type", &self.type_)] {
            issues.min_len(&path.key(key), value, 1);
        }
    }
}

pub fn validate_relationships(rels: &[Relationship], path: &FieldPath, issues: &mut Issues) {
    for (i, r) in rels.iter().enumerate() {
        r.validate(&path.index(i), issues);
    }
}

/// Physical model plus the administrative fields every infra resource carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalInfraModel {
    #[serde(flatten)]
    pub model: PhysicalModel,
    pub admin_state: AdminState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<Relationship>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

impl PhysicalInfraModel {
    pub fn validate(&self, path: &FieldPath, issues: &mut Issues) {
        if let Some(rels) = self.relationships.as_deref() {
            validate_relationships(rels, &path.key("relationships"), issues);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_state_wire_values_and_aliases() {
        assert_eq!(serde_json::to_value(AdminState::Enabled).unwrap(), serde_json::json!("enable"));
        assert_eq!(serde_json::to_value(AdminState::Decommissioned).unwrap(), serde_json::json!("decomissioned"));
        let s: AdminState = serde_json::from_value(serde_json::json!("Standby")).unwrap();
        assert_eq!(s, AdminState::Standby);
        assert!(serde_json::from_value::<AdminState>(serde_json::json!("broken")).is_err());
        for s in AdminState::ALL {
            assert_eq!(serde_json::to_value(s).unwrap(), serde_json::json!(s.as_str()));
        }
    }

    #[test]
    fn infra_model_flattens_physical_fields() {
        let m = PhysicalInfraModel {
            model: PhysicalModel { serial_number: "sn1".into(), manufacturer: "Nokia".into(), purchase_date: None, type_: "ixr-d3".into() },
            admin_state: AdminState::Maintenance,
            relationships: None,
            labels: None,
        };
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v, serde_json::json!({
            "serialNumber": "sn1",
            "manufacturer": "Nokia",
            "type": "ixr-d3",
            "adminState": "maintenance"
        }));
        let back: PhysicalInfraModel = serde_json::from_value(v).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn relationship_requires_descriptor_fields() {
        let r = Relationship {
            api_version: "infra.kuid.dev/v1alpha1".into(),
            kind: "Rack".into(),
            name: String::new(),
            uid: None,
            type_: String::new(),
            labels: None,
        };
        let mut issues = Issues::new();
        validate_relationships(&[r], &FieldPath::from_dotted("spec.relationships"), &mut issues);
        let locs: Vec<String> = issues.into_errors().iter().map(|e| e.loc.to_string()).collect();
        assert_eq!(locs, vec!["spec.relationships.0.name", "spec.relationships.0.type"]);
    }
}

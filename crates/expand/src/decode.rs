//! Document decoding with located type errors.
//!
//! Each list element and each sparse object is decoded on its own so a type
//! mismatch is reported at its field (`spec.nodes.2.type`) and one bad value
//! does not hide the others. `null` is treated as absent throughout.

#![forbid(unsafe_code)]

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as Json};
use topo_core::{Condition, FieldPath, IssueKind, Issues, ObjectMeta, ValidationErrors};
use topo_schema::Relationship;

use crate::topology::{
    Topology, TopologyEndpoint, TopologyLink, TopologyNode, TopologySpec, TopologyStatus, TOPOLOGY_KIND, TOPO_API_VERSION,
};

/// Decode a `Topology`, collecting every type mismatch with its location.
pub fn decode(doc: &Json) -> Result<Topology, ValidationErrors> {
    let mut issues = Issues::new();
    let root = FieldPath::root();
    let Some(obj) = object(doc, &root, &mut issues) else {
        return Err(issues.into_errors());
    };

    let api_version = field::<String>(obj, "apiVersion", &root, &mut issues);
    let kind = field::<String>(obj, "kind", &root, &mut issues);
    let metadata = match present(obj, "metadata") {
        Some(v) => sparse::<ObjectMeta>(v, &root.key("metadata"), &mut issues),
        None => Some(ObjectMeta::default()),
    };
    let spec = present(obj, "spec").map(|v| decode_spec(v, &root.key("spec"), &mut issues));
    let status = present(obj, "status").map(|v| decode_status(v, &root.key("status"), &mut issues));

    if !issues.is_empty() {
        return Err(issues.into_errors());
    }
    Ok(Topology {
        api_version: api_version.flatten().unwrap_or_else(|| TOPO_API_VERSION.to_string()),
        kind: kind.flatten().unwrap_or_else(|| TOPOLOGY_KIND.to_string()),
        metadata: metadata.unwrap_or_default(),
        spec: spec.flatten(),
        status: status.flatten(),
    })
}

fn decode_spec(v: &Json, path: &FieldPath, issues: &mut Issues) -> Option<TopologySpec> {
    let obj = object(v, path, issues)?;
    let defaults = present(obj, "defaults").and_then(|d| sparse::<TopologyNode>(d, &path.key("defaults"), issues));
    let nodes = list(obj, "nodes", path, issues, |n, p, iss| sparse::<TopologyNode>(n, p, iss));
    let links = list(obj, "links", path, issues, decode_link);
    let relationships = present(obj, "relationships")
        .map(|_| list(obj, "relationships", path, issues, |r, p, iss| element::<Relationship>(r, p, iss)));
    Some(TopologySpec { defaults, nodes, links, relationships })
}

fn decode_link(v: &Json, path: &FieldPath, issues: &mut Issues) -> Option<TopologyLink> {
    let obj = object(v, path, issues)?;
    let endpoints = present(obj, "endpoints")
        .map(|_| list(obj, "endpoints", path, issues, |e, p, iss| sparse::<TopologyEndpoint>(e, p, iss)));
    Some(TopologyLink { endpoints })
}

fn decode_status(v: &Json, path: &FieldPath, issues: &mut Issues) -> Option<TopologyStatus> {
    let obj = object(v, path, issues)?;
    let conditions = present(obj, "conditions")
        .map(|_| list(obj, "conditions", path, issues, |c, p, iss| element::<Condition>(c, p, iss)));
    Some(TopologyStatus { conditions })
}

/// `obj[key]` unless missing or null.
fn present<'a>(obj: &'a Map<String, Json>, key: &str) -> Option<&'a Json> {
    obj.get(key).filter(|v| !v.is_null())
}

fn object<'a>(v: &'a Json, path: &FieldPath, issues: &mut Issues) -> Option<&'a Map<String, Json>> {
    let obj = v.as_object();
    if obj.is_none() {
        issues.push(path.clone(), IssueKind::TypeError, format!("invalid type: {}, expected an object", describe(v)));
    }
    obj
}

/// Decode a scalar field; `Some(None)` when absent, `None` on a type error.
fn field<T: DeserializeOwned>(obj: &Map<String, Json>, key: &str, path: &FieldPath, issues: &mut Issues) -> Option<Option<T>> {
    match present(obj, key) {
        None => Some(None),
        Some(v) => element::<T>(v, &path.key(key), issues).map(Some),
    }
}

/// Decode every element of the list at `obj[key]`, in order. Elements that fail are dropped
/// after their issues are recorded; the result only matters when nothing failed.
fn list<T>(
    obj: &Map<String, Json>,
    key: &str,
    path: &FieldPath,
    issues: &mut Issues,
    decode_one: impl Fn(&Json, &FieldPath, &mut Issues) -> Option<T>,
) -> Vec<T> {
    let loc = path.key(key);
    match present(obj, key) {
        None => Vec::new(),
        Some(Json::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| decode_one(item, &loc.index(i), issues))
            .collect(),
        Some(other) => {
            issues.push(loc, IssueKind::TypeError, format!("invalid type: {}, expected a list", describe(other)));
            Vec::new()
        }
    }
}

/// Decode one value as a whole, reporting a failure at `path`.
fn element<T: DeserializeOwned>(v: &Json, path: &FieldPath, issues: &mut Issues) -> Option<T> {
    serde_json::from_value(v.clone())
        .map_err(|e| issues.push(path.clone(), IssueKind::TypeError, e.to_string()))
        .ok()
}

/// Decode an object whose fields are all optional. On failure every key is retried alone so
/// each bad field is reported at its own location.
fn sparse<T: DeserializeOwned>(v: &Json, path: &FieldPath, issues: &mut Issues) -> Option<T> {
    let obj = object(v, path, issues)?;
    match serde_json::from_value::<T>(v.clone()) {
        Ok(t) => Some(t),
        Err(whole) => {
            let mut local = Issues::new();
            for (key, value) in obj {
                let mut single = Map::new();
                single.insert(key.clone(), value.clone());
                if let Err(e) = serde_json::from_value::<T>(Json::Object(single)) {
                    local.push(path.key(key), IssueKind::TypeError, e.to_string());
                }
            }
            if local.is_empty() {
                local.push(path.clone(), IssueKind::TypeError, whole.to_string());
            }
            issues.absorb(local.into_errors());
            None
        }
    }
}

fn describe(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "list",
        Json::Object(_) => "object",
    }
}

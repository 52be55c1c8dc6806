//! Topo expand: turn a `Topology` document into concrete `Node` and `Link` resources.
//!
//! Expansion runs in three passes over one document:
//!
//! 1. **prepare**: merge `spec.defaults` into every node, rename `name` to
//!    `node`, fill engine defaults; wrap every link with `adminState = enable`.
//! 2. **validate**: check every prepared node, every link endpoint and the
//!    topology envelope, collecting *all* issues. Any issue fails the call.
//! 3. **construct**: only after a clean validation, build the resources with
//!    names derived from the topology name.
//!
//! Nothing is kept between calls and nothing is partially returned.

#![forbid(unsafe_code)]

pub mod decode;
pub mod topology;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use topo_core::meta::{child_meta, effective_namespace, require_name, validate_conditions, validate_object_meta};
use topo_core::{FieldPath, IssueKind, Issues, ValidationErrors};
use topo_schema::{AdminState, Link, LinkEndpoint, LinkSpec, Location, Node, NodeSpec, PhysicalInfraModel, PhysicalModel};
use tracing::{debug, info};

pub use decode::decode;
pub use topology::{Topology, TopologyEndpoint, TopologyLink, TopologyNode, TopologySpec, TopologyStatus};

pub const DEFAULT_SERIAL_NUMBER: &str = "dummy";
pub const DEFAULT_MANUFACTURER: &str = "Nokia";
pub const DEFAULT_ADMIN_STATE: AdminState = AdminState::Enabled;

/// Resources produced from one topology.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expansion {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl Expansion {
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() && self.links.is_empty() }
}

/// Node fields after the defaults merge, before they are checked as a `NodeSpec`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedNode {
    pub node: Option<String>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub type_: Option<String>,
    pub admin_state: Option<AdminState>,
    pub labels: Option<BTreeMap<String, String>>,
    pub provider: Option<String>,
    pub version: Option<String>,
    pub region: Option<String>,
    pub site: Option<String>,
    pub rack: Option<String>,
    pub position: Option<String>,
    pub location: Option<Location>,
}

impl PreparedNode {
    fn from_merged(n: TopologyNode) -> Self {
        Self {
            node: n.name,
            serial_number: Some(DEFAULT_SERIAL_NUMBER.to_string()),
            manufacturer: Some(DEFAULT_MANUFACTURER.to_string()),
            type_: n.type_,
            admin_state: Some(DEFAULT_ADMIN_STATE),
            labels: n.labels,
            provider: n.provider,
            version: n.version,
            region: n.region,
            site: n.site,
            rack: n.rack,
            position: n.position,
            location: n.location,
        }
    }

    /// Check the candidate as a complete `NodeSpec`, reporting under `path`.
    pub fn validate(&self, path: &FieldPath, issues: &mut Issues) -> Option<NodeSpec> {
        let before = issues.len();
        let node = required(&self.node, path, "node", issues);
        let serial_number = required(&self.serial_number, path, "serialNumber", issues);
        let manufacturer = required(&self.manufacturer, path, "manufacturer", issues);
        let type_ = required(&self.type_, path, "type", issues);
        let admin_state = required(&self.admin_state, path, "adminState", issues);

        let spec = NodeSpec {
            node: node?,
            infra: PhysicalInfraModel {
                model: PhysicalModel { serial_number: serial_number?, manufacturer: manufacturer?, purchase_date: None, type_: type_? },
                admin_state: admin_state?,
                relationships: None,
                labels: self.labels.clone(),
            },
            location: self.location.clone(),
            provider: self.provider.clone(),
            version: self.version.clone(),
            region: self.region.clone(),
            site: self.site.clone(),
            rack: self.rack.clone(),
            position: self.position.clone(),
        };
        spec.validate(path, issues);
        (issues.len() == before).then_some(spec)
    }
}

fn required<T: Clone>(v: &Option<T>, path: &FieldPath, key: &str, issues: &mut Issues) -> Option<T> {
    if v.is_none() {
        issues.missing(path.key(key));
    }
    v.clone()
}

/// A link ready for validation: the authored endpoints plus the engine admin state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedLink {
    pub endpoints: Option<Vec<TopologyEndpoint>>,
    pub admin_state: AdminState,
}

/// Merge defaults into every node of the topology, in document order.
pub fn prepare_nodes(spec: &TopologySpec) -> Vec<PreparedNode> {
    let empty = TopologyNode::default();
    let defaults = spec.defaults.as_ref().unwrap_or(&empty);
    spec.nodes.iter().map(|n| PreparedNode::from_merged(n.overlay(defaults))).collect()
}

/// Links do not inherit topology defaults; they only get the engine admin state.
pub fn prepare_links(spec: &TopologySpec) -> Vec<PreparedLink> {
    spec.links
        .iter()
        .map(|l| PreparedLink { endpoints: l.endpoints.clone(), admin_state: DEFAULT_ADMIN_STATE })
        .collect()
}

/// Validated specs, in document order, ready to be turned into resources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub name: String,
    pub namespace: String,
    pub nodes: Vec<NodeSpec>,
    pub links: Vec<LinkSpec>,
}

/// Validation pass: checks everything and reports every issue found.
pub fn validate(topology: &Topology) -> Result<Plan, ValidationErrors> {
    let mut issues = Issues::new();
    let root = FieldPath::root();

    let meta_path = root.key("metadata");
    validate_object_meta(&topology.metadata, &meta_path, &mut issues);
    let name = require_name(&topology.metadata, &meta_path, &mut issues).unwrap_or_default().to_string();
    if let Some(conds) = topology.status.as_ref().and_then(|s| s.conditions.as_deref()) {
        validate_conditions(conds, &root.key("status").key("conditions"), &mut issues);
    }

    let mut plan = Plan { name, namespace: effective_namespace(&topology.metadata).to_string(), ..Default::default() };

    if let Some(spec) = &topology.spec {
        let spec_path = root.key("spec");
        if let Some(rels) = spec.relationships.as_deref() {
            topo_schema::physical::validate_relationships(rels, &spec_path.key("relationships"), &mut issues);
        }
        plan.nodes = validate_nodes(spec, &spec_path.key("nodes"), &mut issues);
        plan.links = validate_links(spec, &spec_path.key("links"), &mut issues);
    }

    if !issues.is_empty() {
        debug!(errors = issues.len(), topology = %plan.name, "topology validation failed");
    }
    issues.finish()?;
    Ok(plan)
}

fn validate_nodes(spec: &TopologySpec, path: &FieldPath, issues: &mut Issues) -> Vec<NodeSpec> {
    let prepared = prepare_nodes(spec);
    debug!(count = prepared.len(), "prepared nodes");

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (i, n) in spec.nodes.iter().enumerate() {
        if let Some(name) = n.name.as_deref() {
            if let Some(first) = seen.insert(name, i) {
                issues.push(path.index(i).key("name"), IssueKind::Duplicate, format!("node {:?} already declared at index {}", name, first));
            }
        }
    }

    prepared
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.validate(&path.index(i), issues))
        .collect()
}

fn validate_links(spec: &TopologySpec, path: &FieldPath, issues: &mut Issues) -> Vec<LinkSpec> {
    // Endpoints reference nodes by their authored name, before any rename.
    let known: HashSet<&str> = spec.nodes.iter().filter_map(|n| n.name.as_deref()).collect();
    let prepared = prepare_links(spec);
    debug!(count = prepared.len(), "prepared links");

    let mut names: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(prepared.len());
    for (i, link) in prepared.into_iter().enumerate() {
        let link_path = path.index(i);
        let before = issues.len();
        let Some(spec) = validate_link(link, &link_path, &known, issues) else { continue };
        if let Some(first) = names.insert(spec.canonical_name(), i) {
            issues.push(link_path, IssueKind::Duplicate, format!("link {:?} already declared at index {}", spec.canonical_name(), first));
            continue;
        }
        if issues.len() == before {
            out.push(spec);
        }
    }
    out
}

fn validate_link(link: PreparedLink, path: &FieldPath, known: &HashSet<&str>, issues: &mut Issues) -> Option<LinkSpec> {
    let ep_path = path.key("endpoints");
    let Some(endpoints) = link.endpoints else {
        issues.missing(ep_path);
        return None;
    };
    if endpoints.len() != 2 {
        issues.push(ep_path, IssueKind::LengthMismatch, format!("ensure this list has exactly 2 items, got {}", endpoints.len()));
        return None;
    }

    let mut checked = Vec::with_capacity(2);
    for (j, ep) in endpoints.iter().enumerate() {
        let loc = ep_path.index(j);
        let converted = convert_endpoint(ep, &loc, issues);
        if let Some(node) = ep.node.as_deref() {
            if !known.contains(node) {
                issues.push(loc.key("node"), IssueKind::ReferentialIntegrity, format!("endpoint references unknown node: {}", node));
            }
        }
        checked.push(converted);
    }

    let b = checked.pop().flatten();
    let a = checked.pop().flatten();
    let mut spec = LinkSpec::new(a?, b?);
    spec.admin_state = link.admin_state;
    spec.validate(path, issues);
    Some(spec)
}

fn convert_endpoint(ep: &TopologyEndpoint, path: &FieldPath, issues: &mut Issues) -> Option<LinkEndpoint> {
    let before = issues.len();
    let node = required(&ep.node, path, "node", issues);
    let port = required(&ep.port, path, "port", issues).and_then(|v| id(v, &path.key("port"), issues));
    let module_bay = ep.module_bay.and_then(|v| id(v, &path.key("moduleBay"), issues));
    let module = ep.module.and_then(|v| id(v, &path.key("module"), issues));
    let endpoint = ep.endpoint.and_then(|v| id(v, &path.key("endpoint"), issues));
    if issues.len() != before {
        return None;
    }
    Some(LinkEndpoint { node: node?, module_bay, module, port: port?, adaptor: ep.adaptor.clone(), endpoint })
}

fn id(v: i64, loc: &FieldPath, issues: &mut Issues) -> Option<u32> {
    if !issues.non_negative(loc, v) {
        return None;
    }
    match u32::try_from(v) {
        Ok(v) => Some(v),
        Err(_) => {
            issues.push(loc.clone(), IssueKind::LessThanEqual, format!("ensure this value is less than or equal to {}", u32::MAX));
            None
        }
    }
}

/// Construction pass: build the resources of a validated plan.
pub fn construct(plan: Plan) -> Expansion {
    let Plan { name, namespace, nodes, links } = plan;
    let nodes: Vec<Node> = nodes
        .into_iter()
        .map(|spec| Node::new(child_meta(format!("{}.{}", name, spec.node), &namespace), spec))
        .collect();
    let links: Vec<Link> = links
        .into_iter()
        .map(|spec| Link::new(child_meta(format!("{}.{}", name, spec.canonical_name()), &namespace), spec))
        .collect();
    info!(topology = %name, namespace = %namespace, nodes = nodes.len(), links = links.len(), "topology expanded");
    Expansion { nodes, links }
}

/// Validate then construct. Either every resource is built or only the issues come back.
pub fn expand(topology: &Topology) -> Result<Expansion, ValidationErrors> {
    let plan = validate(topology)?;
    Ok(construct(plan))
}

impl Topology {
    pub fn expand(&self) -> Result<Expansion, ValidationErrors> {
        expand(self)
    }
}

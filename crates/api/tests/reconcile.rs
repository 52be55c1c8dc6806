#![forbid(unsafe_code)]

use serde_json::{json, Value};
use topo_api::{reconcile_wire, ReconcileConfig, Reconciler, TopologyReconciler};
use topo_core::IssueKind;

fn doc() -> Value {
    json!({
        "apiVersion": "topo.kubenet.dev/v1alpha1",
        "kind": "Topology",
        "metadata": {"name": "fabric1", "namespace": "prod"},
        "spec": {
            "defaults": {"type": "ixr-d3", "provider": "srlinux.nokia.com"},
            "nodes": [{"name": "leaf1"}, {"name": "spine1", "type": "ixr-d5"}],
            "links": [{"endpoints": [{"node": "leaf1", "port": 1}, {"node": "spine1", "port": 1}]}]
        }
    })
}

fn bytes(v: &Value) -> Vec<u8> {
    serde_json::to_vec(v).unwrap()
}

#[test]
fn success_carries_requeue_hint_and_children() {
    let wire = reconcile_wire(&TopologyReconciler::default(), &bytes(&doc())).unwrap();
    let v: Value = serde_json::from_str(&wire).unwrap();
    assert_eq!(v["requeue"], json!(false));
    assert_eq!(v["requeueAfter"], json!(30));
    let nodes = v["result"]["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0]["apiVersion"], "infra.kuid.dev/v1alpha1");
    assert_eq!(nodes[0]["kind"], "Node");
    assert_eq!(nodes[0]["metadata"]["name"], "fabric1.leaf1");
    assert_eq!(nodes[0]["spec"]["adminState"], "enable");
    assert_eq!(v["result"]["links"][0]["metadata"]["name"], "fabric1.leaf1.1.spine1.1");
}

#[test]
fn invalid_json_is_code_one() {
    let err = reconcile_wire(&TopologyReconciler::default(), b"{not json").unwrap_err();
    assert_eq!(err.code, 1);
    assert!(err.message.contains("invalid JSON"), "{}", err.message);
}

#[test]
fn non_object_root_is_code_one() {
    let err = TopologyReconciler::default().reconcile(b"[1, 2, 3]").unwrap_err();
    assert_eq!(err.code(), 1);
}

#[test]
fn type_errors_are_all_reported_with_their_location() {
    let mut d = doc();
    d["spec"]["nodes"] = json!([{"name": "leaf1", "region": 5}, {"name": "spine1"}, {"name": "leaf2", "type": 7}]);
    d["spec"]["links"][0]["endpoints"][1]["port"] = json!("one");
    let err = TopologyReconciler::default().reconcile(&bytes(&d)).unwrap_err();
    assert_eq!(err.code(), 2);
    let got: Vec<(String, IssueKind)> = err.issues().unwrap().iter().map(|e| (e.loc.to_string(), e.kind)).collect();
    assert_eq!(
        got,
        vec![
            ("spec.nodes.0.region".to_string(), IssueKind::TypeError),
            ("spec.nodes.2.type".to_string(), IssueKind::TypeError),
            ("spec.links.0.endpoints.1.port".to_string(), IssueKind::TypeError),
        ]
    );
}

#[test]
fn validation_reply_lists_every_issue() {
    let mut d = doc();
    d["spec"]["defaults"] = json!({});
    d["spec"]["links"][0]["endpoints"][1]["node"] = json!("spine9");
    let err = reconcile_wire(&TopologyReconciler::default(), &bytes(&d)).unwrap_err();
    assert_eq!(err.code, 2);
    assert!(err.message.contains("2 validation errors"), "{}", err.message);
    assert!(err.message.contains("spec.nodes.0.type"));
    assert!(err.message.contains("spec.links.0.endpoints.1.node"));
}

#[test]
fn missing_spec_yields_empty_result() {
    let out = TopologyReconciler::default().reconcile(br#"{"metadata": {"name": "fabric1"}}"#).unwrap();
    assert!(out.result.is_empty());
    assert!(!out.requeue);
}

#[test]
fn yaml_hosts_can_pass_a_decoded_value() {
    let out = TopologyReconciler::new(ReconcileConfig::default()).reconcile_value(doc()).unwrap();
    assert_eq!(out.result.nodes.len(), 2);
    assert_eq!(out.result.links.len(), 1);
}

#[test]
fn repeated_calls_produce_identical_bytes() {
    let r = TopologyReconciler::default();
    let input = bytes(&doc());
    assert_eq!(reconcile_wire(&r, &input).unwrap(), reconcile_wire(&r, &input).unwrap());
}

//! Resource envelope checks: object metadata, conditions, owner references and
//! the finalizer/deletion contract.

#![forbid(unsafe_code)]

use std::collections::HashSet;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, ObjectMeta, OwnerReference};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::issues::{FieldPath, IssueKind, Issues};

pub const DEFAULT_NAMESPACE: &str = "default";

pub const NAME_MAX_LEN: usize = 253;
pub const NAMESPACE_MAX_LEN: usize = 63;
pub const CONDITION_TYPE_MAX_LEN: usize = 316;
pub const CONDITION_REASON_MAX_LEN: usize = 1024;
pub const CONDITION_MESSAGE_MAX_LEN: usize = 32768;

pub const CONDITION_STATUSES: [&str; 3] = ["True", "False", "Unknown"];

static REASON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]([A-Za-z0-9_,:]*[A-Za-z0-9_])?$").unwrap()
});

static DNS_LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());

/// Namespace of the object, `"default"` when unset or empty.
pub fn effective_namespace(meta: &ObjectMeta) -> &str {
    match meta.namespace.as_deref() {
        Some(ns) if !ns.is_empty() => ns,
        _ => DEFAULT_NAMESPACE,
    }
}

/// Build metadata for a child object by name and namespace only.
pub fn child_meta(name: String, namespace: &str) -> ObjectMeta {
    ObjectMeta { name: Some(name), namespace: Some(namespace.to_string()), ..Default::default() }
}

/// Push a `missing` issue when `metadata.name` is unset; returns the name otherwise.
pub fn require_name<'a>(meta: &'a ObjectMeta, path: &FieldPath, issues: &mut Issues) -> Option<&'a str> {
    match meta.name.as_deref() {
        Some(n) => Some(n),
        None => {
            issues.missing(path.key("name"));
            None
        }
    }
}

/// Field constraints of `ObjectMeta` that hold for every resource kind.
pub fn validate_object_meta(meta: &ObjectMeta, path: &FieldPath, issues: &mut Issues) {
    if let Some(name) = meta.name.as_deref() {
        let loc = path.key("name");
        if issues.min_len(&loc, name, 1) {
            issues.max_len(&loc, name, NAME_MAX_LEN);
        }
    }

    if let Some(ns) = meta.namespace.as_deref().filter(|ns| !ns.is_empty()) {
        let loc = path.key("namespace");
        if issues.max_len(&loc, ns, NAMESPACE_MAX_LEN) && !DNS_LABEL_RE.is_match(ns) {
            issues.push(loc, IssueKind::StringPatternMismatch, "namespace must be a DNS-1123 label");
        }
    }

    if let Some(generation) = meta.generation {
        issues.non_negative(&path.key("generation"), generation);
    }

    if let Some(owners) = meta.owner_references.as_deref() {
        validate_owner_references(owners, &path.key("ownerReferences"), issues);
    }

    if let Some(finalizers) = meta.finalizers.as_deref() {
        let mut seen = HashSet::new();
        for (i, f) in finalizers.iter().enumerate() {
            if !seen.insert(f.as_str()) {
                issues.push(path.key("finalizers").index(i), IssueKind::Duplicate, format!("duplicate finalizer {:?}", f));
            }
        }
    }
}

/// Owner references are keyed by `uid`; at most one may be the managing controller.
pub fn validate_owner_references(owners: &[OwnerReference], path: &FieldPath, issues: &mut Issues) {
    let mut uids = HashSet::new();
    let mut controller_seen = false;
    for (i, o) in owners.iter().enumerate() {
        let loc = path.index(i);
        if o.uid.is_empty() {
            issues.missing(loc.key("uid"));
        } else if !uids.insert(o.uid.as_str()) {
            issues.push(loc.key("uid"), IssueKind::Duplicate, format!("duplicate owner reference uid {:?}", o.uid));
        }
        if o.controller == Some(true) {
            if controller_seen {
                issues.push(loc.key("controller"), IssueKind::ValueError, "only one owner reference can have controller set to true");
            }
            controller_seen = true;
        }
    }
}

/// Conditions form a list keyed by `type`.
pub fn validate_conditions(conditions: &[Condition], path: &FieldPath, issues: &mut Issues) {
    let mut types = HashSet::new();
    for (i, c) in conditions.iter().enumerate() {
        let loc = path.index(i);

        let type_loc = loc.key("type");
        if issues.min_len(&type_loc, &c.type_, 1) && issues.max_len(&type_loc, &c.type_, CONDITION_TYPE_MAX_LEN) && !types.insert(c.type_.as_str()) {
            issues.push(type_loc, IssueKind::Duplicate, format!("duplicate condition type {:?}", c.type_));
        }

        if !CONDITION_STATUSES.contains(&c.status.as_str()) {
            issues.push(loc.key("status"), IssueKind::Enum, "status must be one of True, False, Unknown");
        }

        let reason_loc = loc.key("reason");
        if issues.min_len(&reason_loc, &c.reason, 1)
            && issues.max_len(&reason_loc, &c.reason, CONDITION_REASON_MAX_LEN)
            && !REASON_RE.is_match(&c.reason)
        {
            issues.push(reason_loc, IssueKind::StringPatternMismatch, "reason must be a CamelCase token");
        }

        issues.max_len(&loc.key("message"), &c.message, CONDITION_MESSAGE_MAX_LEN);

        if let Some(g) = c.observed_generation {
            issues.non_negative(&loc.key("observedGeneration"), g);
        }
    }
}

/// A deletion was requested; the object lingers until its finalizers are gone.
pub fn is_pending_delete(meta: &ObjectMeta) -> bool {
    meta.deletion_timestamp.is_some()
}

/// The object is pending delete and no finalizer blocks its removal.
pub fn can_remove(meta: &ObjectMeta) -> bool {
    is_pending_delete(meta) && meta.finalizers.as_ref().map_or(true, |f| f.is_empty())
}

/// Add `finalizer` unless present. Entries can only be removed once deletion was requested.
pub fn add_finalizer(meta: &mut ObjectMeta, finalizer: &str) -> bool {
    if is_pending_delete(meta) {
        return false;
    }
    let list = meta.finalizers.get_or_insert_with(Vec::new);
    if list.iter().any(|f| f == finalizer) {
        return false;
    }
    list.push(finalizer.to_string());
    true
}

/// Remove `finalizer` wherever it sits in the list; order carries no meaning.
pub fn remove_finalizer(meta: &mut ObjectMeta, finalizer: &str) -> bool {
    let Some(list) = meta.finalizers.as_mut() else { return false };
    let before = list.len();
    list.retain(|f| f != finalizer);
    before != list.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    fn condition(type_: &str, status: &str, reason: &str) -> Condition {
        Condition {
            type_: type_.to_string(),
            status: status.to_string(),
            reason: reason.to_string(),
            message: String::new(),
            last_transition_time: Time(chrono_now()),
            observed_generation: None,
        }
    }

    fn chrono_now() -> k8s_openapi::chrono::DateTime<k8s_openapi::chrono::Utc> {
        k8s_openapi::chrono::Utc::now()
    }

    fn owner(uid: &str, controller: bool) -> OwnerReference {
        OwnerReference {
            api_version: "topo.kubenet.dev/v1alpha1".into(),
            kind: "Topology".into(),
            name: "fabric1".into(),
            uid: uid.into(),
            controller: Some(controller),
            block_owner_deletion: None,
        }
    }

    #[test]
    fn namespace_defaults_when_unset_or_empty() {
        let mut meta = ObjectMeta::default();
        assert_eq!(effective_namespace(&meta), "default");
        meta.namespace = Some(String::new());
        assert_eq!(effective_namespace(&meta), "default");
        meta.namespace = Some("prod".into());
        assert_eq!(effective_namespace(&meta), "prod");
    }

    #[test]
    fn object_meta_checks_collect_all() {
        let meta = ObjectMeta {
            name: Some(String::new()),
            namespace: Some("Not_A_Label".into()),
            generation: Some(-1),
            owner_references: Some(vec![owner("a", true), owner("a", false), owner("b", true)]),
            finalizers: Some(vec!["x".into(), "x".into()]),
            ..Default::default()
        };
        let mut issues = Issues::new();
        validate_object_meta(&meta, &FieldPath::root().key("metadata"), &mut issues);
        let errs = issues.into_errors();
        let locs: Vec<String> = errs.iter().map(|e| e.loc.to_string()).collect();
        assert_eq!(
            locs,
            vec![
                "metadata.name",
                "metadata.namespace",
                "metadata.generation",
                "metadata.ownerReferences.1.uid",
                "metadata.ownerReferences.2.controller",
                "metadata.finalizers.1",
            ]
        );
    }

    #[test]
    fn require_name_reports_missing() {
        let mut issues = Issues::new();
        assert!(require_name(&ObjectMeta::default(), &FieldPath::root().key("metadata"), &mut issues).is_none());
        let errs = issues.into_errors();
        assert_eq!(errs.0[0].loc.to_string(), "metadata.name");
        assert_eq!(errs.0[0].kind, IssueKind::Missing);
    }

    #[test]
    fn conditions_are_keyed_by_type() {
        let conds = vec![
            condition("Ready", "True", "Reconciled"),
            condition("Ready", "False", "Failed"),
            condition("Synced", "maybe", "not a token"),
            condition("Valid", "Unknown", "Pending:retry_1"),
        ];
        let mut issues = Issues::new();
        validate_conditions(&conds, &FieldPath::root().key("status").key("conditions"), &mut issues);
        let errs = issues.into_errors();
        let kinds: Vec<(String, IssueKind)> = errs.iter().map(|e| (e.loc.to_string(), e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("status.conditions.1.type".to_string(), IssueKind::Duplicate),
                ("status.conditions.2.status".to_string(), IssueKind::Enum),
                ("status.conditions.2.reason".to_string(), IssueKind::StringPatternMismatch),
            ]
        );
    }

    #[test]
    fn finalizers_block_removal_in_any_order() {
        let mut meta = ObjectMeta::default();
        assert!(add_finalizer(&mut meta, "a.example.com/cleanup"));
        assert!(add_finalizer(&mut meta, "b.example.com/cleanup"));
        assert!(!add_finalizer(&mut meta, "a.example.com/cleanup"));
        assert!(!can_remove(&meta));

        meta.deletion_timestamp = Some(Time(chrono_now()));
        assert!(is_pending_delete(&meta));
        assert!(!add_finalizer(&mut meta, "c.example.com/cleanup"));
        assert!(!can_remove(&meta));

        // second entry first: no ordering is enforced
        assert!(remove_finalizer(&mut meta, "b.example.com/cleanup"));
        assert!(!can_remove(&meta));
        assert!(remove_finalizer(&mut meta, "a.example.com/cleanup"));
        assert!(!remove_finalizer(&mut meta, "a.example.com/cleanup"));
        assert!(can_remove(&meta));
    }
}

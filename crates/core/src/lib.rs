//! Topo core: resource metadata kernel.
//!
//! The envelope types (`ObjectMeta`, `Condition`, `OwnerReference`, ...) are the
//! Kubernetes `meta/v1` types from `k8s-openapi`; this crate adds the field
//! constraints and the issue collector every other crate reports through.

#![forbid(unsafe_code)]

pub mod issues;
pub mod meta;

pub use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
pub use metav1::{Condition, ManagedFieldsEntry, ObjectMeta, OwnerReference, Time};

pub use issues::{FieldError, FieldPath, IssueKind, Issues, PathSegment, ValidationErrors};

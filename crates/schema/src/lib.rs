//! Topo schema: infra resources (`Node`, `Link`) and the value objects they are
//! composed of.
//!
//! Resources follow the Kubernetes envelope (`apiVersion`, `kind`, `metadata`,
//! `spec`, `status`) and implement [`kube::Resource`], so the usual
//! [`kube::ResourceExt`] accessors work on them.

#![forbid(unsafe_code)]

pub mod link;
pub mod location;
pub mod node;
pub mod physical;

pub use link::{Link, LinkEndpoint, LinkSpec, LinkStatus};
pub use location::Location;
pub use node::{Node, NodeSpec, NodeStatus};
pub use physical::{AdminState, PhysicalInfraModel, PhysicalModel, Relationship};

pub const INFRA_GROUP: &str = "infra.kuid.dev";
pub const INFRA_API_VERSION: &str = "infra.kuid.dev/v1alpha1";
pub const NODE_KIND: &str = "Node";
pub const LINK_KIND: &str = "Link";

/// Implement [`kube::Resource`] for a namespaced type with a `metadata: ObjectMeta` field.
///
/// Callers need `kube` and `k8s-openapi` in their own dependencies.
#[macro_export]
macro_rules! impl_namespaced_resource {
    ($ty:ty, group = $group:literal, version = $version:literal, kind = $kind:literal, plural = $plural:literal) => {
        impl ::kube::Resource for $ty {
            type DynamicType = ();
            type Scope = ::k8s_openapi::NamespaceResourceScope;

            fn kind(_: &()) -> ::std::borrow::Cow<'_, str> { $kind.into() }
            fn group(_: &()) -> ::std::borrow::Cow<'_, str> { $group.into() }
            fn version(_: &()) -> ::std::borrow::Cow<'_, str> { $version.into() }
            fn plural(_: &()) -> ::std::borrow::Cow<'_, str> { $plural.into() }

            fn meta(&self) -> &::k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta { &self.metadata }
            fn meta_mut(&mut self) -> &mut ::k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta { &mut self.metadata }
        }
    };
}

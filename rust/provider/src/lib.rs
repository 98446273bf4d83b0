//! The provider contract consumed by the link resolution engine.
//!
//! A provider owns a namespace of resource types (the substring of a type
//! string before its first `/`) and is asked two things by the engine: can a
//! resource of type A link to a resource of type B, and if so, what
//! [`LinkHandle`] should be attached to the edge. Providers, including those
//! loaded from plugins, are external collaborators: this crate only defines
//! the shape the engine expects of them, not any particular implementation.

use std::sync::Arc;

use common::async_trait::async_trait;
use common::eyre::Report;

mod registry;
#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use registry::{ProviderLookup, ProviderRegistry};

/// Whether a dependency must be resolved (and stable) before its dependent
/// can be created (`Hard`), or is only a data-flow relationship (`Soft`).
///
/// A cycle made up entirely of hard edges can never be deployed and is a
/// fatal error; a cycle containing at least one soft edge is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Hard,
    Soft,
}

/// A pluggable link implementation attached to an edge of the dependency
/// graph. The engine only ever calls [`LinkHandle::get_kind`]; everything
/// else about a link handle (the deployment-time logic it carries) is opaque
/// to it.
pub trait LinkHandle: Send + Sync {
    fn get_kind(&self) -> LinkKind;
}

/// The subset of a resource type's capabilities the engine needs.
///
/// A provider implementation will usually have a much larger trait for the
/// resource types it owns (`stage_changes`, `deploy`, `destroy`, and so on);
/// none of that belongs here, since the engine never calls it.
pub trait ResourceCapability: Send + Sync {
    /// The type strings this resource type is able to link to.
    fn can_link_to(&self) -> &[String];

    /// Whether this resource type is expected to commonly be a leaf of the
    /// dependency graph (e.g. an IAM policy), suppressing the "should this
    /// link to something?" warning for leaves of this type.
    fn is_common_terminal(&self) -> bool;

    /// The type string this capability describes.
    fn get_type(&self) -> &str;
}

/// Errors raised by a provider while answering `resource`/`link`. Providers
/// are external collaborators, so this is deliberately just a type alias for
/// a dynamic error: the engine propagates whatever a provider returns
/// unchanged rather than trying to classify it.
pub type ProviderError = Report;

/// A provider: owns a namespace of resource types and supplies link
/// implementations for ordered pairs of types within (or across) that
/// namespace.
#[async_trait]
pub trait Provider: Send + Sync {
    /// The namespace prefix this provider is registered under, e.g. `aws`.
    fn namespace(&self) -> &str;

    /// Look up the capability of a resource type. `None` if this provider
    /// does not recognise the type string.
    fn resource(&self, type_string: &str) -> Option<Arc<dyn ResourceCapability>>;

    /// Fetch the link implementation for an ordered pair of type strings.
    /// `Ok(None)` means "not implemented for this ordered pair", which is a
    /// distinct outcome from `can_link_to` reporting the pair as allowed:
    /// the combination of allowed-but-unimplemented is a contract violation
    /// the engine detects and rejects the blueprint for.
    async fn link(
        &self,
        type_a: &str,
        type_b: &str,
    ) -> Result<Option<Arc<dyn LinkHandle>>, ProviderError>;
}

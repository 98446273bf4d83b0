use std::collections::BTreeMap;

use common::serde::{self, Deserialize, Serialize};
use schemars::JsonSchema;

/// A blueprint document: a named set of resources.
///
/// Uses a [`BTreeMap`] so that fixtures and snapshot tests have a deterministic
/// base iteration order; the link resolution engine must not rely on this (see
/// the ordering guarantees in its own crate) since providers are free to return
/// their candidates/selectors in whatever order they were declared.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(crate = "common::serde")]
pub struct Blueprint {
    pub resources: BTreeMap<String, Resource>,
}

/// A single resource declared in a blueprint.
///
/// The engine only reads `resource_type`, `metadata` and `link_selector`; every
/// other field a resource may carry (deployment config, substitution
/// expressions, etc.) is opaque to it and is preserved verbatim in `extra` so
/// that round-tripping a blueprint through this crate does not lose data.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(crate = "common::serde")]
pub struct Resource {
    /// A namespaced type identifier, e.g. `aws/lambda/function`.
    #[serde(rename = "type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "linkSelector")]
    pub link_selector: Option<LinkSelector>,

    /// Everything else a resource declares that the engine does not read.
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: serde_json_value::Map,
}

impl Resource {
    /// The namespace prefix of this resource's type, i.e. everything before
    /// the first `/`. Resources with no `/` in their type are their own
    /// namespace (no provider will ever be registered under such a type in
    /// practice, so edge-probing such a resource simply finds no provider).
    pub fn namespace(&self) -> &str {
        self.resource_type
            .split_once('/')
            .map_or(self.resource_type.as_str(), |(namespace, _rest)| namespace)
    }

    pub fn metadata_labels(&self) -> &BTreeMap<String, String> {
        static EMPTY: BTreeMap<String, String> = BTreeMap::new();
        self.metadata
            .as_ref()
            .map_or(&EMPTY, |metadata| &metadata.labels)
    }

    pub fn selector_by_label(&self) -> &BTreeMap<String, String> {
        static EMPTY: BTreeMap<String, String> = BTreeMap::new();
        self.link_selector
            .as_ref()
            .map_or(&EMPTY, |selector| &selector.by_label)
    }
}

/// Metadata labels carried by a resource. Used by other resources' link
/// selectors to pick this resource as a link candidate.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(crate = "common::serde")]
pub struct Metadata {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// A resource's declared intent to link outward to whatever other resources
/// carry matching metadata labels.
///
/// Only the by-label form is currently supported; a blueprint author who
/// wants a resource to link to everything with `app: orderApi` writes
/// `linkSelector: { byLabel: { app: orderApi } }`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(crate = "common::serde")]
pub struct LinkSelector {
    #[serde(default, rename = "byLabel")]
    pub by_label: BTreeMap<String, String>,
}

/// A thin wrapper so the `extra` bag can skip `schemars` support (the
/// `serde_json::Map` does not implement `JsonSchema`) while keeping the field
/// itself a plain, flattened JSON object everywhere else.
mod serde_json_value {
    pub type Map = common::serde_json::Map<String, common::serde_json::Value>;
}

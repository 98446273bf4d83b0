//! Test doubles for crates that consume [`Provider`](crate::Provider), gated
//! behind the `test-utils` feature so they never ship in a release build.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use common::async_trait::async_trait;

use crate::{LinkHandle, LinkKind, Provider, ProviderError, ResourceCapability};

/// A fixed-kind [`LinkHandle`].
pub struct StubLink(pub LinkKind);

impl LinkHandle for StubLink {
    fn get_kind(&self) -> LinkKind {
        self.0
    }
}

/// A [`ResourceCapability`] built from literal fixture data.
pub struct StubCapability {
    pub type_string: String,
    pub can_link_to: Vec<String>,
    pub common_terminal: bool,
}

impl ResourceCapability for StubCapability {
    fn can_link_to(&self) -> &[String] {
        &self.can_link_to
    }

    fn is_common_terminal(&self) -> bool {
        self.common_terminal
    }

    fn get_type(&self) -> &str {
        &self.type_string
    }
}

/// A provider whose capability and link tables are populated directly by a
/// test, rather than by any real cloud-provider logic. Registered under
/// whatever namespace the test names in [`StubProvider::new`].
///
/// `link()` calls are counted so tests asserting on the engine's reuse guard
/// (scenario 8 of the testable properties) can confirm a provider is never
/// consulted twice after a build has already completed.
pub struct StubProvider {
    namespace: String,
    resources: HashMap<String, Arc<StubCapability>>,
    links: HashMap<(String, String), Arc<dyn LinkHandle>>,
    link_calls: Mutex<u64>,
}

impl StubProvider {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            resources: HashMap::new(),
            links: HashMap::new(),
            link_calls: Mutex::new(0),
        }
    }

    /// Register a resource type's capability.
    pub fn with_resource(
        mut self,
        type_string: &str,
        can_link_to: &[&str],
        common_terminal: bool,
    ) -> Self {
        self.resources.insert(
            type_string.to_string(),
            Arc::new(StubCapability {
                type_string: type_string.to_string(),
                can_link_to: can_link_to.iter().map(|s| s.to_string()).collect(),
                common_terminal,
            }),
        );
        self
    }

    /// Register a link implementation for an ordered type pair.
    pub fn with_link(mut self, type_a: &str, type_b: &str, kind: LinkKind) -> Self {
        self.links.insert(
            (type_a.to_string(), type_b.to_string()),
            Arc::new(StubLink(kind)),
        );
        self
    }

    pub fn link_call_count(&self) -> u64 {
        *self.link_calls.lock().expect("lock poisoned")
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn resource(&self, type_string: &str) -> Option<Arc<dyn ResourceCapability>> {
        self.resources
            .get(type_string)
            .map(|capability| capability.clone() as Arc<dyn ResourceCapability>)
    }

    async fn link(
        &self,
        type_a: &str,
        type_b: &str,
    ) -> Result<Option<Arc<dyn LinkHandle>>, ProviderError> {
        *self.link_calls.lock().expect("lock poisoned") += 1;
        Ok(self
            .links
            .get(&(type_a.to_string(), type_b.to_string()))
            .cloned())
    }
}

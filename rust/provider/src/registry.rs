use std::collections::HashMap;
use std::sync::Arc;

use crate::Provider;

/// Lookup of providers by the namespace they claim. Kept as a trait so the
/// engine can depend on it rather than on [`ProviderRegistry`] directly,
/// matching the provider/capability split: swapping in a different registry
/// implementation (say, one that lazily loads plugins) never touches engine
/// code.
pub trait ProviderLookup: Send + Sync {
    fn provider_for(&self, namespace: &str) -> Option<Arc<dyn Provider>>;
}

/// A static, in-memory registry of providers keyed by namespace.
///
/// Registration is last-write-wins: a provider registered after another with
/// the same namespace silently replaces it. This mirrors how the engine's
/// caller is expected to build the registry once at startup from a fixed
/// provider set, not how it should be used to hot-swap providers at runtime.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers
            .insert(provider.namespace().to_string(), provider);
    }

    pub fn get(&self, namespace: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(namespace).cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl ProviderLookup for ProviderRegistry {
    fn provider_for(&self, namespace: &str) -> Option<Arc<dyn Provider>> {
        self.get(namespace)
    }
}

impl FromIterator<Arc<dyn Provider>> for ProviderRegistry {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Provider>>>(iter: I) -> Self {
        let mut registry = Self::new();
        for provider in iter {
            registry.register(provider);
        }
        registry
    }
}

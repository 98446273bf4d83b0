use std::collections::HashSet;

use provider::ProviderLookup;

use crate::chain::NodeRef;

/// An advisory notice that a leaf resource's type is link-capable but the
/// resource itself has no outbound links — it probably should, but nothing
/// about the blueprint is actually invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub resource_name: String,
    pub resource_type: String,
}

/// Walk the final forest and emit one warning per leaf node whose provider
/// says its type is link-capable and not a common terminal (§4.6). A node is
/// only ever warned about once even if reachable via multiple roots/paths.
///
/// A successful build may still contain a soft cycle in `links_to` (it is a
/// legal outcome, not a bug — see `chain::ChainLinkNode`'s doc comment), so
/// this walk tracks the names currently on its own recursion stack and backs
/// off the moment it would re-enter one, the same way
/// `builder::rewrite_descendants` guards its descent.
pub fn collect(roots: &[NodeRef], providers: &dyn ProviderLookup) -> Vec<Warning> {
    let mut warned = HashSet::new();
    let mut warnings = Vec::new();
    for root in roots {
        let mut visiting = HashSet::new();
        walk(root, providers, &mut warned, &mut warnings, &mut visiting);
    }
    warnings
}

fn walk(
    node: &NodeRef,
    providers: &dyn ProviderLookup,
    warned: &mut HashSet<String>,
    warnings: &mut Vec<Warning>,
    visiting: &mut HashSet<String>,
) {
    let (name, resource_type, children) = {
        let node = node.borrow();
        (
            node.resource_name.clone(),
            node.resource.resource_type.clone(),
            node.links_to.clone(),
        )
    };

    if !visiting.insert(name.clone()) {
        return;
    }

    if children.is_empty() {
        if !warned.contains(&name) {
            let namespace = resource_type.split_once('/').map_or(resource_type.as_str(), |(ns, _)| ns);
            let should_warn = providers
                .provider_for(namespace)
                .and_then(|provider| provider.resource(&resource_type))
                .map(|capability| !capability.can_link_to().is_empty() && !capability.is_common_terminal())
                .unwrap_or(false);

            if should_warn {
                warned.insert(name.clone());
                warnings.push(Warning {
                    resource_name: name,
                    resource_type,
                });
            }
        }
    } else {
        for child in &children {
            walk(child, providers, warned, warnings, visiting);
        }
    }

    visiting.remove(&name);
}

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use blueprint::Blueprint;
use common::tokio_util::sync::CancellationToken;
use provider::ProviderLookup;

use crate::chain::{wire, ChainLinkNode, NodeRef};
use crate::cycle;
use crate::error::EngineError;
use crate::grouping::{self, SelectGroup};
use crate::probe::can_link;
use crate::warning;

/// Everything a successful build produces: the ordered chain-forest roots
/// and the warnings collected over the final (post-cleanup) shape.
pub struct BuildOutput {
    pub roots: Vec<NodeRef>,
    pub warnings: Vec<warning::Warning>,
}

fn check_cancelled(token: &CancellationToken) -> Result<(), EngineError> {
    if token.is_cancelled() {
        Err(EngineError::Cancelled)
    } else {
        Ok(())
    }
}

/// Look up or create the node for `name`, recording its creation order the
/// first time. Order matters only for the deterministic shape of the
/// returned root list; construction itself does not depend on it.
fn get_or_create(
    link_map: &mut HashMap<String, NodeRef>,
    creation_order: &mut Vec<String>,
    blueprint: &Blueprint,
    name: &str,
) -> NodeRef {
    if let Some(existing) = link_map.get(name) {
        return existing.clone();
    }
    let resource = Arc::new(blueprint.resources[name].clone());
    let node: NodeRef = Rc::new(RefCell::new(ChainLinkNode::new(name, resource)));
    link_map.insert(name.to_string(), node.clone());
    creation_order.push(name.to_string());
    node
}

/// Drives the Grouper's output through edge probing and wiring (§4.3),
/// cycle analysis (§4.4), and top-level cleanup (§4.5), returning the
/// resulting chain forest and its warnings, or a structured error.
pub async fn build(
    blueprint: &Blueprint,
    providers: &dyn ProviderLookup,
    token: &CancellationToken,
) -> Result<BuildOutput, EngineError> {
    let groups = grouping::group(blueprint);
    let mut link_map: HashMap<String, NodeRef> = HashMap::new();
    let mut creation_order: Vec<String> = Vec::new();

    for (selector_key, group) in &groups {
        for s_name in &group.selector_resources {
            check_cancelled(token)?;
            get_or_create(&mut link_map, &mut creation_order, blueprint, s_name);
            if let Err(mut err) = add_resource_chain(
                blueprint,
                providers,
                token,
                &groups,
                &mut link_map,
                &mut creation_order,
                s_name,
                selector_key,
                group,
            )
            .await
            {
                if let EngineError::MissingLinkImplementation { partial_roots, .. } = &mut err {
                    *partial_roots = snapshot_partial_roots(&creation_order, &link_map);
                }
                return Err(err);
            }
        }
    }

    for name in blueprint.resources.keys() {
        get_or_create(&mut link_map, &mut creation_order, blueprint, name);
    }

    // Every node starts out assuming it is a root (§4.3.3); a node gains a
    // real predecessor the moment something wires to it, regardless of
    // which pass over the grouping discovers that edge first. The
    // provisional root list is therefore just "every node created so far",
    // narrowed down below.
    let mut roots: Vec<NodeRef> = creation_order
        .iter()
        .map(|name| link_map[name].clone())
        .collect();

    let findings = cycle::analyse(&roots);
    let hard_cycles: Vec<_> = findings.iter().filter_map(|f| f.error.clone()).collect();

    let keep_visible: HashSet<String> = findings
        .iter()
        .filter(|f| f.error.is_some())
        .flat_map(|f| f.participants.clone())
        .collect();

    // §4.5 — demote any node that picked up a real predecessor from
    // whichever pass over the grouping discovered it, unless it is also a
    // hard-cycle participant kept visible for diagnostics.
    for name in &creation_order {
        let has_predecessor = link_map[name]
            .borrow()
            .linked_from
            .iter()
            .any(|weak| weak.upgrade().is_some());
        if has_predecessor && !keep_visible.contains(name) {
            demote(&mut roots, &link_map, name);
        }
    }

    if !hard_cycles.is_empty() {
        return Err(EngineError::CircularLinks {
            cycles: hard_cycles,
            partial_roots: roots,
        });
    }

    let warnings = warning::collect(&roots, providers);

    Ok(BuildOutput { roots, warnings })
}

/// Best-effort root list for a forest that is still under construction:
/// every node created so far with no real predecessor yet. Used only to
/// give a failing build's error something to show for diagnostics: unlike
/// the final `roots` computed after the full grouping pass and top-level
/// cleanup, this snapshot has not been checked for cycles and may still
/// contain nodes that a later pass would have demoted.
fn snapshot_partial_roots(
    creation_order: &[String],
    link_map: &HashMap<String, NodeRef>,
) -> Vec<NodeRef> {
    creation_order
        .iter()
        .filter(|name| {
            !link_map[name.as_str()]
                .borrow()
                .linked_from
                .iter()
                .any(|weak| weak.upgrade().is_some())
        })
        .map(|name| link_map[name.as_str()].clone())
        .collect()
}

/// §4.3.1 — wire a selector-resource's incoming edges (from selectors that
/// matched one of its own metadata labels) and outgoing edges (to every
/// candidate sharing the label this resource is being visited under).
#[allow(clippy::too_many_arguments)]
async fn add_resource_chain(
    blueprint: &Blueprint,
    providers: &dyn ProviderLookup,
    token: &CancellationToken,
    groups: &std::collections::BTreeMap<String, SelectGroup>,
    link_map: &mut HashMap<String, NodeRef>,
    creation_order: &mut Vec<String>,
    s_name: &str,
    selector_key: &str,
    group: &SelectGroup,
) -> Result<(), EngineError> {
    let s_type = blueprint.resources[s_name].resource_type.clone();

    for (key, value) in blueprint.resources[s_name].metadata_labels() {
        let own_label_key = format!("label::{key}:{value}");
        let Some(label_group) = groups.get(&own_label_key) else {
            continue;
        };
        for t_name in &label_group.selector_resources {
            let Some(t_node) = link_map.get(t_name).cloned() else {
                continue;
            };
            check_cancelled(token)?;
            let t_type = blueprint.resources[t_name].resource_type.clone();
            let probe = can_link(providers, &t_type, &s_type).await?;
            if probe.can_link_to {
                let Some(implementation) = probe.implementation else {
                    return Err(EngineError::MissingLinkImplementation {
                        from: t_name.clone(),
                        from_type: t_type,
                        to: s_name.to_string(),
                        to_type: s_type.clone(),
                        partial_roots: Vec::new(),
                    });
                };
                let s_node = get_or_create(link_map, creation_order, blueprint, s_name);
                wire(&t_node, &s_node);
                t_node
                    .borrow_mut()
                    .link_implementations
                    .insert(s_name.to_string(), implementation);
                t_node.borrow_mut().record_selector(own_label_key.as_str(), s_name);
            }
        }
    }

    let s_node = get_or_create(link_map, creation_order, blueprint, s_name);

    for c_name in &group.candidate_resources {
        if c_name == s_name {
            continue;
        }
        check_cancelled(token)?;
        let c_type = blueprint.resources[c_name].resource_type.clone();
        let probe = can_link(providers, &s_type, &c_type).await?;
        if probe.can_link_to {
            let Some(implementation) = probe.implementation else {
                return Err(EngineError::MissingLinkImplementation {
                    from: s_name.to_string(),
                    from_type: s_type.clone(),
                    to: c_name.clone(),
                    to_type: c_type,
                    partial_roots: Vec::new(),
                });
            };
            let c_node = get_or_create(link_map, creation_order, blueprint, c_name);
            wire(&s_node, &c_node);
            s_node
                .borrow_mut()
                .link_implementations
                .insert(c_name.clone(), implementation);
            s_node.borrow_mut().record_selector(selector_key, c_name);
        }
    }

    Ok(())
}

/// §4.5 — remove `name` from the provisional root list and rewrite the
/// materialised paths of its descendants that assumed it was a root.
fn demote(roots: &mut Vec<NodeRef>, link_map: &HashMap<String, NodeRef>, name: &str) {
    roots.retain(|node| node.borrow().resource_name != *name);

    let Some(node) = link_map.get(name) else {
        return;
    };
    let self_path = format!("/{name}");
    node.borrow_mut().paths.retain(|p| *p != self_path);

    let mut visiting = HashSet::new();
    visiting.insert(name.to_string());
    rewrite_descendants(node, &self_path, &mut visiting);
}

fn rewrite_descendants(node: &NodeRef, stale_prefix: &str, visiting: &mut HashSet<String>) {
    let inherited = node.borrow().paths.clone();
    let children = node.borrow().links_to.clone();

    for child in &children {
        let child_name = child.borrow().resource_name.clone();
        if visiting.contains(&child_name) {
            continue;
        }

        let mut child_mut = child.borrow_mut();
        let old_paths = child_mut.paths.clone();
        let mut new_paths: Vec<String> = Vec::new();
        for path in &old_paths {
            if let Some(rest) = path.strip_prefix(stale_prefix) {
                for base in &inherited {
                    let candidate = format!("{base}{rest}");
                    if !new_paths.contains(&candidate) {
                        new_paths.push(candidate);
                    }
                }
            } else if !new_paths.contains(path) {
                new_paths.push(path.clone());
            }
        }
        child_mut.paths = new_paths;
        drop(child_mut);

        visiting.insert(child_name.clone());
        rewrite_descendants(child, stale_prefix, visiting);
        visiting.remove(&child_name);
    }
}

use std::collections::HashSet;

use provider::LinkKind;

use crate::chain::NodeRef;
use crate::error::CircularLink;

/// One back-edge the depth-first walk closed. `error` is populated only when
/// every edge in the closing suffix was hard; a `None` entry records a
/// permitted soft cycle purely so callers can see it was found.
pub struct CycleFinding {
    pub participants: Vec<String>,
    pub error: Option<CircularLink>,
}

/// Depth-first walk of the provisional chain forest, classifying every back
/// edge as a hard (fatal) or soft (permitted) cycle, and direct vs indirect,
/// per §4.4. Traversal never re-enters a node through the edge that closed a
/// cycle, and never re-explores a node once fully visited.
pub fn analyse(roots: &[NodeRef]) -> Vec<CycleFinding> {
    let mut findings = Vec::new();
    let mut fully_done: HashSet<String> = HashSet::new();

    for root in roots {
        let mut names: Vec<String> = Vec::new();
        let mut kinds: Vec<LinkKind> = Vec::new();
        walk(root, &mut names, &mut kinds, &mut fully_done, &mut findings);
    }

    findings
}

fn walk(
    node: &NodeRef,
    names: &mut Vec<String>,
    kinds: &mut Vec<LinkKind>,
    fully_done: &mut HashSet<String>,
    findings: &mut Vec<CycleFinding>,
) {
    let name = node.borrow().resource_name.clone();
    if fully_done.contains(&name) {
        return;
    }

    names.push(name);
    let children = node.borrow().links_to.clone();

    for child in &children {
        let child_name = child.borrow().resource_name.clone();
        let kind = node
            .borrow()
            .link_implementations
            .get(&child_name)
            .map(|handle| handle.get_kind())
            .unwrap_or(LinkKind::Soft);

        if let Some(idx) = names.iter().position(|n| *n == child_name) {
            let mut suffix_kinds: Vec<LinkKind> = kinds[idx..].to_vec();
            suffix_kinds.push(kind);
            let hard = suffix_kinds.iter().all(|k| matches!(k, LinkKind::Hard));
            let direct = names.len() - idx <= 2;
            let participants: Vec<String> = names[idx..].to_vec();

            let error = hard.then(|| CircularLink {
                from: names.last().cloned().unwrap_or_default(),
                from_type: node.borrow().resource.resource_type.clone(),
                to: child_name.clone(),
                to_type: child.borrow().resource.resource_type.clone(),
                direct,
                participants: participants.clone(),
            });

            findings.push(CycleFinding {
                participants,
                error,
            });
            continue;
        }

        if fully_done.contains(&child_name) {
            continue;
        }

        kinds.push(kind);
        walk(child, names, kinds, fully_done, findings);
        kinds.pop();
    }

    let name = names.pop().expect("pushed at function entry");
    fully_done.insert(name);
}

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use blueprint::Resource;
use provider::LinkHandle;

/// A vertex of the output chain forest.
///
/// `links_to` owns its targets; `linked_from` is a non-owning mirror kept
/// only so a warning pass or a future consumer can walk backwards without
/// re-deriving the inverse index. Because soft cycles are a legal outcome of
/// a successful build, `links_to` can itself describe a genuine reference
/// cycle (A links to B and B links to A) — that is an accepted, short-lived
/// leak rather than a bug: the forest is owned for the lifetime of a single
/// `Engine::links` caller and dropped (process-wide, in the CLI) shortly
/// after it is read. Deriving [`Debug`] would walk straight into that cycle,
/// so it is implemented by hand to print only resource names.
pub struct ChainLinkNode {
    pub resource_name: String,
    pub resource: Arc<Resource>,
    pub selectors: HashMap<String, Vec<String>>,
    pub link_implementations: HashMap<String, Arc<dyn LinkHandle>>,
    pub links_to: Vec<Rc<RefCell<ChainLinkNode>>>,
    pub linked_from: Vec<Weak<RefCell<ChainLinkNode>>>,
    pub paths: Vec<String>,
}

impl ChainLinkNode {
    /// Every node starts out assuming it is a chain root — its only path is
    /// its own name — since at creation time the builder does not yet know
    /// whether some other resource will later turn out to link to it. If one
    /// does, `wire` layers real paths on top of this one; top-level cleanup
    /// (§4.5) is what later strips the assumed self-path from any node that
    /// turned out not to be a root after all.
    pub fn new(name: &str, resource: Arc<Resource>) -> Self {
        Self {
            resource_name: name.to_string(),
            resource,
            selectors: HashMap::new(),
            link_implementations: HashMap::new(),
            links_to: Vec::new(),
            linked_from: Vec::new(),
            paths: vec![format!("/{name}")],
        }
    }

    /// Add `path` to this node's materialised paths if not already present.
    /// Per §4.3.3, comparison is by `/`-separated segment equality rather
    /// than substring search, so a name that is a textual suffix of another
    /// (`table` inside `ordersTable`) can never cause a false-positive skip.
    pub fn add_path(&mut self, path: &str) {
        let segments: Vec<&str> = path.split('/').collect();
        let already_present = self
            .paths
            .iter()
            .any(|existing| existing.split('/').collect::<Vec<&str>>() == segments);
        if !already_present {
            self.paths.push(path.to_string());
        }
    }

    pub fn record_selector(&mut self, selector_key: &str, linked_name: &str) {
        let names = self.selectors.entry(selector_key.to_string()).or_default();
        if !names.iter().any(|n| n == linked_name) {
            names.push(linked_name.to_string());
        }
    }
}

impl fmt::Debug for ChainLinkNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainLinkNode")
            .field("resource_name", &self.resource_name)
            .field("selectors", &self.selectors)
            .field(
                "links_to",
                &self
                    .links_to
                    .iter()
                    .map(|n| n.borrow().resource_name.clone())
                    .collect::<Vec<_>>(),
            )
            .field(
                "linked_from",
                &self
                    .linked_from
                    .iter()
                    .filter_map(|n| n.upgrade())
                    .map(|n| n.borrow().resource_name.clone())
                    .collect::<Vec<_>>(),
            )
            .field("paths", &self.paths)
            .finish()
    }
}

pub type NodeRef = Rc<RefCell<ChainLinkNode>>;

/// Wire `from -> to`: appends the owning forward edge, the non-owning back
/// edge, and extends `to`'s materialised paths with every one of `from`'s
/// paths plus `to`'s own name. Idempotent: re-wiring an already-wired pair
/// is a no-op on `links_to`/`linked_from` (paths are still merged, since a
/// newly discovered route to an already-linked node is still a real route).
pub fn wire(from: &NodeRef, to: &NodeRef) {
    let already_wired = from
        .borrow()
        .links_to
        .iter()
        .any(|n| Rc::ptr_eq(n, to));
    if !already_wired {
        from.borrow_mut().links_to.push(to.clone());
        to.borrow_mut().linked_from.push(Rc::downgrade(from));
    }

    let from_paths = from.borrow().paths.clone();
    let to_name = to.borrow().resource_name.clone();
    for parent_path in from_paths {
        to.borrow_mut().add_path(&format!("{parent_path}/{to_name}"));
    }
}

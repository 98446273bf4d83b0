use std::collections::BTreeMap;

use blueprint::Blueprint;

/// The two roles a resource can play within a selector-key bucket: it is a
/// `selector` if its link-selector clause names the key, and a `candidate`
/// if its metadata labels carry the key.
#[derive(Debug, Clone, Default)]
pub struct SelectGroup {
    pub selector_resources: Vec<String>,
    pub candidate_resources: Vec<String>,
}

/// Bin every resource of a blueprint into selector groups keyed by
/// `label::<key>:<value>`. Iteration order of the result mirrors the
/// blueprint's resource map and carries no further guarantee (§4.1).
pub fn group(blueprint: &Blueprint) -> BTreeMap<String, SelectGroup> {
    let mut groups: BTreeMap<String, SelectGroup> = BTreeMap::new();

    for (name, resource) in &blueprint.resources {
        for (key, value) in resource.selector_by_label() {
            groups
                .entry(selector_key(key, value))
                .or_default()
                .selector_resources
                .push(name.clone());
        }
        for (key, value) in resource.metadata_labels() {
            groups
                .entry(selector_key(key, value))
                .or_default()
                .candidate_resources
                .push(name.clone());
        }
    }

    groups
}

fn selector_key(key: &str, value: &str) -> String {
    format!("label::{key}:{value}")
}

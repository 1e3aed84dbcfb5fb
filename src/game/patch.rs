//! Dotted-path property patching over JSON object graphs
//!
//! Partial-update messages address state with dotted paths like
//! `state.position.x`. This module is used on both sides of that contract: the
//! asset loaders build nested client payloads with it, and clients (and tests)
//! apply received patches with it.

use serde_json::{Map, Value};

use crate::ws::protocol::Properties;

/// Assign `value` at `path` inside `root`, creating missing intermediate
/// objects along the way. Intermediates are always objects, never arrays; a
/// pre-existing non-object intermediate is overwritten. Paths are
/// additive/overwrite-only - there is no removal operation.
pub fn set(root: &mut Value, path: &str, value: Value) {
    let mut node = root;
    let mut rest = path;

    while let Some((head, tail)) = rest.split_once('.') {
        node = as_object(node)
            .entry(head.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        rest = tail;
    }

    as_object(node).insert(rest.to_string(), value);
}

/// Apply every dotted-path entry of a partial update to `root`.
pub fn apply(root: &mut Value, properties: &Properties) {
    for (path, value) in properties {
        set(root, path, value.clone());
    }
}

fn as_object(node: &mut Value) -> &mut Map<String, Value> {
    if !matches!(node, Value::Object(_)) {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn creates_missing_intermediates() {
        let mut root = json!({});
        set(&mut root, "state.position.x", json!(105));
        assert_eq!(root, json!({"state": {"position": {"x": 105}}}));
    }

    #[test]
    fn preserves_existing_siblings() {
        let mut root = json!({"state": {"position": {"x": 1, "y": 2}, "name": "bunny"}});
        set(&mut root, "state.position.x", json!(6));
        assert_eq!(
            root,
            json!({"state": {"position": {"x": 6, "y": 2}, "name": "bunny"}})
        );
    }

    #[test]
    fn applying_same_patch_twice_is_idempotent() {
        let mut once = json!({"state": {"state": "idle"}});
        let mut twice = once.clone();

        let mut properties = Properties::new();
        properties.insert("state.state".to_string(), json!("walking"));
        properties.insert("state.motionIndex".to_string(), json!(3));

        apply(&mut once, &properties);
        apply(&mut twice, &properties);
        apply(&mut twice, &properties);

        assert_eq!(once, twice);
    }

    #[test]
    fn overwrites_non_object_intermediate() {
        let mut root = json!({"state": 7});
        set(&mut root, "state.position.x", json!(1));
        assert_eq!(root, json!({"state": {"position": {"x": 1}}}));
    }

    #[test]
    fn single_segment_path_assigns_at_root() {
        let mut root = json!({"name": "old"});
        set(&mut root, "name", json!("new"));
        assert_eq!(root, json!({"name": "new"}));
    }
}

//! Recursive traversal over a configuration tree.

use crate::{instance::ConfigInstance, value::Value};

/// Visits `root`, then every configuration instance reachable through its
/// stored values: direct `Config` values, `Config` values inside maps, and
/// `Config` elements inside sequences. Other value kinds are ignored.
/// Sibling order follows parameter declaration order.
pub fn walk_tree<F: FnMut(&ConfigInstance)>(root: &ConfigInstance, visit: &mut F) {
    visit(root);
    for (_, value) in root.entries() {
        match value {
            Value::Config(child) => walk_tree(child, visit),
            Value::Map(entries) => {
                for v in entries.values() {
                    if let Value::Config(child) = v {
                        walk_tree(child, visit);
                    }
                }
            },
            Value::Seq(items) => {
                for v in items {
                    if let Value::Config(child) = v {
                        walk_tree(child, visit);
                    }
                }
            },
            _ => {},
        }
    }
}

/// Runs every visited instance's validator and returns the collected
/// messages, in visit order.
#[must_use]
pub fn collect_errors(root: &ConfigInstance) -> Vec<String> {
    let mut errors = Vec::new();
    walk_tree(root, &mut |conf| conf.run_validate(&mut errors));
    errors
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::{collections::BTreeMap, sync::Arc};

    use super::*;
    use crate::schema::Schema;

    fn leaf_schema() -> Arc<Schema> {
        Schema::builder("leaf")
            .param("name")
            .validate(|conf, errors| {
                if conf.get("name").is_ok_and(|v| v.is_null()) {
                    errors.push("name must be set".into());
                }
            })
            .build()
            .unwrap()
    }

    fn leaf(schema: &Arc<Schema>, name: Option<&str>) -> ConfigInstance {
        let mut conf = ConfigInstance::new(schema);
        if let Some(n) = name {
            conf.set("name", n).unwrap();
        }
        conf
    }

    #[test]
    fn reaches_instances_in_direct_map_and_seq_positions() {
        let leaf_s = leaf_schema();
        let root_s = Schema::builder("root")
            .param("direct")
            .param("by_key")
            .param("listed")
            .param("scalar")
            .build()
            .unwrap();

        let mut root = ConfigInstance::new(&root_s);
        root.set("direct", leaf(&leaf_s, Some("a"))).unwrap();
        root.set(
            "by_key",
            Value::Map(BTreeMap::from([
                ("x".to_string(), Value::from(leaf(&leaf_s, None))),
                ("y".to_string(), Value::Int(1)),
            ])),
        )
        .unwrap();
        root.set(
            "listed",
            Value::Seq(vec![
                Value::from(leaf(&leaf_s, Some("b"))),
                Value::Str("ignored".into()),
                Value::from(leaf(&leaf_s, None)),
            ]),
        )
        .unwrap();
        root.set("scalar", 42).unwrap();

        let mut visited = 0;
        walk_tree(&root, &mut |_| visited += 1);
        assert_eq!(visited, 5);

        let errors = collect_errors(&root);
        assert_eq!(errors, ["name must be set", "name must be set"]);
    }

    #[test]
    fn parent_links_are_not_traversed() {
        let leaf_s = leaf_schema();
        let parent = leaf(&leaf_s, None);
        let mut child = ConfigInstance::with_parent(&leaf_s, Value::from(parent)).unwrap();
        child.set("name", "ok").unwrap();

        // The unset parent would push an error if it were visited.
        assert!(collect_errors(&child).is_empty());
    }
}

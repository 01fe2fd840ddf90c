//! Case outline builder
//!
//! An `outline:<id>` search returns a flat list of cases. This module
//! rebuilds the parent/child forest from `ixBug`/`ixBugParent`.
//!
//! Nodes whose parent is missing from the result become forest roots. A
//! malformed response whose parent links form a loop would otherwise leave
//! those nodes unreachable; they are promoted to roots instead, cutting the
//! loop at the first node seen, so every case appears exactly once.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::normalize::id_field;

/// One case in the outline tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineNode {
    #[serde(rename = "ixBug")]
    pub ix_bug: i64,
    #[serde(rename = "ixBugParent")]
    pub ix_bug_parent: Option<i64>,
    #[serde(rename = "sTitle")]
    pub title: Value,
    #[serde(rename = "sStatus")]
    pub status: Value,
    #[serde(rename = "sPersonAssignedTo")]
    pub assigned_to: Value,
    #[serde(rename = "dtLastUpdated")]
    pub last_updated: Value,
    #[serde(rename = "sProject", skip_serializing_if = "Option::is_none")]
    pub project: Option<Value>,
    #[serde(rename = "sArea", skip_serializing_if = "Option::is_none")]
    pub area: Option<Value>,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    fn from_case(ix_bug: i64, item: &Value) -> Self {
        let text = |key: &str| {
            item.get(key)
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| Value::String(String::new()))
        };
        let optional = |key: &str| item.get(key).filter(|v| !v.is_null()).cloned();
        Self {
            ix_bug,
            ix_bug_parent: id_field(item, "ixBugParent", None),
            title: text("sTitle"),
            status: text("sStatus"),
            assigned_to: text("sPersonAssignedTo"),
            last_updated: text("dtLastUpdated"),
            project: optional("sProject"),
            area: optional("sArea"),
            children: Vec::new(),
        }
    }

    /// Depth-first search for a case id within this subtree
    pub fn find(&self, ix_bug: i64) -> Option<&OutlineNode> {
        if self.ix_bug == ix_bug {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(ix_bug))
    }

    /// Number of nodes in this subtree, itself included
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::size).sum::<usize>()
    }
}

/// Result of [`build_outline`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outline {
    /// The requested case, else the first root, else nothing
    #[serde(rename = "outline")]
    pub root: Option<OutlineNode>,
    pub forest: Vec<OutlineNode>,
    pub total: usize,
}

/// Build the outline forest for `requested` from a flat case list.
///
/// Items without a resolvable `ixBug` are skipped. A later item with the
/// same id replaces an earlier one but keeps its position.
pub fn build_outline(cases: &[&Value], requested: i64) -> Outline {
    let mut nodes: Vec<OutlineNode> = Vec::new();
    let mut index_of: HashMap<i64, usize> = HashMap::new();

    for item in cases {
        let Some(id) = id_field(item, "ixBug", None) else {
            continue;
        };
        let node = OutlineNode::from_case(id, item);
        match index_of.get(&id) {
            Some(&idx) => nodes[idx] = node,
            None => {
                index_of.insert(id, nodes.len());
                nodes.push(node);
            }
        }
    }

    let mut children_of: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut roots: Vec<usize> = Vec::new();
    for (idx, node) in nodes.iter().enumerate() {
        // FogBugz reports "0" for cases without a parent
        let parent = node.ix_bug_parent.filter(|p| *p != 0);
        match parent.and_then(|p| index_of.get(&p)) {
            Some(&parent) => children_of.entry(parent).or_default().push(idx),
            None => roots.push(idx),
        }
    }

    let mut visited: HashSet<usize> = HashSet::new();
    let mut forest: Vec<OutlineNode> = roots
        .into_iter()
        .map(|idx| materialize(idx, &nodes, &children_of, &mut visited))
        .collect();

    // Anything still unvisited sits on a parent cycle with no root above it
    for idx in 0..nodes.len() {
        if !visited.contains(&idx) {
            tracing::warn!(
                ix_bug = nodes[idx].ix_bug,
                "Cyclic parent chain in outline; treating case as a root"
            );
            forest.push(materialize(idx, &nodes, &children_of, &mut visited));
        }
    }

    let root = forest
        .iter()
        .find_map(|tree| tree.find(requested))
        .or_else(|| forest.first())
        .cloned();

    Outline {
        root,
        forest,
        total: nodes.len(),
    }
}

fn materialize(
    idx: usize,
    nodes: &[OutlineNode],
    children_of: &HashMap<usize, Vec<usize>>,
    visited: &mut HashSet<usize>,
) -> OutlineNode {
    visited.insert(idx);
    let mut node = nodes[idx].clone();
    if let Some(children) = children_of.get(&idx) {
        for &child in children {
            if visited.contains(&child) {
                continue;
            }
            node.children
                .push(materialize(child, nodes, children_of, visited));
        }
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outline_of(cases: &[Value], requested: i64) -> Outline {
        let refs: Vec<&Value> = cases.iter().collect();
        build_outline(&refs, requested)
    }

    #[test]
    fn test_builds_parent_child_tree() {
        let cases = vec![
            json!({"ixBug": "1", "ixBugParent": "0", "sTitle": "Epic"}),
            json!({"ixBug": "2", "ixBugParent": "1", "sTitle": "Story"}),
            json!({"ixBug": "3", "ixBugParent": "2", "sTitle": "Task"}),
            json!({"ixBug": "4", "ixBugParent": "1", "sTitle": "Story 2"}),
        ];
        let outline = outline_of(&cases, 1);

        assert_eq!(outline.total, 4);
        assert_eq!(outline.forest.len(), 1);
        let root = outline.root.unwrap();
        assert_eq!(root.ix_bug, 1);
        assert_eq!(root.ix_bug_parent, Some(0));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].children[0].ix_bug, 3);
        assert_eq!(root.size(), 4);
    }

    #[test]
    fn test_orphans_become_roots() {
        let cases = vec![
            json!({"ixBug": "10", "ixBugParent": "99"}),
            json!({"ixBug": "11", "ixBugParent": "10"}),
            json!({"ixBug": "12"}),
        ];
        let outline = outline_of(&cases, 500);
        let roots: Vec<i64> = outline.forest.iter().map(|n| n.ix_bug).collect();
        assert_eq!(roots, vec![10, 12]);
        // Requested id absent: first root wins
        assert_eq!(outline.root.unwrap().ix_bug, 10);
    }

    #[test]
    fn test_requested_node_can_be_nested() {
        let cases = vec![
            json!({"ixBug": "1"}),
            json!({"ixBug": "2", "ixBugParent": "1"}),
        ];
        let outline = outline_of(&cases, 2);
        assert_eq!(outline.root.unwrap().ix_bug, 2);
    }

    #[test]
    fn test_skips_items_without_id() {
        let cases = vec![json!({"sTitle": "no id"}), json!({"ixBug": "x"}), json!({"ixBug": ["5"]})];
        let outline = outline_of(&cases, 5);
        assert_eq!(outline.total, 1);
        assert_eq!(outline.root.unwrap().ix_bug, 5);
    }

    #[test]
    fn test_empty_input() {
        let outline = outline_of(&[], 1);
        assert_eq!(outline.total, 0);
        assert!(outline.forest.is_empty());
        assert!(outline.root.is_none());
    }

    #[test]
    fn test_cycles_are_broken() {
        let cases = vec![
            json!({"ixBug": "1", "ixBugParent": "2"}),
            json!({"ixBug": "2", "ixBugParent": "1"}),
            json!({"ixBug": "3", "ixBugParent": "3"}),
        ];
        let outline = outline_of(&cases, 1);
        assert_eq!(outline.total, 3);
        let counted: usize = outline.forest.iter().map(OutlineNode::size).sum();
        assert_eq!(counted, 3);
        assert_eq!(outline.forest[0].ix_bug, 1);
        assert_eq!(outline.forest[0].children[0].ix_bug, 2);
    }

    #[test]
    fn test_serialized_shape() {
        let cases = vec![json!({"ixBug": "1", "sTitle": "T", "sProject": "Core"})];
        let value = serde_json::to_value(outline_of(&cases, 1)).unwrap();
        assert_eq!(value["outline"]["ixBug"], 1);
        assert_eq!(value["outline"]["ixBugParent"], Value::Null);
        assert_eq!(value["outline"]["sStatus"], "");
        assert_eq!(value["outline"]["sProject"], "Core");
        assert!(value["outline"].get("sArea").is_none());
        assert_eq!(value["total"], 1);
    }

    #[test]
    fn test_zero_parent_is_kept_as_zero() {
        let cases = vec![
            json!({"ixBug": "1", "ixBugParent": "0"}),
            json!({"ixBug": "2", "ixBugParent": "1"}),
        ];
        let outline = outline_of(&cases, 1);
        assert_eq!(outline.forest.len(), 1);

        let value = serde_json::to_value(&outline).unwrap();
        assert_eq!(value["outline"]["ixBugParent"], 0);
        assert_eq!(value["outline"]["children"][0]["ixBugParent"], 1);
    }
}

// ── Result tree ──
//
// Groups a flat list of results by schema ancestry below the walk root.
// Built incrementally: inserting batch by batch yields the same tree as
// inserting everything at once. Collapsed branches are remembered by
// name path, so a rebuild keeps the user's expand/collapse state.

use std::collections::HashSet;

use oidscope_api::Oid;
use oidscope_api::oid::format_arcs;

use crate::model::SnmpResult;
use crate::schema::{Schema, SchemaNode};

/// One node in the result tree. Leaves carry a result; branches carry
/// children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    /// Full OID of a leaf's result.
    pub oid: Option<Oid>,
    /// Schema node a branch stands for; `None` for leaves and flat entries.
    pub schema_oid: Option<Oid>,
    pub result: Option<SnmpResult>,
    pub children: Vec<TreeNode>,
    pub expanded: bool,
}

impl TreeNode {
    fn branch(node: &SchemaNode, expanded: bool) -> Self {
        Self {
            name: node.name.clone(),
            oid: None,
            schema_oid: Some(node.oid.clone()),
            result: None,
            children: Vec::new(),
            expanded,
        }
    }

    fn leaf(name: String, result: &SnmpResult) -> Self {
        Self {
            name,
            oid: Some(result.oid.clone()),
            schema_oid: None,
            result: Some(result.clone()),
            children: Vec::new(),
            expanded: false,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.result.is_some()
    }

    /// Leaves in this subtree.
    pub fn result_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(TreeNode::result_count).sum()
        }
    }
}

/// A visible row of the flattened tree.
#[derive(Debug, Clone)]
pub struct TreeRow<'a> {
    /// Child indices from the root; pass to [`ResultTree::toggle`].
    pub path: Vec<usize>,
    pub depth: usize,
    pub has_children: bool,
    pub node: &'a TreeNode,
}

/// Results grouped by schema ancestry.
#[derive(Debug, Clone, Default)]
pub struct ResultTree {
    children: Vec<TreeNode>,
    walk_root: Option<Oid>,
    collapsed: HashSet<Vec<String>>,
}

impl ResultTree {
    pub fn new(walk_root: Option<Oid>) -> Self {
        Self {
            children: Vec::new(),
            walk_root,
            collapsed: HashSet::new(),
        }
    }

    pub fn build(results: &[SnmpResult], walk_root: Option<Oid>, schema: &dyn Schema) -> Self {
        let mut tree = Self::new(walk_root);
        tree.extend(results, schema);
        tree
    }

    pub fn extend(&mut self, results: &[SnmpResult], schema: &dyn Schema) {
        for result in results {
            self.insert(result, schema);
        }
    }

    /// Discard the nodes and re-insert `results`, keeping collapsed state.
    pub fn rebuild(&mut self, results: &[SnmpResult], schema: &dyn Schema) {
        self.children.clear();
        self.extend(results, schema);
    }

    pub fn walk_root(&self) -> Option<&Oid> {
        self.walk_root.as_ref()
    }

    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn insert(&mut self, result: &SnmpResult, schema: &dyn Schema) {
        let Some(node) = schema.longest_prefix(&result.oid) else {
            self.children.push(TreeNode::leaf(result.name.clone(), result));
            return;
        };

        let groups = group_path(node, self.walk_root.as_ref(), schema);
        let mut names: Vec<String> = Vec::with_capacity(groups.len() + 1);
        let mut level = &mut self.children;
        for group in groups {
            names.push(group.name.clone());
            let expanded = !self.collapsed.contains(&names);
            level = branch_children(level, group, expanded);
        }

        match result.oid.strip_prefix(&node.oid) {
            Some(suffix) if !suffix.is_empty() => {
                names.push(node.name.clone());
                let expanded = !self.collapsed.contains(&names);
                let column = branch_children(level, node, expanded);
                column.push(TreeNode::leaf(format_arcs(suffix), result));
            }
            _ => level.push(TreeNode::leaf(node.name.clone(), result)),
        }
    }

    /// Flip a branch. Returns `false` if `path` names no branch.
    pub fn toggle(&mut self, path: &[usize]) -> bool {
        let Some(expanded) = self.node(path).map(|n| n.expanded) else {
            return false;
        };
        self.set_expanded(path, !expanded)
    }

    pub fn set_expanded(&mut self, path: &[usize], expanded: bool) -> bool {
        let Some(names) = self.name_path(path) else {
            return false;
        };
        let Some(node) = self.node_mut(path) else {
            return false;
        };
        if node.children.is_empty() {
            return false;
        }
        node.expanded = expanded;
        if expanded {
            self.collapsed.remove(&names);
        } else {
            self.collapsed.insert(names);
        }
        true
    }

    pub fn node(&self, path: &[usize]) -> Option<&TreeNode> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.children.get(*first)?, |n, &i| n.children.get(i))
    }

    fn node_mut(&mut self, path: &[usize]) -> Option<&mut TreeNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get_mut(*first)?;
        for &i in rest {
            node = node.children.get_mut(i)?;
        }
        Some(node)
    }

    fn name_path(&self, path: &[usize]) -> Option<Vec<String>> {
        let mut names = Vec::with_capacity(path.len());
        let mut level = &self.children;
        for &i in path {
            let node = level.get(i)?;
            names.push(node.name.clone());
            level = &node.children;
        }
        Some(names)
    }

    /// Depth-first listing of the visible nodes.
    pub fn rows(&self) -> Vec<TreeRow<'_>> {
        fn visit<'a>(node: &'a TreeNode, path: &mut Vec<usize>, rows: &mut Vec<TreeRow<'a>>) {
            let has_children = !node.children.is_empty();
            rows.push(TreeRow {
                path: path.clone(),
                depth: path.len() - 1,
                has_children,
                node,
            });
            if node.expanded && has_children {
                for (i, child) in node.children.iter().enumerate() {
                    path.push(i);
                    visit(child, path, rows);
                    path.pop();
                }
            }
        }

        let mut rows = Vec::new();
        let mut path = Vec::new();
        for (i, child) in self.children.iter().enumerate() {
            path.push(i);
            visit(child, &mut path, &mut rows);
            path.pop();
        }
        rows
    }

    pub fn result_count(&self) -> usize {
        self.children.iter().map(TreeNode::result_count).sum()
    }
}

/// Ancestors of `node` strictly below the walk root, root-to-leaf, without
/// `node` itself.
fn group_path<'s>(
    node: &'s SchemaNode,
    walk_root: Option<&Oid>,
    schema: &'s dyn Schema,
) -> Vec<&'s SchemaNode> {
    let mut ancestors = Vec::new();
    let mut current = Some(node);
    while let Some(n) = current {
        let at_or_above_root =
            walk_root.is_some_and(|root| n.oid.len() <= root.len() && root.starts_with(&n.oid));
        if at_or_above_root {
            break;
        }
        ancestors.push(n);
        current = schema.parent(n);
    }
    ancestors.reverse();
    ancestors.pop();
    ancestors
}

fn branch_children<'a>(
    level: &'a mut Vec<TreeNode>,
    node: &SchemaNode,
    expanded: bool,
) -> &'a mut Vec<TreeNode> {
    let existing = level
        .iter()
        .position(|c| !c.is_leaf() && c.name == node.name);
    let idx = match existing {
        Some(idx) => idx,
        None => {
            level.push(TreeNode::branch(node, expanded));
            level.len() - 1
        }
    };
    &mut level[idx].children
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::{NodeKind, StaticSchema};
    use pretty_assertions::assert_eq;

    fn oid(s: &str) -> Oid {
        s.parse().unwrap()
    }

    fn schema() -> StaticSchema {
        StaticSchema::from_nodes([
            SchemaNode::new("mib-2", oid("1.3.6.1.2.1"), NodeKind::Node),
            SchemaNode::new("system", oid("1.3.6.1.2.1.1"), NodeKind::Node),
            SchemaNode::new("sysDescr", oid("1.3.6.1.2.1.1.1"), NodeKind::Scalar),
            SchemaNode::new("sysName", oid("1.3.6.1.2.1.1.5"), NodeKind::Scalar),
            SchemaNode::new("interfaces", oid("1.3.6.1.2.1.2"), NodeKind::Node),
            SchemaNode::new("ifTable", oid("1.3.6.1.2.1.2.2"), NodeKind::Table),
            SchemaNode::new("ifEntry", oid("1.3.6.1.2.1.2.2.1"), NodeKind::Row),
            SchemaNode::new("ifDescr", oid("1.3.6.1.2.1.2.2.1.2"), NodeKind::Column),
            SchemaNode::new("ifMtu", oid("1.3.6.1.2.1.2.2.1.4"), NodeKind::Column),
        ])
    }

    fn res(o: &str) -> SnmpResult {
        SnmpResult {
            oid: oid(o),
            name: o.into(),
            value: "x".into(),
            type_name: "STRING".into(),
        }
    }

    fn shape(nodes: &[TreeNode]) -> Vec<String> {
        fn walk(nodes: &[TreeNode], depth: usize, out: &mut Vec<String>) {
            for n in nodes {
                out.push(format!("{}{}", "  ".repeat(depth), n.name));
                walk(&n.children, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        walk(nodes, 0, &mut out);
        out
    }

    #[test]
    fn column_instances_share_one_branch() {
        let s = schema();
        let results = [res("1.3.6.1.2.1.2.2.1.2.1"), res("1.3.6.1.2.1.2.2.1.2.2")];
        let tree = ResultTree::build(&results, Some(oid("1.3.6.1.2.1.2.2")), &s);
        assert_eq!(shape(tree.children()), vec!["ifEntry", "  ifDescr", "    1", "    2"]);
        assert_eq!(tree.result_count(), 2);
    }

    #[test]
    fn path_stops_at_walk_root() {
        let s = schema();
        let tree = ResultTree::build(&[res("1.3.6.1.2.1.1.5.0")], Some(oid("1.3.6.1.2.1")), &s);
        assert_eq!(shape(tree.children()), vec!["system", "  sysName", "    0"]);
    }

    #[test]
    fn exact_match_is_a_named_leaf() {
        let s = schema();
        let tree = ResultTree::build(&[res("1.3.6.1.2.1.1.1")], Some(oid("1.3.6.1.2.1.1")), &s);
        assert_eq!(shape(tree.children()), vec!["sysDescr"]);
        assert!(tree.children()[0].is_leaf());
    }

    #[test]
    fn unknown_oids_become_flat_leaves() {
        let s = schema();
        let tree = ResultTree::build(&[res("1.3.6.1.4.1.9.9")], None, &s);
        assert_eq!(shape(tree.children()), vec!["1.3.6.1.4.1.9.9"]);
    }

    #[test]
    fn batched_insertion_matches_one_shot() {
        let s = schema();
        let results = vec![
            res("1.3.6.1.2.1.1.1.0"),
            res("1.3.6.1.2.1.1.5.0"),
            res("1.3.6.1.2.1.2.2.1.2.1"),
            res("1.3.6.1.2.1.2.2.1.4.1"),
            res("1.3.6.1.2.1.2.2.1.2.2"),
        ];
        let root = Some(oid("1.3.6.1.2.1"));
        let whole = ResultTree::build(&results, root.clone(), &s);

        let mut batched = ResultTree::new(root);
        for chunk in results.chunks(2) {
            batched.extend(chunk, &s);
        }
        assert_eq!(whole.children(), batched.children());
    }

    #[test]
    fn collapsed_state_survives_rebuild() {
        let s = schema();
        let results = vec![res("1.3.6.1.2.1.1.1.0"), res("1.3.6.1.2.1.2.2.1.2.1")];
        let mut tree = ResultTree::build(&results, Some(oid("1.3.6.1.2.1")), &s);
        let visible = tree.rows().len();

        assert!(tree.toggle(&[0]));
        assert!(!tree.children()[0].expanded);
        assert!(tree.rows().len() < visible);

        tree.rebuild(&results, &s);
        assert!(!tree.children()[0].expanded);
        assert!(tree.children()[1].expanded);

        assert!(tree.set_expanded(&[0], true));
        assert_eq!(tree.rows().len(), visible);
    }

    #[test]
    fn rows_report_depth_and_children() {
        let s = schema();
        let tree = ResultTree::build(&[res("1.3.6.1.2.1.1.5.0")], Some(oid("1.3.6.1.2.1")), &s);
        let rows: Vec<(usize, bool, &str)> = tree
            .rows()
            .iter()
            .map(|r| (r.depth, r.has_children, r.node.name.as_str()))
            .collect();
        assert_eq!(rows, vec![(0, true, "system"), (1, true, "sysName"), (2, false, "0")]);
        assert!(!tree.clone().toggle(&[0, 0, 0]));
    }
}

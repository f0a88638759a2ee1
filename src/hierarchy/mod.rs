//! In-memory organisational hierarchy.
//!
//! A [`HierarchyGraph`] is an immutable snapshot of one node flavor, built
//! from a batch fetch. All queries are synchronous and never touch the
//! record store. Every walk tracks the ids it has seen, so corrupted parent
//! data surfaces as [`HierarchyError::CycleDetected`] instead of looping.

pub mod gps;
pub mod node;
pub mod tree;

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use crate::errors::{HierarchyError, HierarchyResult};

pub use gps::GpsPoint;
pub use node::{HierarchyNode, NewNode, NodeFlavor, NodeId, Site, Staff};
pub use tree::{flatten_forest, TreeNode};

/// Hard cap on any walk, independent of cycle tracking
pub const DEFAULT_MAX_DEPTH: usize = 256;

fn format_path(path: &[NodeId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    InProgress,
    Done,
}

#[derive(Clone, Debug)]
pub struct HierarchyGraph<N> {
    nodes: Vec<N>,
    index: HashMap<NodeId, usize>,
    children: HashMap<Option<NodeId>, Vec<usize>>,
    duplicates: Vec<NodeId>,
    max_depth: usize,
}

impl<N: HierarchyNode> HierarchyGraph<N> {
    pub fn new(nodes: Vec<N>) -> Self {
        Self::with_max_depth(nodes, DEFAULT_MAX_DEPTH)
    }

    /// Build a snapshot. A repeated id keeps its first occurrence.
    pub fn with_max_depth(nodes: Vec<N>, max_depth: usize) -> Self {
        let mut kept: Vec<N> = Vec::with_capacity(nodes.len());
        let mut index = HashMap::new();
        let mut duplicates = Vec::new();

        for node in nodes {
            if index.contains_key(&node.id()) {
                warn!(
                    "Duplicate {} id {} in snapshot, keeping first occurrence",
                    N::FLAVOR,
                    node.id()
                );
                duplicates.push(node.id());
                continue;
            }
            index.insert(node.id(), kept.len());
            kept.push(node);
        }

        let mut children: HashMap<Option<NodeId>, Vec<usize>> = HashMap::new();
        for (idx, node) in kept.iter().enumerate() {
            children.entry(node.parent_id()).or_default().push(idx);
        }

        debug!("Built {} hierarchy with {} nodes", N::FLAVOR, kept.len());

        Self {
            nodes: kept,
            index,
            children,
            duplicates,
            max_depth,
        }
    }

    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get_node_by_id(&self, id: NodeId) -> Option<&N> {
        self.index.get(&id).map(|idx| &self.nodes[*idx])
    }

    fn require(&self, id: NodeId) -> HierarchyResult<&N> {
        self.get_node_by_id(id)
            .ok_or(HierarchyError::NodeNotFound(id))
    }

    /// Nodes whose back-reference equals `id`, or the roots for `None`, in
    /// snapshot order. Unknown ids have no children.
    pub fn children_of(&self, id: Option<NodeId>) -> Vec<&N> {
        self.children
            .get(&id)
            .map(|idxs| idxs.iter().map(|idx| &self.nodes[*idx]).collect())
            .unwrap_or_default()
    }

    pub fn roots(&self) -> Vec<&N> {
        self.children_of(None)
    }

    /// Parents of `id` from nearest to root, excluding `id` itself.
    ///
    /// A back-reference to a node outside the snapshot ends the chain.
    pub fn ancestor_chain(&self, id: NodeId) -> HierarchyResult<Vec<&N>> {
        let mut current = self.require(id)?;
        let mut chain = Vec::new();
        let mut visited = HashSet::from([id]);
        let mut path = vec![id];

        while let Some(parent_id) = current.parent_id() {
            path.push(parent_id);
            if !visited.insert(parent_id) {
                warn!("Cycle in {} hierarchy: {}", N::FLAVOR, format_path(&path));
                return Err(HierarchyError::CycleDetected(format_path(&path)));
            }
            if chain.len() >= self.max_depth {
                return Err(HierarchyError::DepthLimitExceeded {
                    id,
                    limit: self.max_depth,
                });
            }
            let Some(parent) = self.get_node_by_id(parent_id) else {
                warn!(
                    "{} {} references missing parent {}",
                    N::FLAVOR,
                    current.id(),
                    parent_id
                );
                break;
            };
            chain.push(parent);
            current = parent;
        }

        Ok(chain)
    }

    /// Labels of the ancestor chain, nearest first
    pub fn supervisor_chain_labels(&self, id: NodeId) -> HierarchyResult<Vec<String>> {
        Ok(self
            .ancestor_chain(id)?
            .into_iter()
            .map(|n| n.label().to_string())
            .collect())
    }

    pub fn depth_of(&self, id: NodeId) -> HierarchyResult<usize> {
        Ok(self.ancestor_chain(id)?.len())
    }

    /// Tree rooted at `root`, or one tree per root node for `None`
    pub fn subtree(&self, root: Option<NodeId>) -> HierarchyResult<Vec<TreeNode<N>>> {
        let starts = match root {
            Some(id) => vec![self.require(id)?],
            None => self.roots(),
        };

        let mut visited = HashSet::new();
        let mut path = Vec::new();
        starts
            .into_iter()
            .map(|node| self.build_tree(node, 0, &mut visited, &mut path))
            .collect()
    }

    fn build_tree(
        &self,
        node: &N,
        depth: usize,
        visited: &mut HashSet<NodeId>,
        path: &mut Vec<NodeId>,
    ) -> HierarchyResult<TreeNode<N>> {
        path.push(node.id());
        if !visited.insert(node.id()) {
            warn!("Cycle in {} hierarchy: {}", N::FLAVOR, format_path(path));
            return Err(HierarchyError::CycleDetected(format_path(path)));
        }
        if depth > self.max_depth {
            return Err(HierarchyError::DepthLimitExceeded {
                id: path[0],
                limit: self.max_depth,
            });
        }

        let mut tree_node = TreeNode::from_node(node, depth);
        for child in self.children_of(Some(node.id())) {
            let child_node = self.build_tree(child, depth + 1, visited, path)?;
            tree_node.children.push(child_node);
        }
        tree_node.has_children = !tree_node.children.is_empty();

        path.pop();
        Ok(tree_node)
    }

    /// Every node below `id`, breadth-first, excluding `id`
    pub fn descendants(&self, id: NodeId) -> HierarchyResult<Vec<&N>> {
        self.require(id)?;
        let mut visited = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        let mut found = Vec::new();

        while let Some(current) = queue.pop_front() {
            for child in self.children_of(Some(current)) {
                if !visited.insert(child.id()) {
                    return Err(HierarchyError::CycleDetected(format!(
                        "{} is its own descendant via {}",
                        child.id(),
                        current
                    )));
                }
                found.push(child);
                queue.push_back(child.id());
            }
        }

        Ok(found)
    }

    /// Deepest level reachable from the roots (roots are level 0)
    pub fn max_depth(&self) -> HierarchyResult<usize> {
        Ok(self
            .subtree(None)?
            .iter()
            .map(|tree| tree.max_depth())
            .max()
            .unwrap_or(0))
    }

    /// Check that moving `id` under `new_parent` keeps the hierarchy acyclic.
    ///
    /// Any parent type is accepted for any child type.
    pub fn check_reparent(&self, id: NodeId, new_parent: Option<NodeId>) -> HierarchyResult<()> {
        self.require(id)?;
        let Some(parent_id) = new_parent else {
            return Ok(());
        };
        self.require(parent_id)?;

        if parent_id == id {
            return Err(HierarchyError::CycleDetected(format_path(&[id, id])));
        }

        let chain = self.ancestor_chain(parent_id)?;
        if let Some(pos) = chain.iter().position(|n| n.id() == id) {
            let mut path = vec![id, parent_id];
            path.extend(chain[..=pos].iter().map(|n| n.id()));
            return Err(HierarchyError::CycleDetected(format_path(&path)));
        }

        Ok(())
    }

    /// Report duplicate ids, dangling back-references and cycles
    pub fn verify_integrity(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for id in &self.duplicates {
            errors.push(format!("Duplicate {} id: {}", N::FLAVOR, id));
        }

        for node in &self.nodes {
            if let Some(parent_id) = node.parent_id() {
                if !self.index.contains_key(&parent_id) {
                    errors.push(format!(
                        "Node id:[{}] {} {} not found in nodes",
                        node.id(),
                        N::FLAVOR.parent_field(),
                        parent_id
                    ));
                }
            }
        }

        let mut state: HashMap<NodeId, Visit> = HashMap::new();
        for node in &self.nodes {
            let mut path = Vec::new();
            let mut current = Some(node.id());
            while let Some(id) = current {
                match state.get(&id) {
                    Some(Visit::Done) => break,
                    Some(Visit::InProgress) => {
                        let start = path.iter().position(|p| *p == id).unwrap_or(0);
                        let mut cycle = path[start..].to_vec();
                        cycle.push(id);
                        if cycle.len() == 2 {
                            errors.push(format!("Node id:[{}] is its own parent", id));
                        } else {
                            errors.push(format!("Cycle detected: {}", format_path(&cycle)));
                        }
                        break;
                    }
                    None => {}
                }
                state.insert(id, Visit::InProgress);
                path.push(id);
                current = self.get_node_by_id(id).and_then(|n| n.parent_id());
            }
            for id in path {
                state.insert(id, Visit::Done);
            }
        }

        if errors.is_empty() {
            debug!("{} hierarchy passed integrity checks", N::FLAVOR);
            Ok(())
        } else {
            warn!("{} hierarchy has {} integrity problems", N::FLAVOR, errors.len());
            Err(errors)
        }
    }

    pub fn stats(&self) -> String {
        let depth = self
            .max_depth()
            .map(|d| d.to_string())
            .unwrap_or_else(|_| "n/a (cyclic)".to_string());
        format!(
            "Nodes: {}, Roots: {}, Max depth: {}",
            self.nodes.len(),
            self.roots().len(),
            depth
        )
    }
}

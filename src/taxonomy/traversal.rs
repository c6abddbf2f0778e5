//! Tree traversal (BFS and ancestor walks).

use std::collections::VecDeque;

use super::tree::TaxonomyNode;

/// Breadth-first order of arena positions, starting at `root`.
/// Children are visited in insertion order, so the order is deterministic.
pub fn breadth_first(nodes: &[TaxonomyNode], root: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(nodes.len());
    let mut queue: VecDeque<usize> = VecDeque::new();
    queue.push_back(root);

    while let Some(current) = queue.pop_front() {
        order.push(current);
        for &child in &nodes[current].children {
            queue.push_back(child);
        }
    }

    order
}

/// Arena positions of the ancestors of `node`, parent first, root last.
pub fn ancestors(nodes: &[TaxonomyNode], node: usize) -> Vec<usize> {
    let mut result = Vec::new();
    let mut current = nodes[node].parent;
    while let Some(parent) = current {
        result.push(parent);
        current = nodes[parent].parent;
    }
    result
}

/// Arena positions from the root down to `node`, inclusive.
pub fn root_path(nodes: &[TaxonomyNode], node: usize) -> Vec<usize> {
    let mut path = ancestors(nodes, node);
    path.reverse();
    path.push(node);
    path
}

//! Pre-order index over a borrowed IR tree.
//!
//! The tree itself stays an owned hierarchy; `TreeIndex` is the arena view
//! the passes work against. Every node gets a dense pre-order position, so a
//! subtree is the half-open range `pos..end` and ancestry checks are range
//! containment.

use crate::Node;
use std::collections::HashMap;
use std::ops::Range;

#[derive(Debug, Clone, Copy)]
struct Entry<'a> {
    node: &'a Node,
    parent: Option<usize>,
    depth: usize,
    end: usize,
    slot: usize,
}

/// Positional view of one translation unit.
#[derive(Debug)]
pub struct TreeIndex<'a> {
    entries: Vec<Entry<'a>>,
    positions: HashMap<&'a str, usize>,
}

impl<'a> TreeIndex<'a> {
    pub fn build(root: &'a Node) -> Self {
        let mut index = Self {
            entries: Vec::with_capacity(root.count()),
            positions: HashMap::new(),
        };
        index.visit(root, None, 0, 0);
        index
    }

    fn visit(&mut self, node: &'a Node, parent: Option<usize>, depth: usize, slot: usize) {
        let pos = self.entries.len();
        self.entries.push(Entry {
            node,
            parent,
            depth,
            end: pos + 1,
            slot,
        });
        self.positions.entry(node.id.as_str()).or_insert(pos);
        for (i, child) in node.children.iter().enumerate() {
            self.visit(child, Some(pos), depth + 1, i);
        }
        self.entries[pos].end = self.entries.len();
    }

    pub fn root(&self) -> &'a Node {
        self.entries[0].node
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn node(&self, pos: usize) -> &'a Node {
        self.entries[pos].node
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&'a Node> {
        self.position(id).map(|pos| self.node(pos))
    }

    pub fn parent(&self, pos: usize) -> Option<usize> {
        self.entries[pos].parent
    }

    pub fn depth(&self, pos: usize) -> usize {
        self.entries[pos].depth
    }

    /// Index of `pos` among its parent's children.
    pub fn slot(&self, pos: usize) -> usize {
        self.entries[pos].slot
    }

    /// Pre-order range covered by the subtree rooted at `pos`.
    pub fn subtree(&self, pos: usize) -> Range<usize> {
        pos..self.entries[pos].end
    }

    /// Whether `pos` lies inside the subtree rooted at `ancestor` (inclusive).
    pub fn contains(&self, ancestor: usize, pos: usize) -> bool {
        self.subtree(ancestor).contains(&pos)
    }

    pub fn children(&self, pos: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.node(pos).children.len());
        let mut next = pos + 1;
        let end = self.entries[pos].end;
        while next < end {
            out.push(next);
            next = self.entries[next].end;
        }
        out
    }

    /// Ancestors of `pos`, nearest first.
    pub fn ancestors(&self, pos: usize) -> Ancestors<'_, 'a> {
        Ancestors {
            index: self,
            next: self.parent(pos),
        }
    }

    /// All positions in post-order (children before parents, siblings in order).
    pub fn post_order(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.len());
        if !self.is_empty() {
            self.push_post_order(0, &mut out);
        }
        out
    }

    fn push_post_order(&self, pos: usize, out: &mut Vec<usize>) {
        for child in self.children(pos) {
            self.push_post_order(child, out);
        }
        out.push(pos);
    }
}

pub struct Ancestors<'i, 'a> {
    index: &'i TreeIndex<'a>,
    next: Option<usize>,
}

impl Iterator for Ancestors<'_, '_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let pos = self.next?;
        self.next = self.index.parent(pos);
        Some(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdGen;

    fn sample() -> Node {
        let mut ids = IdGen::new("u");
        let a = ids.ident("a");
        let b = ids.ident("b");
        let sum = ids.binary(a, "+", b);
        let ret = ids.ret(Some(sum));
        let f = ids.function("add", &["a", "b"], vec![ret]);
        ids.module("m", vec![f])
    }

    #[test]
    fn test_positions_are_pre_order() {
        let root = sample();
        let index = TreeIndex::build(&root);
        assert_eq!(index.len(), root.count());
        let kinds: Vec<_> = (0..index.len()).map(|p| index.node(p).kind.as_str()).collect();
        assert_eq!(
            kinds,
            [
                "module",
                "function",
                "parameter",
                "parameter",
                "block",
                "return",
                "expression",
                "identifier",
                "identifier"
            ]
        );
        assert_eq!(index.subtree(1), 1..9);
        assert_eq!(index.children(1), vec![2, 3, 4]);
        assert_eq!(index.slot(4), 2);
    }

    #[test]
    fn test_ancestors_and_depth() {
        let root = sample();
        let index = TreeIndex::build(&root);
        let ident = index.len() - 1;
        assert_eq!(index.ancestors(ident).collect::<Vec<_>>(), vec![6, 5, 4, 1, 0]);
        assert_eq!(index.depth(ident), 5);
        assert!(index.contains(1, ident));
        assert!(!index.contains(2, ident));
    }

    #[test]
    fn test_post_order_visits_children_first() {
        let root = sample();
        let index = TreeIndex::build(&root);
        let order = index.post_order();
        assert_eq!(order.first(), Some(&2));
        assert_eq!(order.last(), Some(&0));
        let ret = order.iter().position(|&p| p == 5).unwrap();
        let sum = order.iter().position(|&p| p == 6).unwrap();
        assert!(sum < ret);
    }
}

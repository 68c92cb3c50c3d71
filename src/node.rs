/// CubeFrame Index Nodes
///
/// Both index variants are trees of `Branch` levels. Each level maps one
/// column's distinct keys to the next level; the last level maps to leaves
/// holding row positions. Pivot margins may additionally hold `Subtotal`
/// entries under `Key::Subtotal`.
///
/// Branches remember the order keys were first inserted in, so unsorted walks
/// are reproducible.

use crate::record::Record;
use crate::value::Key;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::slice;

/// Row position inside a dataset. Positions are never reused.
pub type RowId = usize;

/// Row positions stored at a leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIds {
    /// First-occurrence slot written by `GroupingIndex::add`.
    One(RowId),
    Many(SmallVec<[RowId; 4]>),
}

impl RowIds {
    pub fn from_slice(rows: &[RowId]) -> Self {
        RowIds::Many(SmallVec::from_slice(rows))
    }

    pub fn as_slice(&self) -> &[RowId] {
        match self {
            RowIds::One(row) => slice::from_ref(row),
            RowIds::Many(rows) => rows.as_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn contains(&self, row: RowId) -> bool {
        self.as_slice().contains(&row)
    }

    /// The row position if exactly one is stored.
    pub fn single(&self) -> Option<RowId> {
        match self.as_slice() {
            [row] => Some(*row),
            _ => None,
        }
    }

    pub fn extend_from_slice(&mut self, rows: &[RowId]) {
        match self {
            RowIds::One(first) => {
                let mut all = SmallVec::from_slice(&[*first]);
                all.extend_from_slice(rows);
                *self = RowIds::Many(all);
            }
            RowIds::Many(existing) => existing.extend_from_slice(rows),
        }
    }

    /// Remove every occurrence of `row`. Returns true if anything was removed.
    pub fn remove(&mut self, row: RowId) -> bool {
        match self {
            RowIds::One(existing) if *existing == row => {
                *self = RowIds::Many(SmallVec::new());
                true
            }
            RowIds::One(_) => false,
            RowIds::Many(rows) => {
                let before = rows.len();
                rows.retain(|r| *r != row);
                rows.len() != before
            }
        }
    }
}

/// Back-reference carried by a subtotal entry in a pivot margin.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtotalEntry {
    /// Position of the subtotal dataset within the cube.
    pub subtotal: usize,
    /// The aggregate row that produced this entry.
    pub row: Record,
}

#[derive(Debug, Clone)]
pub enum IndexNode {
    Leaf(RowIds),
    Branch(Branch),
    Subtotal(SubtotalEntry),
}

impl IndexNode {
    pub fn as_branch(&self) -> Option<&Branch> {
        match self {
            IndexNode::Branch(branch) => Some(branch),
            _ => None,
        }
    }

    pub fn as_rows(&self) -> Option<&RowIds> {
        match self {
            IndexNode::Leaf(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, IndexNode::Branch(_))
    }

    /// Cached leaf count for branches; zero for terminal nodes.
    pub fn leaves(&self) -> usize {
        match self {
            IndexNode::Branch(branch) => branch.leaves().unwrap_or(0),
            _ => 0,
        }
    }
}

/// One level of an index
#[derive(Debug, Clone, Default)]
pub struct Branch {
    keys: Vec<Key>,
    children: FxHashMap<Key, IndexNode>,
    leaves: Option<usize>,
}

impl Branch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, key: &Key) -> Option<&IndexNode> {
        self.children.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &Key) -> Option<&mut IndexNode> {
        self.children.get_mut(key)
    }

    /// Keys in first-insertion order.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Entries in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &IndexNode)> + '_ {
        self.keys
            .iter()
            .filter_map(move |key| self.children.get(key).map(|node| (key, node)))
    }

    /// Entries in key order.
    pub fn sorted(&self) -> Vec<(&Key, &IndexNode)> {
        let mut entries: Vec<(&Key, &IndexNode)> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Cached count of terminal entries below this level, if computed.
    pub fn leaves(&self) -> Option<usize> {
        self.leaves
    }

    pub(crate) fn set(&mut self, key: Key, node: IndexNode) {
        if !self.children.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.children.insert(key, node);
        self.leaves = None;
    }

    pub(crate) fn remove(&mut self, key: &Key) -> Option<IndexNode> {
        let node = self.children.remove(key)?;
        self.keys.retain(|k| k != key);
        self.leaves = None;
        Some(node)
    }

    /// The child branch under `key`, created if absent. `None` when the key
    /// already holds a terminal node.
    pub(crate) fn child_branch_mut(&mut self, key: &Key) -> Option<&mut Branch> {
        if !self.children.contains_key(key) {
            self.set(key.clone(), IndexNode::Branch(Branch::new()));
        }
        match self.children.get_mut(key) {
            Some(IndexNode::Branch(branch)) => Some(branch),
            _ => None,
        }
    }

    /// Walk (creating as needed) one branch per key of `path`.
    pub(crate) fn branch_path_mut(&mut self, path: &[Key]) -> Option<&mut Branch> {
        let mut node = self;
        for key in path {
            node.leaves = None;
            node = node.child_branch_mut(key)?;
        }
        Some(node)
    }

    /// The node reached by following every key of `path`.
    pub fn descend(&self, path: &[Key]) -> Option<&IndexNode> {
        let (last, prefix) = path.split_last()?;
        let mut node = self;
        for key in prefix {
            match node.children.get(key)? {
                IndexNode::Branch(branch) => node = branch,
                _ => return None,
            }
        }
        node.children.get(last)
    }

    /// Remove `row` from the leaf at `path`, dropping levels left empty.
    /// Returns true if the row was found.
    pub(crate) fn prune(&mut self, path: &[Key], row: RowId) -> bool {
        let Some((key, rest)) = path.split_first() else {
            return false;
        };
        let (removed, emptied) = match self.children.get_mut(key) {
            Some(IndexNode::Branch(child)) if !rest.is_empty() => {
                let removed = child.prune(rest, row);
                (removed, child.is_empty())
            }
            Some(IndexNode::Leaf(rows)) if rest.is_empty() => {
                let removed = rows.remove(row);
                (removed, rows.is_empty())
            }
            _ => return false,
        };
        if removed {
            self.leaves = None;
        }
        if emptied {
            self.remove(key);
        }
        removed
    }

    /// Recompute and cache leaf counts for this level and everything below.
    pub fn count_leaves(&mut self) -> usize {
        let total: usize = self
            .children
            .values_mut()
            .map(|node| match node {
                IndexNode::Branch(branch) => branch.count_leaves(),
                _ => 1,
            })
            .sum();
        self.leaves = Some(total);
        total
    }

    /// Count terminal entries from scratch without touching the cache.
    pub fn tally(&self) -> usize {
        self.children
            .values()
            .map(|node| match node {
                IndexNode::Branch(branch) => branch.tally(),
                _ => 1,
            })
            .sum()
    }
}

/// CubeFrame Indices
///
/// Two hierarchical index variants share the `Branch` tree in `node`:
///
/// - `GroupingIndex` keys its levels by column *name order*, so `{age, sex}`
///   and `{sex, age}` resolve to the same group. It backs group-by: `add` is
///   the find-or-create primitive that decides "new group" vs "existing group".
/// - `OrderedIndex` keeps the caller's column order, always accumulates row
///   lists at its leaves, and can cache leaf counts. Pivot cubes are built on it.
///
/// Indices store row positions only; they never own the dataset's data.
///
/// # Examples
///
/// ```
/// use cubeframe::{record, GroupingIndex};
///
/// let mut index = GroupingIndex::new();
/// assert_eq!(index.add(&record! { "sex" => "F", "age" => 30 }, 0), 0);
/// // Same group regardless of column order: the existing slot wins.
/// assert_eq!(index.add(&record! { "age" => 30, "sex" => "F" }, 1), 0);
/// assert_eq!(index.columns(), &["age".to_string(), "sex".to_string()]);
/// ```

use crate::node::{Branch, IndexNode, RowId, RowIds};
use crate::record::Record;
use crate::value::{Key, Value};
use smallvec::SmallVec;

type Path = SmallVec<[Key; 8]>;

/// Grouping index keyed by a canonically sorted column set
#[derive(Debug, Clone, Default)]
pub struct GroupingIndex {
    root: Branch,
    columns: Vec<String>,
}

impl GroupingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An index whose key columns are fixed up front rather than by the first insert.
    pub fn with_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        let mut columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        columns.sort();
        columns.dedup();
        GroupingIndex {
            root: Branch::new(),
            columns,
        }
    }

    /// Sorted key columns. Empty until the first insert fixes them.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn root(&self) -> &Branch {
        &self.root
    }

    fn fix_columns(&mut self, group: &Record) {
        if self.columns.is_empty() {
            let mut columns: Vec<String> = group.columns().map(str::to_string).collect();
            columns.sort();
            columns.dedup();
            self.columns = columns;
        }
    }

    /// Key path for `group`, or `None` if it does not carry this index's columns.
    fn path(&self, group: &Record) -> Option<Path> {
        if group.len() != self.columns.len() {
            return None;
        }
        if self.columns.is_empty() {
            // A group over no columns collapses to a single null-keyed bucket.
            return Some(SmallVec::from_elem(Key::Value(Value::Null), 1));
        }
        self.columns
            .iter()
            .map(|column| group.get(column).cloned().map(Key::Value))
            .collect()
    }

    /// The leaf for `group`, or `None` if any level is missing.
    pub fn find(&self, group: &Record) -> Option<&IndexNode> {
        let path = self.path(group)?;
        self.root.descend(&path)
    }

    /// Insert `row` under `group`. With `unique` set, an occupied group is
    /// rejected and `false` returned without changing anything.
    pub fn insert(&mut self, group: &Record, row: RowId, unique: bool) -> bool {
        self.fix_columns(group);
        let Some(path) = self.path(group) else {
            return false;
        };
        insert_rows(&mut self.root, &path, &[row], unique)
    }

    /// Find-or-create: returns the row already stored for `group`, or stores
    /// `candidate` and returns it.
    pub fn add(&mut self, group: &Record, candidate: RowId) -> RowId {
        self.fix_columns(group);
        let Some(path) = self.path(group) else {
            return candidate;
        };
        let Some((last, prefix)) = path.split_last() else {
            return candidate;
        };
        let Some(parent) = self.root.branch_path_mut(prefix) else {
            return candidate;
        };
        match parent.get(last) {
            Some(IndexNode::Leaf(rows)) => rows.as_slice().first().copied().unwrap_or(candidate),
            Some(_) => candidate,
            None => {
                parent.set(last.clone(), IndexNode::Leaf(RowIds::One(candidate)));
                candidate
            }
        }
    }

    /// Remove `row` from the leaf for `group`, dropping emptied levels.
    pub fn delete(&mut self, group: &Record, row: RowId) -> bool {
        match self.path(group) {
            Some(path) => self.root.prune(&path, row),
            None => false,
        }
    }
}

/// Ordered index keyed in caller-specified column order
#[derive(Debug, Clone)]
pub struct OrderedIndex {
    root: Branch,
    columns: Vec<String>,
}

impl OrderedIndex {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        OrderedIndex {
            root: Branch::new(),
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn root(&self) -> &Branch {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut Branch {
        &mut self.root
    }

    /// Key path for `group` in this index's column order. Absent columns read as null.
    pub fn path(&self, group: &Record) -> Vec<Key> {
        self.columns
            .iter()
            .map(|column| Key::Value(group.value(column).clone()))
            .collect()
    }

    /// Follow `path` one level per key. A shorter path yields the branch at
    /// that depth; a longer or unknown one yields `None`.
    pub fn find(&self, path: &[Key]) -> Option<&IndexNode> {
        self.root.descend(path)
    }

    pub fn insert(&mut self, group: &Record, row: RowId, unique: bool) -> bool {
        let path = self.path(group);
        self.insert_rows(&path, &[row], unique)
    }

    /// Insert a list of rows at `path`, merging with any list already there
    /// unless `unique` is set.
    pub fn insert_rows(&mut self, path: &[Key], rows: &[RowId], unique: bool) -> bool {
        if path.len() != self.columns.len() {
            return false;
        }
        insert_rows(&mut self.root, path, rows, unique)
    }

    pub fn delete(&mut self, path: &[Key], row: RowId) -> bool {
        self.root.prune(path, row)
    }

    /// Recompute cached leaf counts over the whole index.
    pub fn count_leaves(&mut self) -> usize {
        self.root.count_leaves()
    }
}

fn insert_rows(root: &mut Branch, path: &[Key], rows: &[RowId], unique: bool) -> bool {
    let Some((last, prefix)) = path.split_last() else {
        return false;
    };
    let Some(parent) = root.branch_path_mut(prefix) else {
        return false;
    };
    match parent.get_mut(last) {
        Some(IndexNode::Leaf(existing)) => {
            if unique {
                return false;
            }
            existing.extend_from_slice(rows);
            true
        }
        Some(_) => false,
        None => {
            parent.set(last.clone(), IndexNode::Leaf(RowIds::from_slice(rows)));
            true
        }
    }
}

/// A named index registered on a dataset
#[derive(Debug, Clone)]
pub enum Index {
    Grouping(GroupingIndex),
    Ordered(OrderedIndex),
}

impl Index {
    pub fn columns(&self) -> &[String] {
        match self {
            Index::Grouping(index) => index.columns(),
            Index::Ordered(index) => index.columns(),
        }
    }

    pub fn root(&self) -> &Branch {
        match self {
            Index::Grouping(index) => index.root(),
            Index::Ordered(index) => index.root(),
        }
    }

    /// The node for a group given as a record of key columns.
    pub fn lookup(&self, group: &Record) -> Option<&IndexNode> {
        match self {
            Index::Grouping(index) => index.find(group),
            Index::Ordered(index) => {
                if !index.columns().iter().all(|column| group.contains(column)) {
                    return None;
                }
                index.find(&index.path(group))
            }
        }
    }

    /// The node at a key path. Grouping paths are in sorted column order.
    pub fn lookup_path(&self, path: &[Key]) -> Option<&IndexNode> {
        self.root().descend(path)
    }

    /// Drop `position` using the key values of `row`.
    pub(crate) fn forget(&mut self, row: &Record, position: RowId) -> bool {
        match self {
            Index::Grouping(index) => {
                let group = row.project(index.columns());
                index.delete(&group, position)
            }
            Index::Ordered(index) => {
                let path = index.path(row);
                index.delete(&path, position)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    fn keys(values: &[&str]) -> Vec<Key> {
        values.iter().map(|v| Key::from(*v)).collect()
    }

    #[test]
    fn test_grouping_find_missing() {
        let mut index = GroupingIndex::new();
        assert!(index.find(&record! { "a" => 1 }).is_none());

        index.insert(&record! { "a" => 1, "b" => "x" }, 0, false);
        assert!(index.find(&record! { "a" => 2, "b" => "x" }).is_none());
        // Column-set mismatch is a miss, not an error.
        assert!(index.find(&record! { "a" => 1 }).is_none());
        assert!(index.find(&record! { "a" => 1, "c" => "x" }).is_none());
    }

    #[test]
    fn test_grouping_column_order_invariance() {
        let mut index = GroupingIndex::new();
        index.insert(&record! { "sex" => "F", "age" => 30 }, 0, false);

        let by_age_sex = index.find(&record! { "age" => 30, "sex" => "F" }).unwrap();
        assert_eq!(by_age_sex.as_rows().unwrap().as_slice(), &[0]);
        assert_eq!(index.columns(), &["age".to_string(), "sex".to_string()]);
    }

    #[test]
    fn test_grouping_unique_insert() {
        let mut index = GroupingIndex::new();
        assert!(index.insert(&record! { "id" => 1 }, 0, true));
        assert!(!index.insert(&record! { "id" => 1 }, 1, true));
        let rows = index.find(&record! { "id" => 1 }).unwrap().as_rows().unwrap();
        assert_eq!(rows.as_slice(), &[0]);
    }

    #[test]
    fn test_grouping_non_unique_accumulates_both_orders() {
        let mut forward = GroupingIndex::new();
        forward.insert(&record! { "k" => "a" }, 1, false);
        forward.insert(&record! { "k" => "a" }, 2, false);

        let mut backward = GroupingIndex::new();
        backward.insert(&record! { "k" => "a" }, 2, false);
        backward.insert(&record! { "k" => "a" }, 1, false);

        let mut f = forward.find(&record! { "k" => "a" }).unwrap().as_rows().unwrap().as_slice().to_vec();
        let mut b = backward.find(&record! { "k" => "a" }).unwrap().as_rows().unwrap().as_slice().to_vec();
        f.sort();
        b.sort();
        assert_eq!(f, vec![1, 2]);
        assert_eq!(f, b);
    }

    #[test]
    fn test_grouping_add_first_wins() {
        let mut index = GroupingIndex::new();
        assert_eq!(index.add(&record! { "r" => "E", "q" => "Q1" }, 0), 0);
        assert_eq!(index.add(&record! { "r" => "W", "q" => "Q1" }, 1), 1);
        assert_eq!(index.add(&record! { "q" => "Q1", "r" => "E" }, 2), 0);
        assert_eq!(index.root().tally(), 2);
    }

    #[test]
    fn test_grouping_without_columns() {
        let mut index = GroupingIndex::new();
        assert_eq!(index.add(&Record::new(), 0), 0);
        assert_eq!(index.add(&Record::new(), 1), 0);
        assert!(index.find(&Record::new()).is_some());
    }

    #[test]
    fn test_grouping_delete_prunes_levels() {
        let mut index = GroupingIndex::new();
        index.insert(&record! { "a" => "x", "b" => "y" }, 0, false);
        index.insert(&record! { "a" => "x", "b" => "z" }, 1, false);

        assert!(index.delete(&record! { "a" => "x", "b" => "y" }, 0));
        assert!(index.find(&record! { "a" => "x", "b" => "y" }).is_none());
        assert!(index.delete(&record! { "a" => "x", "b" => "z" }, 1));
        assert!(index.root().is_empty());
        assert!(!index.delete(&record! { "a" => "x", "b" => "z" }, 1));
    }

    #[test]
    fn test_ordered_shapes_differ_by_column_order() {
        let row = record! { "age" => 30, "sex" => "F" };
        let mut age_sex = OrderedIndex::new(&["age", "sex"]);
        let mut sex_age = OrderedIndex::new(&["sex", "age"]);
        age_sex.insert(&row, 0, false);
        sex_age.insert(&row, 0, false);

        assert!(age_sex.root().get(&Key::from(30)).is_some());
        assert!(age_sex.root().get(&Key::from("F")).is_none());
        assert!(sex_age.root().get(&Key::from("F")).is_some());
        assert!(sex_age.root().get(&Key::from(30)).is_none());
    }

    #[test]
    fn test_ordered_insert_merges_lists() {
        let mut index = OrderedIndex::new(&["r", "q"]);
        assert!(index.insert_rows(&keys(&["E", "Q1"]), &[0, 1], false));
        assert!(index.insert_rows(&keys(&["E", "Q1"]), &[4], false));
        assert!(!index.insert_rows(&keys(&["E", "Q1"]), &[5], true));
        assert!(!index.insert_rows(&keys(&["E"]), &[6], false));

        let rows = index.find(&keys(&["E", "Q1"])).unwrap().as_rows().unwrap();
        assert_eq!(rows.as_slice(), &[0, 1, 4]);
        assert!(index.find(&keys(&["E"])).unwrap().is_branch());
    }

    #[test]
    fn test_ordered_leaf_counts_match_tally() {
        let mut index = OrderedIndex::new(&["r", "c", "q"]);
        let paths = [
            ["E", "Paris", "Q1"],
            ["E", "Paris", "Q2"],
            ["E", "Lyon", "Q1"],
            ["W", "Lima", "Q3"],
        ];
        for (i, path) in paths.iter().enumerate() {
            index.insert_rows(&keys(path), &[i], false);
        }

        assert_eq!(index.count_leaves(), 4);
        fn check(branch: &Branch) {
            assert_eq!(branch.leaves(), Some(branch.tally()));
            for (_, node) in branch.iter() {
                if let IndexNode::Branch(child) = node {
                    check(child);
                }
            }
        }
        check(index.root());
        assert_eq!(index.find(&keys(&["E"])).unwrap().leaves(), 3);
    }

    #[test]
    fn test_index_lookup_by_record() {
        let row = record! { "r" => "E", "q" => "Q1" };
        let mut ordered = OrderedIndex::new(&["q", "r"]);
        ordered.insert(&row, 7, false);
        let index = Index::Ordered(ordered);

        assert_eq!(index.lookup(&row).unwrap().as_rows().unwrap().as_slice(), &[7]);
        assert!(index.lookup(&record! { "r" => "E" }).is_none());
        assert!(index.lookup_path(&keys(&["Q1", "E"])).is_some());
    }
}

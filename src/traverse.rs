/// CubeFrame Traversal
///
/// Walks over index trees, and the visitor protocol renderers use to consume a
/// pivot cube without touching its index structure.
///
/// `PivotCube::navigate` walks the margin named by `Visitor::dimension` in
/// sorted key order. Branches are bracketed by `begin`/`end`; terminal entries
/// either hand over to the `follow` visitor on the next margin or resolve the
/// crossing and report it through `interior`. A crossing resolves against the
/// aggregate keyed by exactly the columns it binds (summary, a subtotal, a
/// margin or the page total); when none is, the cell is `None`.
///
/// # Examples
///
/// ```
/// use cubeframe::{record, Dataset, Expression, Key, PivotCube, Record, Visitor, sum};
///
/// #[derive(Default)]
/// struct Cells(Vec<(String, Option<f64>)>);
///
/// impl Visitor for Cells {
///     fn interior(&mut self, group: &[Key], _key: &Key, value: Option<&Record>) {
///         let label = group.iter().map(|k| k.to_string()).collect::<Vec<_>>().join("/");
///         self.0.push((label, value.and_then(|v| v.value("revenue").as_f64())));
///     }
/// }
///
/// let data = Dataset::from_records(vec![
///     record! { "region" => "W", "revenue" => 7 },
///     record! { "region" => "E", "revenue" => 10 },
/// ]);
/// let cube = PivotCube::new(data, Expression::new().with("revenue", sum("revenue")), &[vec!["region"]]).unwrap();
///
/// let mut cells = Cells::default();
/// cube.navigate(&mut cells);
/// assert_eq!(cells.0, vec![("E".to_string(), Some(10.0)), ("W".to_string(), Some(7.0))]);
/// ```

use crate::node::{Branch, IndexNode};
use crate::pivot::{PivotCube, PIVOT_ORDER, SUBTOTAL_ORDER};
use crate::record::Record;
use crate::value::{Key, Value};
use log::{info, warn};

/// Depth-first walk in insertion order. The callback sees the key path, the
/// key and the node, before descending into branches.
pub fn walk<F>(node: &Branch, mut callback: F)
where
    F: FnMut(&[Key], &Key, &IndexNode),
{
    fn recurse<F: FnMut(&[Key], &Key, &IndexNode)>(node: &Branch, group: &mut Vec<Key>, callback: &mut F) {
        for (key, child) in node.iter() {
            group.push(key.clone());
            callback(group, key, child);
            if let IndexNode::Branch(branch) = child {
                recurse(branch, group, callback);
            }
            group.pop();
        }
    }
    recurse(node, &mut Vec::new(), &mut callback);
}

/// Breadth-first by level: every sibling is visited before any of their
/// children. The callback also receives the cached leaf count (0 for terminals).
pub fn breadth<F>(node: &Branch, mut callback: F)
where
    F: FnMut(&[Key], &Key, &IndexNode, usize),
{
    fn recurse<F: FnMut(&[Key], &Key, &IndexNode, usize)>(node: &Branch, group: &mut Vec<Key>, callback: &mut F) {
        for (key, child) in node.iter() {
            group.push(key.clone());
            callback(group, key, child, child.leaves());
            group.pop();
        }
        for (key, child) in node.iter() {
            if let IndexNode::Branch(branch) = child {
                group.push(key.clone());
                recurse(branch, group, callback);
                group.pop();
            }
        }
    }
    recurse(node, &mut Vec::new(), &mut callback);
}

/// Depth-first walk in key order. The callback also receives the cached leaf
/// count and the key's ordinal among its siblings.
pub fn sorted<F>(node: &Branch, mut callback: F)
where
    F: FnMut(&[Key], &Key, &IndexNode, usize, usize),
{
    fn recurse<F: FnMut(&[Key], &Key, &IndexNode, usize, usize)>(
        node: &Branch,
        group: &mut Vec<Key>,
        callback: &mut F,
    ) {
        for (ordinal, (key, child)) in node.sorted().into_iter().enumerate() {
            group.push(key.clone());
            callback(group, key, child, child.leaves(), ordinal);
            if let IndexNode::Branch(branch) = child {
                recurse(branch, group, callback);
            }
            group.pop();
        }
    }
    recurse(node, &mut Vec::new(), &mut callback);
}

/// A key's place in the cube: the dimension it belongs to and its depth there.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot {
    dimension: usize,
    depth: usize,
}

/// Keys from the start of a navigation down to the current entry, remembering
/// which subtotal each `Key::Subtotal` came from. Values pushed by callers bind
/// crosstab columns by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Crossing {
    keys: Vec<Key>,
    subtotals: Vec<Option<usize>>,
    slots: Vec<Option<Slot>>,
}

impl Crossing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn push_value(&mut self, value: impl Into<Value>) {
        self.keys.push(Key::Value(value.into()));
        self.subtotals.push(None);
        self.slots.push(None);
    }

    fn push(&mut self, key: Key, subtotal: Option<usize>, slot: Slot) {
        self.keys.push(key);
        self.subtotals.push(subtotal);
        self.slots.push(Some(slot));
    }

    fn pop(&mut self) {
        self.keys.pop();
        self.subtotals.pop();
        self.slots.pop();
    }

    /// Ids of the subtotals spliced into this crossing, outermost first.
    pub fn subtotals(&self) -> Vec<usize> {
        self.subtotals.iter().flatten().copied().collect()
    }

    /// The crossing with subtotal markers removed.
    pub fn values(&self) -> Vec<Key> {
        self.keys.iter().filter(|k| !k.is_subtotal()).cloned().collect()
    }
}

impl<V: Into<Value>> FromIterator<V> for Crossing {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut crossing = Crossing::new();
        for value in iter {
            crossing.push_value(value);
        }
        crossing
    }
}

/// Receiver of a cube navigation. Every hook defaults to doing nothing.
pub trait Visitor {
    /// The margin this visitor walks.
    fn dimension(&self) -> usize {
        0
    }

    fn init(&mut self) {}

    /// Entering a branch, or handing a terminal entry over to the follow visitor.
    fn begin(&mut self, _group: &[Key], _leaves: usize, _subtotals: &[usize]) {}

    /// A resolved cell; `value` is `None` when the crossing has no data.
    fn interior(&mut self, _group: &[Key], _key: &Key, _value: Option<&Record>) {}

    fn end(&mut self, _group: &[Key], _leaves: usize, _subtotals: &[usize]) {}

    fn finish(&mut self) {}

    /// Visitor for the next margin, walked below each terminal entry of this one.
    fn follow(&mut self) -> Option<&mut dyn Visitor> {
        None
    }
}

impl PivotCube {
    /// Walks the visitor's margin from the root.
    pub fn navigate(&self, visitor: &mut dyn Visitor) {
        self.navigate_at(visitor, &Crossing::new());
    }

    /// Walks the visitor's margin with `crossing` already in place, as when a
    /// follow visitor continues below an entry of the previous margin.
    pub fn navigate_at(&self, visitor: &mut dyn Visitor, crossing: &Crossing) {
        let dimension = visitor.dimension();
        let Some(index) = self.margin(dimension).and_then(|m| m.ordered(PIVOT_ORDER)) else {
            warn!(
                "Cannot navigate dimension {}: the cube has {}",
                dimension,
                self.dimensions().len()
            );
            return;
        };
        visitor.init();
        let mut crossing = crossing.clone();
        self.collate(index.root(), visitor, &mut crossing, dimension, 0);
        visitor.finish();
    }

    fn collate(
        &self,
        node: &Branch,
        visitor: &mut dyn Visitor,
        crossing: &mut Crossing,
        dimension: usize,
        depth: usize,
    ) {
        for (key, child) in node.sorted() {
            let subtotal = match child {
                IndexNode::Subtotal(entry) => Some(entry.subtotal),
                _ => None,
            };
            crossing.push(key.clone(), subtotal, Slot { dimension, depth });
            let subtotals = crossing.subtotals();

            match child {
                IndexNode::Branch(branch) => {
                    let leaves = branch.leaves().unwrap_or_else(|| branch.tally());
                    visitor.begin(crossing.keys(), leaves, &subtotals);
                    self.collate(branch, visitor, crossing, dimension, depth + 1);
                    visitor.end(crossing.keys(), leaves, &subtotals);
                }
                _ => {
                    let follows = visitor
                        .follow()
                        .map(|next| next.dimension() < self.dimensions().len())
                        .unwrap_or(false);
                    if follows {
                        visitor.begin(crossing.keys(), 1, &subtotals);
                        if let Some(next) = visitor.follow() {
                            self.navigate_at(next, crossing);
                        }
                        visitor.end(crossing.keys(), 1, &subtotals);
                    } else {
                        let value = self.resolve(crossing);
                        visitor.interior(crossing.keys(), key, value.as_ref());
                    }
                }
            }
            crossing.pop();
        }
    }

    /// The row a terminal entry stands for: the aggregate keyed by exactly
    /// the columns the crossing binds. Sentinels bind nothing, so a crossing
    /// made only of sentinels is the cube total. `None` when no aggregate is
    /// keyed by those columns or it has no row for the crossing.
    fn resolve(&self, crossing: &Crossing) -> Option<Record> {
        let (columns, values) = self.bindings(crossing)?;
        if columns.is_empty() {
            return Some(self.total().clone());
        }

        let candidates = std::iter::once((self.summary(), PIVOT_ORDER))
            .chain(self.subtotals().iter().map(|subtotal| (subtotal, SUBTOTAL_ORDER)))
            .chain(self.margins().iter().chain(self.page_total()).map(|margin| (margin, PIVOT_ORDER)));
        for (data, name) in candidates {
            if data.ordered(name).map_or(false, |index| index.columns() == columns.as_slice()) {
                return data.find_path(name, &values);
            }
        }
        self.spliced_row(crossing, &columns)
    }

    /// Bound crosstab columns in crosstab order, with their keys.
    fn bindings(&self, crossing: &Crossing) -> Option<(Vec<String>, Vec<Key>)> {
        let mut offsets = Vec::with_capacity(self.dimensions().len());
        let mut offset = 0;
        for dimension in self.dimensions() {
            offsets.push(offset);
            offset += dimension.len();
        }

        let mut bound: Vec<(usize, &Key)> = Vec::with_capacity(crossing.len());
        for (i, (key, slot)) in crossing.keys.iter().zip(&crossing.slots).enumerate() {
            if key.is_subtotal() {
                continue;
            }
            let position = match slot {
                Some(slot) => offsets.get(slot.dimension).copied()? + slot.depth,
                None => i,
            };
            bound.push((position, key));
        }
        bound.sort_by_key(|(position, _)| *position);
        if bound.windows(2).any(|pair| pair[0].0 == pair[1].0) {
            return None;
        }

        let crosstab = self.crosstab();
        let mut columns = Vec::with_capacity(bound.len());
        let mut values = Vec::with_capacity(bound.len());
        for (position, key) in bound {
            columns.push(crosstab.get(position)?.clone());
            values.push(key.clone());
        }
        Some((columns, values))
    }

    /// The row spliced with a sentinel whose own margin prefix binds exactly
    /// `columns`, i.e. the crossing has no keys outside that prefix.
    fn spliced_row(&self, crossing: &Crossing, columns: &[String]) -> Option<Record> {
        for (i, slot) in crossing.slots.iter().enumerate() {
            let Some(slot) = slot else {
                continue;
            };
            if !crossing.keys[i].is_subtotal() || slot.depth == 0 || slot.depth > i {
                continue;
            }
            let prefix = self.dimensions().get(slot.dimension).and_then(|d| d.get(..slot.depth));
            if prefix != Some(columns) {
                continue;
            }
            let mut path = crossing.keys[i - slot.depth..i].to_vec();
            path.push(Key::Subtotal);
            let node = self
                .margin(slot.dimension)
                .and_then(|margin| margin.ordered(PIVOT_ORDER))
                .and_then(|index| index.find(&path));
            if let Some(IndexNode::Subtotal(entry)) = node {
                return Some(entry.row.clone());
            }
        }
        None
    }
}

/// Logs every hook at info level.
#[derive(Default)]
pub struct EchoVisitor {
    dimension: usize,
    follow: Option<Box<EchoVisitor>>,
}

impl EchoVisitor {
    pub fn new(dimension: usize) -> Self {
        EchoVisitor {
            dimension,
            follow: None,
        }
    }

    /// Chains an echo for the next margin.
    pub fn then(mut self, follow: EchoVisitor) -> Self {
        self.follow = Some(Box::new(follow));
        self
    }
}

fn path(group: &[Key]) -> String {
    group.iter().map(Key::to_string).collect::<Vec<_>>().join(" / ")
}

impl Visitor for EchoVisitor {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn init(&mut self) {
        info!("[{}] init", self.dimension);
    }

    fn begin(&mut self, group: &[Key], leaves: usize, subtotals: &[usize]) {
        info!("[{}] begin: {} leaves={} subtotals={:?}", self.dimension, path(group), leaves, subtotals);
    }

    fn interior(&mut self, group: &[Key], key: &Key, value: Option<&Record>) {
        let value = match value {
            Some(row) => serde_json::to_string(row).unwrap_or_default(),
            None => "null".to_string(),
        };
        info!("[{}] interior: {} key={} value={}", self.dimension, path(group), key, value);
    }

    fn end(&mut self, group: &[Key], leaves: usize, subtotals: &[usize]) {
        info!("[{}] end: {} leaves={} subtotals={:?}", self.dimension, path(group), leaves, subtotals);
    }

    fn finish(&mut self) {
        info!("[{}] final", self.dimension);
    }

    fn follow(&mut self) -> Option<&mut dyn Visitor> {
        match self.follow.as_mut() {
            Some(next) => Some(&mut **next),
            None => None,
        }
    }
}

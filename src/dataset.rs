/// CubeFrame Dataset Implementation
///
/// A Dataset is a set of named columns that all share one logical length.
/// Rows are addressed by stable positions: deleting a row tombstones it rather
/// than renumbering, so indices built over the dataset keep pointing at the
/// right rows.
///
/// # Examples
///
/// ```
/// use cubeframe::{record, Dataset, Expression, sum};
///
/// let mut data = Dataset::new();
/// data.push(&record! { "region" => "E", "revenue" => 10 });
/// data.push(&record! { "region" => "E", "revenue" => 5 });
/// data.push(&record! { "region" => "W", "revenue" => 7 });
///
/// let expression = Expression::new().with("revenue", sum("revenue"));
/// let by_region = data.aggregate(&["region"], &expression);
///
/// assert_eq!(by_region.len(), 2);
/// let east = by_region.find(&record! { "region" => "E" }, None).unwrap();
/// assert_eq!(east.value("revenue").as_f64(), Some(15.0));
/// ```

use crate::aggregate::{self, Expression};
use crate::column::Column;
use crate::error::{Error, Result};
use crate::index::{GroupingIndex, Index, OrderedIndex};
use crate::node::{IndexNode, RowId};
use crate::record::Record;
use crate::traverse;
use crate::value::{Key, Value, NULL};
use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};

/// Name of the grouping index every aggregate result carries.
pub const PRIMARY: &str = "primary";

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    lookup: FxHashMap<String, usize>,
    len: usize,
    deleted: FxHashSet<RowId>,
    indices: FxHashMap<String, Index>,
}

impl Dataset {
    /// Creates an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dataset from row-major input whose first row is the header.
    ///
    /// Header cells must be strings. Cells beyond the header width are dropped
    /// with a warning; short rows read as null in their missing columns.
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut rows = rows.into_iter();
        let mut data = Dataset::new();
        let Some(header) = rows.next() else {
            return Ok(data);
        };

        let mut names = Vec::with_capacity(header.len());
        for (j, cell) in header.into_iter().enumerate() {
            match cell {
                Value::String(name) => {
                    if data.has_column(&name) {
                        return Err(Error::DuplicateColumn(name));
                    }
                    data.column_slot(&name);
                    names.push(name);
                }
                _ => return Err(Error::InvalidHeader(j)),
            }
        }

        for (i, row) in rows.enumerate() {
            if row.len() > names.len() {
                warn!(
                    "Row {} has {} cells but the header names {} columns; extra cells dropped",
                    i,
                    row.len(),
                    names.len()
                );
            }
            let position = data.len;
            for (column, value) in names.iter().zip(row) {
                let slot = data.column_slot(column);
                data.columns[slot].set(position, value);
            }
            data.len += 1;
        }

        debug!("Loaded {} rows x {} columns", data.len, data.columns.len());
        Ok(data)
    }

    /// Builds a dataset from column-major input. The length is that of the
    /// longest column; shorter columns read as null past their end.
    pub fn from_columns<K, I>(columns: I) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Vec<Value>)>,
    {
        let mut data = Dataset::new();
        for (name, values) in columns {
            let name = name.into();
            if data.has_column(&name) {
                return Err(Error::DuplicateColumn(name));
            }
            data.len = data.len.max(values.len());
            data.lookup.insert(name.clone(), data.columns.len());
            data.columns.push(Column::with_values(name, values));
        }
        Ok(data)
    }

    pub fn from_records<I: IntoIterator<Item = Record>>(records: I) -> Self {
        let mut data = Dataset::new();
        for record in records {
            data.push(&record);
        }
        data
    }

    /// Parses JSON in any of three shapes: an array of objects, an array of
    /// arrays with a header row first, or an object of column arrays.
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: serde_json::Value = serde_json::from_str(json)?;
        match parsed {
            serde_json::Value::Array(items) => match items.first() {
                None => Ok(Dataset::new()),
                Some(serde_json::Value::Object(_)) => {
                    let mut data = Dataset::new();
                    for item in items {
                        let fields = match item {
                            serde_json::Value::Object(fields) => fields,
                            other => {
                                return Err(Error::InvalidInput(format!(
                                    "expected every row to be an object, found {}",
                                    other
                                )))
                            }
                        };
                        let mut row = Record::with_capacity(fields.len());
                        for (column, cell) in fields {
                            row.set(column, serde_json::from_value::<Value>(cell)?);
                        }
                        data.push(&row);
                    }
                    Ok(data)
                }
                Some(serde_json::Value::Array(_)) => {
                    let rows: Vec<Vec<Value>> = serde_json::from_value(serde_json::Value::Array(items))?;
                    Dataset::from_rows(rows)
                }
                Some(other) => Err(Error::InvalidInput(format!(
                    "expected rows as objects or arrays, found {}",
                    other
                ))),
            },
            serde_json::Value::Object(map) => {
                let mut columns = Vec::with_capacity(map.len());
                for (name, values) in map {
                    let values: Vec<Value> = serde_json::from_value(values)?;
                    columns.push((name, values));
                }
                Dataset::from_columns(columns)
            }
            other => Err(Error::InvalidInput(format!(
                "expected a JSON array or object, found {}",
                other
            ))),
        }
    }

    /// Live rows as a pretty-printed JSON array of objects.
    pub fn to_json(&self) -> Result<String> {
        let rows: Vec<Record> = self.rows().map(|(_, row)| row).collect();
        Ok(serde_json::to_string_pretty(&rows)?)
    }

    /// Reported row count, tombstoned rows included.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of rows that have not been deleted.
    pub fn live_count(&self) -> usize {
        self.len - self.deleted.iter().filter(|&&row| row < self.len).count()
    }

    pub fn is_empty(&self) -> bool {
        self.live_count() == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.name())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.lookup.get(name).map(|&j| &self.columns[j])
    }

    /// Cell at `row` in `column`. Unknown columns and unwritten cells read as null.
    pub fn get(&self, row: RowId, column: &str) -> &Value {
        match self.column(column) {
            Some(column) => column.get(row),
            None => &NULL,
        }
    }

    pub fn is_deleted(&self, row: RowId) -> bool {
        self.deleted.contains(&row)
    }

    /// The row at `position` as a record, or `None` if it is out of range or deleted.
    pub fn row(&self, position: RowId) -> Option<Record> {
        if position >= self.len || self.is_deleted(position) {
            return None;
        }
        Some(self.record_at(position))
    }

    fn record_at(&self, position: RowId) -> Record {
        self.columns
            .iter()
            .map(|c| (c.name().to_string(), c.get(position).clone()))
            .collect()
    }

    /// Positional cell values of a row, in column order.
    pub fn values(&self, position: RowId) -> Vec<Value> {
        self.columns.iter().map(|c| c.get(position).clone()).collect()
    }

    /// Live row positions in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = RowId> + '_ {
        (0..self.len).filter(move |row| !self.deleted.contains(row))
    }

    /// Live rows with their positions.
    pub fn rows(&self) -> impl Iterator<Item = (RowId, Record)> + '_ {
        self.iter().map(move |position| (position, self.record_at(position)))
    }

    pub fn for_each<F: FnMut(&Record, RowId)>(&self, mut callback: F) {
        for (position, row) in self.rows() {
            callback(&row, position);
        }
    }

    fn column_slot(&mut self, name: &str) -> usize {
        if let Some(&j) = self.lookup.get(name) {
            return j;
        }
        let j = self.columns.len();
        self.columns.push(Column::new(name));
        self.lookup.insert(name.to_string(), j);
        j
    }

    fn write(&mut self, row: &Record, position: RowId) {
        for (column, value) in row.iter() {
            let slot = self.column_slot(column);
            self.columns[slot].set(position, value.clone());
        }
    }

    /// Appends a row and returns its position. Unknown columns are created.
    pub fn push(&mut self, row: &Record) -> RowId {
        let position = self.len;
        self.write(row, position);
        self.len += 1;
        position
    }

    /// Writes `row` at an explicit position, extending the row count if needed.
    /// Columns absent from `row` keep their current values. A tombstoned
    /// position stays deleted.
    pub fn insert(&mut self, row: &Record, position: RowId) {
        self.write(row, position);
        if position >= self.len {
            self.len = position + 1;
        }
    }

    /// Links in every column of `other` this dataset does not already have.
    pub fn append(&mut self, other: &Dataset) -> &mut Self {
        for column in &other.columns {
            if !self.has_column(column.name()) {
                self.lookup.insert(column.name().to_string(), self.columns.len());
                self.columns.push(column.clone());
            }
        }
        self.len = self.len.max(other.len);
        self
    }

    /// Tombstones a row and removes it from every registered index.
    /// Returns false if the row is out of range or already deleted.
    pub fn delete(&mut self, position: RowId) -> bool {
        if position >= self.len || !self.deleted.insert(position) {
            return false;
        }
        let row = self.record_at(position);
        for index in self.indices.values_mut() {
            index.forget(&row, position);
        }
        true
    }

    /// Deletes, in place, every live row for which `predicate` is false.
    pub fn retain<F: FnMut(&Record, RowId) -> bool>(&mut self, mut predicate: F) -> usize {
        let doomed: Vec<RowId> = self
            .rows()
            .filter(|(position, row)| !predicate(row, *position))
            .map(|(position, _)| position)
            .collect();
        for &position in &doomed {
            self.delete(position);
        }
        debug!("Filtered {} rows out, {} remain", doomed.len(), self.live_count());
        doomed.len()
    }

    /// Maps every live row into a new dataset, skipping rows the callback rejects.
    pub fn map<F>(&self, mut callback: F) -> Dataset
    where
        F: FnMut(&Record, RowId) -> Option<Record>,
    {
        let mut result = Dataset::new();
        for (position, row) in self.rows() {
            if let Some(mapped) = callback(&row, position) {
                result.push(&mapped);
            }
        }
        debug!("Mapped {} rows into {}", self.live_count(), result.len());
        result
    }

    /// Maps every live row, then links the new columns into `target`.
    pub fn map_into<'a, F>(&self, callback: F, target: &'a mut Dataset) -> &'a mut Dataset
    where
        F: FnMut(&Record, RowId) -> Option<Record>,
    {
        let mapped = self.map(callback);
        target.append(&mapped)
    }

    /// Merges the callback's fields into each live row in place.
    /// Returns the number of rows updated.
    pub fn update<F>(&mut self, mut callback: F) -> usize
    where
        F: FnMut(&Record, RowId) -> Option<Record>,
    {
        let updates: Vec<(RowId, Record)> = self
            .rows()
            .filter_map(|(position, row)| callback(&row, position).map(|fields| (position, fields)))
            .collect();
        for (position, fields) in &updates {
            self.write(fields, *position);
        }
        updates.len()
    }

    /// Folds every live row into a single record.
    pub fn reduce(&self, expression: &Expression) -> Record {
        aggregate::reduce(self, expression)
    }

    /// Groups live rows by `columns`. The result has one row per distinct group
    /// and a `primary` grouping index over `columns`.
    pub fn aggregate<S: AsRef<str>>(&self, columns: &[S], expression: &Expression) -> Dataset {
        aggregate::aggregate(self, columns, expression)
    }

    /// Builds and registers a grouping index over the live rows. Returns false
    /// if `unique` was requested and some group occurred more than once.
    pub fn index<S: AsRef<str>>(&mut self, name: &str, columns: &[S], unique: bool) -> bool {
        let mut index = GroupingIndex::with_columns(columns);
        let mut ok = true;
        for (position, row) in self.rows() {
            ok &= index.insert(&row.project(columns), position, unique);
        }
        debug!("Indexed '{}' with {} groups", name, index.root().tally());
        self.indices.insert(name.to_string(), Index::Grouping(index));
        ok
    }

    /// Builds and registers an ordered index over the live rows.
    pub fn order<S: AsRef<str>>(&mut self, name: &str, columns: &[S], unique: bool) -> bool {
        let mut index = OrderedIndex::new(columns);
        let mut ok = true;
        for (position, row) in self.rows() {
            ok &= index.insert(&row, position, unique);
        }
        debug!("Ordered '{}' with {} groups", name, index.root().tally());
        self.indices.insert(name.to_string(), Index::Ordered(index));
        ok
    }

    /// Rebuilds the primary grouping index as an ordered index over `columns`,
    /// visiting groups in sorted key order.
    pub fn reorder<S: AsRef<str>>(&mut self, name: &str, columns: &[S]) -> Result<&mut OrderedIndex> {
        let primary = match self.indices.get(PRIMARY) {
            Some(Index::Grouping(primary)) => primary,
            _ => return Err(Error::IndexNotFound(PRIMARY.to_string())),
        };

        let mut arrange = Vec::with_capacity(columns.len());
        for column in columns {
            let column = column.as_ref();
            match primary.columns().iter().position(|c| c == column) {
                Some(j) => arrange.push(j),
                None => return Err(Error::UnknownColumn(column.to_string())),
            }
        }

        let mut ordered = OrderedIndex::new(columns);
        traverse::sorted(primary.root(), |group, _, node, _, _| {
            if let IndexNode::Leaf(rows) = node {
                let regroup: Vec<Key> = arrange.iter().map(|&j| group[j].clone()).collect();
                ordered.insert_rows(&regroup, rows.as_slice(), false);
            }
        });
        debug!("Reordered primary into '{}' over {} columns", name, columns.len());

        self.indices.insert(name.to_string(), Index::Ordered(ordered));
        match self.indices.get_mut(name) {
            Some(Index::Ordered(ordered)) => Ok(ordered),
            _ => Err(Error::IndexNotFound(name.to_string())),
        }
    }

    /// Writes each row's index key values back into columns, named by `rename`
    /// or by the index's own columns.
    pub fn surface(&mut self, index: Option<&str>, rename: Option<&[String]>) -> Result<()> {
        let name = index.unwrap_or(PRIMARY);
        let index = self
            .indices
            .get(name)
            .ok_or_else(|| Error::IndexNotFound(name.to_string()))?;

        let names: Vec<String> = match rename {
            Some(rename) if rename.len() >= index.columns().len() => rename.to_vec(),
            _ => index.columns().to_vec(),
        };

        let mut writes: Vec<(RowId, Vec<Key>)> = Vec::new();
        traverse::walk(index.root(), |group, _, node| {
            if let IndexNode::Leaf(rows) = node {
                for &row in rows.as_slice() {
                    writes.push((row, group.to_vec()));
                }
            }
        });

        for column in &names {
            let slot = self.column_slot(column);
            self.columns[slot] = Column::new(column.as_str());
        }
        for (row, group) in writes {
            for (column, key) in names.iter().zip(group) {
                if let Key::Value(value) = key {
                    let slot = self.column_slot(column);
                    self.columns[slot].set(row, value);
                }
            }
        }
        Ok(())
    }

    /// Fetches the single row a group resolves to through a named index
    /// (the primary index when `index` is `None`).
    pub fn find(&self, group: &Record, index: Option<&str>) -> Option<Record> {
        let node = self.get_index(index.unwrap_or(PRIMARY))?.lookup(group)?;
        self.leaf_row(node)
    }

    /// Fetches the single row at a key path of a named index.
    pub fn find_path(&self, index: &str, path: &[Key]) -> Option<Record> {
        let node = self.get_index(index)?.lookup_path(path)?;
        self.leaf_row(node)
    }

    fn leaf_row(&self, node: &IndexNode) -> Option<Record> {
        let position = node.as_rows()?.single()?;
        self.row(position)
    }

    pub fn get_index(&self, name: &str) -> Option<&Index> {
        self.indices.get(name)
    }

    pub fn grouping(&self, name: &str) -> Option<&GroupingIndex> {
        match self.indices.get(name)? {
            Index::Grouping(index) => Some(index),
            Index::Ordered(_) => None,
        }
    }

    pub fn ordered(&self, name: &str) -> Option<&OrderedIndex> {
        match self.indices.get(name)? {
            Index::Ordered(index) => Some(index),
            Index::Grouping(_) => None,
        }
    }

    pub(crate) fn ordered_mut(&mut self, name: &str) -> Option<&mut OrderedIndex> {
        match self.indices.get_mut(name)? {
            Index::Ordered(index) => Some(index),
            Index::Grouping(_) => None,
        }
    }

    /// Registers an index built elsewhere, replacing any index of the same name.
    pub fn register_index(&mut self, name: &str, index: Index) {
        self.indices.insert(name.to_string(), index);
    }

    /// Removes an index so it can be rebuilt after structural changes.
    pub fn drop_index(&mut self, name: &str) -> Option<Index> {
        self.indices.remove(name)
    }

    pub fn index_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.indices.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{count, sum};
    use crate::record;

    fn sales() -> Dataset {
        Dataset::from_records(vec![
            record! { "region" => "E", "quarter" => "Q1", "revenue" => 10 },
            record! { "region" => "E", "quarter" => "Q2", "revenue" => 5 },
            record! { "region" => "W", "quarter" => "Q1", "revenue" => 7 },
        ])
    }

    #[test]
    fn test_from_rows_header() {
        let data = Dataset::from_rows(vec![
            vec![Value::from("a"), Value::from("b")],
            vec![Value::from(1), Value::from("x")],
            vec![Value::from(2)],
        ])
        .unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data.column_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(data.get(0, "b").as_str(), Some("x"));
        assert!(data.get(1, "b").is_null());
    }

    #[test]
    fn test_from_rows_rejects_bad_header() {
        let err = Dataset::from_rows(vec![vec![Value::from("a"), Value::from(3)]]).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(1)));

        let err = Dataset::from_rows(vec![vec![Value::from("a"), Value::from("a")]]).unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn(_)));
        assert_eq!(err.to_string(), "column 'a' appears more than once");
    }

    #[test]
    fn test_from_columns_uses_longest() {
        let data = Dataset::from_columns(vec![
            ("a", vec![Value::from(1), Value::from(2), Value::from(3)]),
            ("b", vec![Value::from("x")]),
        ])
        .unwrap();
        assert_eq!(data.len(), 3);
        assert!(data.get(2, "b").is_null());
        assert!(data.get(0, "missing").is_null());
    }

    #[test]
    fn test_from_json_shapes() {
        let objects = Dataset::from_json(r#"[{"a": 1, "b": "x"}, {"a": 2}]"#).unwrap();
        let arrays = Dataset::from_json(r#"[["a", "b"], [1, "x"], [2, null]]"#).unwrap();
        let columns = Dataset::from_json(r#"{"a": [1, 2], "b": ["x"]}"#).unwrap();

        for data in [&objects, &arrays, &columns] {
            assert_eq!(data.len(), 2);
            assert_eq!(data.get(0, "a").as_f64(), Some(1.0));
            assert_eq!(data.get(0, "b").as_str(), Some("x"));
            assert!(data.get(1, "b").is_null());
        }

        assert!(Dataset::from_json("[1, 2]").is_err());
        assert!(Dataset::from_json("not json").is_err());
    }

    #[test]
    fn test_to_json_skips_deleted() {
        let mut data = sales();
        data.delete(1);
        let json = data.to_json().unwrap();
        let back = Dataset::from_json(&json).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.get(1, "region").as_str(), Some("W"));
    }

    #[test]
    fn test_push_creates_columns_with_backfill() {
        let mut data = Dataset::new();
        data.push(&record! { "a" => 1 });
        data.push(&record! { "b" => "late" });

        assert_eq!(data.len(), 2);
        assert!(data.get(0, "b").is_null());
        assert!(data.get(1, "a").is_null());
        assert_eq!(data.values(1), vec![Value::Null, Value::from("late")]);
    }

    #[test]
    fn test_insert_extends_and_overwrites() {
        let mut data = sales();
        data.insert(&record! { "revenue" => 99 }, 1);
        assert_eq!(data.get(1, "revenue").as_f64(), Some(99.0));
        assert_eq!(data.get(1, "region").as_str(), Some("E"));

        data.insert(&record! { "region" => "N" }, 5);
        assert_eq!(data.len(), 6);
        assert!(data.get(4, "region").is_null());
    }

    #[test]
    fn test_delete_is_stable() {
        let mut data = sales();
        assert!(data.delete(1));
        assert!(!data.delete(1));
        assert!(!data.delete(10));

        let live: Vec<RowId> = data.iter().collect();
        assert_eq!(live, vec![0, 2]);
        assert_eq!(data.live_count(), 2);
        assert!(data.row(1).is_none());

        // New rows never reuse a tombstoned position.
        let position = data.push(&record! { "region" => "N" });
        assert_eq!(position, 3);
        assert!(!data.iter().any(|row| row == 1));

        data.insert(&record! { "region" => "S" }, 1);
        assert!(data.is_deleted(1));
        assert!(!data.iter().any(|row| row == 1));
    }

    #[test]
    fn test_delete_propagates_to_indices() {
        let mut data = sales();
        data.index("by_region", &["region"], false);
        data.order("by_quarter", &["quarter", "region"], false);

        data.delete(2);
        assert!(data.grouping("by_region").unwrap().find(&record! { "region" => "W" }).is_none());
        assert!(data
            .ordered("by_quarter")
            .unwrap()
            .find(&[Key::from("Q1"), Key::from("W")])
            .is_none());
        assert!(data.find(&record! { "region" => "E" }, Some("by_region")).is_none());
    }

    #[test]
    fn test_retain_filters_in_place() {
        let mut data = sales();
        let removed = data.retain(|row, _| row.value("region").as_str() == Some("E"));
        assert_eq!(removed, 1);
        assert_eq!(data.len(), 3);
        assert_eq!(data.live_count(), 2);
        assert!(data.row(2).is_none());
    }

    #[test]
    fn test_map_and_map_into() {
        let data = sales();
        let doubled = data.map(|row, _| {
            let revenue = row.value("revenue").as_f64()?;
            if revenue < 6.0 {
                return None;
            }
            Some(record! { "double" => revenue * 2.0 })
        });
        assert_eq!(doubled.len(), 2);
        assert_eq!(doubled.get(1, "double").as_f64(), Some(14.0));

        let mut target = sales();
        data.map_into(|_, position| Some(record! { "position" => position }), &mut target);
        assert_eq!(target.get(2, "position").as_f64(), Some(2.0));
        assert_eq!(target.get(2, "region").as_str(), Some("W"));
    }

    #[test]
    fn test_update_merges_fields() {
        let mut data = sales();
        let updated = data.update(|row, _| {
            let revenue = row.value("revenue").as_f64()?;
            Some(record! { "share" => revenue / 22.0 })
        });
        assert_eq!(updated, 3);
        assert_eq!(data.get(0, "share").as_f64(), Some(10.0 / 22.0));
        assert_eq!(data.get(0, "revenue").as_f64(), Some(10.0));
    }

    #[test]
    fn test_unique_index_reports_duplicates() {
        let mut data = sales();
        assert!(data.index("by_quarter_region", &["region", "quarter"], true));
        assert!(!data.index("by_region", &["region"], true));

        let east_q2 = data
            .find(&record! { "quarter" => "Q2", "region" => "E" }, Some("by_quarter_region"))
            .unwrap();
        assert_eq!(east_q2.value("revenue").as_f64(), Some(5.0));
    }

    #[test]
    fn test_reorder_and_surface() {
        let data = sales();
        let mut by_group = data.aggregate(
            &["region", "quarter"],
            &Expression::new().with("n", count()).with("revenue", sum("revenue")),
        );

        let ordered = by_group.reorder("q-first", &["quarter", "region"]).unwrap();
        assert_eq!(ordered.root().keys(), &[Key::from("Q1"), Key::from("Q2")]);

        let row = by_group
            .find_path("q-first", &[Key::from("Q1"), Key::from("W")])
            .unwrap();
        assert_eq!(row.value("revenue").as_f64(), Some(7.0));

        by_group
            .surface(None, Some(&["q".to_string(), "r".to_string()]))
            .unwrap();
        // Primary columns are sorted, so `quarter` surfaces first.
        assert_eq!(by_group.get(2, "q").as_str(), Some("Q1"));
        assert_eq!(by_group.get(2, "r").as_str(), Some("W"));
    }

    #[test]
    fn test_reorder_errors() {
        let mut data = sales();
        assert!(matches!(
            data.reorder("x", &["region"]),
            Err(Error::IndexNotFound(_))
        ));

        let mut grouped = data.aggregate(&["region"], &Expression::new().with("n", count()));
        assert!(matches!(
            grouped.reorder("x", &["quarter"]),
            Err(Error::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_drop_index() {
        let mut data = sales();
        data.index("by_region", &["region"], false);
        assert!(data.index_names().any(|name| name == "by_region"));
        assert!(data.drop_index("by_region").is_some());
        assert!(data.get_index("by_region").is_none());
    }
}

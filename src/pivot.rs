/// CubeFrame Pivot Cubes
///
/// A `PivotCube` wraps a dataset with the aggregates a cross-tab needs:
///
/// - `summary`: grouped by every dimension column at once, ordered into a
///   nested `pivot-order` index in dimension order
/// - `margins`: one per dimension, grouped by that dimension's columns alone,
///   with leaf counts cached for span calculations
/// - `total`: the whole dataset reduced to one record
/// - `page_total`: for three or more dimensions, a margin over dimensions 0 and 2
///
/// Subtotals are requested afterwards. Each one aggregates the data by a chosen
/// column subset and splices `Key::Subtotal` entries into the margins so a
/// renderer walking them meets an extra "Total" at the right nesting level.
///
/// # Examples
///
/// ```
/// use cubeframe::{record, Dataset, Expression, Key, PivotCube, sum};
///
/// let data = Dataset::from_records(vec![
///     record! { "region" => "E", "quarter" => "Q1", "revenue" => 10 },
///     record! { "region" => "E", "quarter" => "Q2", "revenue" => 5 },
///     record! { "region" => "W", "quarter" => "Q1", "revenue" => 7 },
/// ]);
/// let expression = Expression::new().with("revenue", sum("revenue"));
/// let cube = PivotCube::new(data, expression, &[vec!["region"], vec!["quarter"]]).unwrap();
///
/// assert_eq!(cube.total().value("revenue").as_f64(), Some(22.0));
/// let cell = cube.lookup(&[Key::from("E"), Key::from("Q2")]).unwrap();
/// assert_eq!(cell.value("revenue").as_f64(), Some(5.0));
/// ```

use crate::aggregate::Expression;
use crate::config::PivotConfig;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::node::{Branch, IndexNode, SubtotalEntry};
use crate::record::Record;
use crate::value::Key;
use log::{debug, trace};
use rustc_hash::FxHashSet;
use std::ops::Deref;

/// Ordered index over the crosstab (summary) or a dimension (margins).
pub const PIVOT_ORDER: &str = "pivot-order";
/// Ordered index over a subtotal's columns, in crosstab order.
pub const SUBTOTAL_ORDER: &str = "subtotal-order";

#[derive(Debug, Clone)]
pub struct PivotCube {
    data: Dataset,
    expression: Expression,
    dimensions: Vec<Vec<String>>,
    summary: Dataset,
    margins: Vec<Dataset>,
    total: Record,
    page_total: Option<Dataset>,
    subtotals: Vec<Dataset>,
    subtotal_dim: Vec<Vec<String>>,
}

impl PivotCube {
    /// Builds a cube over `data`. Fails if the expression is empty or the
    /// dimensions are missing, empty, repeat a column or name unknown columns.
    pub fn new<S: AsRef<str>>(data: Dataset, expression: Expression, dimensions: &[Vec<S>]) -> Result<Self> {
        if expression.is_empty() {
            return Err(Error::MissingExpression);
        }
        let mut cube = PivotCube {
            data,
            expression,
            dimensions: Vec::new(),
            summary: Dataset::new(),
            margins: Vec::new(),
            total: Record::new(),
            page_total: None,
            subtotals: Vec::new(),
            subtotal_dim: Vec::new(),
        };
        cube.dimension(dimensions)?;
        Ok(cube)
    }

    /// Builds a cube from a declarative configuration, then requests each
    /// configured subtotal in order.
    pub fn from_config(data: Dataset, config: &PivotConfig) -> Result<Self> {
        config.validate()?;
        let mut cube = PivotCube::new(data, config.expression(), &config.dimensions)?;
        for subtotal in &config.subtotals {
            cube.subtotal(subtotal)?;
        }
        Ok(cube)
    }

    /// (Re)builds summary, margins, total and page totals for `dimensions`.
    /// Existing subtotals are discarded.
    pub fn dimension<S: AsRef<str>>(&mut self, dimensions: &[Vec<S>]) -> Result<()> {
        let dimensions = validate_dimensions(&self.data, dimensions)?;
        let crosstab: Vec<String> = dimensions.concat();

        let mut summary = self.data.aggregate(&crosstab, &self.expression);
        summary.reorder(PIVOT_ORDER, &crosstab)?;

        let mut margins = Vec::with_capacity(dimensions.len());
        for dimension in &dimensions {
            let mut margin = self.data.aggregate(dimension, &self.expression);
            margin.reorder(PIVOT_ORDER, dimension)?.count_leaves();
            margins.push(margin);
        }

        let page_total = if dimensions.len() > 2 {
            let columns = page_columns(&dimensions);
            let mut page = self.data.aggregate(&columns, &self.expression);
            page.reorder(PIVOT_ORDER, &columns)?.count_leaves();
            Some(page)
        } else {
            None
        };

        self.total = self.data.reduce(&self.expression);
        self.summary = summary;
        self.margins = margins;
        self.page_total = page_total;
        self.subtotals.clear();
        self.subtotal_dim.clear();

        debug!(
            "Built cube over {} dimensions: {} summary cells, margins {:?}",
            dimensions.len(),
            self.summary.len(),
            self.margins.iter().map(Dataset::len).collect::<Vec<_>>()
        );
        self.dimensions = dimensions;
        Ok(())
    }

    /// Requests a subtotal over `columns` and splices its entries into the
    /// margins. Returns the subtotal's id; asking again for the same column
    /// list (same order) returns the existing id without changes.
    pub fn subtotal<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<usize> {
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        if columns.is_empty() {
            return Err(Error::EmptySubtotal);
        }
        if let Some(id) = self.locate(&columns) {
            debug!("Subtotal {:?} already present as #{}", columns, id);
            return Ok(id);
        }

        let crosstab = self.crosstab();
        let mut chosen: FxHashSet<String> = FxHashSet::default();
        for column in &columns {
            if !crosstab.contains(column) {
                return Err(Error::UnknownColumn(column.clone()));
            }
            if !chosen.insert(column.clone()) {
                return Err(Error::DuplicateColumn(column.clone()));
            }
        }

        let ordered: Vec<String> = crosstab.into_iter().filter(|c| chosen.contains(c)).collect();
        let mut subtotal = self.data.aggregate(&ordered, &self.expression);
        subtotal.reorder(SUBTOTAL_ORDER, &ordered)?;
        self.subtotals.push(subtotal);
        self.subtotal_dim.push(columns);
        let id = self.subtotals.len() - 1;

        let mut spliced = 0;
        for (m, margin) in self.margins.iter_mut().enumerate() {
            spliced += splice_margin(&self.data, &self.expression, margin, &self.dimensions[m], &chosen, id)?;

            // A subtotal over exactly the preceding dimensions becomes a
            // trailing Total across this one.
            let preceding: FxHashSet<&str> = self.dimensions[..m].iter().flatten().map(String::as_str).collect();
            if m > 0 && preceding.len() == chosen.len() && chosen.iter().all(|c| preceding.contains(c.as_str())) {
                let free = margin.ordered(PIVOT_ORDER).map_or(false, |i| i.root().get(&Key::Subtotal).is_none());
                if let Some(index) = margin.ordered_mut(PIVOT_ORDER).filter(|_| free) {
                    let entry = SubtotalEntry {
                        subtotal: id,
                        row: self.total.clone(),
                    };
                    index.root_mut().set(Key::Subtotal, IndexNode::Subtotal(entry));
                    index.count_leaves();
                    spliced += 1;
                }
            }
        }

        if let Some(page) = self.page_total.as_mut() {
            let columns = page_columns(&self.dimensions);
            spliced += splice_margin(&self.data, &self.expression, page, &columns, &chosen, id)?;
        }

        debug!(
            "Subtotal #{} over {:?}: {} groups, {} entries spliced",
            id,
            self.subtotal_dim[id],
            self.subtotals[id].len(),
            spliced
        );
        Ok(id)
    }

    /// Position of a subtotal previously requested with exactly `columns`.
    pub fn locate<S: AsRef<str>>(&self, columns: &[S]) -> Option<usize> {
        self.subtotal_dim.iter().position(|existing| {
            existing.len() == columns.len() && existing.iter().zip(columns).all(|(a, b)| a == b.as_ref())
        })
    }

    /// The summary row for a full crossing, in dimension order.
    pub fn lookup(&self, crossing: &[Key]) -> Option<Record> {
        self.summary.find_path(PIVOT_ORDER, crossing)
    }

    /// Applies `callback` to every row of the summary, margins, page total and
    /// subtotals, merging the returned fields in place. The total gets the same
    /// treatment. Useful for averages and other ratios of aggregated columns.
    pub fn ratio<F>(&mut self, mut callback: F)
    where
        F: FnMut(&Record) -> Option<Record>,
    {
        let mut updated = self.summary.update(|row, _| callback(row));
        for margin in self.margins.iter_mut().chain(self.page_total.as_mut()) {
            updated += margin.update(|row, _| callback(row));
        }
        for subtotal in &mut self.subtotals {
            updated += subtotal.update(|row, _| callback(row));
        }
        if let Some(fields) = callback(&self.total) {
            self.total.merge(&fields);
        }
        debug!("Applied ratio to {} aggregate rows", updated);
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn dimensions(&self) -> &[Vec<String>] {
        &self.dimensions
    }

    /// Every dimension column, in dimension order.
    pub fn crosstab(&self) -> Vec<String> {
        self.dimensions.concat()
    }

    pub fn summary(&self) -> &Dataset {
        &self.summary
    }

    pub fn margins(&self) -> &[Dataset] {
        &self.margins
    }

    pub fn margin(&self, dimension: usize) -> Option<&Dataset> {
        self.margins.get(dimension)
    }

    pub fn total(&self) -> &Record {
        &self.total
    }

    /// Margin over dimensions 0 and 2, present for cubes of three or more dimensions.
    pub fn page_total(&self) -> Option<&Dataset> {
        self.page_total.as_ref()
    }

    /// The grand total per page: margin 0, when page totals exist.
    pub fn page_grand_total(&self) -> Option<&Dataset> {
        self.page_total.as_ref().and(self.margins.first())
    }

    pub fn subtotals(&self) -> &[Dataset] {
        &self.subtotals
    }

    /// Column lists subtotals were requested with, parallel to `subtotals()`.
    pub fn subtotal_dims(&self) -> &[Vec<String>] {
        &self.subtotal_dim
    }
}

impl Deref for PivotCube {
    type Target = Dataset;

    fn deref(&self) -> &Dataset {
        &self.data
    }
}

fn validate_dimensions<S: AsRef<str>>(data: &Dataset, dimensions: &[Vec<S>]) -> Result<Vec<Vec<String>>> {
    if dimensions.is_empty() {
        return Err(Error::MissingDimensions);
    }
    let mut seen = FxHashSet::default();
    let mut result = Vec::with_capacity(dimensions.len());
    for (d, dimension) in dimensions.iter().enumerate() {
        if dimension.is_empty() {
            return Err(Error::EmptyDimension(d));
        }
        let mut columns = Vec::with_capacity(dimension.len());
        for column in dimension {
            let column = column.as_ref();
            if !data.has_column(column) {
                return Err(Error::UnknownColumn(column.to_string()));
            }
            if !seen.insert(column.to_string()) {
                return Err(Error::DuplicateColumn(column.to_string()));
            }
            columns.push(column.to_string());
        }
        result.push(columns);
    }
    Ok(result)
}

fn page_columns(dimensions: &[Vec<String>]) -> Vec<String> {
    let mut columns = dimensions[0].clone();
    columns.extend(dimensions[2].iter().cloned());
    columns
}

/// Splice subtotal entries into one margin. The subtotal's columns within
/// `dimension` must form a proper prefix of it; entries go under each branch
/// at that depth whose keys match a row of the intersection aggregate.
fn splice_margin(
    data: &Dataset,
    expression: &Expression,
    margin: &mut Dataset,
    dimension: &[String],
    chosen: &FxHashSet<String>,
    id: usize,
) -> Result<usize> {
    let columns: Vec<String> = dimension.iter().filter(|c| chosen.contains(*c)).cloned().collect();
    let depth = columns.len();
    if depth == 0 || depth >= dimension.len() || columns[..] != dimension[..depth] {
        return Ok(0);
    }

    let mut intersection = data.aggregate(&columns, expression);
    intersection.reorder(SUBTOTAL_ORDER, &columns)?;

    let Some(index) = margin.ordered_mut(PIVOT_ORDER) else {
        return Ok(0);
    };
    let mut crossing = Vec::with_capacity(depth);
    let spliced = splice(index.root_mut(), &mut crossing, depth, &intersection, id);
    index.count_leaves();
    Ok(spliced)
}

fn splice(node: &mut Branch, crossing: &mut Vec<Key>, depth: usize, intersection: &Dataset, id: usize) -> usize {
    let mut spliced = 0;
    let keys: Vec<Key> = node.keys().iter().filter(|k| !k.is_subtotal()).cloned().collect();
    for key in keys {
        crossing.push(key.clone());
        if let Some(IndexNode::Branch(child)) = node.get_mut(&key) {
            if crossing.len() == depth {
                // The first subtotal to reach a branch keeps it.
                if child.get(&Key::Subtotal).is_some() {
                    trace!("Branch {:?} already carries a subtotal", crossing);
                } else if let Some(row) = intersection.find_path(SUBTOTAL_ORDER, crossing) {
                    trace!("Splicing subtotal #{} under {:?}", id, crossing);
                    child.set(Key::Subtotal, IndexNode::Subtotal(SubtotalEntry { subtotal: id, row }));
                    spliced += 1;
                }
            } else {
                spliced += splice(child, crossing, depth, intersection, id);
            }
        }
        crossing.pop();
    }
    spliced
}

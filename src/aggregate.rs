/// CubeFrame Aggregation
///
/// An `Expression` is an ordered set of named reducers. A reducer is a pure
/// function of `(previous, row) -> next`, where `previous` is `None` for the
/// first row of a group. Groups are folded strictly left to right in the
/// dataset's live row order.
///
/// `sum`, `count`, `min` and `max` do not depend on row order. `first` and
/// `last` are order-sensitive: their result changes if rows are visited in a
/// different order.
///
/// # Examples
///
/// ```
/// use cubeframe::{record, Dataset, Expression, Value, sum, count};
/// use std::rc::Rc;
///
/// let data = Dataset::from_records(vec![
///     record! { "region" => "E", "revenue" => 10 },
///     record! { "region" => "W", "revenue" => 7 },
/// ]);
///
/// let expression = Expression::new()
///     .with("revenue", sum("revenue"))
///     .with("rows", count())
///     .with("scaled", Rc::new(|previous: Option<&Value>, row: &cubeframe::Record| {
///         let so_far = previous.and_then(Value::as_f64).unwrap_or(0.0);
///         Value::from(so_far + row.value("revenue").as_f64().unwrap_or(0.0) / 100.0)
///     }));
///
/// let total = data.reduce(&expression);
/// assert_eq!(total.value("revenue").as_f64(), Some(17.0));
/// assert_eq!(total.value("rows").as_f64(), Some(2.0));
/// ```

use crate::dataset::{Dataset, PRIMARY};
use crate::index::{GroupingIndex, Index};
use crate::record::Record;
use crate::value::Value;
use log::debug;
use std::fmt;
use std::rc::Rc;

/// Folding step for one output column
pub type Reducer = Rc<dyn Fn(Option<&Value>, &Record) -> Value>;

/// Named reducers, applied in insertion order
#[derive(Clone, Default)]
pub struct Expression {
    reducers: Vec<(String, Reducer)>,
}

impl Expression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a named reducer, builder style.
    pub fn with(mut self, name: impl Into<String>, reducer: Reducer) -> Self {
        self.push(name, reducer);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, reducer: Reducer) {
        let name = name.into();
        match self.reducers.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = reducer,
            None => self.reducers.push((name, reducer)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.reducers.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }

    /// Applies every reducer to `row` against the running accumulator.
    pub fn fold(&self, previous: Option<&Record>, row: &Record) -> Record {
        self.reducers
            .iter()
            .map(|(name, reducer)| {
                let value = reducer(previous.and_then(|p| p.get(name)), row);
                (name.clone(), value)
            })
            .collect()
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Group live rows of `data` by `columns`, one output row per group.
///
/// Each output row holds the group's key columns followed by the reducer
/// outputs. The result carries a `primary` grouping index over `columns`.
pub fn aggregate<S: AsRef<str>>(data: &Dataset, columns: &[S], expression: &Expression) -> Dataset {
    let mut result = Dataset::new();
    let mut primary = GroupingIndex::with_columns(columns);

    for (_, row) in data.rows() {
        let group = row.project(columns);
        let next = result.len();
        let slot = primary.add(&group, next);
        let previous = if slot == next { None } else { result.row(slot) };

        let mut item = group.clone();
        item.merge(&expression.fold(previous.as_ref(), &row));
        // Key columns win over reducer outputs of the same name.
        item.merge(&group);
        if slot == next {
            result.push(&item);
        } else {
            result.insert(&item, slot);
        }
    }

    debug!(
        "Aggregated {} rows into {} groups by {:?}",
        data.live_count(),
        result.len(),
        columns.iter().map(AsRef::as_ref).collect::<Vec<&str>>()
    );
    result.register_index(PRIMARY, Index::Grouping(primary));
    result
}

/// Fold every live row of `data` into one record, without grouping.
pub fn reduce(data: &Dataset, expression: &Expression) -> Record {
    let mut result: Option<Record> = None;
    for (_, row) in data.rows() {
        result = Some(expression.fold(result.as_ref(), &row));
    }
    debug!("Reduced {} rows", data.live_count());
    result.unwrap_or_default()
}

fn number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| !v.is_nan())
}

/// Running numeric total of `column`. Non-numeric cells contribute nothing.
pub fn sum(column: &str) -> Reducer {
    let column = column.to_string();
    Rc::new(move |previous: Option<&Value>, row: &Record| {
        let so_far = previous.and_then(Value::as_f64).unwrap_or(0.0);
        Value::from(so_far + number(row.value(&column)).unwrap_or(0.0))
    })
}

/// Number of rows in the group.
pub fn count() -> Reducer {
    Rc::new(|previous: Option<&Value>, _: &Record| {
        Value::from(previous.and_then(Value::as_f64).unwrap_or(0.0) + 1.0)
    })
}

/// Smallest numeric value of `column`; null if the group has none.
pub fn min(column: &str) -> Reducer {
    extremum(column, f64::min)
}

/// Largest numeric value of `column`; null if the group has none.
pub fn max(column: &str) -> Reducer {
    extremum(column, f64::max)
}

fn extremum(column: &str, pick: fn(f64, f64) -> f64) -> Reducer {
    let column = column.to_string();
    Rc::new(move |previous: Option<&Value>, row: &Record| {
        let so_far = previous.and_then(Value::as_f64);
        match (so_far, number(row.value(&column))) {
            (Some(a), Some(b)) => Value::from(pick(a, b)),
            (a, b) => Value::from(a.or(b)),
        }
    })
}

/// Value of `column` in the first row visited. Order-sensitive.
pub fn first(column: &str) -> Reducer {
    let column = column.to_string();
    Rc::new(move |previous: Option<&Value>, row: &Record| match previous {
        Some(value) => value.clone(),
        None => row.value(&column).clone(),
    })
}

/// Value of `column` in the last row visited. Order-sensitive.
pub fn last(column: &str) -> Reducer {
    let column = column.to_string();
    Rc::new(move |_: Option<&Value>, row: &Record| row.value(&column).clone())
}

/// CubeFrame Pivot Configuration
///
/// Declarative description of a cube, loadable from JSON:
///
/// ```json
/// {
///   "dimensions": [["region"], ["quarter"]],
///   "measures": {
///     "revenue": { "op": "sum", "column": "revenue" },
///     "orders": { "op": "count" }
///   },
///   "subtotals": [["region"]]
/// }
/// ```
///
/// Measures are applied in name order.

use crate::aggregate::{self, Expression, Reducer};
use crate::error::{Error, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A standard reducer over one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "column", rename_all = "lowercase")]
pub enum Measure {
    Sum(String),
    Count,
    Min(String),
    Max(String),
    First(String),
    Last(String),
}

impl Measure {
    pub fn reducer(&self) -> Reducer {
        match self {
            Measure::Sum(column) => aggregate::sum(column),
            Measure::Count => aggregate::count(),
            Measure::Min(column) => aggregate::min(column),
            Measure::Max(column) => aggregate::max(column),
            Measure::First(column) => aggregate::first(column),
            Measure::Last(column) => aggregate::last(column),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PivotConfig {
    pub dimensions: Vec<Vec<String>>,
    pub measures: BTreeMap<String, Measure>,
    #[serde(default)]
    pub subtotals: Vec<Vec<String>>,
}

impl PivotConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the configuration without looking at any data.
    pub fn validate(&self) -> Result<()> {
        if self.measures.is_empty() {
            return Err(Error::MissingExpression);
        }
        if self.dimensions.is_empty() {
            return Err(Error::MissingDimensions);
        }

        let mut columns = FxHashSet::default();
        for (d, dimension) in self.dimensions.iter().enumerate() {
            if dimension.is_empty() {
                return Err(Error::EmptyDimension(d));
            }
            for column in dimension {
                if !columns.insert(column.as_str()) {
                    return Err(Error::DuplicateColumn(column.clone()));
                }
            }
        }

        for subtotal in &self.subtotals {
            if subtotal.is_empty() {
                return Err(Error::EmptySubtotal);
            }
            if let Some(unknown) = subtotal.iter().find(|c| !columns.contains(c.as_str())) {
                return Err(Error::UnknownColumn(unknown.clone()));
            }
        }
        Ok(())
    }

    pub fn expression(&self) -> Expression {
        self.measures
            .iter()
            .fold(Expression::new(), |expression, (name, measure)| {
                expression.with(name.as_str(), measure.reducer())
            })
    }
}

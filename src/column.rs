/// CubeFrame Column Implementation
///
/// A Column is an array-like random-access sequence of values indexed by row
/// position. Columns are allowed to lag behind the dataset that owns them:
/// any position past the stored values reads as null, and writing past the
/// end backfills the gap with nulls.

use crate::value::{Value, NULL};
use std::fmt::Debug;

#[derive(Clone)]
pub struct Column {
    name: String,
    values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn with_values(name: impl Into<String>, values: Vec<Value>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of physically stored positions (may be shorter than the dataset).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&NULL)
    }

    /// Write a value at `index`, growing the column with nulls if needed.
    pub fn set(&mut self, index: usize, value: Value) {
        if index < self.values.len() {
            self.values[index] = value;
        } else {
            self.values.resize(index, Value::Null);
            self.values.push(value);
        }
    }

    pub fn iter(&self) -> ColumnIterator<'_> {
        ColumnIterator {
            column: self,
            index: 0,
        }
    }
}

pub struct ColumnIterator<'a> {
    column: &'a Column,
    index: usize,
}

impl<'a> Iterator for ColumnIterator<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.column.len() {
            None
        } else {
            let result = self.column.get(self.index);
            self.index += 1;
            Some(result)
        }
    }
}

impl Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Column {{ name: '{}', len: {} }}", self.name, self.len())
    }
}

/// CubeFrame Record
///
/// A `Record` is one row projected out of a dataset: an ordered mapping from
/// column name to `Value`. Field order is the order columns were first set,
/// which for dataset rows is the dataset's column order.
///
/// # Examples
///
/// ```
/// use cubeframe::{record, Value};
///
/// let mut row = record! { "region" => "E", "revenue" => 10 };
/// row.set("revenue", 12);
///
/// assert_eq!(row.len(), 2);
/// assert_eq!(row.value("revenue").as_f64(), Some(12.0));
/// assert!(row.value("missing").is_null());
/// ```

use crate::value::{Value, NULL};
use serde::ser::{Serialize, SerializeMap, Serializer};
use smallvec::SmallVec;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: SmallVec<[(String, Value); 8]>,
}

impl Record {
    pub fn new() -> Self {
        Record { fields: SmallVec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Record {
            fields: SmallVec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == column)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Value of a column, reading absent columns as null.
    pub fn value(&self, column: &str) -> &Value {
        self.get(column).unwrap_or(&NULL)
    }

    /// Set a field, replacing it in place if the column is already present.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let position = self.fields.iter().position(|(name, _)| name == column)?;
        Some(self.fields.remove(position).1)
    }

    /// Copy every field of `other` into this record.
    pub fn merge(&mut self, other: &Record) {
        for (column, value) in other.iter() {
            self.set(column, value.clone());
        }
    }

    /// A record holding just `columns`, in that order. Absent columns are null.
    pub fn project<S: AsRef<str>>(&self, columns: &[S]) -> Record {
        let mut result = Record::with_capacity(columns.len());
        for column in columns {
            let column = column.as_ref();
            result.set(column, self.value(column).clone());
        }
        result
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.fields.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.set(column, value);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = smallvec::IntoIter<[(String, Value); 8]>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Build a `Record` from `column => value` pairs.
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $( record.set($column, $value); )+
        record
    }};
}

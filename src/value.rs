/// CubeFrame Values
///
/// A `Value` is a single cell: a number, a string, or null. Every column of a
/// dataset holds values of any of these kinds side by side.
///
/// A `Key` is what index levels are keyed by. It is either a plain value or the
/// reserved `Subtotal` marker that pivot cubes splice into their margins. The
/// marker can never collide with data because it is a separate variant.
///
/// # Ordering
///
/// Values sort `Null < Number < String`. Numbers compare numerically and NaN
/// sorts after every other number (all NaNs are equal), so sorting is total
/// and reproducible. `Key::Subtotal` sorts after every value.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Cell value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Number(f64),
    String(String),
}

/// Shared null returned for cells that were never written.
pub(crate) static NULL: Value = Value::Null;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            },
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Number(v) => {
                // 0.0 and -0.0 are equal, as are all NaNs.
                let bits = if v.is_nan() {
                    f64::NAN.to_bits()
                } else if *v == 0.0 {
                    0
                } else {
                    v.to_bits()
                };
                bits.hash(state);
            }
            Value::String(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(v) => write!(f, "{}", v),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Index level key
///
/// The derived ordering places every `Value` before `Subtotal`, so injected
/// totals are visited after the entries they summarise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Value(Value),
    /// Marks a subtotal entry spliced into a pivot margin.
    Subtotal,
}

impl Key {
    pub fn is_subtotal(&self) -> bool {
        matches!(self, Key::Subtotal)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Key::Value(v) => Some(v),
            Key::Subtotal => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Value(v) => v.fmt(f),
            Key::Subtotal => f.write_str("Total"),
        }
    }
}

macro_rules! key_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Key {
                fn from(v: $t) -> Self {
                    Key::Value(v.into())
                }
            }
        )*
    };
}

key_from!(Value, f64, i32, i64, usize, &str, String);

//! Typed column values and their total ordering
//!
//! Ordering rules:
//! - Null sorts lowest
//! - Bool < numeric < string
//! - Int and Long compare numerically with each other
//! - Double uses total ordering; integers compare with doubles exactly

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Boolean
    Bool,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 64-bit floating point
    Double,
    /// UTF-8 string
    Varchar,
}

impl ColumnType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnType::Bool => "bool",
            ColumnType::Int => "int",
            ColumnType::Long => "long",
            ColumnType::Double => "double",
            ColumnType::Varchar => "varchar",
        }
    }

    /// Returns true if a value is storable in a column of this type
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (ColumnType::Bool, Value::Bool(_))
                | (ColumnType::Int, Value::Int(_))
                | (ColumnType::Long, Value::Long(_))
                | (ColumnType::Double, Value::Double(_))
                | (ColumnType::Varchar, Value::Varchar(_))
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// String comparison rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collation {
    /// Code-point comparison
    Binary,
    /// Case-folded comparison; "X" and "x" compare equal
    CaseInsensitive,
}

impl Collation {
    /// Compares two strings under this collation
    pub fn compare_str(&self, a: &str, b: &str) -> Ordering {
        match self {
            Collation::Binary => a.cmp(b),
            Collation::CaseInsensitive => a
                .chars()
                .flat_map(char::to_lowercase)
                .cmp(b.chars().flat_map(char::to_lowercase)),
        }
    }
}

/// A single column value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL null
    Null,
    /// Boolean
    Bool(bool),
    /// Narrow integer
    Int(i32),
    /// Wide integer
    Long(i64),
    /// Floating point
    Double(f64),
    /// String
    Varchar(String),
}

impl Value {
    /// Create a varchar value
    pub fn varchar(s: impl Into<String>) -> Self {
        Value::Varchar(s.into())
    }

    /// Returns true for SQL null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Long(_) | Value::Double(_) => 2,
            Value::Varchar(_) => 3,
        }
    }

    /// Compares under the given collation; collation only affects strings.
    pub fn compare_collated(&self, other: &Value, collation: Option<Collation>) -> Ordering {
        match (self, other, collation) {
            (Value::Varchar(a), Value::Varchar(b), Some(c)) => c.compare_str(a, b),
            _ => self.cmp(other),
        }
    }

    fn compare_numeric(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Long(a), Value::Long(b)) => a.cmp(b),
            (Value::Int(a), Value::Long(b)) => i64::from(*a).cmp(b),
            (Value::Long(a), Value::Int(b)) => a.cmp(&i64::from(*b)),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::Double(a), b) => compare_integer_double(b.as_i64(), *a).reverse(),
            (a, Value::Double(b)) => compare_integer_double(a.as_i64(), *b),
            _ => Ordering::Equal,
        }
    }

    fn as_i64(&self) -> i64 {
        match self {
            Value::Int(v) => i64::from(*v),
            Value::Long(v) => *v,
            _ => 0,
        }
    }

    /// Converts to a JSON value for CLI output and logging
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Long(v) => serde_json::Value::from(*v),
            Value::Double(v) => serde_json::Value::from(*v),
            Value::Varchar(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Converts a JSON scalar into a value of the given column type
    pub fn from_json(value: &serde_json::Value, column_type: ColumnType) -> Option<Self> {
        use serde_json::Value as Json;

        match (value, column_type) {
            (Json::Null, _) => Some(Value::Null),
            (Json::Bool(b), ColumnType::Bool) => Some(Value::Bool(*b)),
            (Json::Number(n), ColumnType::Int) => {
                n.as_i64().and_then(|v| i32::try_from(v).ok()).map(Value::Int)
            }
            (Json::Number(n), ColumnType::Long) => n.as_i64().map(Value::Long),
            (Json::Number(n), ColumnType::Double) => n.as_f64().map(Value::Double),
            (Json::String(s), ColumnType::Varchar) => Some(Value::Varchar(s.clone())),
            _ => None,
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

/// Exact integer/double comparison, placed the way `f64::total_cmp` places
/// the integer's exact value
fn compare_integer_double(integer: i64, double: f64) -> Ordering {
    const TWO_63: f64 = 9_223_372_036_854_775_808.0;
    if double.is_nan() {
        return if double.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if double >= TWO_63 {
        return Ordering::Less;
    }
    if double < -TWO_63 {
        return Ordering::Greater;
    }
    let whole = double.trunc();
    match integer.cmp(&(whole as i64)) {
        Ordering::Equal if double > whole => Ordering::Less,
        Ordering::Equal if double < whole => Ordering::Greater,
        // zero sits above -0.0 like +0.0 does
        Ordering::Equal if integer == 0 => 0.0f64.total_cmp(&double),
        other => other,
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a_rank, b_rank) = (self.type_rank(), other.type_rank());
        if a_rank != b_rank {
            return a_rank.cmp(&b_rank);
        }

        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Varchar(a), Value::Varchar(b)) => a.cmp(b),
            _ => self.compare_numeric(other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Varchar(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Varchar(v.to_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sorts_lowest() {
        let values = vec![
            Value::Null,
            Value::Bool(false),
            Value::Int(-5),
            Value::varchar("a"),
        ];
        for i in 1..values.len() {
            assert!(values[i - 1] < values[i]);
        }
    }

    #[test]
    fn test_narrow_and_wide_integers_compare_numerically() {
        assert_eq!(Value::Int(7), Value::Long(7));
        assert!(Value::Int(7) < Value::Long(8));
        assert!(Value::Long(-1) < Value::Int(0));
        assert!(Value::Double(1.5) > Value::Int(1));
    }

    #[test]
    fn test_wide_integers_compare_exactly_with_doubles() {
        let two_53 = 1i64 << 53;
        let double = Value::Double(two_53 as f64);
        assert_eq!(Value::Long(two_53), double);
        assert!(Value::Long(two_53 + 1) > double);
        assert!(double < Value::Long(two_53 + 1));

        assert!(Value::Long(i64::MAX) < Value::Double(9.3e18));
        assert!(Value::Long(i64::MIN) == Value::Double(-9_223_372_036_854_775_808.0));
        assert!(Value::Long(i64::MIN) > Value::Double(f64::NEG_INFINITY));
        assert!(Value::Int(-1) > Value::Double(-1.5));
        assert!(Value::Int(-2) < Value::Double(-1.5));
        assert!(Value::Int(0) > Value::Double(-0.5));
        assert!(Value::Int(0) > Value::Double(-0.0));
        assert!(Value::Long(0) < Value::Double(f64::NAN));
    }

    #[test]
    fn test_case_insensitive_collation() {
        let upper = Value::varchar("X");
        let lower = Value::varchar("x");
        assert_ne!(upper, lower);
        assert_eq!(
            upper.compare_collated(&lower, Some(Collation::CaseInsensitive)),
            Ordering::Equal
        );
        assert_eq!(
            Value::varchar("B").compare_collated(&Value::varchar("a"), Some(Collation::CaseInsensitive)),
            Ordering::Greater
        );
    }

    #[test]
    fn test_column_type_accepts() {
        assert!(ColumnType::Int.accepts(&Value::Int(1)));
        assert!(ColumnType::Int.accepts(&Value::Null));
        assert!(!ColumnType::Int.accepts(&Value::Long(1)));
        assert!(!ColumnType::Varchar.accepts(&Value::Int(1)));
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!(42);
        assert_eq!(Value::from_json(&json, ColumnType::Int), Some(Value::Int(42)));
        assert_eq!(Value::from_json(&json, ColumnType::Varchar), None);
        assert_eq!(
            Value::from_json(&serde_json::json!("r1"), ColumnType::Varchar),
            Some(Value::varchar("r1"))
        );
    }
}

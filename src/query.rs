//! Comparison operators for index queries and collection filters.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::common::{key_text, Error, Result, Value};

/// A comparison between a stored value (left) and a target value (right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    /// Regular-expression match of the stored value's text. Filters only.
    Match,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Match => "match",
        }
    }

    /// Whether an index can answer this operator without a scan.
    pub fn is_indexable(&self) -> bool {
        !matches!(self, Operator::Match)
    }

    /// Apply an ordering operator to a comparison result.
    ///
    /// `Match` never holds for a plain ordering.
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Le => ordering != Ordering::Greater,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Ge => ordering != Ordering::Less,
            Operator::Match => false,
        }
    }

    /// Evaluate `stored <op> target`.
    ///
    /// Numbers compare numerically, strings lexically, booleans with
    /// `false < true`. Values of different kinds are only ever `==` to
    /// nothing, so every operator yields `false` for them.
    ///
    /// # Errors
    /// `Error::InvalidInput` if `Match` is given a non-string or malformed pattern.
    pub fn evaluate(&self, stored: &Value, target: &Value) -> Result<bool> {
        if let Operator::Match = self {
            let pattern = target.as_str().ok_or_else(|| {
                Error::InvalidInput(format!("match pattern must be a string, got {}", target))
            })?;
            let regex = Regex::new(pattern)
                .map_err(|e| Error::InvalidInput(format!("bad match pattern: {}", e)))?;
            if stored.is_null() {
                return Ok(false);
            }
            return Ok(regex.is_match(&key_text(stored)));
        }

        Ok(compare_values(stored, target).is_some_and(|ord| self.holds(ord)))
    }
}

/// Order two values of the same kind; `None` for mismatched or unordered kinds.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return Some(x.cmp(&y));
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return Some(x.cmp(&y));
            }
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (x, y) if x == y => Some(Ordering::Equal),
        _ => None,
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "==" => Ok(Operator::Eq),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            "match" | "=~" => Ok(Operator::Match),
            other => Err(Error::InvalidWhereQuery(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

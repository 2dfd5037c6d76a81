//! The closed vocabulary of comparison conditions.
//!
//! Callers pick a [`Condition`]; the operator text is looked up here and is
//! never taken from data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How many operands a condition consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many operands.
    Exactly(usize),
    /// Any number of operands, including zero.
    Any,
}

impl Arity {
    /// Check whether `count` operands satisfy this arity.
    #[inline]
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => *n == count,
            Self::Any => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "exactly {}", n),
            Self::Any => f.write_str("any number of"),
        }
    }
}

/// A comparison condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    /// `=`
    Equal,
    /// `<>`
    NotEqual,
    /// `>`
    GreaterThan,
    /// `<`
    LessThan,
    /// `>=`
    GreaterOrEqual,
    /// `<=`
    LessOrEqual,
    /// `LIKE`
    Like,
    /// `ILIKE`
    Ilike,
    /// `BETWEEN ... AND ...`
    Between,
    /// `IN (...)`
    In,
}

impl Condition {
    /// Every condition, in declaration order.
    pub const ALL: [Condition; 10] = [
        Self::Equal,
        Self::NotEqual,
        Self::GreaterThan,
        Self::LessThan,
        Self::GreaterOrEqual,
        Self::LessOrEqual,
        Self::Like,
        Self::Ilike,
        Self::Between,
        Self::In,
    ];

    /// The operator token rendered into query text.
    pub const fn operator(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::Like => "LIKE",
            Self::Ilike => "ILIKE",
            Self::Between => "BETWEEN",
            Self::In => "IN",
        }
    }

    /// The wire name of the condition (e.g. `GREATER_THAN`).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::NotEqual => "NOT_EQUAL",
            Self::GreaterThan => "GREATER_THAN",
            Self::LessThan => "LESS_THAN",
            Self::GreaterOrEqual => "GREATER_OR_EQUAL",
            Self::LessOrEqual => "LESS_OR_EQUAL",
            Self::Like => "LIKE",
            Self::Ilike => "ILIKE",
            Self::Between => "BETWEEN",
            Self::In => "IN",
        }
    }

    /// The operand count this condition requires.
    pub const fn arity(&self) -> Arity {
        match self {
            Self::Between => Arity::Exactly(2),
            Self::In => Arity::Any,
            _ => Arity::Exactly(1),
        }
    }

    /// Look up a condition by wire name, ignoring case and surrounding whitespace.
    ///
    /// ```rust
    /// use sift_query::Condition;
    ///
    /// assert_eq!(Condition::from_name(" greater_than "), Some(Condition::GreaterThan));
    /// assert_eq!(Condition::from_name(">"), None);
    /// ```
    pub fn from_name(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown condition name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown condition `{0}`")]
pub struct UnknownCondition(pub String);

impl FromStr for Condition {
    type Err = UnknownCondition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownCondition(s.to_string()))
    }
}

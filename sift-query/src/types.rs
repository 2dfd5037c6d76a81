//! Sort order types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{QueryError, QueryResult};

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// Get the keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Build from an ascending flag.
    pub fn from_asc(asc: bool) -> Self {
        if asc { Self::Asc } else { Self::Desc }
    }

    /// Whether this is ascending.
    pub fn is_asc(&self) -> bool {
        matches!(self, Self::Asc)
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    field: String,
    order: SortOrder,
}

impl OrderItem {
    /// Create a sort key. The field is trimmed and must not be blank.
    pub fn new(field: &str, order: SortOrder) -> QueryResult<Self> {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Err(QueryError::invalid_field(field, "order field must not be blank"));
        }
        Ok(Self {
            field: trimmed.to_string(),
            order,
        })
    }

    /// The field path.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The sort direction.
    pub fn order(&self) -> SortOrder {
        self.order
    }
}

/// An insertion-ordered list of sort keys.
///
/// ```rust
/// use sift_query::OrderSpec;
///
/// let mut order = OrderSpec::new();
/// order.desc("dataVenda")?.asc("id")?;
/// assert_eq!(order.len(), 2);
/// # Ok::<(), sift_query::QueryError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderSpec {
    items: Vec<OrderItem>,
}

impl OrderSpec {
    /// Create an empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an ascending key.
    pub fn asc(&mut self, field: &str) -> QueryResult<&mut Self> {
        self.items.push(OrderItem::new(field, SortOrder::Asc)?);
        Ok(self)
    }

    /// Append a descending key.
    pub fn desc(&mut self, field: &str) -> QueryResult<&mut Self> {
        self.items.push(OrderItem::new(field, SortOrder::Desc)?);
        Ok(self)
    }

    /// Append an already built key.
    pub fn push(&mut self, item: OrderItem) -> &mut Self {
        self.items.push(item);
        self
    }

    /// Check if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Iterate the keys in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, OrderItem> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a OrderSpec {
    type Item = &'a OrderItem;
    type IntoIter = std::slice::Iter<'a, OrderItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

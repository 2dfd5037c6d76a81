//! Decoding of untrusted `field|CONDITION|value` filter tokens.
//!
//! Decoding is total: malformed or hostile tokens are dropped (and logged at
//! `debug`), never reported as errors. The result is cached per instance and
//! recomputed only after a mutation.
//!
//! ```rust
//! use sift_query::{Condition, FilterQuery, FilterValue};
//!
//! let mut query = FilterQuery::new(["preco|GREATER_THAN|19.90", "nome|LIKE|%foo", "junk"]);
//! query.allow_only(["preco", "nome"]);
//!
//! let items = query.filters();
//! assert_eq!(items.len(), 2);
//! assert_eq!(items[1].field(), "nome");
//! assert_eq!(items[1].condition(), Condition::Like);
//! assert_eq!(items[1].value(), &FilterValue::String("%foo".into()));
//! ```

use std::cell::OnceCell;
use std::collections::HashSet;
use std::sync::LazyLock;

use regex_lite::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::condition::Condition;
use crate::filter::{FilterValue, Predicate, PredicateSet};
use crate::security::Sanitizer;

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d{1,18}$").expect("integer pattern"));

static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+\.\d+$").expect("decimal pattern"));

/// A validated filter: field, condition and a single coerced operand.
///
/// Only [`FilterQuery`] produces these.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterItem {
    field: String,
    condition: Condition,
    value: FilterValue,
}

impl FilterItem {
    /// The validated field path.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The condition.
    pub fn condition(&self) -> Condition {
        self.condition
    }

    /// The coerced operand.
    pub fn value(&self) -> &FilterValue {
        &self.value
    }

    /// Convert into a single-operand predicate.
    pub fn to_predicate(&self) -> Predicate {
        Predicate::from_parts(self.field.clone(), self.condition, vec![self.value.clone()])
    }
}

/// A set of raw filter tokens plus the rules used to decode them.
///
/// Holds its decode cache in a [`OnceCell`], so it is not `Sync`; share it
/// across threads only behind a lock.
#[derive(Debug, Clone, Default)]
pub struct FilterQuery {
    tokens: Vec<String>,
    allowed: HashSet<String>,
    sanitizer: Sanitizer,
    cache: OnceCell<Vec<FilterItem>>,
}

impl FilterQuery {
    /// Create a decoder over the given raw tokens.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// The raw tokens.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Replace the raw tokens.
    pub fn set_tokens<I, S>(&mut self, tokens: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens = tokens.into_iter().map(Into::into).collect();
        self.cache.take();
        self
    }

    /// Restrict decoded fields to this set. An empty set lifts the restriction.
    pub fn allow_only<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = fields.into_iter().map(Into::into).collect();
        self.cache.take();
        self
    }

    /// Use a custom sanitizer.
    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self.cache.take();
        self
    }

    /// Decode the tokens, dropping anything that fails validation.
    pub fn filters(&self) -> &[FilterItem] {
        self.cache.get_or_init(|| self.decode_all())
    }

    /// Append every decoded item to `set` as a single-operand predicate.
    pub fn apply_to(&self, set: &mut PredicateSet) {
        for item in self.filters() {
            set.push(item.to_predicate());
        }
    }

    fn decode_all(&self) -> Vec<FilterItem> {
        let items: Vec<_> = self
            .tokens
            .iter()
            .filter_map(|token| self.decode(token))
            .collect();
        debug!(
            tokens = self.tokens.len(),
            decoded = items.len(),
            "Decoded filter tokens"
        );
        items
    }

    fn decode(&self, token: &str) -> Option<FilterItem> {
        if token.trim().is_empty() {
            return None;
        }

        let parts: Vec<&str> = token.splitn(3, '|').collect();
        let &[field, condition, value] = parts.as_slice() else {
            debug!(token, "Dropping filter token: expected field|CONDITION|value");
            return None;
        };

        let Some(field) = self.sanitizer.safe_field(field, Some(&self.allowed)) else {
            debug!(field, "Dropping filter token: field rejected");
            return None;
        };

        let Some(condition) = Condition::from_name(condition) else {
            debug!(%field, condition, "Dropping filter token: unknown condition");
            return None;
        };

        let Some(value) = self.sanitizer.safe_value(value) else {
            debug!(%field, "Dropping filter token: value rejected");
            return None;
        };

        Some(FilterItem {
            field,
            condition,
            value: coerce(value),
        })
    }
}

/// Coerce a sanitized value string into the narrowest fitting type.
fn coerce(value: String) -> FilterValue {
    if value.eq_ignore_ascii_case("true") {
        return FilterValue::Bool(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return FilterValue::Bool(false);
    }

    if INTEGER.is_match(&value) {
        if let Ok(v) = value.parse::<i64>() {
            return match i32::try_from(v) {
                Ok(small) => FilterValue::Int(small),
                Err(_) => FilterValue::BigInt(v),
            };
        }
    }

    // Inexact decimals (too many digits for 96 bits) stay strings.
    if DECIMAL.is_match(&value) {
        if let Ok(v) = Decimal::from_str_exact(&value) {
            return FilterValue::Decimal(v);
        }
    }

    FilterValue::String(value)
}

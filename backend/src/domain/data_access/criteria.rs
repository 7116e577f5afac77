//! Record, filter and read-option primitives for the record store port.
//!
//! Records travel as JSON objects keyed by camelCase field names. Filters
//! are [`Criteria`]: one [`Condition`] per field, all of which must hold,
//! plus an optional list of alternatives of which at least one must hold.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A persisted record as a JSON object.
pub type Record = serde_json::Map<String, Value>;

/// Name of a persisted entity type, e.g. `User`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityName(Cow<'static, str>);

impl EntityName {
    /// The user entity.
    pub const USER: Self = Self(Cow::Borrowed("User"));

    /// Name an entity type.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Predicate on one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value; `Equals(Value::Null)` behaves like [`Condition::IsNull`].
    Equals(Value),
    NotEquals(Value),
    In(Vec<Value>),
    /// Case-insensitive substring match on a string field.
    Contains(String),
    /// Case-insensitive prefix match on a string field.
    StartsWith(String),
    /// Field is null or absent.
    IsNull,
    NotNull,
    /// Inclusive bounds; timestamps compare chronologically.
    Range {
        gte: Option<Value>,
        lte: Option<Value>,
    },
}

impl Condition {
    /// Evaluate against a field value, `None` meaning the field is absent.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let value = value.filter(|v| !v.is_null());
        match self {
            Self::Equals(Value::Null) | Self::IsNull => value.is_none(),
            Self::NotNull => value.is_some(),
            Self::Equals(expected) => value == Some(expected),
            Self::NotEquals(expected) => value != Some(expected),
            Self::In(options) => value.is_some_and(|v| options.contains(v)),
            Self::Contains(needle) => string_value(value)
                .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
            Self::StartsWith(prefix) => string_value(value)
                .is_some_and(|s| s.to_lowercase().starts_with(&prefix.to_lowercase())),
            Self::Range { gte, lte } => value.is_some_and(|v| {
                let above = gte.as_ref().is_none_or(|low| {
                    matches!(compare_values(v, low), Some(Ordering::Greater | Ordering::Equal))
                });
                let below = lte.as_ref().is_none_or(|high| {
                    matches!(compare_values(v, high), Some(Ordering::Less | Ordering::Equal))
                });
                above && below
            }),
        }
    }
}

fn string_value(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str)
}

/// Order two JSON scalars: numbers numerically, RFC 3339 strings
/// chronologically, other strings lexically, booleans false-first.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => {
            match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
                (Ok(a), Ok(b)) => Some(a.cmp(&b)),
                _ => Some(a.cmp(b)),
            }
        }
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        _ => None,
    }
}

/// Filter over records.
///
/// # Examples
/// ```
/// use b2b_api::domain::data_access::{Condition, Criteria};
/// use serde_json::json;
///
/// let criteria = Criteria::new()
///     .with_condition("role", Condition::Equals(json!("ADMIN")))
///     .with_condition("deletedAt", Condition::IsNull);
/// let record = json!({ "role": "ADMIN", "deletedAt": null });
/// assert!(criteria.matches(record.as_object().expect("object")));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    all: BTreeMap<String, Condition>,
    any: Vec<(String, Condition)>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Criteria with a single field condition.
    pub fn field(field: impl Into<String>, condition: Condition) -> Self {
        Self::new().with_condition(field, condition)
    }

    /// Merge a condition into the criteria. Conditions on other fields are
    /// kept; a condition already present on `field` is replaced.
    #[must_use]
    pub fn with_condition(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.all.insert(field.into(), condition);
        self
    }

    /// Require at least one of `alternatives` to hold.
    #[must_use]
    pub fn with_any(mut self, alternatives: Vec<(String, Condition)>) -> Self {
        self.any = alternatives;
        self
    }

    /// Condition on `field`, if any.
    pub fn condition(&self, field: &str) -> Option<&Condition> {
        self.all.get(field)
    }

    /// Conditions that must all hold, ordered by field name.
    pub fn conditions(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.all.iter().map(|(field, condition)| (field.as_str(), condition))
    }

    /// Alternatives of which at least one must hold; empty means no constraint.
    pub fn alternatives(&self) -> &[(String, Condition)] {
        &self.any
    }

    /// Whether `record` satisfies the criteria.
    pub fn matches(&self, record: &Record) -> bool {
        let all = self
            .all
            .iter()
            .all(|(field, condition)| condition.matches(record.get(field)));
        let any = self.any.is_empty()
            || self
                .any
                .iter()
                .any(|(field, condition)| condition.matches(record.get(field)));
        all && any
    }
}

/// Sort direction for ordered reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// One ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Ordering and windowing applied to multi-record reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub order_by: Vec<OrderBy>,
    pub skip: Option<u64>,
    pub take: Option<u64>,
}

impl ReadOptions {
    /// Sort, skip and truncate an in-memory result set.
    pub fn apply(&self, mut records: Vec<Record>) -> Vec<Record> {
        if !self.order_by.is_empty() {
            records.sort_by(|a, b| {
                self.order_by
                    .iter()
                    .map(|order| {
                        let left = a.get(&order.field).unwrap_or(&Value::Null);
                        let right = b.get(&order.field).unwrap_or(&Value::Null);
                        let ordering = compare_values(left, right).unwrap_or(Ordering::Equal);
                        match order.direction {
                            SortDirection::Asc => ordering,
                            SortDirection::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }
        let skip = usize::try_from(self.skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let take = self
            .take
            .map_or(usize::MAX, |take| usize::try_from(take).unwrap_or(usize::MAX));
        records.into_iter().skip(skip).take(take).collect()
    }
}

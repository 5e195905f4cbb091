use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref CURRENCY_REGEX: Regex = Regex::new(r"[$€£¥]").unwrap();
    static ref NUMERIC_NOISE_REGEX: Regex = Regex::new(r"[$€£¥,\s]").unwrap();
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Contains,
    Equals,
    Greater,
    Less,
}

impl FilterOperator {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FilterOperator::Greater | FilterOperator::Less)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Contains => "contains",
            FilterOperator::Equals => "equals",
            FilterOperator::Greater => "greater",
            FilterOperator::Less => "less",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contains" | "~" => Ok(FilterOperator::Contains),
            "equals" | "eq" | "=" | "==" => Ok(FilterOperator::Equals),
            "greater" | "gt" | ">" => Ok(FilterOperator::Greater),
            "less" | "lt" | "<" => Ok(FilterOperator::Less),
            other => Err(format!("unknown operator: {}", other)),
        }
    }
}

/// A typed test of one column against one operand.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct FilterCondition {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl FilterCondition {
    pub fn new(column: &str, operator: FilterOperator, value: &str) -> Self {
        FilterCondition {
            column: column.to_string(),
            operator,
            value: value.to_string(),
        }
    }
}

/// Remove currency symbols from a value.
///
/// Only `$ € £ ¥` are removed; everything else, digits and separators
/// included, is kept as is.
pub fn strip_currency(value: &str) -> Cow<'_, str> {
    CURRENCY_REGEX.replace_all(value, "")
}

/// Parse a display value such as `"$1,250.50"` as a number.
///
/// # Returns
/// * `Option<f64>` - The parsed number, or `None` when the value is empty,
///   not numeric, or parses to NaN
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned = NUMERIC_NOISE_REGEX.replace_all(value, "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Evaluate one condition against one field value.
///
/// Total over arbitrary input: a numeric comparison where either side does
/// not parse as a number is simply unsatisfied.
///
/// # Arguments
/// * `field` - The record's value for the condition's column
/// * `condition` - The condition to test
///
/// # Returns
/// * `bool` - Whether the field satisfies the condition
///
/// # Examples
/// ```
/// use datatable::predicate::{evaluate, FilterCondition, FilterOperator};
///
/// let cond = FilterCondition::new("Price", FilterOperator::Greater, "$7");
/// assert!(evaluate("$10", &cond));
/// assert!(!evaluate("$5", &cond));
/// assert!(!evaluate("n/a", &cond));
/// ```
pub fn evaluate(field: &str, condition: &FilterCondition) -> bool {
    match condition.operator {
        FilterOperator::Contains => contains_ignore_case(field, &condition.value.to_lowercase()),
        FilterOperator::Equals => {
            normalize_for_equality(field) == normalize_for_equality(&condition.value)
        }
        FilterOperator::Greater => match (parse_number(field), parse_number(&condition.value)) {
            (Some(lhs), Some(rhs)) => lhs > rhs,
            _ => false,
        },
        FilterOperator::Less => match (parse_number(field), parse_number(&condition.value)) {
            (Some(lhs), Some(rhs)) => lhs < rhs,
            _ => false,
        },
    }
}

/// Case-insensitive substring test against an already lowercased needle.
pub(crate) fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(needle_lower)
}

fn normalize_for_equality(value: &str) -> String {
    strip_currency(value).trim().to_lowercase()
}

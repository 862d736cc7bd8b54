use std::cmp::Ordering;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::{Record, Value, ValueKind, parse_js_number, resolve_field};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOperator {
    #[default]
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Contains,
    StartsWith,
    EndsWith,
}

impl ComparisonOperator {
    pub fn label(&self) -> &'static str {
        use ComparisonOperator::*;
        match self {
            Equals => "=",
            NotEquals => "≠",
            GreaterThan => ">",
            LessThan => "<",
            GreaterOrEqual => "≥",
            LessOrEqual => "≤",
            Contains => "contains",
            StartsWith => "starts with",
            EndsWith => "ends with",
        }
    }
}

/// Boolean operator joining condition `i` to condition `i + 1`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connective {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterCondition {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub operator: ComparisonOperator,
    #[serde(default = "empty_value")]
    pub value: Value,
}

fn empty_value() -> Value {
    Value::String(String::new())
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, operator: ComparisonOperator, value: impl Into<Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// An unconfigured condition row: no field, `equals`, empty value.
    pub fn blank() -> Self {
        Self::new("", ComparisonOperator::Equals, empty_value())
    }
}

pub fn parse_filters(filters: &[String]) -> Result<Vec<FilterCondition>> {
    filters.iter().map(|f| parse_filter(f)).collect()
}

/// Parses `field <op> value` where `<op>` is a symbol (`=`, `==`, `!=`, `>`, `>=`,
/// `<`, `<=`) or one of the words `contains`, `startswith`, `endswith`.
pub fn parse_filter(filter: &str) -> Result<FilterCondition> {
    let trimmed = filter.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Empty filter expression"));
    }

    let lowered = trimmed.to_ascii_lowercase();
    for (needle, op) in [
        (" contains ", ComparisonOperator::Contains),
        (" startswith ", ComparisonOperator::StartsWith),
        (" endswith ", ComparisonOperator::EndsWith),
    ] {
        if let Some(idx) = lowered.find(needle) {
            let (left, right_with_space) = trimmed.split_at(idx);
            let right = right_with_space[needle.len()..].trim();
            return build_condition(left, op, right);
        }
    }

    // Earliest symbol wins so that values may themselves contain operators.
    let symbol = ["!=", ">=", "<=", "==", "=", ">", "<"]
        .into_iter()
        .filter_map(|needle| trimmed.find(needle).map(|idx| (idx, needle)))
        .min_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.len().cmp(&a.1.len())));
    if let Some((idx, needle)) = symbol {
        let op = match needle {
            "=" | "==" => ComparisonOperator::Equals,
            "!=" => ComparisonOperator::NotEquals,
            ">" => ComparisonOperator::GreaterThan,
            ">=" => ComparisonOperator::GreaterOrEqual,
            "<" => ComparisonOperator::LessThan,
            "<=" => ComparisonOperator::LessOrEqual,
            _ => unreachable!(),
        };
        return build_condition(&trimmed[..idx], op, &trimmed[idx + needle.len()..]);
    }

    Err(anyhow!("Failed to parse filter expression '{trimmed}'"))
}

fn build_condition(field: &str, operator: ComparisonOperator, raw: &str) -> Result<FilterCondition> {
    let field = field.trim();
    if field.is_empty() {
        return Err(anyhow!("Filter expression is missing a field name"));
    }
    Ok(FilterCondition::new(field, operator, unquote(raw.trim())))
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        if (bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Converts a condition value to the runtime kind of the value it is compared with.
pub fn coerce(value: &Value, reference: ValueKind) -> Value {
    match reference {
        ValueKind::Number => Value::Number(to_number(value)),
        ValueKind::Boolean => Value::Boolean(match value {
            Value::Boolean(b) => *b,
            Value::String(s) => s == "true",
            _ => false,
        }),
        ValueKind::String | ValueKind::Null => Value::String(value.as_display()),
    }
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Boolean(b) => f64::from(u8::from(*b)),
        Value::Number(n) => *n,
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => parse_js_number(s).unwrap_or(f64::NAN),
    }
}

pub fn evaluate_condition(record: &Record, condition: &FilterCondition) -> bool {
    use ComparisonOperator::*;

    if condition.field.trim().is_empty() {
        return true;
    }
    let resolved = resolve_field(record, &condition.field);

    if condition.value.is_empty() {
        let resolved_empty = resolved.is_none_or(Value::is_empty);
        match condition.operator {
            Equals => return resolved_empty,
            NotEquals => return !resolved_empty,
            _ => {}
        }
    }

    // A null value is no more comparable than a missing one.
    let Some(resolved) = resolved.filter(|value| !value.is_null()) else {
        return matches!(condition.operator, NotEquals);
    };

    match condition.operator {
        Contains | StartsWith | EndsWith => {
            let haystack = resolved.as_display().to_lowercase();
            let needle = condition.value.as_display().to_lowercase();
            match condition.operator {
                Contains => haystack.contains(&needle),
                StartsWith => haystack.starts_with(&needle),
                EndsWith => haystack.ends_with(&needle),
                _ => unreachable!(),
            }
        }
        Equals | NotEquals | GreaterThan | LessThan | GreaterOrEqual | LessOrEqual => {
            let right = coerce(&condition.value, resolved.kind());
            let ordering = resolved.partial_cmp(&right);
            match condition.operator {
                Equals => *resolved == right,
                NotEquals => *resolved != right,
                GreaterThan => ordering == Some(Ordering::Greater),
                LessThan => ordering == Some(Ordering::Less),
                GreaterOrEqual => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                LessOrEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                _ => unreachable!(),
            }
        }
    }
}

/// Folds condition results strictly left to right: `a AND b OR c` is `(a AND b) OR c`.
///
/// A missing connective is read as `AND`.
pub fn evaluate_conditions(
    record: &Record,
    conditions: &[FilterCondition],
    connectives: &[Connective],
) -> bool {
    let Some((first, rest)) = conditions.split_first() else {
        return true;
    };
    let mut result = evaluate_condition(record, first);
    for (idx, condition) in rest.iter().enumerate() {
        result = match connectives.get(idx).copied().unwrap_or_default() {
            Connective::And => result && evaluate_condition(record, condition),
            Connective::Or => result || evaluate_condition(record, condition),
        };
    }
    result
}

/// Keeps the records that pass the condition chain, in their original order.
pub fn filter_records(
    records: &[Record],
    conditions: &[FilterCondition],
    connectives: &[Connective],
) -> Vec<Record> {
    if conditions.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|record| evaluate_conditions(record, conditions, connectives))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ComparisonOperator::*;

    fn record() -> Record {
        Record::new()
            .with_field("platform", "Android")
            .with_field("time", 120)
            .with_field("isOfferApplied", true)
            .with_field("empty", "")
    }

    fn check(field: &str, op: ComparisonOperator, value: impl Into<Value>) -> bool {
        evaluate_condition(&record(), &FilterCondition::new(field, op, value))
    }

    #[test]
    fn coerce_follows_reference_kind() {
        assert_eq!(coerce(&Value::from("12"), ValueKind::Number), Value::Number(12.0));
        assert_eq!(coerce(&Value::from(""), ValueKind::Number), Value::Number(0.0));
        assert!(matches!(coerce(&Value::from("abc"), ValueKind::Number), Value::Number(n) if n.is_nan()));
        assert_eq!(coerce(&Value::from("true"), ValueKind::Boolean), Value::Boolean(true));
        assert_eq!(coerce(&Value::from("TRUE"), ValueKind::Boolean), Value::Boolean(false));
        assert_eq!(coerce(&Value::Number(5.0), ValueKind::String), Value::from("5"));
    }

    #[test]
    fn blank_field_passes_vacuously() {
        assert!(check("", Equals, "anything"));
        assert!(check("   ", GreaterThan, 5));
    }

    #[test]
    fn absent_field_only_matches_not_equals() {
        assert!(check("missing", NotEquals, 5));
        for op in [Equals, GreaterThan, LessThan, GreaterOrEqual, LessOrEqual, Contains, StartsWith, EndsWith] {
            assert!(!check("missing", op, 5), "{op:?} should be false on absent field");
        }
    }

    #[test]
    fn empty_condition_value_matches_empty_fields() {
        assert!(check("missing", Equals, ""));
        assert!(check("empty", Equals, Value::Null));
        assert!(!check("platform", Equals, ""));
        assert!(check("platform", NotEquals, ""));
        assert!(!check("empty", NotEquals, ""));
    }

    #[test]
    fn numeric_comparisons_coerce_condition_value() {
        assert!(check("time", Equals, "120"));
        assert!(check("time", GreaterThan, "100"));
        assert!(check("time", LessOrEqual, 120));
        assert!(!check("time", LessThan, "abc"));
        assert!(check("time", NotEquals, "abc"));
    }

    #[test]
    fn boolean_comparisons_accept_literal_text() {
        assert!(check("isOfferApplied", Equals, "true"));
        assert!(check("isOfferApplied", Equals, true));
        assert!(!check("isOfferApplied", Equals, "yes"));
    }

    #[test]
    fn string_operators_ignore_case() {
        assert!(check("platform", Contains, "DRO"));
        assert!(check("platform", StartsWith, "and"));
        assert!(check("platform", EndsWith, "OID"));
        assert!(check("time", StartsWith, "12"));
        assert!(!check("platform", Contains, "ios"));
    }

    fn row(a: bool, b: bool, c: bool) -> Record {
        Record::new()
            .with_field("a", a)
            .with_field("b", b)
            .with_field("c", c)
    }

    fn abc() -> [FilterCondition; 3] {
        [
            FilterCondition::new("a", Equals, true),
            FilterCondition::new("b", Equals, true),
            FilterCondition::new("c", Equals, true),
        ]
    }

    #[test]
    fn and_then_or_chain() {
        let connectives = [Connective::And, Connective::Or];
        assert!(evaluate_conditions(&row(false, false, true), &abc(), &connectives));
        assert!(evaluate_conditions(&row(true, true, false), &abc(), &connectives));
        assert!(!evaluate_conditions(&row(true, false, false), &abc(), &connectives));
    }

    #[test]
    fn or_then_and_chain_ignores_precedence() {
        let connectives = [Connective::Or, Connective::And];
        // `(a OR b) AND c`, not `a OR (b AND c)`.
        assert!(!evaluate_conditions(&row(true, false, false), &abc(), &connectives));
        assert!(evaluate_conditions(&row(true, false, true), &abc(), &connectives));
    }

    #[test]
    fn missing_connectives_default_to_and() {
        assert!(!evaluate_conditions(&row(true, true, false), &abc(), &[]));
        assert!(evaluate_conditions(&row(true, true, true), &abc(), &[]));
    }

    #[test]
    fn parse_filter_supports_symbols_and_words() {
        let parsed = parse_filter("time >= 100").unwrap();
        assert_eq!(parsed.field, "time");
        assert_eq!(parsed.operator, GreaterOrEqual);
        assert_eq!(parsed.value, Value::from("100"));

        let parsed = parse_filter("platform contains 'And'").unwrap();
        assert_eq!(parsed.operator, Contains);
        assert_eq!(parsed.value, Value::from("And"));

        let parsed = parse_filter("url = a>=b").unwrap();
        assert_eq!(parsed.operator, Equals);
        assert_eq!(parsed.value, Value::from("a>=b"));

        let parsed = parse_filter("status != ").unwrap();
        assert_eq!(parsed.operator, NotEquals);
        assert!(parsed.value.is_empty());

        assert!(parse_filter("   ").is_err());
        assert!(parse_filter("= 5").is_err());
        assert!(parse_filter("no operator here").is_err());
    }
}

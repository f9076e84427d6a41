//! The shared condition predicate.
//!
//! One switch over the operator, used by both the rule evaluator and
//! the fee pipeline. Every arm is total: coercion failures, missing
//! fields, and unknown operators all resolve to `false` -- the engine
//! fails closed and never throws into the surrounding form.

use rubric_core::{Condition, FormData, Operator, Value};

use crate::numeric::{to_decimal, to_timestamp};

/// Knobs for the predicate's string handling.
///
/// String operators other than equality always compare
/// case-insensitively. Equality is exact for the rule evaluator but
/// case-insensitive in the fee pipeline, which inherited the older
/// lowercase-compare behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    pub case_insensitive_equality: bool,
}

impl MatchOptions {
    /// Options used by the fee pipeline.
    pub fn fee() -> MatchOptions {
        MatchOptions {
            case_insensitive_equality: true,
        }
    }
}

/// Evaluate a condition against the form snapshot.
pub fn matches(condition: &Condition, form: &FormData, options: MatchOptions) -> bool {
    let actual = form.get(&condition.field).unwrap_or(&Value::Null);
    let expected = &condition.value;

    match &condition.operator {
        Operator::Equals => text_eq(actual, expected, options),
        Operator::NotEquals => !text_eq(actual, expected, options),

        Operator::Contains => lower(actual).contains(&lower(expected)),
        Operator::NotContains => !lower(actual).contains(&lower(expected)),
        Operator::StartsWith => lower(actual).starts_with(&lower(expected)),
        Operator::EndsWith => lower(actual).ends_with(&lower(expected)),

        Operator::GreaterThan => numeric(actual, expected, |a, e| a > e),
        Operator::LessThan => numeric(actual, expected, |a, e| a < e),
        Operator::GreaterThanOrEqual => numeric(actual, expected, |a, e| a >= e),
        Operator::LessThanOrEqual => numeric(actual, expected, |a, e| a <= e),

        Operator::Before => dates(actual, expected, |a, e| a < e),
        Operator::After => dates(actual, expected, |a, e| a > e),

        Operator::IsEmpty => is_empty(actual),
        Operator::IsNotEmpty => !is_empty(actual),

        Operator::IsChecked | Operator::Checked => is_checked(actual),
        Operator::IsNotChecked => !is_checked(actual),

        Operator::Unknown(op) => {
            tracing::warn!(operator = %op, field = %condition.field, "unknown condition operator, evaluating to false");
            false
        }
    }
}

/// AND-composition over a condition list: the legacy field-level
/// conditional shape. An empty list is vacuously true.
pub fn matches_all(conditions: &[Condition], form: &FormData) -> bool {
    conditions
        .iter()
        .all(|c| matches(c, form, MatchOptions::default()))
}

fn text_eq(actual: &Value, expected: &Value, options: MatchOptions) -> bool {
    if options.case_insensitive_equality {
        lower(actual) == lower(expected)
    } else {
        actual.to_string() == expected.to_string()
    }
}

fn lower(v: &Value) -> String {
    v.to_string().to_lowercase()
}

fn numeric(
    actual: &Value,
    expected: &Value,
    cmp: impl Fn(rust_decimal::Decimal, rust_decimal::Decimal) -> bool,
) -> bool {
    match (to_decimal(actual), to_decimal(expected)) {
        (Some(a), Some(e)) => cmp(a, e),
        _ => false,
    }
}

fn dates(actual: &Value, expected: &Value, cmp: impl Fn(i64, i64) -> bool) -> bool {
    match (to_timestamp(actual), to_timestamp(expected)) {
        (Some(a), Some(e)) => cmp(a, e),
        _ => false,
    }
}

fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Text(s) => s.is_empty(),
        Value::Number(_) | Value::Bool(_) => false,
    }
}

/// Boolean-like truthiness: `true`, `"true"`, `"yes"`.
fn is_checked(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Text(s) => s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(field: &str, operator: Operator, value: serde_json::Value) -> Condition {
        Condition {
            field: field.to_string(),
            operator,
            value: Value::from_json(&value),
        }
    }

    fn form(v: serde_json::Value) -> FormData {
        FormData::from_json(&v)
    }

    #[test]
    fn equality_is_exact_by_default() {
        let data = form(serde_json::json!({ "state": "CA" }));
        assert!(matches(
            &cond("state", Operator::Equals, serde_json::json!("CA")),
            &data,
            MatchOptions::default()
        ));
        assert!(!matches(
            &cond("state", Operator::Equals, serde_json::json!("ca")),
            &data,
            MatchOptions::default()
        ));
        assert!(matches(
            &cond("state", Operator::Equals, serde_json::json!("ca")),
            &data,
            MatchOptions::fee()
        ));
    }

    #[test]
    fn equality_compares_across_shapes_as_text() {
        let data = form(serde_json::json!({ "count": 5, "agreed": true }));
        assert!(matches(
            &cond("count", Operator::Equals, serde_json::json!("5")),
            &data,
            MatchOptions::default()
        ));
        assert!(matches(
            &cond("agreed", Operator::Equals, serde_json::json!("true")),
            &data,
            MatchOptions::default()
        ));
    }

    #[test]
    fn substring_operators_are_case_insensitive() {
        let data = form(serde_json::json!({ "title": "Licensed Practical Nurse" }));
        assert!(matches(
            &cond("title", Operator::Contains, serde_json::json!("practical")),
            &data,
            MatchOptions::default()
        ));
        assert!(matches(
            &cond("title", Operator::StartsWith, serde_json::json!("licensed")),
            &data,
            MatchOptions::default()
        ));
        assert!(matches(
            &cond("title", Operator::EndsWith, serde_json::json!("NURSE")),
            &data,
            MatchOptions::default()
        ));
        assert!(!matches(
            &cond("title", Operator::NotContains, serde_json::json!("nurse")),
            &data,
            MatchOptions::default()
        ));
    }

    #[test]
    fn numeric_operators_coerce_text_operands() {
        let data = form(serde_json::json!({ "employees": "12" }));
        assert!(matches(
            &cond("employees", Operator::GreaterThan, serde_json::json!(10)),
            &data,
            MatchOptions::default()
        ));
        assert!(matches(
            &cond("employees", Operator::LessThanOrEqual, serde_json::json!("12")),
            &data,
            MatchOptions::default()
        ));
    }

    #[test]
    fn unparseable_numeric_operand_is_false() {
        let data = form(serde_json::json!({ "employees": "a dozen" }));
        assert!(!matches(
            &cond("employees", Operator::GreaterThan, serde_json::json!(10)),
            &data,
            MatchOptions::default()
        ));
        // both directions
        assert!(!matches(
            &cond("employees", Operator::LessThan, serde_json::json!(10)),
            &data,
            MatchOptions::default()
        ));
    }

    #[test]
    fn date_operators_compare_parsed_dates() {
        let data = form(serde_json::json!({ "expiration": "2025-06-30" }));
        assert!(matches(
            &cond("expiration", Operator::Before, serde_json::json!("2025-12-31")),
            &data,
            MatchOptions::default()
        ));
        assert!(matches(
            &cond("expiration", Operator::After, serde_json::json!("2024-01-01")),
            &data,
            MatchOptions::default()
        ));
        assert!(!matches(
            &cond("expiration", Operator::Before, serde_json::json!("not a date")),
            &data,
            MatchOptions::default()
        ));
    }

    #[test]
    fn empty_covers_missing_null_and_blank() {
        let data = form(serde_json::json!({ "middle_name": "", "suffix": null, "first_name": "Ada" }));
        for field in ["middle_name", "suffix", "never_present"] {
            assert!(matches(
                &cond(field, Operator::IsEmpty, serde_json::json!(null)),
                &data,
                MatchOptions::default()
            ));
        }
        assert!(matches(
            &cond("first_name", Operator::IsNotEmpty, serde_json::json!(null)),
            &data,
            MatchOptions::default()
        ));
    }

    #[test]
    fn checked_accepts_truthy_spellings() {
        let data = form(serde_json::json!({ "a": true, "b": "true", "c": "Yes", "d": "no", "e": false }));
        for field in ["a", "b", "c"] {
            assert!(matches(
                &cond(field, Operator::IsChecked, serde_json::json!(null)),
                &data,
                MatchOptions::default()
            ));
            assert!(matches(
                &cond(field, Operator::Checked, serde_json::json!(null)),
                &data,
                MatchOptions::default()
            ));
        }
        for field in ["d", "e", "missing"] {
            assert!(matches(
                &cond(field, Operator::IsNotChecked, serde_json::json!(null)),
                &data,
                MatchOptions::default()
            ));
        }
    }

    #[test]
    fn unknown_operator_is_false_and_does_not_panic() {
        let data = form(serde_json::json!({ "x": 1 }));
        assert!(!matches(
            &cond("x", Operator::Unknown("bogus".to_string()), serde_json::json!(1)),
            &data,
            MatchOptions::default()
        ));
    }

    #[test]
    fn and_composition_requires_every_condition() {
        let data = form(serde_json::json!({ "licenseType": "endorsement", "years_since_exam": 7 }));
        let both = [
            cond("licenseType", Operator::Equals, serde_json::json!("endorsement")),
            cond("years_since_exam", Operator::GreaterThan, serde_json::json!(5)),
        ];
        assert!(matches_all(&both, &data));

        let one_fails = [
            cond("licenseType", Operator::Equals, serde_json::json!("endorsement")),
            cond("years_since_exam", Operator::GreaterThan, serde_json::json!(10)),
        ];
        assert!(!matches_all(&one_fails, &data));

        assert!(matches_all(&[], &data));
    }
}

//! Conditional-rule evaluation.
//!
//! Rules are evaluated in array order; each firing rule's actions fold
//! into the field-state map in sequence. Because the fold runs in rule
//! order, a later rule's action in the same category overwrites an
//! earlier one (hide then show leaves the field visible), while fee
//! modifiers accumulate across rules.
//!
//! Evaluation is a pure function of `(rules, form)`: no hidden state,
//! no I/O, deterministic output.

use rubric_core::{Action, ActionType, FormData, RuleSet, Value};

use crate::numeric::to_decimal;
use crate::predicate::{matches, MatchOptions};
use crate::state::{FieldState, FieldStates};

/// Evaluate every rule against the form snapshot.
///
/// With no firing rules the result is empty; untouched fields take the
/// defaults through the `FieldStates` accessors.
pub fn evaluate_all(rules: &RuleSet, form: &FormData) -> FieldStates {
    let mut states = FieldStates::new();

    for rule in rules.iter() {
        let Some(trigger) = &rule.trigger else {
            // structural malformation policy: a rule without an
            // interpretable trigger never fires
            continue;
        };
        if !matches(trigger, form, MatchOptions::default()) {
            continue;
        }
        for action in &rule.actions {
            apply_action(states.entry(&action.target_field), action);
        }
    }

    states
}

fn apply_action(state: &mut FieldState, action: &Action) {
    match &action.action_type {
        ActionType::Show => state.visible = true,
        ActionType::Hide => state.visible = false,
        ActionType::Enable => state.enabled = true,
        ActionType::Disable => state.enabled = false,
        ActionType::SetRequired => state.required = true,
        ActionType::SetOptional => state.required = false,
        ActionType::SetValue => state.value = Some(action.value.clone()),
        ActionType::ShowMessage => {
            if !action.value.is_null() {
                state.message = Some(action.value.to_string());
            }
        }
        ActionType::CalculateFee => match &action.fee_modifier {
            Some(modifier) => state.fee_modifiers.push(modifier.clone()),
            // older rules carry a bare amount instead of a modifier
            None => {
                if let Some(amount) = to_decimal(&action.value) {
                    state.legacy_fee += amount;
                }
            }
        },
        ActionType::Unknown(t) => {
            tracing::warn!(action_type = %t, target = %action.target_field, "unknown action type, ignoring");
        }
    }
}

// ──────────────────────────────────────────────
// Derived queries
// ──────────────────────────────────────────────

// Convenience views for callers that only need one field's answer.
// Each re-runs the full evaluation; there is no cache to invalidate.

pub fn is_field_visible(rules: &RuleSet, form: &FormData, field: &str) -> bool {
    evaluate_all(rules, form).is_visible(field)
}

pub fn is_field_enabled(rules: &RuleSet, form: &FormData, field: &str) -> bool {
    evaluate_all(rules, form).is_enabled(field)
}

pub fn is_field_required(rules: &RuleSet, form: &FormData, field: &str) -> bool {
    evaluate_all(rules, form).is_required(field)
}

pub fn field_value(rules: &RuleSet, form: &FormData, field: &str) -> Option<Value> {
    evaluate_all(rules, form).value(field).cloned()
}

// ──────────────────────────────────────────────
// Rule-change evaluation
// ──────────────────────────────────────────────

/// Result of a rule-set-change evaluation: the field states plus the
/// forced values the caller should apply exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleChangeOutcome {
    pub states: FieldStates,
    /// `(field, value)` pairs from firing `set_value` actions, in
    /// field first-touch order.
    pub forced_values: Vec<(String, Value)>,
}

/// Evaluate on a rule-set change and surface forced values for a
/// one-time application.
///
/// `set_value` actions write to the same form data that triggers
/// evaluation, so re-running reactively on every form-data change
/// would loop: evaluate, apply, re-evaluate, apply again. The
/// contract: call this when the rule set itself changes (for example
/// switching application type), apply `forced_values` once, and let
/// subsequent field edits run plain `evaluate_all` without re-applying
/// forced values. The engine stays pure either way; the discipline is
/// the caller's invocation policy.
pub fn evaluate_on_rule_change(rules: &RuleSet, form: &FormData) -> RuleChangeOutcome {
    let states = evaluate_all(rules, form);
    let forced_values = states
        .iter()
        .filter_map(|(name, state)| state.value.clone().map(|v| (name.to_string(), v)))
        .collect();
    RuleChangeOutcome {
        states,
        forced_values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn rules(v: serde_json::Value) -> RuleSet {
        RuleSet::from_json(&v)
    }

    fn form(v: serde_json::Value) -> FormData {
        FormData::from_json(&v)
    }

    #[test]
    fn empty_rule_set_yields_empty_states() {
        let states = evaluate_all(&RuleSet::default(), &form(serde_json::json!({ "x": 1 })));
        assert!(states.is_empty());
        assert_eq!(states.total_fee(Decimal::from(100)), Decimal::from(100));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let rules = rules(serde_json::json!([{
            "id": "r1",
            "trigger": { "field": "a", "operator": "equals", "value": "x" },
            "actions": [
                { "type": "hide", "target_field": "b" },
                { "type": "show_message", "target_field": "c", "value": "note" }
            ]
        }]));
        let data = form(serde_json::json!({ "a": "x" }));
        let first = evaluate_all(&rules, &data);
        let second = evaluate_all(&rules, &data);
        assert_eq!(first, second);
    }

    #[test]
    fn later_rule_wins_for_booleans() {
        let rules = rules(serde_json::json!([
            {
                "id": "r0",
                "trigger": { "field": "a", "operator": "is_not_empty" },
                "actions": [ { "type": "hide", "target_field": "f" } ]
            },
            {
                "id": "r1",
                "trigger": { "field": "a", "operator": "is_not_empty" },
                "actions": [ { "type": "show", "target_field": "f" } ]
            }
        ]));
        let states = evaluate_all(&rules, &form(serde_json::json!({ "a": "filled" })));
        assert!(states.is_visible("f"));
    }

    #[test]
    fn fee_modifiers_accumulate_across_rules() {
        let rules = rules(serde_json::json!([
            {
                "id": "r0",
                "trigger": { "field": "a", "operator": "is_not_empty" },
                "actions": [ { "type": "calculate_fee", "target_field": "f",
                               "fee_modifier": { "type": "discount", "amount": 10, "unit": "percent" } } ]
            },
            {
                "id": "r1",
                "trigger": { "field": "a", "operator": "is_not_empty" },
                "actions": [ { "type": "calculate_fee", "target_field": "f",
                               "fee_modifier": { "type": "surcharge", "amount": 5, "unit": "dollars" } } ]
            }
        ]));
        let states = evaluate_all(&rules, &form(serde_json::json!({ "a": "filled" })));
        // 100 - 10% + $5
        assert_eq!(states.total_fee(Decimal::from(100)), Decimal::from(95));
    }

    #[test]
    fn set_amount_overrides_everything() {
        let rules = rules(serde_json::json!([
            {
                "id": "r0",
                "trigger": { "field": "a", "operator": "is_not_empty" },
                "actions": [ { "type": "calculate_fee", "target_field": "f",
                               "fee_modifier": { "type": "surcharge", "amount": 400, "unit": "dollars" } } ]
            },
            {
                "id": "r1",
                "trigger": { "field": "a", "operator": "is_not_empty" },
                "actions": [ { "type": "calculate_fee", "target_field": "g",
                               "fee_modifier": { "type": "set_amount", "amount": 50, "unit": "dollars" } } ]
            }
        ]));
        let states = evaluate_all(&rules, &form(serde_json::json!({ "a": "filled" })));
        assert_eq!(states.total_fee(Decimal::from(100)), Decimal::from(50));
        assert_eq!(states.total_fee(Decimal::from(9999)), Decimal::from(50));
    }

    #[test]
    fn legacy_bare_amount_joins_the_dollar_bucket() {
        let rules = rules(serde_json::json!([{
            "id": "r0",
            "trigger": { "field": "a", "operator": "is_not_empty" },
            "actions": [ { "type": "calculate_fee", "target_field": "f", "value": 30 } ]
        }]));
        let states = evaluate_all(&rules, &form(serde_json::json!({ "a": "filled" })));
        assert_eq!(states.total_fee(Decimal::from(100)), Decimal::from(130));
    }

    #[test]
    fn evaluator_total_is_not_floored_at_zero() {
        let rules = rules(serde_json::json!([{
            "id": "r0",
            "trigger": { "field": "a", "operator": "is_not_empty" },
            "actions": [ { "type": "calculate_fee", "target_field": "f",
                           "fee_modifier": { "type": "discount", "amount": 150, "unit": "dollars" } } ]
        }]));
        let states = evaluate_all(&rules, &form(serde_json::json!({ "a": "filled" })));
        assert_eq!(states.total_fee(Decimal::from(100)), Decimal::from(-50));
    }

    #[test]
    fn unknown_action_type_is_ignored() {
        let rules = rules(serde_json::json!([{
            "id": "r0",
            "trigger": { "field": "a", "operator": "is_not_empty" },
            "actions": [
                { "type": "levitate", "target_field": "f" },
                { "type": "set_required", "target_field": "f" }
            ]
        }]));
        let states = evaluate_all(&rules, &form(serde_json::json!({ "a": "filled" })));
        assert!(states.is_required("f"));
        assert!(states.is_visible("f"));
    }

    #[test]
    fn derived_queries_match_full_evaluation() {
        let rules = rules(serde_json::json!([{
            "id": "r0",
            "trigger": { "field": "licenseType", "operator": "equals", "value": "business" },
            "actions": [
                { "type": "hide", "target_field": "ssn" },
                { "type": "set_required", "target_field": "ein" },
                { "type": "disable", "target_field": "renewal" },
                { "type": "set_value", "target_field": "category", "value": "commercial" }
            ]
        }]));
        let data = form(serde_json::json!({ "licenseType": "business" }));
        assert!(!is_field_visible(&rules, &data, "ssn"));
        assert!(is_field_required(&rules, &data, "ein"));
        assert!(!is_field_enabled(&rules, &data, "renewal"));
        assert_eq!(
            field_value(&rules, &data, "category"),
            Some(Value::Text("commercial".to_string()))
        );
        // untouched field
        assert!(is_field_visible(&rules, &data, "licenseType"));
    }

    #[test]
    fn forced_values_are_surfaced_once_and_stably() {
        // the rule watches the very field it forces; applying the
        // forced value must not change what a re-run would force
        let rules = rules(serde_json::json!([{
            "id": "r0",
            "trigger": { "field": "status", "operator": "is_empty" },
            "actions": [ { "type": "set_value", "target_field": "priority", "value": "standard" } ]
        }]));
        let data = form(serde_json::json!({ "status": "" }));

        let outcome = evaluate_on_rule_change(&rules, &data);
        assert_eq!(
            outcome.forced_values,
            vec![("priority".to_string(), Value::Text("standard".to_string()))]
        );

        // caller applies the forced value once
        let mut applied = data.clone();
        for (field, value) in &outcome.forced_values {
            applied.insert(field.clone(), value.clone());
        }

        // a second rule-change evaluation is pure and yields the same
        // outcome; no feedback loop inside the engine
        let again = evaluate_on_rule_change(&rules, &applied);
        assert_eq!(again.forced_values, outcome.forced_values);
    }
}

//! Authoring-time rule validation and conflict detection.
//!
//! The evaluator itself never rejects a rule set -- malformed entries
//! degrade to safe defaults. This module is the form builder's
//! save-time check: it reports every problem in an authored rule set
//! (shape errors, references to fields the form does not have,
//! duplicate ids) and flags rules whose actions collide on the same
//! field so the author knows which one the engine will honor.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ruleset::{ActionType, Operator, Rule, RuleSet};
use crate::value::Value;

/// A problem found in one authored rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("rule {index} ({id}): {message}")]
pub struct RuleError {
    /// Zero-based index of the rule in the authored array.
    pub index: usize,
    pub id: String,
    pub message: String,
}

impl RuleError {
    fn new(index: usize, id: &str, message: impl Into<String>) -> RuleError {
        RuleError {
            index,
            id: id.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a full rule set against the fields present in the form.
/// Returns every problem found; an empty vec means the set is valid.
pub fn validate_rules(rules: &RuleSet, available_fields: &[&str]) -> Vec<RuleError> {
    let mut errors = Vec::new();
    let mut seen_ids: HashSet<&str> = HashSet::new();

    for (index, rule) in rules.iter().enumerate() {
        if !rule.id.is_empty() && !seen_ids.insert(rule.id.as_str()) {
            errors.push(RuleError::new(
                index,
                &rule.id,
                format!("duplicate rule id '{}'", rule.id),
            ));
        }
        validate_rule(rule, index, available_fields, &mut errors);
    }

    errors
}

/// Validate a single rule, appending every problem found.
pub fn validate_rule(
    rule: &Rule,
    index: usize,
    available_fields: &[&str],
    errors: &mut Vec<RuleError>,
) {
    let id = rule.id.as_str();
    if id.is_empty() {
        errors.push(RuleError::new(index, id, "rule must have an id"));
    }

    match &rule.trigger {
        None => {
            errors.push(RuleError::new(index, id, "rule must have a trigger"));
        }
        Some(trigger) => {
            if !available_fields.contains(&trigger.field.as_str()) {
                errors.push(RuleError::new(
                    index,
                    id,
                    format!("trigger field '{}' does not exist in form", trigger.field),
                ));
            }
            if let Operator::Unknown(op) = &trigger.operator {
                errors.push(RuleError::new(
                    index,
                    id,
                    format!("invalid trigger operator: '{}'", op),
                ));
            } else if trigger.operator.requires_value() && trigger.value == Value::Null {
                errors.push(RuleError::new(
                    index,
                    id,
                    format!(
                        "operator '{}' requires a trigger value",
                        trigger.operator.as_str()
                    ),
                ));
            }
        }
    }

    if rule.actions.is_empty() {
        errors.push(RuleError::new(index, id, "rule must have at least one action"));
    }

    for action in &rule.actions {
        match &action.action_type {
            ActionType::Unknown(t) => {
                errors.push(RuleError::new(
                    index,
                    id,
                    format!("invalid action type: '{}'", t),
                ));
            }
            ActionType::SetValue => {
                check_target(index, id, &action.target_field, available_fields, errors);
                if action.value == Value::Null {
                    errors.push(RuleError::new(
                        index,
                        id,
                        "action 'set_value' requires a value",
                    ));
                }
            }
            ActionType::CalculateFee => {
                // a modifier or a legacy flat amount; neither means the
                // action can never contribute to the total
                if action.fee_modifier.is_none() && action.value == Value::Null {
                    errors.push(RuleError::new(
                        index,
                        id,
                        "action 'calculate_fee' requires a fee_modifier or amount",
                    ));
                }
            }
            ActionType::ShowMessage => {
                if action.value == Value::Null {
                    errors.push(RuleError::new(
                        index,
                        id,
                        "action 'show_message' requires a message value",
                    ));
                }
            }
            _ => {
                check_target(index, id, &action.target_field, available_fields, errors);
            }
        }
    }
}

fn check_target(
    index: usize,
    id: &str,
    target: &str,
    available_fields: &[&str],
    errors: &mut Vec<RuleError>,
) {
    if target.is_empty() {
        errors.push(RuleError::new(index, id, "action requires a target field"));
    } else if !available_fields.contains(&target) {
        errors.push(RuleError::new(
            index,
            id,
            format!("target field '{}' does not exist in form", target),
        ));
    }
}

// ──────────────────────────────────────────────
// Conflict detection
// ──────────────────────────────────────────────

/// Action category for conflict reporting. Actions in the same
/// category overwrite each other during the evaluator's fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Visibility,
    Enabled,
    Required,
}

/// Multiple rules steering the same field in the same category.
/// Not an error -- the engine resolves it deterministically -- but the
/// author should know which rule wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub field: String,
    pub kind: ConflictKind,
    /// Ids of every rule touching the field in this category,
    /// in rule order.
    pub rule_ids: Vec<String>,
    /// The rule the evaluator honors: the highest rule index.
    pub winner: String,
    pub message: String,
}

/// Report fields targeted by more than one rule in the same action
/// category. The winner is the later rule in array order, matching the
/// evaluator's last-rule-wins fold.
pub fn detect_conflicts(rules: &RuleSet) -> Vec<Conflict> {
    // (field, kind) -> rule ids in rule order
    let mut touches: Vec<((String, ConflictKind), Vec<String>)> = Vec::new();

    for rule in rules.iter() {
        for action in &rule.actions {
            let kind = match action.action_type {
                ActionType::Show | ActionType::Hide => ConflictKind::Visibility,
                ActionType::Enable | ActionType::Disable => ConflictKind::Enabled,
                ActionType::SetRequired | ActionType::SetOptional => ConflictKind::Required,
                _ => continue,
            };
            let key = (action.target_field.clone(), kind);
            match touches.iter_mut().find(|(k, _)| *k == key) {
                Some((_, ids)) => ids.push(rule.id.clone()),
                None => touches.push((key, vec![rule.id.clone()])),
            }
        }
    }

    touches
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|((field, kind), rule_ids)| {
            let winner = rule_ids.last().cloned().unwrap_or_default();
            let what = match kind {
                ConflictKind::Visibility => "visibility",
                ConflictKind::Enabled => "enabled state",
                ConflictKind::Required => "required status",
            };
            let message = format!(
                "multiple rules affect {} of '{}'; rule '{}' takes precedence",
                what, field, winner
            );
            Conflict {
                field,
                kind,
                rule_ids,
                winner,
                message,
            }
        })
        .collect()
}

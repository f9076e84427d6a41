//! Conditional-rule data model.
//!
//! Rule sets are authored in the form builder and persisted as opaque
//! JSON blobs. The parsers here are deliberately forgiving: missing
//! optional fields take their documented defaults, unknown operator and
//! action strings are retained verbatim (and fail closed at evaluation
//! time), and structurally broken entries are skipped with a debug
//! event. Authored-rule problems are reported by the `validate`
//! module, not by parsing.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::value::Value;

// ──────────────────────────────────────────────
// Operators
// ──────────────────────────────────────────────

/// Condition operator vocabulary.
///
/// `Checked` is the fee-schedule spelling of the truthiness test;
/// `IsChecked`/`IsNotChecked` are the conditional-rule spelling. Both
/// are accepted everywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    IsEmpty,
    IsNotEmpty,
    Before,
    After,
    StartsWith,
    EndsWith,
    IsChecked,
    IsNotChecked,
    Checked,
    /// Anything not in the vocabulary. Evaluates to false, never errors.
    Unknown(String),
}

impl Operator {
    pub fn parse(s: &str) -> Operator {
        match s {
            "equals" => Operator::Equals,
            "not_equals" => Operator::NotEquals,
            "contains" => Operator::Contains,
            "not_contains" => Operator::NotContains,
            "greater_than" => Operator::GreaterThan,
            "less_than" => Operator::LessThan,
            "greater_than_or_equal" => Operator::GreaterThanOrEqual,
            "less_than_or_equal" => Operator::LessThanOrEqual,
            "is_empty" => Operator::IsEmpty,
            "is_not_empty" => Operator::IsNotEmpty,
            "before" => Operator::Before,
            "after" => Operator::After,
            "starts_with" => Operator::StartsWith,
            "ends_with" => Operator::EndsWith,
            "is_checked" => Operator::IsChecked,
            "is_not_checked" => Operator::IsNotChecked,
            "checked" => Operator::Checked,
            other => Operator::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::GreaterThanOrEqual => "greater_than_or_equal",
            Operator::LessThanOrEqual => "less_than_or_equal",
            Operator::IsEmpty => "is_empty",
            Operator::IsNotEmpty => "is_not_empty",
            Operator::Before => "before",
            Operator::After => "after",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::IsChecked => "is_checked",
            Operator::IsNotChecked => "is_not_checked",
            Operator::Checked => "checked",
            Operator::Unknown(s) => s,
        }
    }

    /// Whether this operator compares against an authored value.
    /// Presence/truthiness tests do not.
    pub fn requires_value(&self) -> bool {
        !matches!(
            self,
            Operator::IsEmpty
                | Operator::IsNotEmpty
                | Operator::IsChecked
                | Operator::IsNotChecked
                | Operator::Checked
                | Operator::Unknown(_)
        )
    }
}

/// A predicate over one form field.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    /// Parse a condition from wire JSON. Returns None for non-object
    /// shapes or a missing field name: a rule whose trigger cannot be
    /// interpreted simply never fires.
    pub fn from_json(v: &serde_json::Value) -> Option<Condition> {
        let obj = v.as_object()?;
        let field = obj.get("field").and_then(|f| f.as_str())?.to_string();
        let operator = obj
            .get("operator")
            .and_then(|o| o.as_str())
            .map(Operator::parse)
            .unwrap_or(Operator::Unknown(String::new()));
        let value = obj.get("value").map(Value::from_json).unwrap_or(Value::Null);
        Some(Condition {
            field,
            operator,
            value,
        })
    }
}

// ──────────────────────────────────────────────
// Actions
// ──────────────────────────────────────────────

/// Effect applied to a target field when a rule fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionType {
    Show,
    Hide,
    Enable,
    Disable,
    SetRequired,
    SetOptional,
    SetValue,
    CalculateFee,
    ShowMessage,
    /// Anything not in the vocabulary. Logged and ignored at evaluation.
    Unknown(String),
}

impl ActionType {
    pub fn parse(s: &str) -> ActionType {
        match s {
            "show" => ActionType::Show,
            "hide" => ActionType::Hide,
            "enable" => ActionType::Enable,
            "disable" => ActionType::Disable,
            "set_required" => ActionType::SetRequired,
            "set_optional" => ActionType::SetOptional,
            "set_value" => ActionType::SetValue,
            "calculate_fee" => ActionType::CalculateFee,
            "show_message" => ActionType::ShowMessage,
            other => ActionType::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionType::Show => "show",
            ActionType::Hide => "hide",
            ActionType::Enable => "enable",
            ActionType::Disable => "disable",
            ActionType::SetRequired => "set_required",
            ActionType::SetOptional => "set_optional",
            ActionType::SetValue => "set_value",
            ActionType::CalculateFee => "calculate_fee",
            ActionType::ShowMessage => "show_message",
            ActionType::Unknown(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKind {
    Discount,
    Surcharge,
    SetAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierUnit {
    Percent,
    Dollars,
}

/// A fee adjustment attached to a `calculate_fee` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeModifier {
    pub kind: ModifierKind,
    pub amount: Decimal,
    pub unit: ModifierUnit,
}

impl FeeModifier {
    /// Parse a modifier from wire JSON. Older authored rules use the
    /// original builder vocabulary (`override`, `fixed`); both spellings
    /// are accepted. A modifier whose kind cannot be interpreted is
    /// dropped -- its fee contribution is zero.
    pub fn from_json(v: &serde_json::Value) -> Option<FeeModifier> {
        let obj = v.as_object()?;
        let kind = match obj.get("type").and_then(|t| t.as_str()) {
            Some("discount") => ModifierKind::Discount,
            Some("surcharge") => ModifierKind::Surcharge,
            Some("set_amount") | Some("override") => ModifierKind::SetAmount,
            other => {
                tracing::debug!(kind = ?other, "unknown fee modifier type, ignoring modifier");
                return None;
            }
        };
        let unit = match obj.get("unit").and_then(|u| u.as_str()) {
            Some("percent") => ModifierUnit::Percent,
            Some("dollars") | Some("fixed") | None => ModifierUnit::Dollars,
            Some(other) => {
                tracing::debug!(unit = other, "unknown fee modifier unit, ignoring modifier");
                return None;
            }
        };
        let amount = obj
            .get("amount")
            .map(|a| decimal_from_json(a))
            .unwrap_or(Decimal::ZERO);
        Some(FeeModifier { kind, amount, unit })
    }
}

/// One effect of a firing rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub action_type: ActionType,
    pub target_field: String,
    pub value: Value,
    pub fee_modifier: Option<FeeModifier>,
}

// ──────────────────────────────────────────────
// Rules
// ──────────────────────────────────────────────

/// A declarative trigger -> actions pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: String,
    /// A rule without an interpretable trigger never fires.
    pub trigger: Option<Condition>,
    pub actions: Vec<Action>,
}

impl Rule {
    /// Parse a rule from wire JSON.
    ///
    /// Two authored trigger shapes exist: the current nested form
    /// (`"trigger": {field, operator, value}`) and the original
    /// builder's flat form (`trigger_field` / `trigger_condition` /
    /// `trigger_value`). Both parse to the same `Condition`. Likewise
    /// actions may target one field (`target_field`) or fan out over a
    /// `target_fields` array, which expands to one action per field.
    pub fn from_json(v: &serde_json::Value) -> Option<Rule> {
        let obj = v.as_object()?;
        let id = match obj.get("id") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        let trigger = obj
            .get("trigger")
            .and_then(Condition::from_json)
            .or_else(|| flat_trigger(obj));

        let mut actions = Vec::new();
        if let Some(raw_actions) = obj.get("actions").and_then(|a| a.as_array()) {
            for raw in raw_actions {
                parse_actions(raw, &mut actions);
            }
        }

        Some(Rule {
            id,
            trigger,
            actions,
        })
    }
}

/// Original-builder flat trigger keys.
fn flat_trigger(obj: &serde_json::Map<String, serde_json::Value>) -> Option<Condition> {
    let field = obj.get("trigger_field").and_then(|f| f.as_str())?.to_string();
    let operator = obj
        .get("trigger_condition")
        .and_then(|o| o.as_str())
        .map(Operator::parse)
        .unwrap_or(Operator::Unknown(String::new()));
    let value = obj
        .get("trigger_value")
        .map(Value::from_json)
        .unwrap_or(Value::Null);
    Some(Condition {
        field,
        operator,
        value,
    })
}

/// Parse one authored action entry, expanding `target_fields` arrays.
fn parse_actions(v: &serde_json::Value, out: &mut Vec<Action>) {
    let Some(obj) = v.as_object() else {
        tracing::debug!(got = v.to_string(), "non-object action entry, skipping");
        return;
    };
    // current key is "type"; the original builder wrote "action"
    let action_type = obj
        .get("type")
        .or_else(|| obj.get("action"))
        .and_then(|t| t.as_str())
        .map(ActionType::parse)
        .unwrap_or(ActionType::Unknown(String::new()));
    let value = obj.get("value").map(Value::from_json).unwrap_or(Value::Null);
    let fee_modifier = obj.get("fee_modifier").and_then(FeeModifier::from_json);

    let mut push = |target: String| {
        out.push(Action {
            action_type: action_type.clone(),
            target_field: target,
            value: value.clone(),
            fee_modifier: fee_modifier.clone(),
        });
    };

    if let Some(target) = obj.get("target_field").and_then(|t| t.as_str()) {
        push(target.to_string());
    } else if let Some(targets) = obj.get("target_fields").and_then(|t| t.as_array()) {
        for t in targets.iter().filter_map(|t| t.as_str()) {
            push(t.to_string());
        }
    } else if action_type == ActionType::CalculateFee {
        // a calculate_fee action contributes to the total even with no
        // named field; anchor it under an empty target
        push(String::new());
    } else {
        tracing::debug!(action_type = action_type.as_str(), "action has no target field, skipping");
    }
}

/// An ordered rule set. Array order is conflict-resolution order:
/// the later rule index wins when actions collide on a field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> RuleSet {
        RuleSet { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Parse a rule set from wire JSON. A non-array payload yields an
    /// empty set; non-object entries are skipped.
    pub fn from_json(v: &serde_json::Value) -> RuleSet {
        let Some(arr) = v.as_array() else {
            if !v.is_null() {
                tracing::debug!(got = v.to_string(), "rule set is not a JSON array");
            }
            return RuleSet::default();
        };
        let rules = arr.iter().filter_map(Rule::from_json).collect();
        RuleSet { rules }
    }
}

/// Parse a JSON number or numeric string into a Decimal, defaulting
/// to zero. Authored amounts sometimes arrive as strings.
pub(crate) fn decimal_from_json(v: &serde_json::Value) -> Decimal {
    match v {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap_or(Decimal::ZERO),
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

//! Resolved per-field UI state.
//!
//! `FieldStates` is the evaluator's output: one `FieldState` per field
//! touched by a firing rule, in first-touch order. Fields no rule
//! touched are absent and take the documented defaults (visible,
//! enabled, optional) through the accessor methods.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use rubric_core::{FeeModifier, ModifierKind, ModifierUnit, Value};

/// UI-relevant state for one field after folding all firing rules.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldState {
    pub visible: bool,
    pub enabled: bool,
    pub required: bool,
    /// Forced value from a `set_value` action. Applying it back into
    /// form data is the caller's responsibility.
    pub value: Option<Value>,
    /// Accumulated `calculate_fee` modifiers, in rule order.
    pub fee_modifiers: Vec<FeeModifier>,
    /// Flat-amount accumulator for `calculate_fee` actions that carry
    /// a bare numeric value instead of a modifier.
    pub legacy_fee: Decimal,
    pub message: Option<String>,
}

impl Default for FieldState {
    fn default() -> FieldState {
        FieldState {
            visible: true,
            enabled: true,
            required: false,
            value: None,
            fee_modifiers: Vec::new(),
            legacy_fee: Decimal::ZERO,
            message: None,
        }
    }
}

/// Field states in first-touch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldStates {
    names: Vec<String>,
    states: BTreeMap<String, FieldState>,
}

impl FieldStates {
    pub fn new() -> FieldStates {
        FieldStates::default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&FieldState> {
        self.states.get(field)
    }

    /// Iterate states in the order fields were first targeted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldState)> {
        self.names
            .iter()
            .filter_map(|n| self.states.get(n).map(|s| (n.as_str(), s)))
    }

    /// The state for a field, inserting the defaults on first touch.
    pub(crate) fn entry(&mut self, field: &str) -> &mut FieldState {
        if !self.states.contains_key(field) {
            self.names.push(field.to_string());
        }
        self.states.entry(field.to_string()).or_default()
    }

    /// Untouched fields default to visible.
    pub fn is_visible(&self, field: &str) -> bool {
        self.get(field).map_or(true, |s| s.visible)
    }

    /// Untouched fields default to enabled.
    pub fn is_enabled(&self, field: &str) -> bool {
        self.get(field).map_or(true, |s| s.enabled)
    }

    /// Untouched fields default to optional.
    pub fn is_required(&self, field: &str) -> bool {
        self.get(field).is_some_and(|s| s.required)
    }

    /// Forced value for a field, if any rule set one.
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.get(field).and_then(|s| s.value.as_ref())
    }

    /// Every message from a firing `show_message` action, in field
    /// first-touch order.
    pub fn messages(&self) -> Vec<&str> {
        self.iter()
            .filter_map(|(_, s)| s.message.as_deref())
            .collect()
    }

    /// Fold all accumulated fee modifiers over a base fee.
    ///
    /// A `set_amount` modifier anywhere wins outright and is returned
    /// verbatim, ignoring the base fee and every other modifier (the
    /// last one seen in field order wins among several). Otherwise the
    /// result is `base + base * percent/100 + dollars`, where discounts
    /// are negative and surcharges positive, and bare-amount
    /// `calculate_fee` values join the dollar bucket.
    ///
    /// The result is not floored at zero; the fee-calculator pipeline
    /// is the clamping model.
    pub fn total_fee(&self, base: Decimal) -> Decimal {
        let mut dollars = Decimal::ZERO;
        let mut percent = Decimal::ZERO;
        let mut set_amount = None;

        for (_, state) in self.iter() {
            dollars += state.legacy_fee;
            for modifier in &state.fee_modifiers {
                match (modifier.kind, modifier.unit) {
                    (ModifierKind::SetAmount, _) => set_amount = Some(modifier.amount),
                    (ModifierKind::Discount, ModifierUnit::Dollars) => dollars -= modifier.amount,
                    (ModifierKind::Surcharge, ModifierUnit::Dollars) => dollars += modifier.amount,
                    (ModifierKind::Discount, ModifierUnit::Percent) => percent -= modifier.amount,
                    (ModifierKind::Surcharge, ModifierUnit::Percent) => percent += modifier.amount,
                }
            }
        }

        if let Some(amount) = set_amount {
            return amount;
        }
        base + base * percent / Decimal::ONE_HUNDRED + dollars
    }

    /// Serialize to the wire shape consumed by the form renderer:
    /// an object keyed by field name.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        for (name, state) in self.iter() {
            let mut entry = serde_json::Map::new();
            entry.insert("visible".into(), state.visible.into());
            entry.insert("enabled".into(), state.enabled.into());
            entry.insert("required".into(), state.required.into());
            if let Some(value) = &state.value {
                entry.insert("value".into(), value.to_json());
            }
            if let Some(message) = &state.message {
                entry.insert("message".into(), message.as_str().into());
            }
            obj.insert(name.to_string(), serde_json::Value::Object(entry));
        }
        serde_json::Value::Object(obj)
    }
}

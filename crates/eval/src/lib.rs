//! Rubric evaluator -- accepts a rule set (or fee schedule) plus a
//! form-data snapshot, produces per-field UI state and fee totals.
//!
//! Both evaluators are synchronous pure functions with no I/O and no
//! hidden state; they can run on any thread without coordination.
//! Neither has a fatal error path: malformed rule data degrades to
//! safe defaults (field visible/enabled/optional, fee contribution
//! zero) instead of crashing the surrounding form. Upstream fetch or
//! parse failures of the rule JSON are the caller's to surface.

pub mod fees;
pub mod numeric;
pub mod predicate;
pub mod rules;
pub mod state;

pub use fees::{FeeBreakdown, LineItem, LineItemKind};
pub use predicate::{matches, matches_all, MatchOptions};
pub use rules::{
    evaluate_all, evaluate_on_rule_change, field_value, is_field_enabled, is_field_required,
    is_field_visible, RuleChangeOutcome,
};
pub use state::{FieldState, FieldStates};

use rubric_core::{FeeSchedule, FormData, RuleSet};

/// Evaluate a rule-set blob against a form-data blob.
///
/// This is the wire-facing entry point: both arguments are the opaque
/// JSON the backend persists (`.../conditional-rules` and the live
/// form object). Infallible by design.
pub fn evaluate(rules: &serde_json::Value, form: &serde_json::Value) -> FieldStates {
    let rule_set = RuleSet::from_json(rules);
    let data = FormData::from_json(form);
    evaluate_all(&rule_set, &data)
}

/// Run the fee pipeline on a fee-schedule blob and a form-data blob.
pub fn calculate_fees(schedule: &serde_json::Value, form: &serde_json::Value) -> FeeBreakdown {
    let fee_schedule = FeeSchedule::from_json(schedule);
    let data = FormData::from_json(form);
    fees::calculate(&fee_schedule, &data)
}

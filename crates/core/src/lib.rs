//! Rubric core -- the declarative model behind the licensing form
//! engine.
//!
//! A form's behavior is authored as data, not code: conditional rules
//! ("when field X meets condition, do Y to field Z") and a fee schedule
//! (base fee, conditional surcharges, penalties, waivers). Both are
//! persisted as opaque JSON blobs and parsed here defensively -- the
//! engine degrades to safe defaults rather than rejecting a blob.
//!
//! The runtime that interprets these artifacts lives in `rubric-eval`.
//! This crate also carries the authoring-time checks (`validate`) the
//! form builder runs at save time.

pub mod ruleset;
pub mod schedule;
pub mod validate;
pub mod value;

pub use ruleset::{
    Action, ActionType, Condition, FeeModifier, ModifierKind, ModifierUnit, Operator, Rule,
    RuleSet,
};
pub use schedule::{
    AmountKind, BaseFee, BaseFeeKind, ConditionalFee, FeeSchedule, FeeTier, Penalty, Waiver,
    WaiverKind,
};
pub use validate::{detect_conflicts, validate_rules, Conflict, ConflictKind, RuleError};
pub use value::{FormData, Value};

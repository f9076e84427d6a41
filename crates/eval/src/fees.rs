//! Fee-schedule calculation.
//!
//! A deterministic four-stage pipeline over the form snapshot: base
//! fee, then conditional fees, then penalties, then waivers. Stage
//! order is load-bearing -- penalties are percentages of the
//! pre-waiver running total, and waivers run last so they see the full
//! penalized amount. Each waiver is individually capped at the running
//! total, so the final figure never goes negative.
//!
//! This is the canonical (clamping) fee model; the rule evaluator's
//! `total_fee` fold is the legacy path.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use rubric_core::{AmountKind, BaseFeeKind, FeeSchedule, FormData, WaiverKind};

use crate::numeric::{round_cents, to_decimal};
use crate::predicate::{matches, MatchOptions};

/// One line of the itemized receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemKind {
    Base,
    Conditional,
    Penalty,
    Waiver,
}

impl LineItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineItemKind::Base => "base",
            LineItemKind::Conditional => "conditional",
            LineItemKind::Penalty => "penalty",
            LineItemKind::Waiver => "waiver",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub kind: LineItemKind,
    pub label: String,
    /// Negative for waivers.
    pub amount: Decimal,
    pub description: String,
}

/// The itemized result of a fee calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeBreakdown {
    /// Final amount due: floored at zero, rounded to cents.
    pub total: Decimal,
    /// Base plus conditional fees, before penalties and waivers.
    pub subtotal: Decimal,
    pub total_penalties: Decimal,
    /// Sum of discounts granted, as a positive number.
    pub total_waivers: Decimal,
    pub line_items: Vec<LineItem>,
}

impl FeeBreakdown {
    /// Serialize to the wire shape consumed by the fee-summary
    /// renderer.
    pub fn to_json(&self) -> serde_json::Value {
        let breakdown: Vec<serde_json::Value> = self
            .line_items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "type": item.kind.as_str(),
                    "label": item.label,
                    "amount": decimal_number(item.amount),
                    "description": item.description,
                })
            })
            .collect();
        serde_json::json!({
            "total": decimal_number(self.total),
            "subtotal": decimal_number(self.subtotal),
            "totalPenalties": decimal_number(self.total_penalties),
            "totalWaivers": decimal_number(self.total_waivers),
            "breakdown": breakdown,
        })
    }
}

fn decimal_number(d: Decimal) -> serde_json::Value {
    serde_json::Number::from_f64(d.to_f64().unwrap_or(0.0))
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Run the fee pipeline. Never fails: a malformed or empty schedule
/// totals zero.
pub fn calculate(schedule: &FeeSchedule, form: &FormData) -> FeeBreakdown {
    let opts = MatchOptions::fee();
    let mut line_items = Vec::new();

    // Stage 1: base fee
    let base = base_fee_amount(schedule, form);
    let mut total = base;
    if base > Decimal::ZERO {
        line_items.push(LineItem {
            kind: LineItemKind::Base,
            label: "Base Fee".to_string(),
            amount: base,
            description: "Application base fee".to_string(),
        });
    }

    // Stage 2: conditional fees, percentages taken against the base
    for fee in &schedule.conditional_fees {
        let Some(condition) = &fee.condition else {
            continue;
        };
        if !matches(condition, form, opts) {
            continue;
        }
        let amount = round_cents(match fee.kind {
            AmountKind::Percentage => base * fee.amount / Decimal::ONE_HUNDRED,
            AmountKind::Fixed => fee.amount,
        });
        total += amount;
        line_items.push(LineItem {
            kind: LineItemKind::Conditional,
            label: fee.name.clone(),
            amount,
            description: match fee.kind {
                AmountKind::Percentage => format!("{}% of base fee", fee.amount.normalize()),
                AmountKind::Fixed => "Conditional fee".to_string(),
            },
        });
    }
    let subtotal = total;

    // Stage 3: penalties, percentages taken against the running total
    let mut total_penalties = Decimal::ZERO;
    for penalty in &schedule.penalties {
        let Some(condition) = &penalty.condition else {
            continue;
        };
        if !matches(condition, form, opts) {
            continue;
        }
        let amount = round_cents(match penalty.kind {
            AmountKind::Percentage => total * penalty.amount / Decimal::ONE_HUNDRED,
            AmountKind::Fixed => penalty.amount,
        });
        total += amount;
        total_penalties += amount;
        line_items.push(LineItem {
            kind: LineItemKind::Penalty,
            label: penalty.name.clone(),
            amount,
            description: match penalty.kind {
                AmountKind::Percentage => format!("{}% penalty", penalty.amount.normalize()),
                AmountKind::Fixed => "Penalty".to_string(),
            },
        });
    }

    // Stage 4: waivers, each capped at what remains
    let mut total_waivers = Decimal::ZERO;
    for waiver in &schedule.waivers {
        let Some(condition) = &waiver.condition else {
            continue;
        };
        if !matches(condition, form, opts) {
            continue;
        }
        let discount = round_cents(match waiver.kind {
            WaiverKind::Full => total,
            WaiverKind::Percentage => total * waiver.amount / Decimal::ONE_HUNDRED,
            WaiverKind::Fixed => waiver.amount,
        })
        .min(total);
        total -= discount;
        total_waivers += discount;
        line_items.push(LineItem {
            kind: LineItemKind::Waiver,
            label: waiver.name.clone(),
            amount: -discount,
            description: match waiver.kind {
                WaiverKind::Full => "Full fee waiver".to_string(),
                WaiverKind::Percentage => format!("{}% waiver", waiver.amount.normalize()),
                WaiverKind::Fixed => "Fee waiver".to_string(),
            },
        });
    }

    FeeBreakdown {
        total: round_cents(total.max(Decimal::ZERO)),
        subtotal: round_cents(subtotal),
        total_penalties: round_cents(total_penalties),
        total_waivers: round_cents(total_waivers),
        line_items,
    }
}

fn base_fee_amount(schedule: &FeeSchedule, form: &FormData) -> Decimal {
    let Some(base) = &schedule.base_fee else {
        return Decimal::ZERO;
    };
    let amount = match base.kind {
        BaseFeeKind::Fixed => base.amount,
        BaseFeeKind::Percentage => {
            // missing or unparseable field value contributes zero
            let field_value = base
                .percentage_field
                .as_deref()
                .and_then(|f| form.get(f))
                .and_then(to_decimal)
                .unwrap_or(Decimal::ZERO);
            field_value * base.percentage_rate / Decimal::ONE_HUNDRED
        }
        // tier walk not implemented; tiered schedules read the flat amount
        BaseFeeKind::Tiered => base.amount,
    };
    round_cents(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(v: serde_json::Value) -> FeeSchedule {
        FeeSchedule::from_json(&v)
    }

    fn form(v: serde_json::Value) -> FormData {
        FormData::from_json(&v)
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn empty_schedule_totals_zero() {
        let result = calculate(&schedule(serde_json::json!({})), &form(serde_json::json!({ "x": 1 })));
        assert_eq!(result.total, Decimal::ZERO);
        assert!(result.line_items.is_empty());
    }

    #[test]
    fn percentage_base_fee_reads_form_field() {
        let s = schedule(serde_json::json!({
            "baseFee": { "type": "percentage", "percentageField": "projectValue", "percentageRate": 2 }
        }));
        let result = calculate(&s, &form(serde_json::json!({ "projectValue": "50000" })));
        assert_eq!(result.total, dec("1000"));

        // unparseable field value contributes zero
        let result = calculate(&s, &form(serde_json::json!({ "projectValue": "a lot" })));
        assert_eq!(result.total, Decimal::ZERO);
        assert!(result.line_items.is_empty());
    }

    #[test]
    fn tiered_base_fee_falls_back_to_flat_amount() {
        let s = schedule(serde_json::json!({
            "baseFee": { "type": "tiered", "amount": 200, "tiers": [ { "upTo": 1000, "amount": 50 } ] }
        }));
        let result = calculate(&s, &form(serde_json::json!({})));
        assert_eq!(result.total, dec("200"));
    }

    #[test]
    fn penalty_is_percentage_of_running_total_not_base() {
        let s = schedule(serde_json::json!({
            "baseFee": { "type": "fixed", "amount": 100 },
            "conditionalFees": [{
                "name": "Extra", "amount": 20, "type": "fixed",
                "condition": { "field": "extra", "operator": "checked" }
            }],
            "penalties": [{
                "name": "Late", "penaltyType": "percentage", "penaltyAmount": 10,
                "condition": { "field": "late", "operator": "checked" }
            }]
        }));
        let result = calculate(&s, &form(serde_json::json!({ "extra": true, "late": true })));
        assert_eq!(result.subtotal, dec("120"));
        assert_eq!(result.total_penalties, dec("12"));
        assert_eq!(result.total, dec("132"));
    }

    #[test]
    fn waiver_is_capped_at_running_total() {
        let s = schedule(serde_json::json!({
            "baseFee": { "type": "fixed", "amount": 100 },
            "waivers": [{
                "name": "Hardship", "discountType": "fixed", "discountAmount": 500,
                "condition": { "field": "hardship", "operator": "checked" }
            }]
        }));
        let result = calculate(&s, &form(serde_json::json!({ "hardship": "yes" })));
        assert_eq!(result.total, Decimal::ZERO);
        assert_eq!(result.total_waivers, dec("100"));
        assert_eq!(result.line_items.last().unwrap().amount, dec("-100"));
    }

    #[test]
    fn stacked_waivers_never_go_negative() {
        let s = schedule(serde_json::json!({
            "baseFee": { "type": "fixed", "amount": 100 },
            "waivers": [
                {
                    "name": "Full", "discountType": "full",
                    "condition": { "field": "w", "operator": "checked" }
                },
                {
                    "name": "Extra", "discountType": "fixed", "discountAmount": 25,
                    "condition": { "field": "w", "operator": "checked" }
                }
            ]
        }));
        let result = calculate(&s, &form(serde_json::json!({ "w": true })));
        assert_eq!(result.total, Decimal::ZERO);
        // second waiver found nothing left to discount
        assert_eq!(result.line_items[2].amount, Decimal::ZERO);
    }

    #[test]
    fn fee_condition_equality_is_case_insensitive() {
        let s = schedule(serde_json::json!({
            "baseFee": { "type": "fixed", "amount": 100 },
            "conditionalFees": [{
                "name": "Rush", "amount": 25, "type": "fixed",
                "condition": { "field": "rush", "operator": "equals", "value": "yes" }
            }]
        }));
        let result = calculate(&s, &form(serde_json::json!({ "rush": "YES" })));
        assert_eq!(result.total, dec("125"));
    }

    #[test]
    fn totals_round_half_up_at_the_cent() {
        let s = schedule(serde_json::json!({
            "baseFee": { "type": "fixed", "amount": 100.555 }
        }));
        let result = calculate(&s, &form(serde_json::json!({})));
        assert_eq!(result.total, dec("100.56"));
    }
}

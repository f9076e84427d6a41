//! Fee-schedule data model.
//!
//! A fee schedule is the `fee_rules` blob stored on an application-type
//! record: a base fee plus conditional fees, penalties, and waivers,
//! each gated by a condition over the form snapshot. Parsing follows
//! the same forgiving policy as the rule set: a missing or malformed
//! schedule evaluates to a zero total, never an error.

use rust_decimal::Decimal;

use crate::ruleset::{decimal_from_json, Condition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseFeeKind {
    Fixed,
    Percentage,
    Tiered,
}

/// One bracket of a tiered base fee. Brackets are parsed and retained,
/// but the tier walk is not implemented yet; a tiered base fee falls
/// back to its flat `amount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeTier {
    pub up_to: Option<Decimal>,
    pub amount: Decimal,
}

/// The starting application fee before conditional fees, penalties,
/// and waivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseFee {
    pub kind: BaseFeeKind,
    pub amount: Decimal,
    /// For `Percentage`: the form field whose value the rate applies to.
    pub percentage_field: Option<String>,
    pub percentage_rate: Decimal,
    pub tiers: Vec<FeeTier>,
}

impl BaseFee {
    pub fn from_json(v: &serde_json::Value) -> Option<BaseFee> {
        let obj = v.as_object()?;
        let kind = match obj.get("type").and_then(|t| t.as_str()) {
            Some("percentage") => BaseFeeKind::Percentage,
            Some("tiered") => BaseFeeKind::Tiered,
            // "fixed" and anything unrecognized both read the flat amount
            _ => BaseFeeKind::Fixed,
        };
        let amount = obj
            .get("amount")
            .map(decimal_from_json)
            .unwrap_or(Decimal::ZERO);
        let percentage_field = get_str(obj, "percentageField", "percentage_field");
        let percentage_rate = obj
            .get("percentageRate")
            .or_else(|| obj.get("percentage_rate"))
            .map(decimal_from_json)
            .unwrap_or(Decimal::ZERO);
        let tiers = obj
            .get("tiers")
            .and_then(|t| t.as_array())
            .map(|arr| arr.iter().filter_map(parse_tier).collect())
            .unwrap_or_default();
        Some(BaseFee {
            kind,
            amount,
            percentage_field,
            percentage_rate,
            tiers,
        })
    }
}

fn parse_tier(v: &serde_json::Value) -> Option<FeeTier> {
    let obj = v.as_object()?;
    let up_to = obj
        .get("upTo")
        .or_else(|| obj.get("up_to"))
        .map(decimal_from_json);
    let amount = obj
        .get("amount")
        .map(decimal_from_json)
        .unwrap_or(Decimal::ZERO);
    Some(FeeTier { up_to, amount })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountKind {
    Fixed,
    Percentage,
}

impl AmountKind {
    fn parse(s: Option<&str>) -> AmountKind {
        match s {
            Some("percentage") => AmountKind::Percentage,
            _ => AmountKind::Fixed,
        }
    }
}

/// A surcharge applied when its condition matches the form snapshot.
/// Percentage amounts are percentages of the base fee.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalFee {
    pub name: String,
    pub condition: Option<Condition>,
    pub amount: Decimal,
    pub kind: AmountKind,
}

/// A penalty applied against the running total (base + conditional
/// fees), not against the base fee alone.
#[derive(Debug, Clone, PartialEq)]
pub struct Penalty {
    pub name: String,
    pub condition: Option<Condition>,
    pub kind: AmountKind,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaiverKind {
    Full,
    Percentage,
    Fixed,
}

/// A discount applied last, individually capped at the running total.
#[derive(Debug, Clone, PartialEq)]
pub struct Waiver {
    pub name: String,
    pub condition: Option<Condition>,
    pub kind: WaiverKind,
    pub amount: Decimal,
}

/// The complete fee configuration for one application type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeSchedule {
    pub base_fee: Option<BaseFee>,
    pub conditional_fees: Vec<ConditionalFee>,
    pub penalties: Vec<Penalty>,
    pub waivers: Vec<Waiver>,
}

impl FeeSchedule {
    /// Parse a schedule from wire JSON. `from_json(&json!({}))` yields
    /// an empty schedule whose evaluation totals zero.
    pub fn from_json(v: &serde_json::Value) -> FeeSchedule {
        let Some(obj) = v.as_object() else {
            if !v.is_null() {
                tracing::debug!(got = v.to_string(), "fee schedule is not a JSON object");
            }
            return FeeSchedule::default();
        };

        let base_fee = obj
            .get("baseFee")
            .or_else(|| obj.get("base_fee"))
            .and_then(BaseFee::from_json);

        let conditional_fees = entries(obj, "conditionalFees", "conditional_fees")
            .filter_map(|e| {
                let o = e.as_object()?;
                Some(ConditionalFee {
                    name: name_of(o),
                    condition: o.get("condition").and_then(Condition::from_json),
                    amount: o.get("amount").map(decimal_from_json).unwrap_or(Decimal::ZERO),
                    kind: AmountKind::parse(o.get("type").and_then(|t| t.as_str())),
                })
            })
            .collect();

        let penalties = entries(obj, "penalties", "penalties")
            .filter_map(|e| {
                let o = e.as_object()?;
                Some(Penalty {
                    name: name_of(o),
                    condition: o.get("condition").and_then(Condition::from_json),
                    kind: AmountKind::parse(
                        o.get("penaltyType")
                            .or_else(|| o.get("penalty_type"))
                            .and_then(|t| t.as_str()),
                    ),
                    amount: o
                        .get("penaltyAmount")
                        .or_else(|| o.get("penalty_amount"))
                        .map(decimal_from_json)
                        .unwrap_or(Decimal::ZERO),
                })
            })
            .collect();

        let waivers = entries(obj, "waivers", "waivers")
            .filter_map(|e| {
                let o = e.as_object()?;
                let kind = match o
                    .get("discountType")
                    .or_else(|| o.get("discount_type"))
                    .and_then(|t| t.as_str())
                {
                    Some("full") => WaiverKind::Full,
                    Some("percentage") => WaiverKind::Percentage,
                    _ => WaiverKind::Fixed,
                };
                Some(Waiver {
                    name: name_of(o),
                    condition: o.get("condition").and_then(Condition::from_json),
                    kind,
                    amount: o
                        .get("discountAmount")
                        .or_else(|| o.get("discount_amount"))
                        .map(decimal_from_json)
                        .unwrap_or(Decimal::ZERO),
                })
            })
            .collect();

        FeeSchedule {
            base_fee,
            conditional_fees,
            penalties,
            waivers,
        }
    }
}

fn entries<'a>(
    obj: &'a serde_json::Map<String, serde_json::Value>,
    camel: &str,
    snake: &str,
) -> impl Iterator<Item = &'a serde_json::Value> {
    obj.get(camel)
        .or_else(|| obj.get(snake))
        .and_then(|v| v.as_array())
        .map(|a| a.iter())
        .unwrap_or_default()
}

fn get_str(
    obj: &serde_json::Map<String, serde_json::Value>,
    camel: &str,
    snake: &str,
) -> Option<String> {
    obj.get(camel)
        .or_else(|| obj.get(snake))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn name_of(obj: &serde_json::Map<String, serde_json::Value>) -> String {
    obj.get("name")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

//! Total coercions for condition operands and fee math.
//!
//! Every coercion here is total: a value that cannot be interpreted
//! yields `None`, and `None` comparisons resolve to false upstream.
//! All monetary arithmetic is `rust_decimal::Decimal`; totals round
//! half-up at the cent.

use rust_decimal::{Decimal, RoundingStrategy};
use rubric_core::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Coerce a form value to a Decimal for numeric comparison.
/// Unparseable text, booleans, and null all yield `None`.
pub fn to_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Number(d) => Some(*d),
        Value::Text(s) => s.trim().parse().ok(),
        Value::Bool(_) | Value::Null => None,
    }
}

/// Coerce a form value to a UTC timestamp for date comparison.
/// Accepts ISO `YYYY-MM-DD` dates (compared at midnight UTC) and
/// RFC 3339 date-times.
pub fn to_timestamp(v: &Value) -> Option<i64> {
    let Value::Text(s) = v else { return None };
    let s = s.trim();
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(dt.unix_timestamp());
    }
    let date_format = format_description!("[year]-[month]-[day]");
    Date::parse(s, &date_format)
        .ok()
        .map(|d| d.midnight().assume_utc().unix_timestamp())
}

/// Round a monetary amount to cents, half-up.
pub fn round_cents(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

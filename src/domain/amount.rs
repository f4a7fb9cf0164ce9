use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places the expense service stores for every amount.
pub const CENTS_DECIMALS: u32 = 2;

pub const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Parses user-entered numeric text.
///
/// Leading and trailing whitespace is ignored. Empty input and anything that
/// is not a plain or scientific decimal number yields `None`.
pub fn parse_number(input: &str) -> Option<Decimal> {
    let s = input.trim();
    // rust_decimal tolerates `_` separators; a form field must not
    if s.is_empty() || s.contains('_') {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Rounds to cents, ties away from zero.
pub fn quantize(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CENTS_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Formats an amount as Indian rupees with lakh/crore digit grouping,
/// e.g. `₹1,23,456.70`.
pub fn format_currency(value: Decimal) -> String {
    let rounded = quantize(value);
    let neg = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let grouped = if int_part.len() <= 3 {
        int_part.to_string()
    } else {
        let (head, tail) = int_part.split_at(int_part.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 0 {
            let start = end.saturating_sub(2);
            groups.push(&head[start..end]);
            end = start;
        }
        groups.reverse();
        format!("{},{}", groups.join(","), tail)
    };

    if neg {
        format!("-₹{}.{}", grouped, frac_part)
    } else {
        format!("₹{}.{}", grouped, frac_part)
    }
}

/// Same as [`format_currency`] for raw text; non-numeric text renders as `₹0.00`.
pub fn format_currency_text(input: &str) -> String {
    parse_number(input)
        .map(format_currency)
        .unwrap_or_else(|| format_currency(Decimal::ZERO))
}

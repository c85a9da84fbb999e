use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

/// `partial / total * 100`, or zero when the total is zero.
pub fn calculate_percentage(partial: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    partial / total * Decimal::ONE_HUNDRED
}

/// Percentage rounded to one decimal place, half to even.
pub fn percentage_1dp(partial: Decimal, total: Decimal) -> Decimal {
    calculate_percentage(partial, total).round_dp(1)
}

fn symbol_for(code: &str) -> &str {
    match code {
        "ARS" => "$",
        "USD" => "US$",
        other => other,
    }
}

/// Formats an amount the way Argentine users read it: `"$ 1.234,56"`,
/// `"US$ 100,00"`, `"-$ 50,00"`.
pub fn format_currency(amount: Decimal, currency_code: &str) -> String {
    let decimals = match rusty_money::iso::find(currency_code) {
        Some(currency) => currency.exponent,
        None => {
            warn!("Unknown currency code {}, formatting with 2 decimals", currency_code);
            2
        }
    };

    let rounded = amount
        .abs()
        .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let plain = format!("{:.*}", decimals as usize, rounded);
    let (integer, fraction) = match plain.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (plain.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push(',');
        grouped.push_str(fraction);
    }

    let sign = if amount.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}{} {}", sign, symbol_for(currency_code), grouped)
}

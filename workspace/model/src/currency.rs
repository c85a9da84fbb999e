//! Currency handling shared by expenses, incomes and savings.
//!
//! Every monetary record keeps the amount in its original currency together
//! with the exchange rate used, and a copy normalized to ARS so that totals
//! across currencies can be summed directly.

use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::entity::prelude::*;

use crate::error::{ModelError, Result};

/// Base currency every amount is normalized to.
pub const BASE_CURRENCY: Currency = Currency::Ars;

/// Rate applied to amounts already expressed in the base currency.
pub const DEFAULT_EXCHANGE_RATE: Decimal = Decimal::ONE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(3))")]
pub enum Currency {
    #[sea_orm(string_value = "ARS")]
    Ars,
    #[sea_orm(string_value = "USD")]
    Usd,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Ars => "ARS",
            Currency::Usd => "USD",
        }
    }

    /// Symbol used when rendering amounts for this currency.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Ars => "$",
            Currency::Usd => "US$",
        }
    }

    /// ISO 4217 metadata for the currency.
    pub fn iso(&self) -> &'static rusty_money::iso::Currency {
        match self {
            Currency::Ars => rusty_money::iso::ARS,
            Currency::Usd => rusty_money::iso::USD,
        }
    }

    /// Number of minor-unit digits, two for both supported currencies.
    pub fn minor_units(&self) -> u32 {
        self.iso().exponent
    }

    /// Parses a currency code case-insensitively.
    pub fn parse(code: &str) -> Result<Self> {
        match code.trim().to_uppercase().as_str() {
            "ARS" => Ok(Currency::Ars),
            "USD" => Ok(Currency::Usd),
            other => Err(ModelError::validation(
                "currency",
                format!("Unsupported currency '{}'", other),
            )),
        }
    }
}

/// Result of normalizing an amount to the base currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalized {
    pub exchange_rate: Decimal,
    pub amount_ars: Decimal,
}

/// Resolves the exchange rate for `currency` and converts `amount` to ARS.
///
/// ARS always uses a rate of 1 regardless of what was supplied. Foreign
/// currencies require an explicit positive rate. The converted amount is
/// rounded to the base currency precision using banker's rounding.
pub fn normalize(amount: Decimal, currency: Currency, exchange_rate: Option<Decimal>) -> Result<Normalized> {
    let rate = match currency {
        Currency::Ars => DEFAULT_EXCHANGE_RATE,
        _ => match exchange_rate {
            None => {
                return Err(ModelError::validation(
                    "exchange_rate",
                    format!("An exchange rate is required for {} amounts", currency.code()),
                ));
            }
            Some(rate) if rate <= Decimal::ZERO => {
                return Err(ModelError::validation(
                    "exchange_rate",
                    "Exchange rate must be greater than zero",
                ));
            }
            Some(rate) => rate,
        },
    };

    let amount_ars = (amount * rate).round_dp_with_strategy(
        BASE_CURRENCY.minor_units(),
        RoundingStrategy::MidpointNearestEven,
    );

    Ok(Normalized {
        exchange_rate: rate,
        amount_ars,
    })
}

/// Checks that a user supplied amount is strictly positive.
pub fn ensure_positive(field: &str, amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(ModelError::validation(field, "Amount must be greater than zero"));
    }
    Ok(())
}

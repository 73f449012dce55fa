//! Quote validation and completion settlement. Both halves are pure; the
//! service layer persists whatever they return.
use super::booking::{Money, TimeStamp};
use super::error::EngineError;
use chrono::Utc;

/// Platform commission in basis points of the quoted price.
pub const PLATFORM_FEE_BPS: u64 = 1_000;
/// Days after completion by which the commission falls due.
pub const COMMISSION_DUE_DAYS: i64 = 7;

/// A provider's priced proposal as submitted, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuoteInput {
    pub price: Money,
    pub labor: Option<Money>,
    pub material: Option<Money>,
    pub estimated_days: Option<u32>,
    pub notes: Option<String>,
}

/// Rejects a zero price and any cost breakdown that exceeds the total.
pub fn validate_quote(input: &QuoteInput) -> Result<(), EngineError> {
    if input.price.is_zero() {
        return Err(EngineError::InvalidQuote(
            "quoted price must be greater than zero".into(),
        ));
    }
    let breakdown = input
        .labor
        .unwrap_or(Money::ZERO)
        .saturating_add(input.material.unwrap_or(Money::ZERO));
    if breakdown > input.price {
        return Err(EngineError::InvalidQuote(
            "labor plus material exceeds the quoted price".into(),
        ));
    }
    Ok(())
}

/// Financial outcome of a confirmed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub platform_fee: Money,
    pub provider_earnings: Money,
    pub commission_due: TimeStamp<Utc>,
}

/// 10% of the price, rounded half-up to the cent. Integer arithmetic only.
pub fn platform_fee(price: Money) -> Money {
    let cents = price.cents() as u128;
    let fee = (cents * PLATFORM_FEE_BPS as u128 + 5_000) / 10_000;
    Money::from_cents(fee as u64)
}

/// Split the quoted price into fee and earnings and stamp the commission
/// deadline. Completion without a recorded quote is invalid, never defaulted.
pub fn settle(quoted_price: Option<Money>, now: &TimeStamp<Utc>) -> Result<Settlement, EngineError> {
    let price = quoted_price
        .filter(|p| !p.is_zero())
        .ok_or(EngineError::MissingQuote)?;
    let fee = platform_fee(price);

    Ok(Settlement {
        platform_fee: fee,
        // fee is at most 10% of price plus half a cent, so this cannot
        // underflow for any price >= 1 cent.
        provider_earnings: Money::from_cents(price.cents() - fee.cents()),
        commission_due: now.plus_days(COMMISSION_DUE_DAYS),
    })
}

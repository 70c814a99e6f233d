//! Exchange pricing model.
//!
//! The exchange prices resources with a linear curve in stock. The bot
//! estimates, per resource, how many units one premium point buys or sells
//! for, and compares those rates across resources.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::PricingError;
use crate::market::{MarketConstants, TaxRates};

/// Upper bound on refinement steps in [`rate_for_one_point`].
pub const MAX_REFINEMENT_STEPS: u32 = 50;

/// Price of the next unit at the given stock level.
///
/// `base - elasticity * stock / (capacity + stock_size_modifier)`. Falls as
/// stock grows and may go negative for stock far above capacity.
pub fn marginal_price(
    constants: &MarketConstants,
    stock: i64,
    capacity: i64,
) -> Result<Decimal, PricingError> {
    let denominator = Decimal::from(capacity)
        .checked_add(constants.stock_size_modifier)
        .ok_or(PricingError::Overflow)?;

    if denominator.is_zero() {
        return Err(PricingError::DegenerateCapacity);
    }

    let slope = constants
        .resource_price_elasticity
        .checked_mul(Decimal::from(stock))
        .and_then(|v| v.checked_div(denominator))
        .ok_or(PricingError::Overflow)?;

    constants
        .resource_base_price
        .checked_sub(slope)
        .ok_or(PricingError::Overflow)
}

/// Points paid for moving `units` through the exchange, tax included.
///
/// Positive `units` buy from the exchange at the buy tax, negative `units`
/// sell at the sell tax. The curve is linear, so the average of the two end
/// prices is exact.
pub fn cost(
    constants: &MarketConstants,
    stock: i64,
    capacity: i64,
    tax: &TaxRates,
    units: i64,
) -> Result<Decimal, PricingError> {
    let after = stock.checked_sub(units).ok_or(PricingError::Overflow)?;
    let start_price = marginal_price(constants, stock, capacity)?;
    let end_price = marginal_price(constants, after, capacity)?;

    let taxed = Decimal::ONE.checked_add(tax.for_units(units));
    let price_sum = start_price.checked_add(end_price);

    taxed
        .zip(price_sum)
        .and_then(|(taxed, sum)| taxed.checked_mul(sum))
        .and_then(|v| v.checked_mul(Decimal::from(units)))
        .and_then(|v| v.checked_div(Decimal::TWO))
        .ok_or(PricingError::Overflow)
}

/// Outcome of the rate search, with the search trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateEstimate {
    /// Units per point reached.
    pub units: i64,
    /// Starting guess, `floor(1 / marginal_price)`.
    pub initial_units: i64,
    /// Refinement steps taken.
    pub steps: u32,
    /// Whether the cost of `units` fell to at most one point.
    pub converged: bool,
}

/// Largest unit count whose cost is at most one point, with the search trace.
///
/// Starts at `floor(1 / marginal_price)` and steps down one unit at a time
/// while the cost exceeds one point, for at most [`MAX_REFINEMENT_STEPS`]
/// steps. When the cap is hit the last value is returned as is.
pub fn rate_for_one_point_traced(
    constants: &MarketConstants,
    stock: i64,
    capacity: i64,
    tax: &TaxRates,
) -> Result<RateEstimate, PricingError> {
    let marginal = marginal_price(constants, stock, capacity)?;
    if marginal.is_zero() {
        return Err(PricingError::ZeroMarginalPrice);
    }

    let initial_units = Decimal::ONE
        .checked_div(marginal)
        .ok_or(PricingError::Overflow)?
        .floor()
        .to_i64()
        .ok_or(PricingError::Overflow)?;

    let mut units = initial_units;
    let mut steps = 0;
    let mut current = cost(constants, stock, capacity, tax, units)?;

    while current > Decimal::ONE && steps < MAX_REFINEMENT_STEPS {
        units = units.checked_sub(1).ok_or(PricingError::Overflow)?;
        steps += 1;
        current = cost(constants, stock, capacity, tax, units)?;
    }

    Ok(RateEstimate {
        units,
        initial_units,
        steps,
        converged: current <= Decimal::ONE,
    })
}

/// Units of a resource that one premium point trades for.
pub fn rate_for_one_point(
    constants: &MarketConstants,
    stock: i64,
    capacity: i64,
    tax: &TaxRates,
) -> Result<i64, PricingError> {
    rate_for_one_point_traced(constants, stock, capacity, tax).map(|estimate| estimate.units)
}

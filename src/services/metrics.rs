//! Figures derived from stored prices and supply.

use rust_decimal::Decimal;

/// Number of daily closes in the moving average
pub const MAYER_WINDOW: usize = 200;

const SATS_PER_BTC: i64 = 100_000_000;

/// Mayer multiple: current price over the mean of the trailing 200 daily closes.
///
/// `closes_newest_first` must be ordered by date descending. Only the first
/// [`MAYER_WINDOW`] entries are used. Returns `None` when fewer than 200 closes
/// exist or the current price is missing or zero; the ratio is never computed
/// over a shorter window.
pub fn mayer_multiple(
    current_price: Option<Decimal>,
    closes_newest_first: &[Decimal],
) -> Option<Decimal> {
    let price = current_price.filter(|p| !p.is_zero())?;

    if closes_newest_first.len() < MAYER_WINDOW {
        tracing::debug!(
            "Mayer multiple unavailable: {} of {} daily closes",
            closes_newest_first.len(),
            MAYER_WINDOW
        );
        return None;
    }

    let sum: Decimal = closes_newest_first[..MAYER_WINDOW].iter().sum();
    let average = sum / Decimal::from(MAYER_WINDOW as u64);

    if average.is_zero() {
        return None;
    }

    Some(price / average)
}

/// Market cap in USD: price times calculated supply, no further validation.
pub fn market_cap(price_usd: Decimal, supply: Decimal) -> Decimal {
    price_usd * supply
}

/// Fiat value of an amount of satoshis at `btc_price`.
pub fn sats_to_fiat(sats: Decimal, btc_price: Decimal) -> Decimal {
    if sats <= Decimal::ZERO || btc_price.is_zero() {
        return Decimal::ZERO;
    }
    sats / Decimal::from(SATS_PER_BTC) * btc_price
}

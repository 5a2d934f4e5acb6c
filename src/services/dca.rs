//! Dollar-cost-averaging backtest
//!
//! Walks a date-ascending price series once and buys a fixed fiat amount on
//! every date the cadence selects:
//! - daily: every point with a usable price
//! - weekly: the configured weekday, at least 7 days after the previous buy
//! - monthly: the configured day clamped to the month's last day, once per month
//!
//! Points without a usable price for the chosen currency are skipped and do
//! not move the cadence. The portfolio is valued at the last usable price.
//! Pure and synchronous; safe to run concurrently.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::daily_close_prices;
use crate::services::market_data::Currency;

const DAYS_PER_WEEK: i64 = 7;

/// Largest accepted purchase amount, in fiat units
pub const MAX_AMOUNT: Decimal = dec!(1_000_000_000_000);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DcaError {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("amount must be at most {max}, got {0}", max = MAX_AMOUNT)]
    AmountTooLarge(Decimal),

    #[error("day_of_week must be 0 (Sunday) to 6 (Saturday), got {0}")]
    DayOfWeekOutOfRange(u32),

    #[error("day_of_month must be 1 to 31, got {0}")]
    DayOfMonthOutOfRange(u32),

    #[error("{0} is required for this frequency")]
    MissingDay(&'static str),

    #[error("arithmetic overflow while simulating")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyKind {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    /// 0 = Sunday .. 6 = Saturday
    Weekly { day_of_week: u32 },
    /// 1..=31, clamped to the month's length
    Monthly { day_of_month: u32 },
}

impl Frequency {
    /// Build from a kind plus the optional selectors a request carries.
    /// The selector for the chosen kind is required; the other is ignored.
    pub fn from_parts(
        kind: FrequencyKind,
        day_of_week: Option<u32>,
        day_of_month: Option<u32>,
    ) -> Result<Self, DcaError> {
        match kind {
            FrequencyKind::Daily => Ok(Frequency::Daily),
            FrequencyKind::Weekly => day_of_week
                .map(|day_of_week| Frequency::Weekly { day_of_week })
                .ok_or(DcaError::MissingDay("day_of_week")),
            FrequencyKind::Monthly => day_of_month
                .map(|day_of_month| Frequency::Monthly { day_of_month })
                .ok_or(DcaError::MissingDay("day_of_month")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DcaParameters {
    pub amount: Decimal,
    pub currency: Currency,
    pub frequency: Frequency,
}

impl DcaParameters {
    pub fn validate(&self) -> Result<(), DcaError> {
        if self.amount <= Decimal::ZERO {
            return Err(DcaError::NonPositiveAmount(self.amount));
        }
        if self.amount > MAX_AMOUNT {
            return Err(DcaError::AmountTooLarge(self.amount));
        }

        match self.frequency {
            Frequency::Weekly { day_of_week } if day_of_week > 6 => {
                Err(DcaError::DayOfWeekOutOfRange(day_of_week))
            }
            Frequency::Monthly { day_of_month } if !(1..=31).contains(&day_of_month) => {
                Err(DcaError::DayOfMonthOutOfRange(day_of_month))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price_usd: Option<Decimal>,
    pub price_brl: Option<Decimal>,
}

impl PricePoint {
    /// Usable price in `currency`: present and non-zero
    pub fn price(&self, currency: Currency) -> Option<Decimal> {
        let price = match currency {
            Currency::Usd => self.price_usd,
            Currency::Brl => self.price_brl,
        };
        price.filter(|p| *p > Decimal::ZERO)
    }
}

impl From<daily_close_prices::Model> for PricePoint {
    fn from(close: daily_close_prices::Model) -> Self {
        Self {
            date: close.date,
            price_usd: Some(close.price_usd),
            price_brl: close.price_brl,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DcaResult {
    pub total_invested: Decimal,
    pub total_units: Decimal,
    pub current_value: Decimal,
    pub gain_loss: Decimal,
    /// In percent units: 7.5 means +7.5 %. Zero when nothing was invested.
    pub gain_loss_percent: Decimal,
    pub currency: Currency,
    pub purchase_count: u32,
    pub first_purchase: Option<NaiveDate>,
    pub last_purchase: Option<NaiveDate>,
    /// No point in the series had a usable price for the currency
    pub insufficient_data: bool,
}

impl DcaResult {
    fn empty(currency: Currency) -> Self {
        Self {
            total_invested: Decimal::ZERO,
            total_units: Decimal::ZERO,
            current_value: Decimal::ZERO,
            gain_loss: Decimal::ZERO,
            gain_loss_percent: Decimal::ZERO,
            currency,
            purchase_count: 0,
            first_purchase: None,
            last_purchase: None,
            insufficient_data: true,
        }
    }
}

/// Run one strategy over `series` (ascending by date).
pub fn simulate(params: &DcaParameters, series: &[PricePoint]) -> Result<DcaResult, DcaError> {
    params.validate()?;

    let currency = params.currency;
    let Some(latest_price) = series.iter().rev().find_map(|point| point.price(currency)) else {
        return Ok(DcaResult::empty(currency));
    };

    let mut total_invested = Decimal::ZERO;
    let mut total_units = Decimal::ZERO;
    let mut purchase_count = 0u32;
    let mut first_purchase = None;
    let mut last_purchase: Option<NaiveDate> = None;

    for point in series {
        let Some(price) = point.price(currency) else {
            continue;
        };

        if !is_purchase_day(params.frequency, point.date, last_purchase) {
            continue;
        }

        total_invested = checked(total_invested.checked_add(params.amount))?;
        let units = checked(params.amount.checked_div(price))?;
        total_units = checked(total_units.checked_add(units))?;
        purchase_count += 1;
        first_purchase.get_or_insert(point.date);
        last_purchase = Some(point.date);
    }

    let current_value = checked(total_units.checked_mul(latest_price))?;
    let gain_loss = checked(current_value.checked_sub(total_invested))?;
    let gain_loss_percent = if total_invested.is_zero() {
        Decimal::ZERO
    } else {
        checked(
            gain_loss
                .checked_div(total_invested)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED)),
        )?
    };

    Ok(DcaResult {
        total_invested,
        total_units,
        current_value,
        gain_loss,
        gain_loss_percent,
        currency,
        purchase_count,
        first_purchase,
        last_purchase,
        insufficient_data: false,
    })
}

fn checked(value: Option<Decimal>) -> Result<Decimal, DcaError> {
    value.ok_or(DcaError::Overflow)
}

fn is_purchase_day(
    frequency: Frequency,
    date: NaiveDate,
    last_purchase: Option<NaiveDate>,
) -> bool {
    match frequency {
        Frequency::Daily => true,
        Frequency::Weekly { day_of_week } => {
            date.weekday().num_days_from_sunday() == day_of_week
                && last_purchase.is_none_or(|last| (date - last).num_days() >= DAYS_PER_WEEK)
        }
        Frequency::Monthly { day_of_month } => {
            date.day() == day_of_month.min(last_day_of_month(date))
                && last_purchase
                    .is_none_or(|last| (last.year(), last.month()) != (date.year(), date.month()))
        }
    }
}

/// Number of days in `date`'s month
pub fn last_day_of_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn usd(y: i32, m: u32, d: u32, price: Decimal) -> PricePoint {
        PricePoint {
            date: date(y, m, d),
            price_usd: Some(price),
            price_brl: None,
        }
    }

    fn daily_series(start: NaiveDate, end: NaiveDate, price: Decimal) -> Vec<PricePoint> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|d| PricePoint {
                date: d,
                price_usd: Some(price),
                price_brl: Some(price * dec!(5)),
            })
            .collect()
    }

    fn params(frequency: Frequency) -> DcaParameters {
        DcaParameters {
            amount: dec!(100),
            currency: Currency::Usd,
            frequency,
        }
    }

    #[test]
    fn test_weekly_end_to_end() {
        let series = vec![
            usd(2024, 1, 1, dec!(40000)),
            usd(2024, 1, 8, dec!(42000)),
            usd(2024, 1, 15, dec!(38000)),
            usd(2024, 1, 22, dec!(44000)),
        ];

        let result = simulate(&params(Frequency::Weekly { day_of_week: 1 }), &series).unwrap();

        assert_eq!(result.purchase_count, 4);
        assert_eq!(result.total_invested, dec!(400));
        assert_eq!(result.total_units.round_dp(10), dec!(0.0097852586));
        assert_eq!(result.current_value.round_dp(2), dec!(430.55));
        assert_eq!(result.gain_loss.round_dp(2), dec!(30.55));
        assert_eq!(result.gain_loss_percent.round_dp(2), dec!(7.64));
        assert_eq!(result.first_purchase, Some(date(2024, 1, 1)));
        assert_eq!(result.last_purchase, Some(date(2024, 1, 22)));
        assert!(!result.insufficient_data);
    }

    #[test]
    fn test_weekly_dedups_repeated_day() {
        let series = vec![
            usd(2024, 1, 1, dec!(100)),
            usd(2024, 1, 1, dec!(110)),
            usd(2024, 1, 8, dec!(120)),
        ];

        let result = simulate(&params(Frequency::Weekly { day_of_week: 1 }), &series).unwrap();

        assert_eq!(result.purchase_count, 2);
        assert_eq!(result.total_invested, dec!(200));
    }

    #[test]
    fn test_weekly_skips_other_weekdays() {
        let series = daily_series(date(2024, 1, 1), date(2024, 1, 31), dec!(100));

        // 2024-01-07 is the first Sunday
        let result = simulate(&params(Frequency::Weekly { day_of_week: 0 }), &series).unwrap();

        assert_eq!(result.purchase_count, 4);
        assert_eq!(result.first_purchase, Some(date(2024, 1, 7)));
    }

    #[test]
    fn test_monthly_clamps_to_month_end() {
        let april = daily_series(date(2024, 4, 1), date(2024, 4, 30), dec!(100));
        let result = simulate(&params(Frequency::Monthly { day_of_month: 31 }), &april).unwrap();
        assert_eq!(result.purchase_count, 1);
        assert_eq!(result.last_purchase, Some(date(2024, 4, 30)));

        let february = daily_series(date(2023, 2, 1), date(2023, 2, 28), dec!(100));
        let result = simulate(&params(Frequency::Monthly { day_of_month: 31 }), &february).unwrap();
        assert_eq!(result.last_purchase, Some(date(2023, 2, 28)));

        let leap_february = daily_series(date(2024, 2, 1), date(2024, 2, 29), dec!(100));
        let result =
            simulate(&params(Frequency::Monthly { day_of_month: 30 }), &leap_february).unwrap();
        assert_eq!(result.last_purchase, Some(date(2024, 2, 29)));
    }

    #[test]
    fn test_monthly_buys_once_per_month() {
        let mut series = daily_series(date(2024, 1, 1), date(2024, 3, 31), dec!(100));
        series.insert(15, usd(2024, 1, 15, dec!(90)));

        let result = simulate(&params(Frequency::Monthly { day_of_month: 15 }), &series).unwrap();

        assert_eq!(result.purchase_count, 3);
        assert_eq!(result.first_purchase, Some(date(2024, 1, 15)));
    }

    #[test]
    fn test_daily_buys_every_point() {
        let series = daily_series(date(2024, 1, 1), date(2024, 1, 10), dec!(100));

        let result = simulate(&params(Frequency::Daily), &series).unwrap();

        assert_eq!(result.purchase_count, 10);
        assert_eq!(result.total_units, dec!(10));
        assert_eq!(result.gain_loss_percent, Decimal::ZERO);
    }

    #[test]
    fn test_missing_prices_do_not_move_cadence() {
        let series = vec![
            PricePoint {
                date: date(2024, 1, 1),
                price_usd: Some(dec!(100)),
                price_brl: None,
            },
            PricePoint {
                date: date(2024, 1, 8),
                price_usd: Some(dec!(100)),
                price_brl: Some(dec!(500)),
            },
            PricePoint {
                date: date(2024, 1, 15),
                price_usd: Some(dec!(100)),
                price_brl: Some(Decimal::ZERO),
            },
        ];
        let params = DcaParameters {
            amount: dec!(100),
            currency: Currency::Brl,
            frequency: Frequency::Weekly { day_of_week: 1 },
        };

        let result = simulate(&params, &series).unwrap();

        assert_eq!(result.purchase_count, 1);
        assert_eq!(result.first_purchase, Some(date(2024, 1, 8)));
        // valued at the last usable BRL price
        assert_eq!(result.current_value, dec!(100));
    }

    #[test]
    fn test_insufficient_data() {
        let result = simulate(&params(Frequency::Daily), &[]).unwrap();
        assert!(result.insufficient_data);
        assert_eq!(result.gain_loss_percent, Decimal::ZERO);

        let brl_only = vec![PricePoint {
            date: date(2024, 1, 1),
            price_usd: None,
            price_brl: Some(dec!(500)),
        }];
        assert!(simulate(&params(Frequency::Daily), &brl_only).unwrap().insufficient_data);
    }

    #[test]
    fn test_no_purchase_reports_zero_percent() {
        // 2024-01-02 is a Tuesday, nothing matches Monday
        let series = vec![usd(2024, 1, 2, dec!(100))];

        let result = simulate(&params(Frequency::Weekly { day_of_week: 1 }), &series).unwrap();

        assert!(!result.insufficient_data);
        assert_eq!(result.purchase_count, 0);
        assert_eq!(result.gain_loss_percent, Decimal::ZERO);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        let mut invalid = params(Frequency::Daily);
        invalid.amount = Decimal::ZERO;
        assert_eq!(
            simulate(&invalid, &[]).unwrap_err(),
            DcaError::NonPositiveAmount(Decimal::ZERO)
        );

        assert_eq!(
            params(Frequency::Weekly { day_of_week: 7 }).validate(),
            Err(DcaError::DayOfWeekOutOfRange(7))
        );
        assert_eq!(
            params(Frequency::Monthly { day_of_month: 0 }).validate(),
            Err(DcaError::DayOfMonthOutOfRange(0))
        );
        assert_eq!(
            params(Frequency::Monthly { day_of_month: 32 }).validate(),
            Err(DcaError::DayOfMonthOutOfRange(32))
        );
    }

    #[test]
    fn test_rejects_oversized_amount_before_walking() {
        let series = daily_series(date(2024, 1, 1), date(2024, 1, 10), dec!(40000));
        let mut oversized = params(Frequency::Daily);
        let amount = Decimal::from_i128_with_scale(10_i128.pow(28), 0);
        oversized.amount = amount;

        assert_eq!(
            simulate(&oversized, &series),
            Err(DcaError::AmountTooLarge(amount))
        );
    }

    #[test]
    fn test_overflow_is_an_error() {
        // The cap still allows amount / price to exceed Decimal's range
        let series = vec![usd(2024, 1, 1, dec!(0.00000000000000000001))];
        let mut at_cap = params(Frequency::Daily);
        at_cap.amount = MAX_AMOUNT;

        assert_eq!(simulate(&at_cap, &series), Err(DcaError::Overflow));
    }

    #[test]
    fn test_frequency_from_parts() {
        assert_eq!(
            Frequency::from_parts(FrequencyKind::Weekly, Some(3), None),
            Ok(Frequency::Weekly { day_of_week: 3 })
        );
        assert_eq!(
            Frequency::from_parts(FrequencyKind::Monthly, Some(3), None),
            Err(DcaError::MissingDay("day_of_month"))
        );
        assert_eq!(
            Frequency::from_parts(FrequencyKind::Daily, None, None),
            Ok(Frequency::Daily)
        );
    }

    #[test]
    fn test_deterministic() {
        let series = vec![
            usd(2024, 1, 1, dec!(40000)),
            usd(2024, 2, 1, dec!(45000)),
            usd(2024, 3, 1, dec!(61000)),
        ];
        let params = params(Frequency::Monthly { day_of_month: 1 });

        assert_eq!(
            simulate(&params, &series).unwrap(),
            simulate(&params, &series).unwrap()
        );
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(date(2024, 2, 10)), 29);
        assert_eq!(last_day_of_month(date(2023, 2, 10)), 28);
        assert_eq!(last_day_of_month(date(2024, 12, 1)), 31);
        assert_eq!(last_day_of_month(date(2024, 11, 30)), 30);
    }
}

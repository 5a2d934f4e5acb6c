//! Best purchase day search: runs the DCA backtest for every weekday and
//! every day of the month and ranks each group by gain/loss percent.

use rust_decimal::Decimal;

use crate::services::dca::{DcaError, DcaParameters, DcaResult, Frequency, PricePoint, simulate};
use crate::services::market_data::Currency;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRanking {
    /// Weekday (0 = Sunday) or day of month (1..=31)
    pub day: u32,
    pub result: DcaResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayOptimization {
    /// Best first; ties keep weekday order
    pub weekly: Vec<DayRanking>,
    /// Best first; ties keep day order
    pub monthly: Vec<DayRanking>,
}

impl DayOptimization {
    pub fn best_weekly(&self) -> Option<&DayRanking> {
        self.weekly.first()
    }

    pub fn best_monthly(&self) -> Option<&DayRanking> {
        self.monthly.first()
    }
}

/// 7 weekly + 31 monthly backtests over `series`. Bounded at a few hundred
/// points per series this stays in the low milliseconds.
pub fn optimize_purchase_day(
    amount: Decimal,
    currency: Currency,
    series: &[PricePoint],
) -> Result<DayOptimization, DcaError> {
    let run = |frequency: Frequency| {
        simulate(
            &DcaParameters {
                amount,
                currency,
                frequency,
            },
            series,
        )
    };

    let weekly = (0..=6)
        .map(|day| {
            run(Frequency::Weekly { day_of_week: day }).map(|result| DayRanking { day, result })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let monthly = (1..=31)
        .map(|day| {
            run(Frequency::Monthly { day_of_month: day }).map(|result| DayRanking { day, result })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DayOptimization {
        weekly: rank(weekly),
        monthly: rank(monthly),
    })
}

fn rank(mut rankings: Vec<DayRanking>) -> Vec<DayRanking> {
    // sort_by is stable
    rankings.sort_by(|a, b| b.result.gain_loss_percent.cmp(&a.result.gain_loss_percent));
    rankings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate, Weekday};
    use rust_decimal_macros::dec;

    fn series_with<F>(price_for: F) -> Vec<PricePoint>
    where
        F: Fn(NaiveDate) -> Decimal,
    {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|d| PricePoint {
                date: d,
                price_usd: Some(price_for(d)),
                price_brl: None,
            })
            .collect()
    }

    fn assert_non_increasing(rankings: &[DayRanking]) {
        for pair in rankings.windows(2) {
            assert!(pair[0].result.gain_loss_percent >= pair[1].result.gain_loss_percent);
        }
    }

    #[test]
    fn test_flat_series_ranks_every_day_equal() {
        let series = series_with(|_| dec!(100));

        let optimization = optimize_purchase_day(dec!(50), Currency::Usd, &series).unwrap();

        assert_eq!(optimization.weekly.len(), 7);
        assert_eq!(optimization.monthly.len(), 31);
        assert!(
            optimization
                .weekly
                .iter()
                .chain(&optimization.monthly)
                .all(|r| r.result.gain_loss_percent == Decimal::ZERO)
        );
        // ties keep candidate order
        let weekdays: Vec<u32> = optimization.weekly.iter().map(|r| r.day).collect();
        assert_eq!(weekdays, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_cheap_weekday_wins() {
        let series = series_with(|d| {
            if d.weekday() == Weekday::Mon {
                dec!(50)
            } else {
                dec!(100)
            }
        });

        let optimization = optimize_purchase_day(dec!(100), Currency::Usd, &series).unwrap();

        let best = optimization.best_weekly().unwrap();
        assert_eq!(best.day, 1);
        assert_eq!(best.result.gain_loss_percent, dec!(100));
        assert_non_increasing(&optimization.weekly);
    }

    #[test]
    fn test_cheap_day_of_month_wins() {
        let series = series_with(|d| if d.day() == 10 { dec!(50) } else { dec!(100) });

        let optimization = optimize_purchase_day(dec!(100), Currency::Usd, &series).unwrap();

        let best = optimization.best_monthly().unwrap();
        assert_eq!(best.day, 10);
        assert_eq!(best.result.purchase_count, 3);
        assert_non_increasing(&optimization.monthly);
    }

    #[test]
    fn test_invalid_amount_is_rejected() {
        let series = series_with(|_| dec!(100));
        assert_eq!(
            optimize_purchase_day(dec!(-1), Currency::Usd, &series),
            Err(DcaError::NonPositiveAmount(dec!(-1)))
        );
    }
}

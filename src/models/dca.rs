use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::services::dca::{DcaError, DcaParameters, DcaResult, Frequency, FrequencyKind};
use crate::services::dca_optimizer::{DayOptimization, DayRanking};
use crate::services::market_data::Currency;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcaSimulationRequest {
    pub amount: f64,
    pub currency: Currency,
    pub frequency: FrequencyKind,
    /// 0 = Sunday .. 6 = Saturday, required for weekly
    pub day_of_week: Option<u32>,
    /// 1..=31, required for monthly
    pub day_of_month: Option<u32>,
    /// Lookback in days; defaults to the configured history window
    pub days: Option<u32>,
}

impl DcaSimulationRequest {
    pub fn to_parameters(&self) -> Result<DcaParameters, DcaError> {
        let parameters = DcaParameters {
            amount: amount_to_decimal(self.amount),
            currency: self.currency,
            frequency: Frequency::from_parts(self.frequency, self.day_of_week, self.day_of_month)?,
        };
        parameters.validate()?;
        Ok(parameters)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestDayRequest {
    pub amount: f64,
    pub currency: Currency,
    pub days: Option<u32>,
}

impl BestDayRequest {
    pub fn amount(&self) -> Decimal {
        amount_to_decimal(self.amount)
    }
}

// Non-finite amounts become zero and fail validation as non-positive
fn amount_to_decimal(amount: f64) -> Decimal {
    Decimal::from_f64(amount).unwrap_or(Decimal::ZERO)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcaResultResponse {
    pub total_invested: f64,
    pub total_btc: f64,
    pub current_value: f64,
    pub gain_loss: f64,
    pub gain_loss_percent: f64,
    pub currency: Currency,
    pub purchase_count: u32,
    pub first_purchase: Option<NaiveDate>,
    pub last_purchase: Option<NaiveDate>,
    pub insufficient_data: bool,
}

impl From<&DcaResult> for DcaResultResponse {
    fn from(result: &DcaResult) -> Self {
        Self {
            total_invested: result.total_invested.to_f64().unwrap_or(0.0),
            total_btc: result.total_units.to_f64().unwrap_or(0.0),
            current_value: result.current_value.to_f64().unwrap_or(0.0),
            gain_loss: result.gain_loss.to_f64().unwrap_or(0.0),
            gain_loss_percent: result.gain_loss_percent.to_f64().unwrap_or(0.0),
            currency: result.currency,
            purchase_count: result.purchase_count,
            first_purchase: result.first_purchase,
            last_purchase: result.last_purchase,
            insufficient_data: result.insufficient_data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRankingResponse {
    pub day: u32,
    #[serde(flatten)]
    pub result: DcaResultResponse,
}

impl From<&DayRanking> for DayRankingResponse {
    fn from(ranking: &DayRanking) -> Self {
        Self {
            day: ranking.day,
            result: DcaResultResponse::from(&ranking.result),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestDayResponse {
    pub best_weekly: Option<DayRankingResponse>,
    pub best_monthly: Option<DayRankingResponse>,
    pub weekly: Vec<DayRankingResponse>,
    pub monthly: Vec<DayRankingResponse>,
}

impl From<&DayOptimization> for BestDayResponse {
    fn from(optimization: &DayOptimization) -> Self {
        Self {
            best_weekly: optimization.best_weekly().map(DayRankingResponse::from),
            best_monthly: optimization.best_monthly().map(DayRankingResponse::from),
            weekly: optimization.weekly.iter().map(DayRankingResponse::from).collect(),
            monthly: optimization.monthly.iter().map(DayRankingResponse::from).collect(),
        }
    }
}

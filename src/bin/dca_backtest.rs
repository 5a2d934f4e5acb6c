use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::Database;
use std::env;
use std::str::FromStr;

use bitpanel_backend::config::{AppConfig, DEFAULT_HISTORY_WINDOW_DAYS};
use bitpanel_backend::services::dca::{self, DcaParameters, Frequency, PricePoint};
use bitpanel_backend::services::dca_optimizer::optimize_purchase_day;
use bitpanel_backend::services::market_data::Currency;
use bitpanel_backend::services::refresh::window_start;
use bitpanel_backend::services::store::SnapshotStore;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

fn usage(program: &str) -> ! {
    eprintln!("Usage:");
    eprintln!("  {} simulate <amount> <usd|brl> <daily|weekly:DOW|monthly:DOM> [days]", program);
    eprintln!("  {} best-day <amount> <usd|brl> [days]", program);
    eprintln!("Example: {} simulate 100 usd weekly:1 365", program);
    std::process::exit(1);
}

fn parse_frequency(raw: &str) -> Result<Frequency, String> {
    let (kind, day) = match raw.split_once(':') {
        Some((kind, day)) => (
            kind,
            Some(day.parse::<u32>().map_err(|e| format!("Invalid day '{}': {}", day, e))?),
        ),
        None => (raw, None),
    };

    match kind {
        "daily" => Ok(Frequency::Daily),
        "weekly" => day
            .map(|day_of_week| Frequency::Weekly { day_of_week })
            .ok_or_else(|| "weekly needs a weekday, e.g. weekly:1".to_string()),
        "monthly" => day
            .map(|day_of_month| Frequency::Monthly { day_of_month })
            .ok_or_else(|| "monthly needs a day, e.g. monthly:15".to_string()),
        other => Err(format!("Unknown frequency: {}", other)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        usage(&args[0]);
    }

    let command = args[1].as_str();
    let amount = Decimal::from_str(&args[2])?;
    let currency: Currency = args[3].parse()?;

    let days_arg = match command {
        "simulate" => args.get(5),
        "best-day" => args.get(4),
        _ => usage(&args[0]),
    };
    let days: u32 = match days_arg {
        Some(raw) => raw.parse()?,
        None => DEFAULT_HISTORY_WINDOW_DAYS,
    };

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();
    let store = SnapshotStore::new(Database::connect(&config.database_url).await?);

    let start = window_start(Utc::now().date_naive(), days);
    let series: Vec<PricePoint> = store
        .daily_closes_since(start)
        .await?
        .into_iter()
        .map(PricePoint::from)
        .collect();

    println!("Loaded {} daily closes since {}", series.len(), start);

    match command {
        "simulate" => {
            let Some(raw_frequency) = args.get(4) else {
                usage(&args[0]);
            };
            let params = DcaParameters {
                amount,
                currency,
                frequency: parse_frequency(raw_frequency)?,
            };

            let result = dca::simulate(&params, &series)?;
            if result.insufficient_data {
                println!("Insufficient data: no {} prices stored", currency.as_str());
                return Ok(());
            }

            println!("Purchases:      {}", result.purchase_count);
            println!("Total invested: {} {}", result.total_invested.round_dp(2), currency.as_str());
            println!("BTC acquired:   {}", result.total_units.round_dp(8));
            println!("Current value:  {} {}", result.current_value.round_dp(2), currency.as_str());
            println!(
                "Gain/loss:      {} ({}%)",
                result.gain_loss.round_dp(2),
                result.gain_loss_percent.round_dp(2)
            );
        }
        _ => {
            let optimization = optimize_purchase_day(amount, currency, &series)?;

            println!("Weekly (best first):");
            for ranking in &optimization.weekly {
                println!(
                    "  {:<3} {:>8}%",
                    WEEKDAYS[ranking.day as usize % 7],
                    ranking.result.gain_loss_percent.round_dp(2)
                );
            }

            println!("Monthly, top 5:");
            for ranking in optimization.monthly.iter().take(5) {
                println!(
                    "  day {:>2} {:>8}%",
                    ranking.day,
                    ranking.result.gain_loss_percent.round_dp(2)
                );
            }
        }
    }

    Ok(())
}

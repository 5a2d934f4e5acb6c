//! `SeaORM` Entity for current_prices table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "current_prices")]
pub struct Model {
    /// Pair symbol: "BTC-USD", "BTC-BRL" or "USDT-BRL"
    #[sea_orm(primary_key, auto_increment = false)]
    pub symbol: String,
    pub price: Decimal,
    pub last_updated: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

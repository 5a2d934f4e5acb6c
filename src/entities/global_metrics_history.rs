//! `SeaORM` Entity for append-only global_metrics_history

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "global_metrics_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub observed_at: DateTimeUtc,
    pub market_cap_usd: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! SeaORM Entity for deals table
//!
//! One row per accepted FX deal. `deal_unique_id` carries a unique index.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "deals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Caller-supplied business key
    #[sea_orm(unique)]
    pub deal_unique_id: String,
    /// ISO 4217 code, e.g. "USD"
    pub from_currency: String,
    /// ISO 4217 code, e.g. "EUR"
    pub to_currency: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub deal_amount: Decimal,
    /// When the deal occurred (no timezone)
    pub deal_timestamp: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

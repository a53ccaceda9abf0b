use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::deals;

/// Request body for POST /api/deals
///
/// Every field is optional at the wire level so that missing values reach the
/// validator and come back as a specific reason instead of a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealRequest {
    pub deal_unique_id: Option<String>,
    pub from_currency: Option<String>,
    pub to_currency: Option<String>,
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    pub deal_amount: Option<Decimal>, // "1000.50" or 1000.50, both exact
    pub deal_timestamp: Option<NaiveDateTime>, // "2024-02-16T10:30:00"
}

/// Public view of a persisted deal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealResponse {
    pub deal_unique_id: String,
    pub from_currency: String,
    pub to_currency: String,
    pub deal_amount: Decimal, // serialized as a string to stay exact
    pub deal_timestamp: NaiveDateTime,
}

impl From<deals::Model> for DealResponse {
    fn from(deal: deals::Model) -> Self {
        Self {
            deal_unique_id: deal.deal_unique_id,
            from_currency: deal.from_currency,
            to_currency: deal.to_currency,
            deal_amount: deal.deal_amount,
            deal_timestamp: deal.deal_timestamp,
        }
    }
}

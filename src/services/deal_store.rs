//! Persistence for accepted deals
//!
//! [`DealStore`] is the seam between the service and storage. The SeaORM
//! backend is used in deployments; the in-memory backend backs tests and the
//! `memory://` database URL.

use async_trait::async_trait;
use parking_lot::RwLock;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use thiserror::Error;

use crate::entities::{deals, prelude::*};
use crate::services::validation::NewDeal;

/// A persisted deal
pub type Deal = deals::Model;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage layer refused a second row with the same business key
    #[error("deal {0} already exists")]
    Duplicate(String),
    #[error("database error: {0}")]
    Database(String),
}

#[async_trait]
pub trait DealStore: Send + Sync {
    async fn exists_by_unique_id(&self, deal_unique_id: &str) -> Result<bool, StoreError>;

    /// Insert a new deal and return it with its store-assigned id
    async fn save(&self, deal: NewDeal) -> Result<Deal, StoreError>;

    async fn find_by_unique_id(&self, deal_unique_id: &str) -> Result<Option<Deal>, StoreError>;

    /// All deals in insertion order
    async fn find_all(&self) -> Result<Vec<Deal>, StoreError>;
}

#[derive(Clone)]
pub struct SeaOrmDealStore {
    db: DatabaseConnection,
}

impl SeaOrmDealStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DealStore for SeaOrmDealStore {
    async fn exists_by_unique_id(&self, deal_unique_id: &str) -> Result<bool, StoreError> {
        let count = Deals::find()
            .filter(deals::Column::DealUniqueId.eq(deal_unique_id))
            .count(&self.db)
            .await
            .map_err(|e| classify_db_error(e, deal_unique_id))?;

        Ok(count > 0)
    }

    async fn save(&self, deal: NewDeal) -> Result<Deal, StoreError> {
        let deal_unique_id = deal.deal_unique_id.clone();

        let new_deal = deals::ActiveModel {
            deal_unique_id: Set(deal.deal_unique_id),
            from_currency: Set(deal.from_currency),
            to_currency: Set(deal.to_currency),
            deal_amount: Set(deal.deal_amount),
            deal_timestamp: Set(deal.deal_timestamp),
            ..Default::default()
        };

        new_deal
            .insert(&self.db)
            .await
            .map_err(|e| classify_db_error(e, &deal_unique_id))
    }

    async fn find_by_unique_id(&self, deal_unique_id: &str) -> Result<Option<Deal>, StoreError> {
        Deals::find()
            .filter(deals::Column::DealUniqueId.eq(deal_unique_id))
            .one(&self.db)
            .await
            .map_err(|e| classify_db_error(e, deal_unique_id))
    }

    async fn find_all(&self) -> Result<Vec<Deal>, StoreError> {
        Deals::find()
            .order_by_asc(deals::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

/// Map a SeaORM error onto [`StoreError`], recognizing unique-key violations.
///
/// Drivers that SeaORM cannot classify still report the violation in their
/// message, so those are matched textually as a fallback.
pub fn classify_db_error(err: DbErr, deal_unique_id: &str) -> StoreError {
    if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
        return StoreError::Duplicate(deal_unique_id.to_string());
    }

    let message = err.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("unique constraint") || lowered.contains("duplicate key") {
        return StoreError::Duplicate(deal_unique_id.to_string());
    }

    StoreError::Database(message)
}

/// Process-local store; ids are assigned sequentially from 1
#[derive(Default)]
pub struct InMemoryDealStore {
    deals: RwLock<Vec<Deal>>,
}

impl InMemoryDealStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.deals.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.deals.read().is_empty()
    }
}

#[async_trait]
impl DealStore for InMemoryDealStore {
    async fn exists_by_unique_id(&self, deal_unique_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .deals
            .read()
            .iter()
            .any(|d| d.deal_unique_id == deal_unique_id))
    }

    async fn save(&self, deal: NewDeal) -> Result<Deal, StoreError> {
        // Check and insert under one write lock, like a unique index would
        let mut deals = self.deals.write();
        if deals.iter().any(|d| d.deal_unique_id == deal.deal_unique_id) {
            return Err(StoreError::Duplicate(deal.deal_unique_id));
        }

        let id = i32::try_from(deals.len() + 1)
            .map_err(|_| StoreError::Database("deal id space exhausted".to_string()))?;

        let saved = Deal {
            id,
            deal_unique_id: deal.deal_unique_id,
            from_currency: deal.from_currency,
            to_currency: deal.to_currency,
            deal_amount: deal.deal_amount,
            deal_timestamp: deal.deal_timestamp,
        };
        deals.push(saved.clone());

        Ok(saved)
    }

    async fn find_by_unique_id(&self, deal_unique_id: &str) -> Result<Option<Deal>, StoreError> {
        Ok(self
            .deals
            .read()
            .iter()
            .find(|d| d.deal_unique_id == deal_unique_id)
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<Deal>, StoreError> {
        Ok(self.deals.read().clone())
    }
}

//! Deal creation and listing
//!
//! Validation, duplicate pre-check and persistence. The pre-check is only a
//! fast path: the store's own uniqueness guard is authoritative, and its
//! violation surfaces as the same [`DealServiceError::Duplicate`].

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::middleware::correlation::CorrelationId;
use crate::models::deal::DealRequest;
use crate::services::deal_store::{Deal, DealStore, StoreError};
use crate::services::validation::{DealValidator, ValidationError};

#[derive(Debug, Error)]
pub enum DealServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Deal already exists with ID: {0}")]
    Duplicate(String),
    #[error("store failure: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for DealServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(id) => DealServiceError::Duplicate(id),
            other => DealServiceError::Store(other),
        }
    }
}

#[derive(Clone)]
pub struct DealService {
    store: Arc<dyn DealStore>,
    validator: DealValidator,
}

impl DealService {
    pub fn new(store: Arc<dyn DealStore>, validator: DealValidator) -> Self {
        Self { store, validator }
    }

    pub async fn create_deal(
        &self,
        correlation_id: &CorrelationId,
        request: DealRequest,
    ) -> Result<Deal, DealServiceError> {
        let start = Instant::now();
        tracing::info!(
            correlation_id = %correlation_id,
            deal_unique_id = ?request.deal_unique_id,
            "create_deal called"
        );

        let result = self.try_create(&request).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(deal) => tracing::info!(
                correlation_id = %correlation_id,
                deal_unique_id = %deal.deal_unique_id,
                id = deal.id,
                elapsed_ms,
                "create_deal completed"
            ),
            Err(DealServiceError::Store(e)) => tracing::error!(
                correlation_id = %correlation_id,
                elapsed_ms,
                "create_deal failed: {}",
                e
            ),
            Err(e) => tracing::warn!(
                correlation_id = %correlation_id,
                elapsed_ms,
                "create_deal rejected: {}",
                e
            ),
        }

        result
    }

    async fn try_create(&self, request: &DealRequest) -> Result<Deal, DealServiceError> {
        let new_deal = self.validator.validate(request)?;

        if self
            .store
            .exists_by_unique_id(&new_deal.deal_unique_id)
            .await?
        {
            return Err(DealServiceError::Duplicate(new_deal.deal_unique_id));
        }

        Ok(self.store.save(new_deal).await?)
    }

    pub async fn list_deals(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Vec<Deal>, DealServiceError> {
        let start = Instant::now();
        let deals = self
            .store
            .find_all()
            .await
            .map_err(|e| log_store_failure(correlation_id, "list_deals", start, e))?;

        tracing::debug!(
            correlation_id = %correlation_id,
            count = deals.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "list_deals completed"
        );

        Ok(deals)
    }

    pub async fn find_deal(
        &self,
        correlation_id: &CorrelationId,
        deal_unique_id: &str,
    ) -> Result<Option<Deal>, DealServiceError> {
        let start = Instant::now();
        let deal = self
            .store
            .find_by_unique_id(deal_unique_id)
            .await
            .map_err(|e| log_store_failure(correlation_id, "find_deal", start, e))?;

        tracing::debug!(
            correlation_id = %correlation_id,
            deal_unique_id,
            found = deal.is_some(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "find_deal completed"
        );

        Ok(deal)
    }
}

/// Log a store error with its cause before it is reduced to a generic 500
fn log_store_failure(
    correlation_id: &CorrelationId,
    operation: &'static str,
    start: Instant,
    err: StoreError,
) -> DealServiceError {
    tracing::error!(
        correlation_id = %correlation_id,
        operation,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "{} failed: {}",
        operation,
        err
    );
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::deal_store::InMemoryDealStore;
    use crate::services::validation::NewDeal;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Collects the fields of every ERROR event
    #[derive(Clone, Default)]
    struct CapturedErrors(Arc<Mutex<Vec<String>>>);

    struct FieldsVisitor(String);

    impl Visit for FieldsVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            self.0.push_str(&format!("{}={:?} ", field.name(), value));
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for CapturedErrors {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::ERROR {
                let mut visitor = FieldsVisitor(String::new());
                event.record(&mut visitor);
                self.0.lock().push(visitor.0);
            }
        }
    }

    /// Wraps the in-memory store and counts calls to `save`
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryDealStore,
        saves: AtomicUsize,
    }

    #[async_trait]
    impl DealStore for CountingStore {
        async fn exists_by_unique_id(&self, id: &str) -> Result<bool, StoreError> {
            self.inner.exists_by_unique_id(id).await
        }
        async fn save(&self, deal: NewDeal) -> Result<Deal, StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.inner.save(deal).await
        }
        async fn find_by_unique_id(&self, id: &str) -> Result<Option<Deal>, StoreError> {
            self.inner.find_by_unique_id(id).await
        }
        async fn find_all(&self) -> Result<Vec<Deal>, StoreError> {
            self.inner.find_all().await
        }
    }

    /// Pre-check always misses, so only the store's guard can catch duplicates
    struct RacingStore;

    #[async_trait]
    impl DealStore for RacingStore {
        async fn exists_by_unique_id(&self, _id: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn save(&self, deal: NewDeal) -> Result<Deal, StoreError> {
            Err(StoreError::Duplicate(deal.deal_unique_id))
        }
        async fn find_by_unique_id(&self, _id: &str) -> Result<Option<Deal>, StoreError> {
            Ok(None)
        }
        async fn find_all(&self) -> Result<Vec<Deal>, StoreError> {
            Ok(vec![])
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl DealStore for BrokenStore {
        async fn exists_by_unique_id(&self, _id: &str) -> Result<bool, StoreError> {
            Err(StoreError::Database("connection reset".to_string()))
        }
        async fn save(&self, _deal: NewDeal) -> Result<Deal, StoreError> {
            Err(StoreError::Database("connection reset".to_string()))
        }
        async fn find_by_unique_id(&self, _id: &str) -> Result<Option<Deal>, StoreError> {
            Err(StoreError::Database("connection reset".to_string()))
        }
        async fn find_all(&self) -> Result<Vec<Deal>, StoreError> {
            Err(StoreError::Database("connection reset".to_string()))
        }
    }

    fn request(id: &str) -> DealRequest {
        DealRequest {
            deal_unique_id: Some(id.to_string()),
            from_currency: Some("USD".to_string()),
            to_currency: Some("EUR".to_string()),
            deal_amount: Some(dec!(100.00)),
            deal_timestamp: Some(Utc::now().naive_utc()),
        }
    }

    fn service_with(store: Arc<dyn DealStore>) -> DealService {
        DealService::new(store, DealValidator::default())
    }

    #[tokio::test]
    async fn test_create_deal_persists_all_fields() {
        let store = Arc::new(InMemoryDealStore::new());
        let service = service_with(store.clone());
        let cid = CorrelationId::new();

        let req = request("T1");
        let deal = service.create_deal(&cid, req.clone()).await.unwrap();

        assert_eq!(deal.deal_unique_id, "T1");
        let stored = store.find_by_unique_id("T1").await.unwrap().unwrap();
        assert_eq!(stored, deal);
        assert_eq!(Some(stored.from_currency), req.from_currency);
        assert_eq!(Some(stored.to_currency), req.to_currency);
        assert_eq!(Some(stored.deal_amount), req.deal_amount);
        assert_eq!(Some(stored.deal_timestamp), req.deal_timestamp);
    }

    #[tokio::test]
    async fn test_invalid_request_never_saves() {
        let store = Arc::new(CountingStore::default());
        let service = service_with(store.clone());
        let cid = CorrelationId::new();

        let mut missing_id = request("T1");
        missing_id.deal_unique_id = None;
        let mut bad_amount = request("T2");
        bad_amount.deal_amount = Some(dec!(-100));
        let mut bad_currency = request("T3");
        bad_currency.from_currency = Some("USDOLLAR".to_string());

        for req in [missing_id, bad_amount, bad_currency] {
            let err = service.create_deal(&cid, req).await.unwrap_err();
            assert!(matches!(err, DealServiceError::Validation(_)));
        }

        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_duplicate_rejected_even_when_fields_differ() {
        let store = Arc::new(InMemoryDealStore::new());
        let service = service_with(store.clone());
        let cid = CorrelationId::new();

        service.create_deal(&cid, request("T4")).await.unwrap();

        let mut second = request("T4");
        second.to_currency = Some("GBP".to_string());
        second.deal_amount = Some(dec!(5));
        let err = service.create_deal(&cid, second).await.unwrap_err();

        assert!(matches!(err, DealServiceError::Duplicate(ref id) if id == "T4"));
        assert!(err.to_string().contains("already exists"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_store_constraint_violation_maps_to_duplicate() {
        let service = service_with(Arc::new(RacingStore));
        let err = service
            .create_deal(&CorrelationId::new(), request("T5"))
            .await
            .unwrap_err();

        assert!(matches!(err, DealServiceError::Duplicate(ref id) if id == "T5"));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_a_duplicate() {
        let service = service_with(Arc::new(BrokenStore));
        let cid = CorrelationId::new();

        let err = service.create_deal(&cid, request("T6")).await.unwrap_err();
        assert!(matches!(err, DealServiceError::Store(_)));

        let err = service.list_deals(&cid).await.unwrap_err();
        assert!(matches!(err, DealServiceError::Store(_)));
    }

    #[tokio::test]
    async fn test_read_failures_are_logged_with_cause() {
        let captured = CapturedErrors::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(captured.clone()));

        let service = service_with(Arc::new(BrokenStore));
        let cid = CorrelationId::new();

        service.list_deals(&cid).await.unwrap_err();
        service.find_deal(&cid, "T1").await.unwrap_err();

        let logs = captured.0.lock();
        assert_eq!(logs.len(), 2, "{:?}", *logs);
        assert!(logs[0].contains("list_deals"));
        assert!(logs[1].contains("find_deal"));
        for line in logs.iter() {
            assert!(line.contains("connection reset"), "{}", line);
            assert!(line.contains(cid.as_str()), "{}", line);
        }
    }

    #[tokio::test]
    async fn test_list_deals_in_creation_order() {
        let service = service_with(Arc::new(InMemoryDealStore::new()));
        let cid = CorrelationId::new();

        assert!(service.list_deals(&cid).await.unwrap().is_empty());

        for id in ["A", "C", "B"] {
            service.create_deal(&cid, request(id)).await.unwrap();
        }
        // A failed create leaves the list untouched
        let _ = service.create_deal(&cid, request("A")).await;

        let ids: Vec<String> = service
            .list_deals(&cid)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.deal_unique_id)
            .collect();
        assert_eq!(ids, vec!["A", "C", "B"]);
    }

    #[tokio::test]
    async fn test_find_deal() {
        let service = service_with(Arc::new(InMemoryDealStore::new()));
        let cid = CorrelationId::new();

        service.create_deal(&cid, request("T7")).await.unwrap();

        assert!(service.find_deal(&cid, "T7").await.unwrap().is_some());
        assert!(service.find_deal(&cid, "T8").await.unwrap().is_none());
    }
}

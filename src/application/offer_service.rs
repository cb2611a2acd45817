use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::catalog::{CatalogSnapshot, Gig};
use crate::domain::errors::DomainError;
use crate::domain::offer::{CouponOutcome, OfferBuilder};
use crate::domain::order::{Order, OrderDraft};
use crate::domain::ports::{CatalogRepository, Clock, OrderRepository};

/// What the client picked on the checkout screen.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub quantities: HashMap<String, i32>,
    pub coupon: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub gig_id: Uuid,
    pub selection: Selection,
    pub message: Option<String>,
    /// Id of a draft returned by an earlier failed attempt. Reusing it makes
    /// the retry address the same order instead of creating a second one.
    pub draft_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub subtotal: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
    pub coupon: Option<CouponOutcome>,
}

/// Failure to place an order. When pricing succeeded but the store did not,
/// `draft` holds the computed payload so it can be resubmitted unchanged.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct PlaceOrderError {
    pub source: DomainError,
    pub draft: Option<OrderDraft>,
}

impl From<DomainError> for PlaceOrderError {
    fn from(source: DomainError) -> Self {
        Self {
            source,
            draft: None,
        }
    }
}

pub struct OfferService {
    catalog: Arc<dyn CatalogRepository>,
    orders: Arc<dyn OrderRepository>,
    clock: Arc<dyn Clock>,
}

impl OfferService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        orders: Arc<dyn OrderRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            orders,
            clock,
        }
    }

    pub fn catalog(&self) -> Result<CatalogSnapshot, DomainError> {
        self.catalog.fetch_catalog()
    }

    pub fn find_gig(&self, gig_id: Uuid) -> Result<Option<Gig>, DomainError> {
        self.catalog.fetch_gig(gig_id)
    }

    /// Loads the gig and replays `selection` into a fresh builder.
    pub fn prepare(
        &self,
        gig_id: Uuid,
        selection: &Selection,
    ) -> Result<OfferBuilder, DomainError> {
        let gig = self
            .find_gig(gig_id)?
            .ok_or_else(|| DomainError::validation(format!("gig {gig_id} does not exist")))?;
        let mut builder = OfferBuilder::new(gig);
        for (item_id, quantity) in &selection.quantities {
            builder.set_quantity(item_id, *quantity)?;
        }
        if let Some(code) = &selection.coupon {
            let outcome = builder.apply_coupon(code)?;
            if !outcome.applied {
                return Err(DomainError::validation(format!(
                    "coupon {} is not valid",
                    outcome.code
                )));
            }
        }
        Ok(builder)
    }

    pub fn quote(&self, gig_id: Uuid, selection: &Selection) -> Result<Quote, DomainError> {
        let builder = self.prepare(gig_id, selection)?;
        Ok(Quote {
            subtotal: builder.subtotal(),
            discount: builder.discount(),
            total: builder.total(),
            coupon: builder.applied_coupon().cloned(),
        })
    }

    pub fn place_order(
        &self,
        client_id: &str,
        request: CheckoutRequest,
    ) -> Result<Order, PlaceOrderError> {
        let builder = self.prepare(request.gig_id, &request.selection)?;
        let id = request.draft_id.unwrap_or_else(Uuid::new_v4);
        let draft =
            builder.build_with_id(id, client_id, request.message.as_deref(), self.clock.now())?;
        self.submit(&draft).map_err(|source| PlaceOrderError {
            source,
            draft: Some(draft),
        })
    }

    /// Persists an already priced draft and returns the order as stored.
    /// The draft is only borrowed, so the caller still holds it if the store
    /// fails. Submitting a draft whose order already exists returns that
    /// order with its current status.
    pub fn submit(&self, draft: &OrderDraft) -> Result<Order, DomainError> {
        let stored = self
            .orders
            .create(draft)
            .and_then(|id| self.orders.find_by_id(id))
            .inspect_err(|e| log::error!("failed to persist order {}: {}", draft.id, e))?
            .ok_or(DomainError::NotFound)?;

        if stored.client_id != draft.client_id {
            log::warn!(
                "{} tried to reuse order id {} of another client",
                draft.client_id,
                draft.id
            );
            return Err(DomainError::validation(format!(
                "order id {} is already in use",
                draft.id
            )));
        }

        log::info!(
            "order {} {} for {} on gig {} (total {})",
            stored.id,
            stored.status,
            stored.client_id,
            stored.gig_id,
            stored.total_price
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use bigdecimal::Zero;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::domain::catalog::tests::{gig, item};
    use crate::domain::order::OrderStatus;
    use crate::domain::ports::SystemClock;
    use crate::infrastructure::memory::InMemoryStore;

    /// Delegates to an in-memory store but can be switched off.
    struct FlakyOrders {
        inner: InMemoryStore,
        down: AtomicBool,
    }

    impl OrderRepository for FlakyOrders {
        fn create(&self, draft: &OrderDraft) -> Result<Uuid, DomainError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(DomainError::StoreUnavailable("connection refused".to_string()));
            }
            self.inner.create(draft)
        }

        fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
            self.inner.find_by_id(id)
        }

        fn list_for_artist(&self, artist_id: &str) -> Result<Vec<Order>, DomainError> {
            self.inner.list_for_artist(artist_id)
        }

        fn list_for_client(&self, client_id: &str) -> Result<Vec<Order>, DomainError> {
            self.inner.list_for_client(client_id)
        }

        fn resolve_if_pending(
            &self,
            id: Uuid,
            artist_id: &str,
            status: OrderStatus,
            at: DateTime<Utc>,
        ) -> Result<bool, DomainError> {
            self.inner.resolve_if_pending(id, artist_id, status, at)
        }
    }

    fn setup() -> (OfferService, Arc<FlakyOrders>, Uuid) {
        let (service, orders, _, gig_id) = setup_with_store();
        (service, orders, gig_id)
    }

    fn setup_with_store() -> (OfferService, Arc<FlakyOrders>, InMemoryStore, Uuid) {
        let store = InMemoryStore::new();
        let g = gig("artist-1", "DJ", "music", vec![item("a", 100), item("b", 50)]);
        let gig_id = g.id;
        store.insert_gig(g).unwrap();
        let catalog: Arc<InMemoryStore> = Arc::new(store.clone());
        let orders = Arc::new(FlakyOrders {
            inner: store.clone(),
            down: AtomicBool::new(false),
        });
        let service = OfferService::new(catalog, orders.clone(), Arc::new(SystemClock));
        (service, orders, store, gig_id)
    }

    fn selection(a: i32, b: i32, coupon: Option<&str>) -> Selection {
        Selection {
            quantities: HashMap::from([("a".to_string(), a), ("b".to_string(), b)]),
            coupon: coupon.map(str::to_string),
        }
    }

    #[test]
    fn quote_applies_coupon_and_clamps() {
        let (service, _, gig_id) = setup();
        let quote = service.quote(gig_id, &selection(2, 1, Some("welcome20"))).unwrap();
        assert_eq!(quote.subtotal, BigDecimal::from(250));
        assert_eq!(quote.discount, BigDecimal::from(200));
        assert_eq!(quote.total, BigDecimal::from(50));

        let quote = service.quote(gig_id, &selection(0, 1, Some("WELCOME20"))).unwrap();
        assert_eq!(quote.total, BigDecimal::zero());
    }

    #[test]
    fn quote_rejects_unknown_coupon() {
        let (service, _, gig_id) = setup();
        let err = service.quote(gig_id, &selection(1, 0, Some("bogus"))).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn unknown_gig_is_a_validation_error() {
        let (service, _, _) = setup();
        let err = service.quote(Uuid::new_v4(), &Selection::default()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn placed_order_is_pending_and_persisted() {
        let (service, orders, gig_id) = setup();
        let order = service
            .place_order(
                "client-1",
                CheckoutRequest {
                    gig_id,
                    selection: selection(2, 1, Some("WELCOME20")),
                    message: Some("Saturday evening".to_string()),
                    draft_id: None,
                },
            )
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_price, BigDecimal::from(50));
        assert_eq!(order.artist_id, "artist-1");
        assert_eq!(order.created_at, order.updated_at);
        let stored = orders.find_by_id(order.id).unwrap().unwrap();
        assert_eq!(stored, order);
    }

    #[test]
    fn store_failure_keeps_the_draft_for_retry() {
        let (service, orders, gig_id) = setup();
        orders.down.store(true, Ordering::SeqCst);

        let err = service
            .place_order(
                "client-1",
                CheckoutRequest {
                    gig_id,
                    selection: selection(1, 2, None),
                    message: None,
                    draft_id: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err.source, DomainError::StoreUnavailable(_)));
        let draft = err.draft.expect("draft survives a store failure");
        assert_eq!(draft.total_price, BigDecimal::from(200));

        assert!(service.submit(&draft).is_err());
        orders.down.store(false, Ordering::SeqCst);
        let order = service.submit(&draft).unwrap();
        assert_eq!(order.id, draft.id);
        assert_eq!(order.total_price, draft.total_price);
    }

    #[test]
    fn resubmitting_a_draft_does_not_duplicate_it() {
        let (service, orders, gig_id) = setup();
        let draft = service
            .prepare(gig_id, &selection(1, 0, None))
            .unwrap()
            .build("client-1", None, Utc::now())
            .unwrap();
        service.submit(&draft).unwrap();
        service.submit(&draft).unwrap();
        assert_eq!(orders.list_for_client("client-1").unwrap().len(), 1);
    }

    #[test]
    fn validation_failures_carry_no_draft() {
        let (service, _, gig_id) = setup();
        let err = service
            .place_order(
                "client-1",
                CheckoutRequest {
                    gig_id,
                    selection: selection(-1, 0, None),
                    message: None,
                    draft_id: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err.source, DomainError::Validation(_)));
        assert!(err.draft.is_none());
    }

    #[test]
    fn resubmitting_after_resolution_reports_the_stored_status() {
        let (service, orders, gig_id) = setup();
        let draft = service
            .prepare(gig_id, &selection(1, 1, None))
            .unwrap()
            .build("client-1", None, Utc::now())
            .unwrap();
        service.submit(&draft).unwrap();
        assert!(orders
            .resolve_if_pending(draft.id, "artist-1", OrderStatus::Accepted, Utc::now())
            .unwrap());

        let again = service.submit(&draft).unwrap();
        assert_eq!(again.status, OrderStatus::Accepted);
        assert_eq!(again, orders.find_by_id(draft.id).unwrap().unwrap());
    }

    #[test]
    fn retry_with_draft_id_lands_on_the_same_order() {
        let (service, orders, gig_id) = setup();
        orders.down.store(true, Ordering::SeqCst);
        let request = |draft_id: Option<Uuid>| CheckoutRequest {
            gig_id,
            selection: selection(1, 0, Some("save10")),
            message: None,
            draft_id,
        };

        let draft = service
            .place_order("client-1", request(None))
            .unwrap_err()
            .draft
            .expect("draft survives a store failure");

        orders.down.store(false, Ordering::SeqCst);
        let first = service.place_order("client-1", request(Some(draft.id))).unwrap();
        let second = service.place_order("client-1", request(Some(draft.id))).unwrap();
        assert_eq!(first.id, draft.id);
        assert_eq!(second.id, draft.id);
        assert_eq!(first.total_price, draft.total_price);
        assert_eq!(orders.list_for_client("client-1").unwrap().len(), 1);
    }

    #[test]
    fn draft_id_of_another_client_is_rejected() {
        let (service, _, gig_id) = setup();
        let placed = service
            .place_order(
                "client-1",
                CheckoutRequest {
                    gig_id,
                    selection: selection(1, 0, None),
                    message: None,
                    draft_id: None,
                },
            )
            .unwrap();

        let err = service
            .place_order(
                "client-2",
                CheckoutRequest {
                    gig_id,
                    selection: selection(1, 0, None),
                    message: None,
                    draft_id: Some(placed.id),
                },
            )
            .unwrap_err();
        assert!(matches!(err.source, DomainError::Validation(_)));
    }

    #[test]
    fn stored_items_survive_later_catalog_edits() {
        let (service, orders, store, gig_id) = setup_with_store();
        let order = service
            .place_order(
                "client-1",
                CheckoutRequest {
                    gig_id,
                    selection: selection(1, 0, None),
                    message: None,
                    draft_id: None,
                },
            )
            .unwrap();

        let mut edited = service.find_gig(gig_id).unwrap().unwrap();
        edited.items[0].price = BigDecimal::from(999);
        edited.items[0].title = "Renamed".to_string();
        store.insert_gig(edited).unwrap();

        let stored = orders.find_by_id(order.id).unwrap().unwrap();
        assert_eq!(stored.items[0].price, BigDecimal::from(100));
        assert_eq!(stored.items[0].title, "Item a");
        assert_eq!(stored.total_price, BigDecimal::from(100));
    }

    #[test]
    fn oversized_quantity_is_a_validation_error() {
        let (service, _, gig_id) = setup();
        let err = service.quote(gig_id, &selection(10_000_000, 0, None)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}

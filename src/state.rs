use std::sync::Arc;

use crate::application::offer_service::OfferService;
use crate::application::order_service::OrderService;
use crate::db::DbPool;
use crate::domain::ports::{CatalogRepository, ChannelOpener, Clock, OrderRepository, SystemClock};
use crate::infrastructure::catalog_repo::DieselCatalogRepository;
use crate::infrastructure::channel_repo::DieselChannelOpener;
use crate::infrastructure::memory::InMemoryStore;
use crate::infrastructure::order_repo::DieselOrderRepository;

/// Services shared by every worker of the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub offers: Arc<OfferService>,
    pub orders: Arc<OrderService>,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        orders: Arc<dyn OrderRepository>,
        channels: Arc<dyn ChannelOpener>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            offers: Arc::new(OfferService::new(catalog, orders.clone(), clock.clone())),
            orders: Arc::new(OrderService::new(orders, channels, clock)),
        }
    }

    pub fn postgres(pool: DbPool) -> Self {
        Self::new(
            Arc::new(DieselCatalogRepository::new(pool.clone())),
            Arc::new(DieselOrderRepository::new(pool.clone())),
            Arc::new(DieselChannelOpener::new(pool)),
            Arc::new(SystemClock),
        )
    }

    pub fn in_memory(store: InMemoryStore) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store.clone(), store, Arc::new(SystemClock))
    }
}

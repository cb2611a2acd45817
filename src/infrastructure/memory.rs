use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::catalog::{CatalogSnapshot, Gig};
use crate::domain::channel::ChannelHandle;
use crate::domain::errors::DomainError;
use crate::domain::order::{sort_newest_first, Order, OrderDraft, OrderStatus};
use crate::domain::ports::{CatalogRepository, ChannelOpener, OrderRepository};

fn poisoned(operation: &str) -> DomainError {
    DomainError::StoreUnavailable(format!("in-memory store lock poisoned during {operation}"))
}

/// Process-local store backing every port. Clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    orders: Arc<RwLock<HashMap<Uuid, Order>>>,
    gigs: Arc<RwLock<Vec<Gig>>>,
    channels: Arc<RwLock<HashMap<(String, String), ChannelHandle>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_gig(&self, gig: Gig) -> Result<(), DomainError> {
        let mut gigs = self.gigs.write().map_err(|_| poisoned("gig write"))?;
        gigs.retain(|g| g.id != gig.id);
        gigs.push(gig);
        Ok(())
    }

    fn orders_where(&self, keep: impl Fn(&Order) -> bool) -> Result<Vec<Order>, DomainError> {
        let orders = self.orders.read().map_err(|_| poisoned("order read"))?;
        let mut found: Vec<Order> = orders.values().filter(|o| keep(*o)).cloned().collect();
        sort_newest_first(&mut found);
        Ok(found)
    }
}

impl OrderRepository for InMemoryStore {
    fn create(&self, draft: &OrderDraft) -> Result<Uuid, DomainError> {
        let mut orders = self.orders.write().map_err(|_| poisoned("order write"))?;
        orders
            .entry(draft.id)
            .or_insert_with(|| Order::from(draft.clone()));
        Ok(draft.id)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let orders = self.orders.read().map_err(|_| poisoned("order read"))?;
        Ok(orders.get(&id).cloned())
    }

    fn list_for_artist(&self, artist_id: &str) -> Result<Vec<Order>, DomainError> {
        self.orders_where(|o| o.artist_id == artist_id)
    }

    fn list_for_client(&self, client_id: &str) -> Result<Vec<Order>, DomainError> {
        self.orders_where(|o| o.client_id == client_id)
    }

    fn resolve_if_pending(
        &self,
        id: Uuid,
        artist_id: &str,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut orders = self.orders.write().map_err(|_| poisoned("order write"))?;
        match orders.get_mut(&id) {
            Some(o) if o.artist_id == artist_id && o.status == OrderStatus::Pending => {
                o.status = status;
                o.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl CatalogRepository for InMemoryStore {
    fn fetch_catalog(&self) -> Result<CatalogSnapshot, DomainError> {
        let gigs = self.gigs.read().map_err(|_| poisoned("gig read"))?;
        Ok(CatalogSnapshot::new(gigs.clone(), Utc::now()))
    }

    fn fetch_gig(&self, id: Uuid) -> Result<Option<Gig>, DomainError> {
        let gigs = self.gigs.read().map_err(|_| poisoned("gig read"))?;
        Ok(gigs.iter().find(|g| g.id == id).cloned())
    }
}

impl ChannelOpener for InMemoryStore {
    fn open_or_resume(
        &self,
        client_id: &str,
        artist_id: &str,
    ) -> Result<ChannelHandle, DomainError> {
        let mut channels = self.channels.write().map_err(|_| poisoned("channel write"))?;
        let key = (client_id.to_string(), artist_id.to_string());
        if let Some(existing) = channels.get(&key) {
            return Ok(ChannelHandle {
                resumed: true,
                ..existing.clone()
            });
        }
        let handle = ChannelHandle {
            id: Uuid::new_v4(),
            client_id: client_id.to_string(),
            artist_id: artist_id.to_string(),
            created_at: Utc::now(),
            resumed: false,
        };
        channels.insert(key, handle.clone());
        Ok(handle)
    }
}

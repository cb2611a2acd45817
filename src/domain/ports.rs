use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use super::catalog::{CatalogSnapshot, Gig};
use super::channel::ChannelHandle;
use super::errors::DomainError;
use super::order::{Order, OrderDraft, OrderStatus};

pub trait OrderRepository: Send + Sync + 'static {
    /// Persists a draft as a pending order. Creating a draft whose id already
    /// exists is a no-op that returns the same id.
    fn create(&self, draft: &OrderDraft) -> Result<Uuid, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    /// Newest first.
    fn list_for_artist(&self, artist_id: &str) -> Result<Vec<Order>, DomainError>;
    /// Newest first.
    fn list_for_client(&self, client_id: &str) -> Result<Vec<Order>, DomainError>;
    /// Moves the order to `status` only if it is still pending and owned by
    /// `artist_id`, as one atomic step. Returns whether a row changed.
    fn resolve_if_pending(
        &self,
        id: Uuid,
        artist_id: &str,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;
}

pub trait CatalogRepository: Send + Sync + 'static {
    fn fetch_catalog(&self) -> Result<CatalogSnapshot, DomainError>;
    fn fetch_gig(&self, id: Uuid) -> Result<Option<Gig>, DomainError>;
}

pub trait ChannelOpener: Send + Sync + 'static {
    fn open_or_resume(
        &self,
        client_id: &str,
        artist_id: &str,
    ) -> Result<ChannelHandle, DomainError>;
}

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    // Microseconds, the precision Postgres keeps.
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::channel::ChannelHandle;
use crate::domain::errors::DomainError;
use crate::domain::order::{Confirmation, Order, OrderStatus, StatusFilter};
use crate::domain::ports::{ChannelOpener, Clock, OrderRepository};

/// Result of a successful accept. `channel` is `None` when opening the chat
/// failed; the acceptance itself stands.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub order: Order,
    pub channel: Option<ChannelHandle>,
}

pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    channels: Arc<dyn ChannelOpener>,
    clock: Arc<dyn Clock>,
}

impl OrderService {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        channels: Arc<dyn ChannelOpener>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            channels,
            clock,
        }
    }

    /// Returns the order if `viewer` is its client or its provider.
    pub fn get_order(&self, id: Uuid, viewer: &str) -> Result<Order, DomainError> {
        let order = self.repo.find_by_id(id)?.ok_or(DomainError::NotFound)?;
        if !order.is_visible_to(viewer) {
            return Err(DomainError::PermissionDenied);
        }
        Ok(order)
    }

    pub fn list_for_provider(
        &self,
        provider: &str,
        filter: StatusFilter,
    ) -> Result<Vec<Order>, DomainError> {
        let orders = self.repo.list_for_artist(provider)?;
        Ok(filter.apply(&orders).into_iter().cloned().collect())
    }

    pub fn list_for_client(&self, client: &str) -> Result<Vec<Order>, DomainError> {
        self.repo.list_for_client(client)
    }

    pub fn accept(&self, id: Uuid, provider: &str) -> Result<Accepted, DomainError> {
        let order = self.transition(id, provider, OrderStatus::Accepted)?;
        let channel = match self.channels.open_or_resume(&order.client_id, &order.artist_id) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!(
                    "order {} accepted but chat channel could not be opened: {}",
                    order.id,
                    e
                );
                None
            }
        };
        Ok(Accepted { order, channel })
    }

    /// Declines only once the provider has confirmed. A cancelled prompt is
    /// still checked against the order and then returns `Ok(None)` without
    /// writing anything.
    pub fn decline(
        &self,
        id: Uuid,
        provider: &str,
        confirmation: Confirmation,
    ) -> Result<Option<Order>, DomainError> {
        if confirmation == Confirmation::Cancelled {
            self.load_for(id, provider, OrderStatus::Declined)?;
            log::debug!("decline of order {} cancelled by {}", id, provider);
            return Ok(None);
        }
        self.transition(id, provider, OrderStatus::Declined)
            .map(Some)
    }

    fn load_for(
        &self,
        id: Uuid,
        provider: &str,
        target: OrderStatus,
    ) -> Result<Order, DomainError> {
        let order = self.repo.find_by_id(id)?.ok_or(DomainError::NotFound)?;
        if let Err(e) = order.ensure_transition(provider, target) {
            log::warn!("{} on order {} refused: {}", provider, id, e);
            return Err(e);
        }
        Ok(order)
    }

    fn transition(
        &self,
        id: Uuid,
        provider: &str,
        target: OrderStatus,
    ) -> Result<Order, DomainError> {
        let order = self.load_for(id, provider, target)?;
        let at = self.clock.now().max(order.updated_at);
        if self.repo.resolve_if_pending(id, provider, target, at)? {
            log::info!("order {} {} by {}", id, target, provider);
            return Ok(order.resolved(target, at));
        }

        // Someone else resolved it between the read and the update.
        let current = self.repo.find_by_id(id)?.ok_or(DomainError::NotFound)?;
        current.ensure_transition(provider, target)?;
        Err(DomainError::Internal(format!(
            "conditional update of order {id} did not apply"
        )))
    }
}

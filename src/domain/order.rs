use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Lifecycle state of an order. `Accepted` and `Declined` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Declined,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Declined => "declined",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "accepted" => Ok(OrderStatus::Accepted),
            "declined" => Ok(OrderStatus::Declined),
            other => Err(DomainError::Internal(format!("unknown order status '{other}'"))),
        }
    }
}

/// Point-in-time copy of a catalog item as it was when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_id: String,
    pub title: String,
    pub quantity: i32,
    pub price: BigDecimal,
}

/// A fully priced order that has not been persisted yet.
///
/// The id is fixed when the draft is built, so submitting the same draft
/// twice never creates two orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub id: Uuid,
    pub client_id: String,
    pub artist_id: String,
    pub gig_id: Uuid,
    pub gig_title: String,
    pub message: Option<String>,
    pub items: Vec<OrderItem>,
    pub coupon_code: Option<String>,
    pub subtotal: BigDecimal,
    pub discount: BigDecimal,
    pub total_price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub client_id: String,
    pub artist_id: String,
    pub gig_id: Uuid,
    pub gig_title: String,
    pub message: Option<String>,
    pub items: Vec<OrderItem>,
    pub coupon_code: Option<String>,
    pub subtotal: BigDecimal,
    pub discount: BigDecimal,
    pub total_price: BigDecimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderDraft> for Order {
    fn from(draft: OrderDraft) -> Self {
        Order {
            id: draft.id,
            client_id: draft.client_id,
            artist_id: draft.artist_id,
            gig_id: draft.gig_id,
            gig_title: draft.gig_title,
            message: draft.message,
            items: draft.items,
            coupon_code: draft.coupon_code,
            subtotal: draft.subtotal,
            discount: draft.discount,
            total_price: draft.total_price,
            status: OrderStatus::Pending,
            created_at: draft.created_at,
            updated_at: draft.created_at,
        }
    }
}

impl Order {
    /// Checks whether `provider` may move this order to `target`.
    ///
    /// Ownership is checked before state so a stranger never learns whether
    /// an order has been resolved.
    pub fn ensure_transition(
        &self,
        provider: &str,
        target: OrderStatus,
    ) -> Result<(), DomainError> {
        if self.artist_id != provider {
            return Err(DomainError::PermissionDenied);
        }
        if self.status.is_terminal() {
            return Err(DomainError::AlreadyResolved {
                status: self.status,
            });
        }
        if !target.is_terminal() {
            return Err(DomainError::validation("an order can only be accepted or declined"));
        }
        Ok(())
    }

    pub fn resolved(mut self, status: OrderStatus, at: DateTime<Utc>) -> Self {
        self.status = status;
        self.updated_at = at;
        self
    }

    pub fn is_visible_to(&self, user_id: &str) -> bool {
        self.client_id == user_id || self.artist_id == user_id
    }
}

/// Status tab on the provider's order list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Accepted,
    Declined,
}

impl StatusFilter {
    pub fn matches(&self, status: OrderStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => status == OrderStatus::Pending,
            StatusFilter::Accepted => status == OrderStatus::Accepted,
            StatusFilter::Declined => status == OrderStatus::Declined,
        }
    }

    /// Derived view over an already fetched list; order is preserved.
    pub fn apply<'a>(&self, orders: &'a [Order]) -> Vec<&'a Order> {
        orders.iter().filter(|o| self.matches(o.status)).collect()
    }
}

impl FromStr for StatusFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::All),
            "pending" => Ok(StatusFilter::Pending),
            "accepted" => Ok(StatusFilter::Accepted),
            "declined" => Ok(StatusFilter::Declined),
            other => Err(DomainError::validation(format!("unknown status filter '{other}'"))),
        }
    }
}

/// Answer to the "decline this order?" prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Cancelled,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Cancelled
        }
    }
}

/// Newest first; ties broken by id so the listing is stable.
pub fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

//! Checkout pricing: per-item quantities, coupon discounts and the order
//! payload handed to the store.

use std::collections::HashMap;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::{Gig, ServiceItem};
use super::errors::DomainError;
use super::order::{OrderDraft, OrderItem};

pub const MAX_COUPON_LEN: usize = 32;
pub const MAX_MESSAGE_LEN: usize = 2000;
pub const MAX_QUANTITY: i32 = 1000;

/// Exclusive upper bound on subtotals; amounts are stored as NUMERIC(12, 2).
pub fn max_order_amount() -> BigDecimal {
    BigDecimal::from(10_000_000_000_i64)
}

/// Flat discounts in MAD keyed by normalised code.
const COUPONS: &[(&str, i32)] = &[("SAVE10", 100), ("WELCOME20", 200)];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponOutcome {
    pub code: String,
    pub discount: BigDecimal,
    pub applied: bool,
}

/// Looks up `code` after trimming and uppercasing it. Unknown codes yield a
/// zero discount with `applied == false`.
pub fn apply_coupon(code: &str) -> CouponOutcome {
    let code = code.trim().to_uppercase();
    match COUPONS.iter().find(|(known, _)| *known == code) {
        Some((_, amount)) => CouponOutcome {
            code,
            discount: BigDecimal::from(*amount),
            applied: true,
        },
        None => CouponOutcome {
            code,
            discount: BigDecimal::zero(),
            applied: false,
        },
    }
}

pub fn compute_subtotal(items: &[ServiceItem], quantities: &HashMap<String, i32>) -> BigDecimal {
    items
        .iter()
        .filter_map(|item| {
            let qty = quantities.get(&item.id).copied().unwrap_or(0);
            (qty > 0).then(|| &item.price * &BigDecimal::from(qty))
        })
        .fold(BigDecimal::zero(), |acc, line| acc + line)
}

/// `max(subtotal - discount, 0)`.
pub fn compute_total(subtotal: &BigDecimal, discount: &BigDecimal) -> BigDecimal {
    let total = subtotal - discount;
    if total < BigDecimal::zero() {
        BigDecimal::zero()
    } else {
        total
    }
}

fn validate_coupon_format(code: &str) -> Result<(), DomainError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(DomainError::validation("coupon code is empty"));
    }
    if code.chars().count() > MAX_COUPON_LEN {
        return Err(DomainError::validation("coupon code is too long"));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(DomainError::validation(
            "coupon code may only contain letters and digits",
        ));
    }
    Ok(())
}

/// Working state of one checkout for one gig.
///
/// A coupon can be applied at most once; after that it can be neither
/// replaced nor removed.
#[derive(Debug, Clone)]
pub struct OfferBuilder {
    gig: Gig,
    quantities: HashMap<String, i32>,
    coupon: Option<CouponOutcome>,
}

impl OfferBuilder {
    pub fn new(gig: Gig) -> Self {
        Self {
            gig,
            quantities: HashMap::new(),
            coupon: None,
        }
    }

    pub fn gig(&self) -> &Gig {
        &self.gig
    }

    pub fn quantity(&self, item_id: &str) -> i32 {
        self.quantities.get(item_id).copied().unwrap_or(0)
    }

    pub fn set_quantity(&mut self, item_id: &str, quantity: i32) -> Result<(), DomainError> {
        if self.gig.item(item_id).is_none() {
            return Err(DomainError::validation(format!(
                "item '{item_id}' is not offered by this gig"
            )));
        }
        if quantity < 0 {
            return Err(DomainError::validation(format!(
                "quantity for '{item_id}' must not be negative"
            )));
        }
        if quantity > MAX_QUANTITY {
            return Err(DomainError::validation(format!(
                "quantity for '{item_id}' must not exceed {MAX_QUANTITY}"
            )));
        }
        self.quantities.insert(item_id.to_string(), quantity);
        Ok(())
    }

    pub fn increment(&mut self, item_id: &str) -> Result<i32, DomainError> {
        let next = self
            .quantity(item_id)
            .checked_add(1)
            .ok_or_else(|| DomainError::validation("quantity is too large"))?;
        self.set_quantity(item_id, next)?;
        Ok(next)
    }

    /// Never goes below zero.
    pub fn decrement(&mut self, item_id: &str) -> Result<i32, DomainError> {
        let next = (self.quantity(item_id) - 1).max(0);
        self.set_quantity(item_id, next)?;
        Ok(next)
    }

    pub fn apply_coupon(&mut self, code: &str) -> Result<CouponOutcome, DomainError> {
        if let Some(applied) = &self.coupon {
            return Err(DomainError::validation(format!(
                "coupon {} is already applied",
                applied.code
            )));
        }
        validate_coupon_format(code)?;
        let outcome = apply_coupon(code);
        if outcome.applied {
            log::debug!("coupon {} applied to gig {}", outcome.code, self.gig.id);
            self.coupon = Some(outcome.clone());
        }
        Ok(outcome)
    }

    pub fn applied_coupon(&self) -> Option<&CouponOutcome> {
        self.coupon.as_ref()
    }

    pub fn subtotal(&self) -> BigDecimal {
        compute_subtotal(&self.gig.items, &self.quantities)
    }

    pub fn discount(&self) -> BigDecimal {
        self.coupon
            .as_ref()
            .map(|c| c.discount.clone())
            .unwrap_or_else(BigDecimal::zero)
    }

    pub fn total(&self) -> BigDecimal {
        compute_total(&self.subtotal(), &self.discount())
    }

    /// Freezes the current selection into an order payload under a fresh id.
    pub fn build(
        &self,
        client_id: &str,
        message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<OrderDraft, DomainError> {
        self.build_with_id(Uuid::new_v4(), client_id, message, now)
    }

    /// Like [`build`](Self::build) but reuses `id`, so a client retrying a
    /// failed submission addresses the same order. Items keep the catalog
    /// order and carry a copy of their title and price.
    pub fn build_with_id(
        &self,
        id: Uuid,
        client_id: &str,
        message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<OrderDraft, DomainError> {
        let client_id = client_id.trim();
        if client_id.is_empty() {
            return Err(DomainError::validation("client id is required"));
        }
        if client_id == self.gig.artist_id {
            return Err(DomainError::validation("providers cannot book their own gig"));
        }
        let message = message.map(str::trim).filter(|m| !m.is_empty());
        if message.is_some_and(|m| m.chars().count() > MAX_MESSAGE_LEN) {
            return Err(DomainError::validation(format!(
                "message exceeds {MAX_MESSAGE_LEN} characters"
            )));
        }

        let items = self
            .gig
            .items
            .iter()
            .filter_map(|item| {
                let quantity = self.quantity(&item.id);
                (quantity > 0).then(|| OrderItem {
                    item_id: item.id.clone(),
                    title: item.title.clone(),
                    quantity,
                    price: item.price.clone(),
                })
            })
            .collect();

        let subtotal = self.subtotal();
        if subtotal >= max_order_amount() {
            return Err(DomainError::validation("order amount is too large"));
        }
        let discount = self.discount();
        let total_price = compute_total(&subtotal, &discount);

        Ok(OrderDraft {
            id,
            client_id: client_id.to_string(),
            artist_id: self.gig.artist_id.clone(),
            gig_id: self.gig.id,
            gig_title: self.gig.title.clone(),
            message: message.map(str::to_string),
            items,
            coupon_code: self.coupon.as_ref().map(|c| c.code.clone()),
            subtotal,
            discount,
            total_price,
            created_at: now,
        })
    }
}

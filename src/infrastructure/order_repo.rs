use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderDraft, OrderItem, OrderStatus};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_items, orders};

use super::models::{NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

// Only connection-level failures are worth retrying.
impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match e {
            Error::DatabaseError(
                DatabaseErrorKind::ClosedConnection
                | DatabaseErrorKind::UnableToSendCommand
                | DatabaseErrorKind::SerializationFailure,
                info,
            ) => DomainError::StoreUnavailable(info.message().to_string()),
            Error::DatabaseError(kind, info) => DomainError::Internal(format!(
                "database rejected statement ({kind:?}): {}",
                info.message()
            )),
            other => DomainError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::StoreUnavailable(e.to_string())
    }
}

// ── Row mapping ──────────────────────────────────────────────────────────────

fn to_order(row: OrderRow, items: Vec<OrderItemRow>) -> Result<Order, DomainError> {
    Ok(Order {
        id: row.id,
        client_id: row.client_id,
        artist_id: row.artist_id,
        gig_id: row.gig_id,
        gig_title: row.gig_title,
        message: row.message,
        items: items
            .into_iter()
            .map(|i| OrderItem {
                item_id: i.item_key,
                title: i.title,
                quantity: i.quantity,
                price: i.price,
            })
            .collect(),
        coupon_code: row.coupon_code,
        subtotal: row.subtotal,
        discount: row.discount,
        total_price: row.total_price,
        status: row.status.parse()?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Attaches items to already loaded order rows with one extra query.
fn with_items(conn: &mut PgConnection, rows: Vec<OrderRow>) -> Result<Vec<Order>, DomainError> {
    let items = OrderItemRow::belonging_to(&rows)
        .select(OrderItemRow::as_select())
        .order(order_items::position.asc())
        .load(conn)?;

    items
        .grouped_by(&rows)
        .into_iter()
        .zip(rows)
        .map(|(items, row)| to_order(row, items))
        .collect()
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, draft: &OrderDraft) -> Result<Uuid, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Insert the order; a resubmitted draft hits the primary key.
            let inserted = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: draft.id,
                    client_id: draft.client_id.clone(),
                    artist_id: draft.artist_id.clone(),
                    gig_id: draft.gig_id,
                    gig_title: draft.gig_title.clone(),
                    message: draft.message.clone(),
                    coupon_code: draft.coupon_code.clone(),
                    subtotal: draft.subtotal.clone(),
                    discount: draft.discount.clone(),
                    total_price: draft.total_price.clone(),
                    status: OrderStatus::Pending.as_str().to_string(),
                    created_at: draft.created_at,
                    updated_at: draft.created_at,
                })
                .on_conflict(orders::id)
                .do_nothing()
                .execute(conn)?;

            if inserted == 0 {
                log::debug!("order {} already stored, skipping insert", draft.id);
                return Ok(draft.id);
            }

            // 2. Insert the item snapshots in catalog order.
            let new_items = draft
                .items
                .iter()
                .enumerate()
                .map(|(position, item)| -> Result<NewOrderItemRow, DomainError> {
                    Ok(NewOrderItemRow {
                        id: Uuid::new_v4(),
                        order_id: draft.id,
                        position: i32::try_from(position)
                            .map_err(|_| DomainError::validation("too many order items"))?,
                        item_key: item.item_id.clone(),
                        title: item.title.clone(),
                        quantity: item.quantity,
                        price: item.price.clone(),
                    })
                })
                .collect::<Result<Vec<_>, DomainError>>()?;

            if !new_items.is_empty() {
                diesel::insert_into(order_items::table)
                    .values(&new_items)
                    .execute(conn)?;
            }

            Ok(draft.id)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = OrderItemRow::belonging_to(&order)
            .select(OrderItemRow::as_select())
            .order(order_items::position.asc())
            .load(&mut conn)?;

        to_order(order, items).map(Some)
    }

    fn list_for_artist(&self, artist_id: &str) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let rows = orders::table
                .filter(orders::artist_id.eq(artist_id))
                .order((orders::created_at.desc(), orders::id.desc()))
                .select(OrderRow::as_select())
                .load(conn)?;
            with_items(conn, rows)
        })
    }

    fn list_for_client(&self, client_id: &str) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let rows = orders::table
                .filter(orders::client_id.eq(client_id))
                .order((orders::created_at.desc(), orders::id.desc()))
                .select(OrderRow::as_select())
                .load(conn)?;
            with_items(conn, rows)
        })
    }

    fn resolve_if_pending(
        &self,
        id: Uuid,
        artist_id: &str,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        // Ownership, state check and write in one statement.
        let updated = diesel::update(
            orders::table
                .filter(orders::id.eq(id))
                .filter(orders::artist_id.eq(artist_id))
                .filter(orders::status.eq(OrderStatus::Pending.as_str())),
        )
        .set((
            orders::status.eq(status.as_str()),
            orders::updated_at.eq(at),
        ))
        .execute(&mut conn)?;

        Ok(updated == 1)
    }
}

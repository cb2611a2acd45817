use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::{chat_channels, gig_items, gigs, order_items, orders};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub client_id: String,
    pub artist_id: String,
    pub gig_id: Uuid,
    pub gig_title: String,
    pub message: Option<String>,
    pub coupon_code: Option<String>,
    pub subtotal: BigDecimal,
    pub discount: BigDecimal,
    pub total_price: BigDecimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub client_id: String,
    pub artist_id: String,
    pub gig_id: Uuid,
    pub gig_title: String,
    pub message: Option<String>,
    pub coupon_code: Option<String>,
    pub subtotal: BigDecimal,
    pub discount: BigDecimal,
    pub total_price: BigDecimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub item_key: String,
    pub title: String,
    pub quantity: i32,
    pub price: BigDecimal,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub item_key: String,
    pub title: String,
    pub quantity: i32,
    pub price: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = gigs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GigRow {
    pub id: Uuid,
    pub artist_id: String,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable)]
#[diesel(table_name = gig_items)]
#[diesel(belongs_to(GigRow, foreign_key = gig_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GigItemRow {
    pub id: Uuid,
    pub gig_id: Uuid,
    pub item_key: String,
    pub title: String,
    pub price: BigDecimal,
    pub position: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = chat_channels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChannelRow {
    pub id: Uuid,
    pub client_id: String,
    pub artist_id: String,
    pub created_at: DateTime<Utc>,
}

use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::offer_service::{CheckoutRequest, Selection};
use crate::application::order_service::Accepted;
use crate::domain::order::{Confirmation, Order, StatusFilter};
use crate::errors::AppError;
use crate::handlers::identity::Identity;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub gig_id: Uuid,
    /// Quantity per item id; missing items count as zero.
    #[serde(default)]
    pub quantities: HashMap<String, i32>,
    pub coupon: Option<String>,
    pub message: Option<String>,
    /// `id` of the draft returned with an earlier 503. Retrying with it
    /// resolves to the same order, never a duplicate.
    pub draft_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub item_id: String,
    pub title: String,
    pub quantity: i32,
    /// Unit price captured when the order was placed.
    pub price: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub client_id: String,
    pub artist_id: String,
    pub gig_id: Uuid,
    pub gig_title: String,
    pub message: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub coupon_code: Option<String>,
    pub subtotal: String,
    pub discount: String,
    pub total_price: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// `all` (default), `pending`, `accepted` or `declined`.
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AcceptOrderResponse {
    pub order: OrderResponse,
    /// Absent when the chat channel could not be opened.
    pub channel_id: Option<Uuid>,
    pub channel_resumed: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DeclineOrderRequest {
    /// Must be `true`; anything else leaves the order untouched.
    #[serde(default)]
    pub confirm: bool,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            client_id: o.client_id,
            artist_id: o.artist_id,
            gig_id: o.gig_id,
            gig_title: o.gig_title,
            message: o.message,
            items: o
                .items
                .into_iter()
                .map(|i| OrderItemResponse {
                    item_id: i.item_id,
                    title: i.title,
                    quantity: i.quantity,
                    price: i.price.to_string(),
                })
                .collect(),
            coupon_code: o.coupon_code,
            subtotal: o.subtotal.to_string(),
            discount: o.discount.to_string(),
            total_price: o.total_price.to_string(),
            status: o.status.to_string(),
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
        }
    }
}

impl From<Accepted> for AcceptOrderResponse {
    fn from(a: Accepted) -> Self {
        Self {
            channel_id: a.channel.as_ref().map(|c| c.id),
            channel_resumed: a.channel.as_ref().is_some_and(|c| c.resumed),
            order: OrderResponse::from(a.order),
        }
    }
}

fn list_response(orders: Vec<Order>) -> ListOrdersResponse {
    ListOrdersResponse {
        total: orders.len(),
        items: orders.into_iter().map(OrderResponse::from).collect(),
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Prices the selection against the current catalog and stores a pending
/// order for the calling client. When the store is down the 503 body carries
/// the computed draft; resending the request with its `draft_id` is safe.
#[utoipa::path(
    post,
    path = "/orders",
    params(
        ("X-User-Id" = String, Header, description = "Calling client"),
    ),
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed or found by draft_id", body = OrderResponse),
        (status = 400, description = "Invalid selection, coupon or message"),
        (status = 401, description = "Missing caller identity"),
        (status = 503, description = "Store unavailable; body contains the draft"),
    ),
    tag = "orders"
)]
pub async fn place_order(
    state: web::Data<AppState>,
    user: Identity,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let request = CheckoutRequest {
        gig_id: body.gig_id,
        selection: Selection {
            quantities: body.quantities,
            coupon: body.coupon,
        },
        message: body.message,
        draft_id: body.draft_id,
    };
    let offers = state.offers.clone();

    let order = web::block(move || offers.place_order(user.as_str(), request))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/{id}
///
/// Visible to the order's client and provider only.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = String, Header, description = "Calling user"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 403, description = "Caller is not a party to the order"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    user: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let orders = state.orders.clone();

    let order = web::block(move || orders.get_order(order_id, user.as_str()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// The calling client's own orders, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("X-User-Id" = String, Header, description = "Calling client"),
    ),
    responses(
        (status = 200, description = "Client's orders", body = ListOrdersResponse),
    ),
    tag = "orders"
)]
pub async fn list_client_orders(
    state: web::Data<AppState>,
    user: Identity,
) -> Result<HttpResponse, AppError> {
    let orders = state.orders.clone();

    let result = web::block(move || orders.list_for_client(user.as_str()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(list_response(result)))
}

/// GET /provider/orders
///
/// Orders addressed to the calling provider, newest first, optionally
/// narrowed to one status.
#[utoipa::path(
    get,
    path = "/provider/orders",
    params(
        ("status" = Option<String>, Query, description = "all | pending | accepted | declined"),
        ("X-User-Id" = String, Header, description = "Calling provider"),
    ),
    responses(
        (status = 200, description = "Provider's orders", body = ListOrdersResponse),
        (status = 400, description = "Unknown status filter"),
    ),
    tag = "orders"
)]
pub async fn list_provider_orders(
    state: web::Data<AppState>,
    user: Identity,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let filter: StatusFilter = query
        .into_inner()
        .status
        .as_deref()
        .unwrap_or_default()
        .parse()?;
    let orders = state.orders.clone();

    let result = web::block(move || orders.list_for_provider(user.as_str(), filter))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(list_response(result)))
}

/// POST /orders/{id}/accept
///
/// Accepts a pending order and opens or resumes the chat with the client.
#[utoipa::path(
    post,
    path = "/orders/{id}/accept",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = String, Header, description = "Calling provider"),
    ),
    responses(
        (status = 200, description = "Order accepted", body = AcceptOrderResponse),
        (status = 403, description = "Caller does not own the order"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already resolved"),
    ),
    tag = "orders"
)]
pub async fn accept_order(
    state: web::Data<AppState>,
    user: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let orders = state.orders.clone();

    let accepted = web::block(move || orders.accept(order_id, user.as_str()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(AcceptOrderResponse::from(accepted)))
}

/// POST /orders/{id}/decline
///
/// Declines a pending order once `confirm` is true. Without confirmation
/// nothing changes and 204 is returned.
#[utoipa::path(
    post,
    path = "/orders/{id}/decline",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = String, Header, description = "Calling provider"),
    ),
    request_body = DeclineOrderRequest,
    responses(
        (status = 200, description = "Order declined", body = OrderResponse),
        (status = 204, description = "Decline not confirmed, order unchanged"),
        (status = 403, description = "Caller does not own the order"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already resolved"),
    ),
    tag = "orders"
)]
pub async fn decline_order(
    state: web::Data<AppState>,
    user: Identity,
    path: web::Path<Uuid>,
    body: web::Json<DeclineOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let confirmation = Confirmation::from(body.into_inner().confirm);
    let orders = state.orders.clone();

    let declined = web::block(move || orders.decline(order_id, user.as_str(), confirmation))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    match declined {
        Some(order) => Ok(HttpResponse::Ok().json(OrderResponse::from(order))),
        None => Ok(HttpResponse::NoContent().finish()),
    }
}

use std::collections::HashMap;
use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::offer_service::{Quote, Selection};
use crate::domain::catalog::{Gig, GigQuery};
use crate::errors::AppError;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchGigsParams {
    /// Free text matched against title, category and description.
    pub q: Option<String>,
    pub category: Option<String>,
    /// Upper bound on the cheapest item, e.g. "500".
    pub max_price: Option<String>,
    /// One of `newest`, `price_asc`, `price_desc`, `title`.
    pub sort: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GigSummaryResponse {
    pub id: Uuid,
    pub artist_id: String,
    pub title: String,
    pub category: String,
    pub starting_price: Option<String>,
    pub item_count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServiceItemResponse {
    pub id: String,
    pub title: String,
    pub price: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GigResponse {
    pub id: Uuid,
    pub artist_id: String,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub items: Vec<ServiceItemResponse>,
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct QuoteRequest {
    /// Quantity per item id; missing items count as zero.
    #[serde(default)]
    pub quantities: HashMap<String, i32>,
    pub coupon: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuoteResponse {
    pub subtotal: String,
    pub discount: String,
    pub total: String,
    pub coupon: Option<String>,
}

impl From<&Gig> for GigSummaryResponse {
    fn from(g: &Gig) -> Self {
        Self {
            id: g.id,
            artist_id: g.artist_id.clone(),
            title: g.title.clone(),
            category: g.category.clone(),
            starting_price: g.starting_price().map(|p| p.to_string()),
            item_count: g.items.len(),
        }
    }
}

impl From<Gig> for GigResponse {
    fn from(g: Gig) -> Self {
        Self {
            id: g.id,
            artist_id: g.artist_id,
            title: g.title,
            category: g.category,
            description: g.description,
            items: g
                .items
                .into_iter()
                .map(|i| ServiceItemResponse {
                    id: i.id,
                    title: i.title,
                    price: i.price.to_string(),
                })
                .collect(),
            created_at: g.created_at.to_rfc3339(),
        }
    }
}

impl From<Quote> for QuoteResponse {
    fn from(q: Quote) -> Self {
        Self {
            subtotal: q.subtotal.to_string(),
            discount: q.discount.to_string(),
            total: q.total.to_string(),
            coupon: q.coupon.map(|c| c.code),
        }
    }
}

impl From<QuoteRequest> for Selection {
    fn from(r: QuoteRequest) -> Self {
        Selection {
            quantities: r.quantities,
            coupon: r.coupon,
        }
    }
}

fn to_query(params: SearchGigsParams) -> Result<GigQuery, AppError> {
    let max_price = params
        .max_price
        .as_deref()
        .map(|raw| {
            BigDecimal::from_str(raw.trim())
                .map_err(|e| AppError::BadRequest(format!("Invalid max_price '{}': {}", raw, e)))
        })
        .transpose()?;

    Ok(GigQuery {
        text: params.q,
        category: params.category,
        max_price,
        sort: params.sort.as_deref().unwrap_or_default().parse()?,
    })
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /gigs
///
/// Fetches a fresh catalog snapshot and filters and sorts it in memory.
#[utoipa::path(
    get,
    path = "/gigs",
    params(
        ("q" = Option<String>, Query, description = "Free text search"),
        ("category" = Option<String>, Query, description = "Exact category, case-insensitive"),
        ("max_price" = Option<String>, Query, description = "Maximum starting price in MAD"),
        ("sort" = Option<String>, Query, description = "newest | price_asc | price_desc | title"),
    ),
    responses(
        (status = 200, description = "Matching gigs", body = [GigSummaryResponse]),
        (status = 400, description = "Invalid query"),
        (status = 503, description = "Store unavailable"),
    ),
    tag = "gigs"
)]
pub async fn search_gigs(
    state: web::Data<AppState>,
    query: web::Query<SearchGigsParams>,
) -> Result<HttpResponse, AppError> {
    let query = to_query(query.into_inner())?;
    let offers = state.offers.clone();

    let result = web::block(move || {
        let snapshot = offers.catalog()?;
        Ok::<_, AppError>(
            snapshot
                .search(&query)
                .into_iter()
                .map(GigSummaryResponse::from)
                .collect::<Vec<_>>(),
        )
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(result))
}

/// GET /gigs/{id}
#[utoipa::path(
    get,
    path = "/gigs/{id}",
    params(
        ("id" = Uuid, Path, description = "Gig UUID"),
    ),
    responses(
        (status = 200, description = "Gig found", body = GigResponse),
        (status = 404, description = "Gig not found"),
    ),
    tag = "gigs"
)]
pub async fn get_gig(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let gig_id = path.into_inner();
    let offers = state.offers.clone();

    let gig = web::block(move || offers.find_gig(gig_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    match gig {
        Some(gig) => Ok(HttpResponse::Ok().json(GigResponse::from(gig))),
        None => Err(AppError::NotFound),
    }
}

/// POST /gigs/{id}/quote
///
/// Prices a selection without placing an order.
#[utoipa::path(
    post,
    path = "/gigs/{id}/quote",
    params(
        ("id" = Uuid, Path, description = "Gig UUID"),
    ),
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Priced selection", body = QuoteResponse),
        (status = 400, description = "Unknown gig, item or coupon"),
    ),
    tag = "gigs"
)]
pub async fn quote_gig(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<QuoteRequest>,
) -> Result<HttpResponse, AppError> {
    let gig_id = path.into_inner();
    let selection = Selection::from(body.into_inner());
    let offers = state.offers.clone();

    let quote = web::block(move || offers.quote(gig_id, &selection))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(QuoteResponse::from(quote)))
}

//! HTTP-level tests against the in-memory store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use bigdecimal::BigDecimal;
use booking_service::domain::catalog::{Gig, ServiceItem};
use booking_service::domain::errors::DomainError;
use booking_service::domain::order::{Order, OrderDraft, OrderStatus};
use booking_service::domain::ports::{OrderRepository, SystemClock};
use booking_service::handlers::gigs::{GigSummaryResponse, QuoteResponse};
use booking_service::handlers::identity::USER_ID_HEADER;
use booking_service::handlers::orders::{AcceptOrderResponse, ListOrdersResponse, OrderResponse};
use booking_service::infrastructure::memory::InMemoryStore;
use booking_service::{configure, AppState};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

const CLIENT: &str = "client-42";
const ARTIST: &str = "artist-7";

fn gig(artist: &str, title: &str, prices: &[(&str, i32)]) -> Gig {
    Gig {
        id: Uuid::new_v4(),
        artist_id: artist.to_string(),
        title: title.to_string(),
        category: "music".to_string(),
        description: None,
        items: prices
            .iter()
            .map(|(id, price)| ServiceItem {
                id: id.to_string(),
                title: format!("{title} {id}"),
                price: BigDecimal::from(*price),
            })
            .collect(),
        created_at: Utc::now(),
    }
}

fn seeded_store() -> (InMemoryStore, Uuid) {
    let store = InMemoryStore::new();
    let dj = gig(ARTIST, "DJ", &[("a", 100), ("b", 50)]);
    let dj_id = dj.id;
    store.insert_gig(dj).unwrap();
    let mut band = gig("artist-8", "Band", &[("show", 3000)]);
    band.created_at -= Duration::days(1);
    store.insert_gig(band).unwrap();
    (store, dj_id)
}

macro_rules! app {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::in_memory($store)))
                .configure(configure),
        )
        .await
    };
}

fn place(gig_id: Uuid, quantities: Value, coupon: Option<&str>) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/orders")
        .insert_header((USER_ID_HEADER, CLIENT))
        .set_json(json!({
            "gig_id": gig_id,
            "quantities": quantities,
            "coupon": coupon,
            "message": "Wedding on Saturday",
        }))
}

#[actix_web::test]
async fn search_lists_newest_gig_first() {
    let (store, dj_id) = seeded_store();
    let app = app!(store);

    let req = test::TestRequest::get().uri("/gigs").to_request();
    let gigs: Vec<GigSummaryResponse> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(gigs.len(), 2);
    assert_eq!(gigs[0].id, dj_id);

    let req = test::TestRequest::get()
        .uri("/gigs?sort=price_desc&max_price=5000")
        .to_request();
    let gigs: Vec<GigSummaryResponse> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(gigs[0].title, "Band");

    let req = test::TestRequest::get().uri("/gigs?sort=random").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_gig_is_404() {
    let (store, _) = seeded_store();
    let app = app!(store);

    let req = test::TestRequest::get()
        .uri(&format!("/gigs/{}", Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn quote_prices_selection_with_coupon() {
    let (store, dj_id) = seeded_store();
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri(&format!("/gigs/{dj_id}/quote"))
        .set_json(json!({ "quantities": { "a": 2, "b": 1 }, "coupon": " welcome20 " }))
        .to_request();
    let quote: QuoteResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(quote.subtotal.parse::<BigDecimal>().unwrap(), BigDecimal::from(250));
    assert_eq!(quote.discount.parse::<BigDecimal>().unwrap(), BigDecimal::from(200));
    assert_eq!(quote.total.parse::<BigDecimal>().unwrap(), BigDecimal::from(50));
    assert_eq!(quote.coupon.as_deref(), Some("WELCOME20"));

    let req = test::TestRequest::post()
        .uri(&format!("/gigs/{dj_id}/quote"))
        .set_json(json!({ "quantities": { "a": 1 }, "coupon": "bogus" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn placing_an_order_requires_identity() {
    let (store, dj_id) = seeded_store();
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/orders")
        .set_json(json!({ "gig_id": dj_id, "quantities": { "a": 1 } }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn full_booking_flow_accept() {
    let (store, dj_id) = seeded_store();
    let app = app!(store);

    // Client places the order.
    let req = place(dj_id, json!({ "a": 2, "b": 1 }), Some("WELCOME20")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: OrderResponse = test::read_body_json(resp).await;
    assert_eq!(order.status, "pending");
    assert_eq!(order.artist_id, ARTIST);
    assert_eq!(order.total_price.parse::<BigDecimal>().unwrap(), BigDecimal::from(50));
    let lines: Vec<(&str, i32)> = order
        .items
        .iter()
        .map(|i| (i.item_id.as_str(), i.quantity))
        .collect();
    assert_eq!(lines, vec![("a", 2), ("b", 1)]);

    // It shows up for the provider.
    let req = test::TestRequest::get()
        .uri("/provider/orders?status=pending")
        .insert_header((USER_ID_HEADER, ARTIST))
        .to_request();
    let listed: ListOrdersResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.total, 1);
    assert_eq!(listed.items[0].id, order.id);

    // A different provider cannot touch it.
    let req = test::TestRequest::post()
        .uri(&format!("/orders/{}/accept", order.id))
        .insert_header((USER_ID_HEADER, "artist-8"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // The owner accepts and gets a chat channel.
    let req = test::TestRequest::post()
        .uri(&format!("/orders/{}/accept", order.id))
        .insert_header((USER_ID_HEADER, ARTIST))
        .to_request();
    let accepted: AcceptOrderResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(accepted.order.status, "accepted");
    assert!(accepted.channel_id.is_some());
    assert!(!accepted.channel_resumed);

    // Terminal: declining afterwards conflicts.
    let req = test::TestRequest::post()
        .uri(&format!("/orders/{}/decline", order.id))
        .insert_header((USER_ID_HEADER, ARTIST))
        .set_json(json!({ "confirm": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // The client sees the accepted order.
    let req = test::TestRequest::get()
        .uri(&format!("/orders/{}", order.id))
        .insert_header((USER_ID_HEADER, CLIENT))
        .to_request();
    let seen: OrderResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(seen.status, "accepted");

    // Outsiders do not.
    let req = test::TestRequest::get()
        .uri(&format!("/orders/{}", order.id))
        .insert_header((USER_ID_HEADER, "stranger"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn decline_needs_confirmation() {
    let (store, dj_id) = seeded_store();
    let app = app!(store);

    let req = place(dj_id, json!({ "a": 1 }), None).to_request();
    let order: OrderResponse = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::post()
        .uri(&format!("/orders/{}/decline", order.id))
        .insert_header((USER_ID_HEADER, "artist-8"))
        .set_json(json!({ "confirm": false }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/orders/{}/decline", order.id))
        .insert_header((USER_ID_HEADER, ARTIST))
        .set_json(json!({ "confirm": false }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/orders/{}", order.id))
        .insert_header((USER_ID_HEADER, ARTIST))
        .to_request();
    let unchanged: OrderResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(unchanged.status, "pending");

    let req = test::TestRequest::post()
        .uri(&format!("/orders/{}/decline", order.id))
        .insert_header((USER_ID_HEADER, ARTIST))
        .set_json(json!({ "confirm": true }))
        .to_request();
    let declined: OrderResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(declined.status, "declined");

    let req = test::TestRequest::get()
        .uri("/provider/orders?status=declined")
        .insert_header((USER_ID_HEADER, ARTIST))
        .to_request();
    let listed: ListOrdersResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.total, 1);
}

#[actix_web::test]
async fn empty_selection_is_a_free_order() {
    let (store, dj_id) = seeded_store();
    let app = app!(store);

    let req = place(dj_id, json!({ "a": 0, "b": 0 }), None).to_request();
    let order: OrderResponse = test::call_and_read_body_json(&app, req).await;
    assert!(order.items.is_empty());
    assert_eq!(order.total_price.parse::<BigDecimal>().unwrap(), BigDecimal::from(0));
}

#[actix_web::test]
async fn invalid_selection_is_400() {
    let (store, dj_id) = seeded_store();
    let app = app!(store);

    let invalid = [json!({ "a": -1 }), json!({ "nope": 1 }), json!({ "a": 10_000_000 })];
    for quantities in invalid {
        let req = place(dj_id, quantities, None).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    let req = place(Uuid::new_v4(), json!({}), None).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn provider_listing_is_newest_first() {
    let (store, dj_id) = seeded_store();
    let app = app!(store);

    let mut placed = Vec::new();
    for qty in 1..=3 {
        let req = place(dj_id, json!({ "a": qty }), None).to_request();
        let order: OrderResponse = test::call_and_read_body_json(&app, req).await;
        placed.push(order.id);
    }

    let req = test::TestRequest::get()
        .uri("/provider/orders")
        .insert_header((USER_ID_HEADER, ARTIST))
        .to_request();
    let listed: ListOrdersResponse = test::call_and_read_body_json(&app, req).await;
    let created: Vec<DateTime<FixedOffset>> = listed
        .items
        .iter()
        .map(|o| DateTime::parse_from_rfc3339(&o.created_at).unwrap())
        .collect();
    assert!(created.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(listed.total, 3);

    let req = test::TestRequest::get()
        .uri("/orders")
        .insert_header((USER_ID_HEADER, CLIENT))
        .to_request();
    let mine: ListOrdersResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(mine.total, 3);

    let req = test::TestRequest::get()
        .uri("/provider/orders?status=archived")
        .insert_header((USER_ID_HEADER, ARTIST))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

/// Order store whose writes can be switched off.
struct FlakyOrders {
    inner: InMemoryStore,
    down: AtomicBool,
}

impl OrderRepository for FlakyOrders {
    fn create(&self, draft: &OrderDraft) -> Result<Uuid, DomainError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(DomainError::StoreUnavailable("connection refused".to_string()));
        }
        self.inner.create(draft)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        self.inner.find_by_id(id)
    }

    fn list_for_artist(&self, artist_id: &str) -> Result<Vec<Order>, DomainError> {
        self.inner.list_for_artist(artist_id)
    }

    fn list_for_client(&self, client_id: &str) -> Result<Vec<Order>, DomainError> {
        self.inner.list_for_client(client_id)
    }

    fn resolve_if_pending(
        &self,
        id: Uuid,
        artist_id: &str,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        self.inner.resolve_if_pending(id, artist_id, status, at)
    }
}

#[actix_web::test]
async fn retry_with_draft_id_after_outage_creates_one_order() {
    let (store, dj_id) = seeded_store();
    let orders = Arc::new(FlakyOrders {
        inner: store.clone(),
        down: AtomicBool::new(true),
    });
    let state = AppState::new(
        Arc::new(store.clone()),
        orders.clone(),
        Arc::new(store.clone()),
        Arc::new(SystemClock),
    );
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure),
    )
    .await;

    let req = place(dj_id, json!({ "a": 2 }), Some("save10")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    let draft_id: Uuid = body["draft"]["id"].as_str().unwrap().parse().unwrap();

    orders.down.store(false, Ordering::SeqCst);
    let retry = || {
        test::TestRequest::post()
            .uri("/orders")
            .insert_header((USER_ID_HEADER, CLIENT))
            .set_json(json!({
                "gig_id": dj_id,
                "quantities": { "a": 2 },
                "coupon": "save10",
                "draft_id": draft_id,
            }))
            .to_request()
    };
    let first: OrderResponse = test::call_and_read_body_json(&app, retry()).await;
    let second: OrderResponse = test::call_and_read_body_json(&app, retry()).await;
    assert_eq!(first.id, draft_id);
    assert_eq!(second.id, draft_id);
    assert_eq!(first.total_price.parse::<BigDecimal>().unwrap(), BigDecimal::from(100));

    let req = test::TestRequest::get()
        .uri("/orders")
        .insert_header((USER_ID_HEADER, CLIENT))
        .to_request();
    let listed: ListOrdersResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.total, 1);
}

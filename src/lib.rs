pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;
pub mod state;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use db::{create_pool, DbPool};
pub use state::AppState;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::gigs::search_gigs,
        handlers::gigs::get_gig,
        handlers::gigs::quote_gig,
        handlers::orders::place_order,
        handlers::orders::get_order,
        handlers::orders::list_client_orders,
        handlers::orders::list_provider_orders,
        handlers::orders::accept_order,
        handlers::orders::decline_order,
    ),
    tags(
        (name = "gigs", description = "Browsing and pricing service listings"),
        (name = "orders", description = "Booking requests and their lifecycle"),
    )
)]
pub struct ApiDoc;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    if !applied.is_empty() {
        log::info!("applied {} migration(s)", applied.len());
    }
    Ok(())
}

/// Registers every route on `cfg`. Shared by the server and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/gigs")
            .route("", web::get().to(handlers::gigs::search_gigs))
            .route("/{id}", web::get().to(handlers::gigs::get_gig))
            .route("/{id}/quote", web::post().to(handlers::gigs::quote_gig)),
    )
    .service(
        web::scope("/orders")
            .route("", web::post().to(handlers::orders::place_order))
            .route("", web::get().to(handlers::orders::list_client_orders))
            .route("/{id}", web::get().to(handlers::orders::get_order))
            .route("/{id}/accept", web::post().to(handlers::orders::accept_order))
            .route("/{id}/decline", web::post().to(handlers::orders::decline_order)),
    )
    .route(
        "/provider/orders",
        web::get().to(handlers::orders::list_provider_orders),
    );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = ApiDoc::openapi();
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .configure(configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}

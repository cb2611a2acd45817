use booking_service::config::{Settings, StoreBackend};
use booking_service::infrastructure::memory::InMemoryStore;
use booking_service::{build_server, create_pool, run_migrations, AppState};
use dotenvy::dotenv;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let settings = Settings::from_env().unwrap_or_else(|e| {
        log::error!("invalid configuration: {}", e);
        std::process::exit(2);
    });

    let state = match settings.backend {
        StoreBackend::Postgres => {
            let url = settings
                .database_url
                .as_deref()
                .ok_or_else(|| std::io::Error::other("DATABASE_URL must be set"))?;
            let pool = create_pool(url, settings.pool_size)
                .map_err(|e| std::io::Error::other(format!("database pool: {e}")))?;
            run_migrations(&pool)
                .map_err(|e| std::io::Error::other(format!("migrations: {e}")))?;
            AppState::postgres(pool)
        }
        StoreBackend::Memory => {
            log::warn!("using the in-memory store; data is lost on shutdown");
            AppState::in_memory(InMemoryStore::new())
        }
    };

    log::info!(
        "Starting server at http://{}:{}",
        settings.host,
        settings.port
    );

    build_server(state, &settings.host, settings.port)?.await
}

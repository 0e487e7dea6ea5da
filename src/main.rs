mod api;
mod app;
mod cart;
mod config;
mod domain;
mod error;
mod logging;
mod pricing;
mod routes;

use anyhow::Result;

use cart::store::{CartStore, FileCartStore, RedisCartStore, TieredCartStore};
use cart::CartService;
use pricing::PricingTables;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting Tidybook backend"
    );

    // Fallback store doubles as the home of the persistent node id
    let fallback = FileCartStore::open(&settings.data_dir).await?;
    let node_id = fallback.node_id().await?;

    // Primary store is optional: without redis we run on the file store
    let primary: Option<Box<dyn CartStore>> = match &settings.redis_url {
        Some(url) => match RedisCartStore::connect(url).await {
            Ok(store) => Some(Box::new(store)),
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, falling back to file store only");
                None
            }
        },
        None => None,
    };

    let carts = CartService::new(TieredCartStore::new(primary, fallback), node_id);

    // Pricing engine runs on its own task; handlers talk to it over a channel
    let pricing = pricing::engine::spawn(PricingTables::default(), settings.pricing_queue_depth);
    tracing::info!("pricing engine started");

    // Create application state
    let state = app::AppState::new(settings.clone(), pricing, carts);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

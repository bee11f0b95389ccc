// School Directory Server

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use school_directory::{api::create_directory_router, app_state::AppState, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    // Build main application router
    let app = Router::new()
        .nest("/api/v1", create_directory_router(app_state))
        .layer(CorsLayer::permissive());

    let addr = config.server_address();
    info!("School directory server starting on http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

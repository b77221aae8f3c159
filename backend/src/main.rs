use std::net::SocketAddr;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use classbank_backend::{db::DbConnection, rest, scheduler};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Setting up database");
    let db = DbConnection::init().await?;

    // Set up our application state
    let state = rest::AppState::new(db);

    // Background jobs: daily snapshot and weekly interest
    scheduler::start(
        state.snapshots.clone(),
        state.interest.clone(),
        state.config.clone(),
    );

    // CORS setup to allow frontend to make requests
    let cors = CorsLayer::new()
        .allow_origin("http://localhost:8080".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    // Set up our application routes
    let api_routes = Router::new()
        .route("/transactions/award", post(rest::award))
        .route("/transactions/deposit", post(rest::deposit))
        .route("/transactions", get(rest::list_transactions))
        .route("/balance/:user_id", get(rest::get_balance))
        .route("/admin/snapshot/run", post(rest::run_snapshot))
        .route("/admin/interest/run", post(rest::run_interest))
        .route("/admin/config", get(rest::get_config).put(rest::update_config));

    // Define our main application router
    let app = Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(state);

    // Start the server
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

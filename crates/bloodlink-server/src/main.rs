mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use bloodlink_api::middleware::require_admin;
use bloodlink_api::{AppState, AppStateInner, donors, requests, stats, support};
use bloodlink_engine::{AdminPolicy, Engine, EngineConfig};
use bloodlink_gateway::connection;
use bloodlink_gateway::dispatcher::Dispatcher;

use crate::config::Config;

/// Inbound chat events waiting for the engine.
const EVENT_QUEUE: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bloodlink=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = Arc::new(bloodlink_db::Database::open(&config.db_path)?);
    info!("Registry opened at {}", config.db_path.display());

    // Chat gateway feeds the engine through a bounded queue.
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
    let dispatcher = Dispatcher::new(events_tx);

    let admin = AdminPolicy::new(config.admin_handle, config.admin_token.clone());
    let engine = Engine::new(
        db.clone(),
        Arc::new(dispatcher.clone()),
        EngineConfig {
            send_pacing: config.send_pacing,
            commit_policy: config.commit_policy,
            admin: admin.clone(),
        },
    );
    tokio::spawn(engine.clone().run(events_rx));
    info!(
        "Engine started ({:?}, {} ms between offers)",
        config.commit_policy,
        config.send_pacing.as_millis()
    );

    let app_state: AppState = Arc::new(AppStateInner { db, engine, admin });

    // Routes
    let public_routes = Router::new()
        .route("/donors", post(donors::register_donor))
        .route("/requests", post(requests::create_request))
        .with_state(app_state.clone());

    let admin_routes = Router::new()
        .route("/donors", get(donors::list_donors))
        .route("/donors/top", get(donors::top_donors))
        .route("/donors/{id}", get(donors::get_donor).delete(donors::delete_donor))
        .route("/donors/{id}/restriction", put(donors::set_restriction))
        .route("/requests", get(requests::list_requests))
        .route(
            "/requests/{id}",
            get(requests::get_request)
                .patch(requests::update_field)
                .delete(requests::delete_request),
        )
        .route("/requests/{id}/status", put(requests::update_status))
        .route(
            "/requests/{id}/donations/{donor_id}/complete",
            post(requests::complete_donation),
        )
        .route("/stats", get(stats::get_stats))
        .route("/operations", get(stats::recent_operations))
        .route("/support", get(support::list_messages))
        .route("/support/read", post(support::mark_read))
        .route("/support/reply/{user}", post(support::reply))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_admin))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(dispatcher);

    let app = Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("BloodLink server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(dispatcher): State<Dispatcher>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher))
}

mod seed;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use fieldlink_api::auth::{self, AppState, AppStateInner};
use fieldlink_api::middleware::require_auth;
use fieldlink_api::{chat, groups, reports, technicians, uploads};
use fieldlink_db::Database;
use fieldlink_gateway::connection;
use fieldlink_gateway::hub::Hub;

#[derive(Clone)]
struct GatewayState {
    hub: Hub,
    db: Arc<Database>,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fieldlink=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = fieldlink_api::middleware::jwt_secret();
    let db_path = std::env::var("FIELDLINK_DB_PATH").unwrap_or_else(|_| "fieldlink.db".into());
    let host = std::env::var("FIELDLINK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("FIELDLINK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let upload_dir: PathBuf = std::env::var("FIELDLINK_UPLOAD_DIR")
        .unwrap_or_else(|_| "uploads".into())
        .into();
    let admin_password = std::env::var("FIELDLINK_ADMIN_PASSWORD")
        .ok()
        .filter(|s| !s.is_empty());
    let backup_url = std::env::var("FIELDLINK_BACKUP_URL")
        .ok()
        .filter(|s| !s.is_empty());

    if admin_password.is_none() {
        warn!("FIELDLINK_ADMIN_PASSWORD is unset; admin login is disabled");
    }

    // Init database and demo directory
    let db = Arc::new(Database::open(&PathBuf::from(&db_path))?);
    seed::seed_demo_data(&db)?;

    // Shared state
    let hub = Hub::new();
    let app_state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        hub: hub.clone(),
        jwt_secret: jwt_secret.clone(),
        admin_password,
        upload_dir,
        backup_url,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route(
            "/technicians",
            get(technicians::list_technicians).post(technicians::create_technician),
        )
        .route(
            "/technicians/{id}",
            get(technicians::get_technician)
                .patch(technicians::update_technician)
                .delete(technicians::delete_technician),
        )
        .route("/profile", get(technicians::profile))
        .route("/dashboard", get(technicians::dashboard))
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route("/chat/rooms", get(chat::rooms))
        .route("/chat/history", get(chat::history))
        .route("/chat/overview", get(chat::overview))
        .route("/chat/messages", post(chat::send_message))
        .route(
            "/reports",
            get(reports::list_reports).post(reports::submit_report),
        )
        .route("/reports/summary", get(reports::weekly_summary))
        .route("/reports/summary/export", get(reports::export_weekly_summary))
        .route("/reports/{job_id}/export", get(reports::export_report))
        .route("/uploads/{filename}", post(uploads::upload))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let gateway_state = GatewayState {
        hub,
        db,
        jwt_secret,
    };
    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(gateway_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Fieldlink server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.hub, state.db, state.jwt_secret)
    })
}

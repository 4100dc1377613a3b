mod auth;
mod catalog;
mod context;
mod docs;
mod errors;
mod games;
mod logging;
mod players;
mod schemas;
mod serialized;
mod sessions;
mod stats;

use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::{middleware, routing::get};
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use gamehub_core::{GameHub, PgDatabase};

use context::ServerContext;

pub use logging::init_logger;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9700;

pub type Router = axum::Router<ServerContext>;

/// Starts the GameHub server
pub async fn run_server() {
    let port = env::var("GAMEHUB_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let database_url = env::var("GAMEHUB_DATABASE_URL").expect("GAMEHUB_DATABASE_URL is set");
    let secret = env::var("GAMEHUB_SECRET_KEY").expect("GAMEHUB_SECRET_KEY is set");

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let database = PgDatabase::new(&database_url)
        .await
        .expect("database connects");

    let hub = GameHub::new(database, &secret);

    let context = ServerContext { hub: Arc::new(hub) };

    let api_router = Router::new()
        .nest("/players", players::router())
        .nest("/platforms", catalog::platforms_router())
        .nest("/genres", catalog::genres_router())
        .nest("/games", games::router())
        .nest("/sessions", sessions::router())
        .nest("/stats", stats::router());

    let root_router = Router::new()
        .nest("/auth", auth::router())
        .nest("/api", api_router)
        .route("/api-docs/openapi.json", get(docs::docs))
        .layer(middleware::from_fn(errors::error_envelope))
        .layer(cors);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("Listening on port {port}");

    axum::serve(
        listener,
        root_router.with_state(context).into_make_service(),
    )
    .await
    .unwrap();
}

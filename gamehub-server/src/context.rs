use std::sync::Arc;

use axum::extract::FromRef;
use gamehub_core::{GameHub, PgDatabase};

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub hub: Arc<GameHub<PgDatabase>>,
}

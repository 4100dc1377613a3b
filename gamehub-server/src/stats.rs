use axum::{extract::State, routing::get, Json};

use gamehub_core::UserRole;

use crate::{
    auth::Identity, context::ServerContext, errors::ServerResult, serialized::StatsResponse,
    Router,
};

#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "stats",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = StatsResponse)
    )
)]
async fn stats(
    identity: Identity,
    State(context): State<ServerContext>,
) -> ServerResult<Json<StatsResponse>> {
    identity.require_role(&[UserRole::Admin, UserRole::Player])?;

    let overview = context.hub.stats.overview().await?;

    Ok(Json(StatsResponse::from_overview(
        &overview,
        "Statistiques récupérées avec succès",
        200,
    )))
}

pub fn router() -> Router {
    Router::new().route("/", get(stats))
}

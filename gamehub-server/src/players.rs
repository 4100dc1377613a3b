use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, put},
    Json,
};

use gamehub_core::{PlayerChanges, PrimaryKey, UserRole};

use crate::{
    auth::Identity,
    context::ServerContext,
    errors::ServerResult,
    schemas::{ListQuery, PlayerUpdateSchema, ValidatedJson},
    serialized::{MessageResponse, PlayerListResponse, PlayerResponse, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/api/players",
    tag = "players",
    params(ListQuery),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = PlayerListResponse)
    )
)]
async fn list_players(
    identity: Identity,
    State(context): State<ServerContext>,
    Query(query): Query<ListQuery>,
) -> ServerResult<Json<PlayerListResponse>> {
    identity.require_role(&[UserRole::Admin, UserRole::Player])?;

    let page = context
        .hub
        .players
        .list(query.sort.as_deref(), query.page(), query.limit())
        .await?;

    Ok(Json(PlayerListResponse {
        players: page.players.to_serialized(),
        current_page: query.page(),
        total: page.total,
        message: "Liste des players récupérée avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    get,
    path = "/api/players/{id}",
    tag = "players",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = PlayerResponse),
        (status = 404, description = "Player introuvable")
    )
)]
async fn player_by_id(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(player_id): Path<PrimaryKey>,
) -> ServerResult<Json<PlayerResponse>> {
    identity.require_role(&[UserRole::Admin, UserRole::Player])?;

    let player = context.hub.players.get_by_id(player_id).await?;

    Ok(Json(PlayerResponse {
        player: player.to_serialized(),
        message: "Joueur récupéré avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    put,
    path = "/api/players/{id}",
    tag = "players",
    request_body = PlayerUpdateSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = PlayerResponse),
        (status = 400, description = "Email ou username déjà utilisé"),
        (status = 404, description = "Player introuvable")
    )
)]
async fn update_player(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(player_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<PlayerUpdateSchema>,
) -> ServerResult<Json<PlayerResponse>> {
    identity.require_self_or_admin(player_id)?;

    let player = context
        .hub
        .players
        .update(
            player_id,
            PlayerChanges {
                email: body.email,
                username: body.username,
                password: body.password,
                role: body.role,
            },
        )
        .await?;

    Ok(Json(PlayerResponse {
        player: player.to_serialized(),
        message: "Player mis à jour avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/players/{id}",
    tag = "players",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, description = "Player introuvable")
    )
)]
async fn delete_player(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(player_id): Path<PrimaryKey>,
) -> ServerResult<Json<MessageResponse>> {
    identity.require_self_or_admin(player_id)?;

    context.hub.players.delete(player_id).await?;

    Ok(Json(MessageResponse {
        message: "Joueur supprimé avec succès".to_string(),
        code: 200,
    }))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_players))
        .route("/:id", get(player_by_id))
        .route("/:id", put(update_player))
        .route("/:id", delete(delete_player))
}

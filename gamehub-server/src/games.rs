use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json,
};

use gamehub_core::{GameChanges, NewGameRequest, PrimaryKey, UserRole};

use crate::{
    auth::Identity,
    context::ServerContext,
    errors::ServerResult,
    schemas::{GameCreateSchema, GameUpdateSchema, ListQuery, ValidatedJson},
    serialized::{GameListResponse, GameResponse, MessageResponse, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/api/games",
    tag = "games",
    request_body = GameCreateSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = GameResponse),
        (status = 400, description = "Champs manquants ou genre/plateforme introuvable")
    )
)]
async fn create_game(
    identity: Identity,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<GameCreateSchema>,
) -> ServerResult<(StatusCode, Json<GameResponse>)> {
    identity.require_role(&[UserRole::Admin])?;

    let game = context
        .hub
        .games
        .create(NewGameRequest {
            title: body.title,
            slug: body.slug,
            genre: body.genre,
            platform: body.platform,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(GameResponse {
            game: game.to_serialized(),
            message: "Jeu créé avec succès".to_string(),
            code: 201,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/games",
    tag = "games",
    params(ListQuery),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = GameListResponse)
    )
)]
async fn list_games(
    identity: Identity,
    State(context): State<ServerContext>,
    Query(query): Query<ListQuery>,
) -> ServerResult<Json<GameListResponse>> {
    identity.require_role(&[UserRole::Admin, UserRole::Player])?;

    let page = context
        .hub
        .games
        .list(query.sort.as_deref(), query.page(), query.limit())
        .await?;

    Ok(Json(GameListResponse {
        games: page.games.to_serialized(),
        current_page: query.page(),
        total: page.total,
        message: "Liste des Jeux récupérée avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    get,
    path = "/api/games/{id}",
    tag = "games",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = GameResponse),
        (status = 404, description = "Jeu introuvable")
    )
)]
async fn game_by_id(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(game_id): Path<PrimaryKey>,
) -> ServerResult<Json<GameResponse>> {
    identity.require_role(&[UserRole::Admin, UserRole::Player])?;

    let game = context.hub.games.get_by_id(game_id).await?;

    Ok(Json(GameResponse {
        game: game.to_serialized(),
        message: "Jeu récupéré avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    put,
    path = "/api/games/{id}",
    tag = "games",
    request_body = GameUpdateSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = GameResponse),
        (status = 400, description = "Aucun champ fourni ou genre/plateforme introuvable"),
        (status = 404, description = "Jeu introuvable")
    )
)]
async fn update_game(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(game_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<GameUpdateSchema>,
) -> ServerResult<Json<GameResponse>> {
    identity.require_role(&[UserRole::Admin])?;

    let game = context
        .hub
        .games
        .update(
            game_id,
            GameChanges {
                title: body.title,
                slug: body.slug,
                genre: body.genre,
                platform: body.platform,
            },
        )
        .await?;

    Ok(Json(GameResponse {
        game: game.to_serialized(),
        message: "Jeu mis à jour avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/games/{id}",
    tag = "games",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, description = "Jeu introuvable")
    )
)]
async fn delete_game(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(game_id): Path<PrimaryKey>,
) -> ServerResult<Json<MessageResponse>> {
    identity.require_role(&[UserRole::Admin])?;

    context.hub.games.delete(game_id).await?;

    Ok(Json(MessageResponse {
        message: "Jeu supprimé avec succès".to_string(),
        code: 200,
    }))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_game))
        .route("/", get(list_games))
        .route("/:id", get(game_by_id))
        .route("/:id", put(update_game))
        .route("/:id", delete(delete_game))
}

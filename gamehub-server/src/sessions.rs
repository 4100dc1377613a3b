use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json,
};

use gamehub_core::{NewSessionRequest, PrimaryKey, SessionChanges, UserRole};

use crate::{
    auth::Identity,
    context::ServerContext,
    errors::ServerResult,
    schemas::{ListQuery, SessionCreateSchema, SessionUpdateSchema, ValidatedJson},
    serialized::{MessageResponse, SessionListResponse, SessionResponse, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/api/sessions",
    tag = "sessions",
    request_body = SessionCreateSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = SessionResponse),
        (status = 400, description = "Champs manquants ou joueur déjà dans une session active"),
        (status = 404, description = "Joueur ou jeu référencé introuvable")
    )
)]
async fn create_session(
    identity: Identity,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<SessionCreateSchema>,
) -> ServerResult<(StatusCode, Json<SessionResponse>)> {
    identity.require_role(&[UserRole::Admin])?;

    let session = context
        .hub
        .sessions
        .create(NewSessionRequest {
            player: body.player,
            game: body.game,
            score: body.score,
            active: body.active,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session: session.to_serialized(),
            message: "Session créé avec succès".to_string(),
            code: 201,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/sessions",
    tag = "sessions",
    params(ListQuery),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = SessionListResponse)
    )
)]
async fn list_sessions(
    identity: Identity,
    State(context): State<ServerContext>,
    Query(query): Query<ListQuery>,
) -> ServerResult<Json<SessionListResponse>> {
    identity.require_role(&[UserRole::Admin, UserRole::Player])?;

    let page = context
        .hub
        .sessions
        .list(query.sort.as_deref(), query.page(), query.limit())
        .await?;

    Ok(Json(SessionListResponse {
        sessions: page.sessions.to_serialized(),
        current_page: query.page(),
        total: page.total,
        message: "Liste des sessions récupérée avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = SessionResponse),
        (status = 404, description = "Session introuvable")
    )
)]
async fn session_by_id(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(session_id): Path<PrimaryKey>,
) -> ServerResult<Json<SessionResponse>> {
    identity.require_role(&[UserRole::Admin, UserRole::Player])?;

    let session = context.hub.sessions.get_by_id(session_id).await?;

    Ok(Json(SessionResponse {
        session: session.to_serialized(),
        message: "Session récupéré avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    put,
    path = "/api/sessions/{id}",
    tag = "sessions",
    request_body = SessionUpdateSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = SessionResponse),
        (status = 400, description = "Aucun champ fourni ou joueur déjà dans une session active"),
        (status = 404, description = "Session introuvable")
    )
)]
async fn update_session(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(session_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<SessionUpdateSchema>,
) -> ServerResult<Json<SessionResponse>> {
    let session = context.hub.sessions.get_by_id(session_id).await?;

    // Only the owning player, or an admin, may touch a session
    identity.require_self_or_admin(session.player.id)?;

    let session = context
        .hub
        .sessions
        .update(
            session_id,
            SessionChanges {
                player: body.player,
                game: body.game,
                score: body.score,
                active: body.active,
            },
        )
        .await?;

    Ok(Json(SessionResponse {
        session: session.to_serialized(),
        message: "Session mis à jour avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, description = "Session introuvable")
    )
)]
async fn delete_session(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(session_id): Path<PrimaryKey>,
) -> ServerResult<Json<MessageResponse>> {
    identity.require_role(&[UserRole::Admin, UserRole::Player])?;

    context.hub.sessions.delete(session_id).await?;

    Ok(Json(MessageResponse {
        message: "Session supprimé avec succès".to_string(),
        code: 200,
    }))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_session))
        .route("/", get(list_sessions))
        .route("/:id", get(session_by_id))
        .route("/:id", put(update_session))
        .route("/:id", delete(delete_session))
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json,
};

use gamehub_core::{EntryChanges, NewEntryRequest, PrimaryKey, UserRole};

use crate::{
    auth::Identity,
    context::ServerContext,
    errors::ServerResult,
    schemas::{EntrySchema, ListQuery, ValidatedJson},
    serialized::{
        GenreListResponse, GenreResponse, MessageResponse, PlatformListResponse, PlatformResponse,
        ToSerialized,
    },
    Router,
};

#[utoipa::path(
    post,
    path = "/api/genres",
    tag = "genres",
    request_body = EntrySchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = GenreResponse),
        (status = 400, description = "Champs manquants ou nom/slug déjà utilisé")
    )
)]
async fn create_genre(
    identity: Identity,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<EntrySchema>,
) -> ServerResult<(StatusCode, Json<GenreResponse>)> {
    identity.require_role(&[UserRole::Admin])?;

    let genre = context
        .hub
        .catalog
        .create_genre(NewEntryRequest {
            name: body.name,
            slug: body.slug,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(GenreResponse {
            genre: genre.to_serialized(),
            message: "Genre créé avec succès".to_string(),
            code: 201,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/genres",
    tag = "genres",
    params(ListQuery),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = GenreListResponse)
    )
)]
async fn list_genres(
    identity: Identity,
    State(context): State<ServerContext>,
    Query(query): Query<ListQuery>,
) -> ServerResult<Json<GenreListResponse>> {
    identity.require_role(&[UserRole::Admin, UserRole::Player])?;

    let page = context
        .hub
        .catalog
        .list_genres(query.sort.as_deref(), query.page(), query.limit())
        .await?;

    Ok(Json(GenreListResponse {
        genres: page.entries.to_serialized(),
        current_page: query.page(),
        total: page.total,
        message: "Liste des genres récupérée avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    get,
    path = "/api/genres/{id}",
    tag = "genres",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = GenreResponse),
        (status = 404, description = "Genre introuvable")
    )
)]
async fn genre_by_id(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(genre_id): Path<PrimaryKey>,
) -> ServerResult<Json<GenreResponse>> {
    identity.require_role(&[UserRole::Admin, UserRole::Player])?;

    let genre = context.hub.catalog.genre_by_id(genre_id).await?;

    Ok(Json(GenreResponse {
        genre: genre.to_serialized(),
        message: "Genre récupéré avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    put,
    path = "/api/genres/{id}",
    tag = "genres",
    request_body = EntrySchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = GenreResponse),
        (status = 400, description = "Nom ou slug déjà utilisé"),
        (status = 404, description = "Genre introuvable")
    )
)]
async fn update_genre(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(genre_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<EntrySchema>,
) -> ServerResult<Json<GenreResponse>> {
    identity.require_role(&[UserRole::Admin])?;

    let genre = context
        .hub
        .catalog
        .update_genre(
            genre_id,
            EntryChanges {
                name: body.name,
                slug: body.slug,
            },
        )
        .await?;

    Ok(Json(GenreResponse {
        genre: genre.to_serialized(),
        message: "Genre mis à jour avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/genres/{id}",
    tag = "genres",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = MessageResponse),
        (status = 400, description = "Impossible de supprimer un genre ayant des jeux associés"),
        (status = 404, description = "Genre introuvable")
    )
)]
async fn delete_genre(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(genre_id): Path<PrimaryKey>,
) -> ServerResult<Json<MessageResponse>> {
    identity.require_role(&[UserRole::Admin])?;

    context.hub.catalog.delete_genre(genre_id).await?;

    Ok(Json(MessageResponse {
        message: "Genre supprimé avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    post,
    path = "/api/platforms",
    tag = "platforms",
    request_body = EntrySchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = PlatformResponse),
        (status = 400, description = "Champs manquants ou nom/slug déjà utilisé")
    )
)]
async fn create_platform(
    identity: Identity,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<EntrySchema>,
) -> ServerResult<(StatusCode, Json<PlatformResponse>)> {
    identity.require_role(&[UserRole::Admin])?;

    let platform = context
        .hub
        .catalog
        .create_platform(NewEntryRequest {
            name: body.name,
            slug: body.slug,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PlatformResponse {
            platform: platform.to_serialized(),
            message: "Plateforme créé avec succès".to_string(),
            code: 201,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/platforms",
    tag = "platforms",
    params(ListQuery),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = PlatformListResponse)
    )
)]
async fn list_platforms(
    identity: Identity,
    State(context): State<ServerContext>,
    Query(query): Query<ListQuery>,
) -> ServerResult<Json<PlatformListResponse>> {
    identity.require_role(&[UserRole::Admin, UserRole::Player])?;

    let page = context
        .hub
        .catalog
        .list_platforms(query.sort.as_deref(), query.page(), query.limit())
        .await?;

    Ok(Json(PlatformListResponse {
        platforms: page.entries.to_serialized(),
        current_page: query.page(),
        total: page.total,
        message: "Liste des plateformes récupérée avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    get,
    path = "/api/platforms/{id}",
    tag = "platforms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = PlatformResponse),
        (status = 404, description = "Plateforme introuvable")
    )
)]
async fn platform_by_id(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(platform_id): Path<PrimaryKey>,
) -> ServerResult<Json<PlatformResponse>> {
    identity.require_role(&[UserRole::Admin, UserRole::Player])?;

    let platform = context.hub.catalog.platform_by_id(platform_id).await?;

    Ok(Json(PlatformResponse {
        platform: platform.to_serialized(),
        message: "Plateforme récupéré avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    put,
    path = "/api/platforms/{id}",
    tag = "platforms",
    request_body = EntrySchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = PlatformResponse),
        (status = 400, description = "Nom ou slug déjà utilisé"),
        (status = 404, description = "Plateforme introuvable")
    )
)]
async fn update_platform(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(platform_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<EntrySchema>,
) -> ServerResult<Json<PlatformResponse>> {
    identity.require_role(&[UserRole::Admin])?;

    let platform = context
        .hub
        .catalog
        .update_platform(
            platform_id,
            EntryChanges {
                name: body.name,
                slug: body.slug,
            },
        )
        .await?;

    Ok(Json(PlatformResponse {
        platform: platform.to_serialized(),
        message: "Plateforme mis à jour avec succès".to_string(),
        code: 200,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/platforms/{id}",
    tag = "platforms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = MessageResponse),
        (status = 400, description = "Impossible de supprimer une plateforme ayant des jeux associés"),
        (status = 404, description = "Plateforme introuvable")
    )
)]
async fn delete_platform(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(platform_id): Path<PrimaryKey>,
) -> ServerResult<Json<MessageResponse>> {
    identity.require_role(&[UserRole::Admin])?;

    context.hub.catalog.delete_platform(platform_id).await?;

    Ok(Json(MessageResponse {
        message: "Plateforme supprimé avec succès".to_string(),
        code: 200,
    }))
}

pub fn genres_router() -> Router {
    Router::new()
        .route("/", post(create_genre))
        .route("/", get(list_genres))
        .route("/:id", get(genre_by_id))
        .route("/:id", put(update_genre))
        .route("/:id", delete(delete_genre))
}

pub fn platforms_router() -> Router {
    Router::new()
        .route("/", post(create_platform))
        .route("/", get(list_platforms))
        .route("/:id", get(platform_by_id))
        .route("/:id", put(update_platform))
        .route("/:id", delete(delete_platform))
}

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    routing::post,
    Json,
};

use gamehub_core::{Claims, Credentials, NewRegistration, PrimaryKey, UserRole};

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{LoginSchema, RegisterSchema, ValidatedJson},
    serialized::{LoginResponse, MessageResponse},
    Router,
};

/// The authenticated identity attached to a request, read from the bearer
/// token
pub struct Identity(Claims);

impl Identity {
    /// Refuses the request unless the identity carries one of the roles
    pub fn require_role(&self, roles: &[UserRole]) -> ServerResult<()> {
        if roles.contains(&self.0.role) {
            Ok(())
        } else {
            Err(ServerError::InsufficientRole)
        }
    }

    /// Admins always pass; anyone else must be the owner of the resource
    pub fn require_self_or_admin(&self, owner_id: PrimaryKey) -> ServerResult<()> {
        if self.0.role == UserRole::Admin || self.0.id == owner_id {
            Ok(())
        } else {
            Err(ServerError::InsufficientRole)
        }
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for Identity {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|x| x.to_str().ok())
            .ok_or(ServerError::MissingToken)?;

        let token = header_value
            .split_ascii_whitespace()
            .last()
            .ok_or(ServerError::MissingToken)?;

        let claims = state
            .hub
            .auth
            .verify(token)
            .map_err(|_| ServerError::InvalidToken)?;

        Ok(Self(claims))
    }
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterSchema,
    responses(
        (status = 201, body = MessageResponse),
        (status = 400, description = "Utilisateur déjà existant ou corps invalide")
    )
)]
async fn register(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RegisterSchema>,
) -> ServerResult<(StatusCode, Json<MessageResponse>)> {
    context
        .hub
        .auth
        .register(NewRegistration {
            email: body.email,
            username: body.username,
            password: body.password,
            role: body.role,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Utilisateur créé avec succès".to_string(),
            code: 201,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginSchema,
    responses(
        (status = 200, body = LoginResponse),
        (status = 401, description = "Mot de passe incorrect"),
        (status = 404, description = "Utilisateur non trouvé")
    )
)]
async fn login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<Json<LoginResponse>> {
    let login = context
        .hub
        .auth
        .login(Credentials {
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok(Json(LoginResponse {
        message: "Connexion réussie".to_string(),
        token: login.token,
        code: 200,
    }))
}

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

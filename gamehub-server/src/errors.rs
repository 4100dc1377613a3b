use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use log::error;
use serde::Serialize;
use thiserror::Error;

use gamehub_core::{AuthError, CatalogError, DatabaseError, GameError, PlayerError, SessionError};

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing or invalid input
    #[error("{0}")]
    Validation(String),
    /// A uniqueness or invariant violation. The API reports these as 400.
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Vous devez être connecté pour accéder à cette ressource")]
    MissingToken,
    #[error("{0}")]
    Unauthorized(String),
    #[error("Token invalide")]
    InvalidToken,
    #[error("Accès refusé. Rôle insuffisant")]
    InsufficientRole,
    #[error("Une erreur interne est survenue")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MissingToken | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidToken | Self::InsufficientRole => StatusCode::FORBIDDEN,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::Conflict(_) => "ConflictError",
            Self::NotFound(_) => "NotFoundError",
            Self::MissingToken | Self::Unauthorized(_) => "AuthenticationError",
            Self::InvalidToken | Self::InsufficientRole => "AuthorizationError",
            Self::Unknown(_) => "ServerError",
        }
    }
}

/// Carried on the response so [error_envelope] can format the final body
/// with the request path attached.
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    pub name: &'static str,
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if let Self::Unknown(detail) = &self {
            error!("Erreur interne: {detail}");
        }

        let details = ErrorDetails {
            name: self.name(),
            message: self.to_string(),
        };

        let mut response = (self.as_status_code(), self.to_string()).into_response();
        response.extensions_mut().insert(details);

        response
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: &'static str,
    message: String,
    timestamp: String,
    path: String,
}

/// The centralized error formatter. Every error response produced by a
/// handler is rewritten into the `{error, message, timestamp, path}` envelope.
pub async fn error_envelope(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;

    match response.extensions_mut().remove::<ErrorDetails>() {
        Some(details) => {
            let status = response.status();

            let body = Json(ErrorEnvelope {
                error: details.name,
                message: details.message,
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                path,
            });

            (status, body).into_response()
        }
        None => response,
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            e @ DatabaseError::NotFound { .. } => Self::NotFound(e.to_string()),
            e @ DatabaseError::Conflict { .. } => Self::Conflict(e.to_string()),
            DatabaseError::Internal(e) => Self::Unknown(e.to_string()),
        }
    }
}

impl From<SessionError> for ServerError {
    fn from(value: SessionError) -> Self {
        match value {
            e @ (SessionError::MissingFields
            | SessionError::NoFieldsToUpdate
            | SessionError::InvalidSort(_)) => Self::Validation(e.to_string()),
            e @ (SessionError::NotFound
            | SessionError::PlayerNotFound
            | SessionError::GameNotFound) => Self::NotFound(e.to_string()),
            e @ SessionError::PlayerAlreadyActive => Self::Conflict(e.to_string()),
            SessionError::Db(e) => e.into(),
        }
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            e @ AuthError::AlreadyExists => Self::Validation(e.to_string()),
            e @ AuthError::UserNotFound => Self::NotFound(e.to_string()),
            e @ AuthError::WrongPassword => Self::Unauthorized(e.to_string()),
            AuthError::InvalidToken => Self::InvalidToken,
            AuthError::Db(e) => e.into(),
            e @ (AuthError::HashError(_) | AuthError::TokenError(_)) => {
                Self::Unknown(e.to_string())
            }
        }
    }
}

impl From<PlayerError> for ServerError {
    fn from(value: PlayerError) -> Self {
        match value {
            e @ PlayerError::NotFound => Self::NotFound(e.to_string()),
            e @ (PlayerError::EmailTaken
            | PlayerError::UsernameTaken
            | PlayerError::HasSessions
            | PlayerError::InvalidSort(_)) => Self::Validation(e.to_string()),
            PlayerError::Db(e) => e.into(),
            e @ PlayerError::HashError(_) => Self::Unknown(e.to_string()),
        }
    }
}

impl From<GameError> for ServerError {
    fn from(value: GameError) -> Self {
        match value {
            e @ GameError::NotFound => Self::NotFound(e.to_string()),
            e @ (GameError::MissingFields
            | GameError::GenreNotFound
            | GameError::PlatformNotFound
            | GameError::NoFieldsToUpdate
            | GameError::HasSessions
            | GameError::InvalidSort(_)) => Self::Validation(e.to_string()),
            GameError::Db(e) => e.into(),
        }
    }
}

impl From<CatalogError> for ServerError {
    fn from(value: CatalogError) -> Self {
        match value {
            e @ (CatalogError::GenreNotFound | CatalogError::PlatformNotFound) => {
                Self::NotFound(e.to_string())
            }
            e @ (CatalogError::MissingFields
            | CatalogError::NameTaken
            | CatalogError::SlugTaken
            | CatalogError::GenreHasGames
            | CatalogError::PlatformHasGames
            | CatalogError::InvalidSort(_)) => Self::Validation(e.to_string()),
            CatalogError::Db(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_errors_map_to_the_documented_statuses() {
        let missing: ServerError = SessionError::NotFound.into();
        assert_eq!(missing.as_status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.name(), "NotFoundError");
        assert_eq!(missing.to_string(), "Session introuvable");

        let conflict: ServerError = SessionError::PlayerAlreadyActive.into();
        assert_eq!(conflict.as_status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(conflict.name(), "ConflictError");
        assert_eq!(
            conflict.to_string(),
            "Le joueur est déjà dans une session active"
        );

        let invalid: ServerError = SessionError::MissingFields.into();
        assert_eq!(invalid.as_status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.name(), "ValidationError");
    }

    #[test]
    fn auth_failures_map_to_the_documented_statuses() {
        assert_eq!(
            ServerError::MissingToken.as_status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServerError::InsufficientRole.as_status_code(),
            StatusCode::FORBIDDEN
        );

        let wrong_password: ServerError = AuthError::WrongPassword.into();
        assert_eq!(wrong_password.as_status_code(), StatusCode::UNAUTHORIZED);

        let invalid_token: ServerError = AuthError::InvalidToken.into();
        assert_eq!(invalid_token.as_status_code(), StatusCode::FORBIDDEN);
    }
}

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use gamehub_core::{PrimaryKey, UserRole};

use crate::errors::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterSchema {
    #[validate(email, length(max = 100))]
    pub email: String,
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 6, max = 100))]
    pub password: String,
    #[schema(value_type = Option<String>, example = "player")]
    pub role: Option<UserRole>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(email, length(max = 100))]
    pub email: String,
    #[validate(length(min = 6, max = 100))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlayerUpdateSchema {
    #[validate(email, length(max = 100))]
    pub email: Option<String>,
    #[validate(length(min = 3, max = 50))]
    pub username: Option<String>,
    #[validate(length(min = 6, max = 100))]
    pub password: Option<String>,
    #[schema(value_type = Option<String>, example = "player")]
    pub role: Option<UserRole>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GameCreateSchema {
    #[validate(length(min = 1))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub slug: Option<String>,
    pub genre: Option<PrimaryKey>,
    pub platform: Option<PrimaryKey>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GameUpdateSchema {
    #[validate(length(min = 1))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub slug: Option<String>,
    pub genre: Option<PrimaryKey>,
    pub platform: Option<PrimaryKey>,
}

/// Create or update payload for genres and platforms
#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntrySchema {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub slug: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionCreateSchema {
    pub player: Option<PrimaryKey>,
    pub game: Option<PrimaryKey>,
    #[validate(range(min = 0))]
    pub score: Option<i64>,
    pub active: Option<bool>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionUpdateSchema {
    pub player: Option<PrimaryKey>,
    pub game: Option<PrimaryKey>,
    #[validate(range(min = 0))]
    pub score: Option<i64>,
    pub active: Option<bool>,
}

/// Query parameters shared by every listing endpoint
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuery {
    /// Sort key, prefixed with `-` for descending order
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    const DEFAULT_PAGE: i64 = 1;
    const DEFAULT_LIMIT: i64 = 5;

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(Self::DEFAULT_PAGE)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| ServerError::Validation("Corps JSON invalide".to_string()))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| ServerError::Validation("Validation échouée".to_string()))?;

        Ok(Self(extracted_json.0))
    }
}

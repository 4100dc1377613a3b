use async_trait::async_trait;
use thiserror::Error;

mod data;
pub use data::*;

mod pg;
pub use pg::*;

mod memory;
pub use memory::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} avec {field} '{value}' existe déjà")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource} introuvable")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

impl DatabaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can fetch and persist GameHub data
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn player_by_id(&self, player_id: PrimaryKey) -> Result<PlayerData>;
    async fn player_by_email(&self, email: &str) -> Result<PlayerData>;
    async fn player_by_username(&self, username: &str) -> Result<PlayerData>;
    async fn list_players(
        &self,
        order: Option<PlayerOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PlayerData>>;
    async fn count_players(&self) -> Result<i64>;
    async fn top_players(&self, limit: i64) -> Result<Vec<PlayerData>>;
    async fn create_player(&self, new_player: NewPlayer) -> Result<PlayerData>;
    async fn update_player(&self, updated_player: UpdatedPlayer) -> Result<PlayerData>;
    async fn delete_player(&self, player_id: PrimaryKey) -> Result<()>;

    async fn genre_by_id(&self, genre_id: PrimaryKey) -> Result<GenreData>;
    async fn genre_by_name(&self, name: &str) -> Result<GenreData>;
    async fn genre_by_slug(&self, slug: &str) -> Result<GenreData>;
    async fn list_genres(
        &self,
        order: Option<CatalogOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<GenreData>>;
    async fn count_genres(&self) -> Result<i64>;
    async fn create_genre(&self, new_genre: NewCatalogEntry) -> Result<GenreData>;
    async fn update_genre(&self, updated_genre: UpdatedCatalogEntry) -> Result<GenreData>;
    async fn delete_genre(&self, genre_id: PrimaryKey) -> Result<()>;
    /// How many games reference this genre, for the deletion guard
    async fn count_games_with_genre(&self, genre_id: PrimaryKey) -> Result<i64>;

    async fn platform_by_id(&self, platform_id: PrimaryKey) -> Result<PlatformData>;
    async fn platform_by_name(&self, name: &str) -> Result<PlatformData>;
    async fn platform_by_slug(&self, slug: &str) -> Result<PlatformData>;
    async fn list_platforms(
        &self,
        order: Option<CatalogOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PlatformData>>;
    async fn count_platforms(&self) -> Result<i64>;
    async fn create_platform(&self, new_platform: NewCatalogEntry) -> Result<PlatformData>;
    async fn update_platform(
        &self,
        updated_platform: UpdatedCatalogEntry,
    ) -> Result<PlatformData>;
    async fn delete_platform(&self, platform_id: PrimaryKey) -> Result<()>;
    async fn count_games_with_platform(&self, platform_id: PrimaryKey) -> Result<i64>;

    async fn game_by_id(&self, game_id: PrimaryKey) -> Result<GameData>;
    async fn game_by_title(&self, title: &str) -> Result<GameData>;
    async fn game_by_slug(&self, slug: &str) -> Result<GameData>;
    async fn list_games(
        &self,
        order: Option<GameOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<GameData>>;
    async fn count_games(&self) -> Result<i64>;
    async fn create_game(&self, new_game: NewGame) -> Result<GameData>;
    async fn update_game(&self, updated_game: UpdatedGame) -> Result<GameData>;
    async fn delete_game(&self, game_id: PrimaryKey) -> Result<()>;

    async fn session_by_id(&self, session_id: PrimaryKey) -> Result<SessionData>;
    /// Id of the active session owned by the player, if any. `exclude` leaves
    /// one session out of the check, for updates of that same session.
    async fn active_session_for_player(
        &self,
        player_id: PrimaryKey,
        exclude: Option<PrimaryKey>,
    ) -> Result<Option<PrimaryKey>>;
    async fn list_sessions(
        &self,
        order: SessionOrder,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<SessionData>>;
    async fn count_sessions(&self) -> Result<i64>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn update_session(&self, updated_session: UpdatedSession) -> Result<SessionData>;
    async fn delete_session(&self, session_id: PrimaryKey) -> Result<()>;

    // Settlement and back-reference primitives, sequenced by the session
    // engine. The add/remove operations are idempotent set operations.
    async fn adjust_player_score(&self, player_id: PrimaryKey, delta: i64) -> Result<()>;
    async fn add_session_to_player(
        &self,
        player_id: PrimaryKey,
        session_id: PrimaryKey,
    ) -> Result<()>;
    async fn remove_session_from_player(
        &self,
        player_id: PrimaryKey,
        session_id: PrimaryKey,
    ) -> Result<()>;
    async fn add_session_to_game(&self, game_id: PrimaryKey, session_id: PrimaryKey)
        -> Result<()>;
    async fn remove_session_from_game(
        &self,
        game_id: PrimaryKey,
        session_id: PrimaryKey,
    ) -> Result<()>;
}

#[derive(Debug)]
pub struct NewPlayer {
    pub email: String,
    pub username: String,
    /// Argon2 hash, never the plain password
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Default)]
pub struct UpdatedPlayer {
    pub id: PrimaryKey,
    pub email: Option<String>,
    pub username: Option<String>,
    /// Argon2 hash, never the plain password
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

/// A new genre or platform
#[derive(Debug)]
pub struct NewCatalogEntry {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Default)]
pub struct UpdatedCatalogEntry {
    pub id: PrimaryKey,
    pub name: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug)]
pub struct NewGame {
    pub title: String,
    pub slug: String,
    pub genre_id: PrimaryKey,
    pub platform_id: PrimaryKey,
}

#[derive(Debug, Default)]
pub struct UpdatedGame {
    pub id: PrimaryKey,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub genre_id: Option<PrimaryKey>,
    pub platform_id: Option<PrimaryKey>,
}

#[derive(Debug)]
pub struct NewSession {
    pub player_id: PrimaryKey,
    pub game_id: PrimaryKey,
    pub score: i64,
    pub active: bool,
}

#[derive(Debug, Default)]
pub struct UpdatedSession {
    pub id: PrimaryKey,
    pub player_id: Option<PrimaryKey>,
    pub game_id: Option<PrimaryKey>,
    pub score: Option<i64>,
    pub active: Option<bool>,
}

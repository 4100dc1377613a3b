use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// Role attached to a player account, used for route authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Player,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Admin => "admin",
        }
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player" => Ok(Self::Player),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A registered player account
#[derive(Debug, Clone)]
pub struct PlayerData {
    pub id: PrimaryKey,
    pub email: String,
    pub username: String,
    /// Argon2 hash of the password. Stripped before anything is serialized.
    pub password: String,
    pub role: UserRole,
    /// Denormalized sum of the creation-time scores of this player's sessions,
    /// maintained by the session engine.
    pub total_score: i64,
    /// Back-reference set of the sessions owned by this player
    pub session_ids: Vec<PrimaryKey>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A game genre
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GenreData {
    pub id: PrimaryKey,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A platform games can be played on
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlatformData {
    pub id: PrimaryKey,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A catalog game, with its genre and platform resolved
#[derive(Debug, Clone)]
pub struct GameData {
    pub id: PrimaryKey,
    pub title: String,
    pub slug: String,
    pub genre: GenreData,
    pub platform: PlatformData,
    /// Back-reference set of the sessions played on this game
    pub session_ids: Vec<PrimaryKey>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One play session linking a player to a game, with both resolved
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    pub player: PlayerData,
    pub game: GameData,
    pub score: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionData {
    /// Seconds elapsed since creation as observed at `now` while the session
    /// is active. Once closed, the duration is frozen at the last update.
    pub fn duration_seconds_at(&self, now: DateTime<Utc>) -> i64 {
        let end = if self.active { now } else { self.updated_at };

        (end - self.created_at).num_seconds()
    }

    pub fn duration_seconds(&self) -> i64 {
        self.duration_seconds_at(Utc::now())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

fn split_direction(raw: &str) -> (&str, SortDirection) {
    match raw.strip_prefix('-') {
        Some(key) => (key, SortDirection::Descending),
        None => (raw, SortDirection::Ascending),
    }
}

/// Ordering of a session listing. Parsed from the wire format where a
/// leading `-` means descending, and nested player/game fields are reached
/// with a dot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOrder {
    pub key: SessionSortKey,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSortKey {
    Score,
    Active,
    CreatedAt,
    UpdatedAt,
    PlayerUsername,
    PlayerEmail,
    PlayerTotalScore,
    GameTitle,
    GameSlug,
}

impl SessionOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        let (key, direction) = split_direction(raw);

        let key = match key {
            "score" => SessionSortKey::Score,
            "active" => SessionSortKey::Active,
            "createdAt" => SessionSortKey::CreatedAt,
            "updatedAt" => SessionSortKey::UpdatedAt,
            "player.username" => SessionSortKey::PlayerUsername,
            "player.email" => SessionSortKey::PlayerEmail,
            "player.totalScore" => SessionSortKey::PlayerTotalScore,
            "game.title" => SessionSortKey::GameTitle,
            "game.slug" => SessionSortKey::GameSlug,
            _ => return None,
        };

        Some(Self { key, direction })
    }

    /// The default listing order
    pub fn most_recent_first() -> Self {
        Self {
            key: SessionSortKey::CreatedAt,
            direction: SortDirection::Descending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerOrder {
    pub key: PlayerSortKey,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerSortKey {
    Username,
    Email,
    TotalScore,
    CreatedAt,
}

impl PlayerOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        let (key, direction) = split_direction(raw);

        let key = match key {
            "username" => PlayerSortKey::Username,
            "email" => PlayerSortKey::Email,
            "totalScore" => PlayerSortKey::TotalScore,
            "createdAt" => PlayerSortKey::CreatedAt,
            _ => return None,
        };

        Some(Self { key, direction })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOrder {
    pub key: GameSortKey,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameSortKey {
    Title,
    Slug,
    CreatedAt,
}

impl GameOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        let (key, direction) = split_direction(raw);

        let key = match key {
            "title" => GameSortKey::Title,
            "slug" => GameSortKey::Slug,
            "createdAt" => GameSortKey::CreatedAt,
            _ => return None,
        };

        Some(Self { key, direction })
    }
}

/// Ordering of a genre or platform listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogOrder {
    pub key: CatalogSortKey,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSortKey {
    Name,
    Slug,
    CreatedAt,
}

impl CatalogOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        let (key, direction) = split_direction(raw);

        let key = match key {
            "name" => CatalogSortKey::Name,
            "slug" => CatalogSortKey::Slug,
            "createdAt" => CatalogSortKey::CreatedAt,
            _ => return None,
        };

        Some(Self { key, direction })
    }
}

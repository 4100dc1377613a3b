//! All schemas that are exposed from endpoints are defined here
//! along with the conversions from the core data records

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use gamehub_core::{
    GameData, GenreData, PlatformData, PlayerData, PrimaryKey, SessionData, StatsData,
};

/// A player account. The password hash never appears here.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    id: PrimaryKey,
    email: String,
    username: String,
    #[schema(example = "player")]
    role: String,
    total_score: i64,
    sessions: Vec<PrimaryKey>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
    id: PrimaryKey,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    id: PrimaryKey,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    id: PrimaryKey,
    title: String,
    slug: String,
    genre: Genre,
    platform: Platform,
    sessions: Vec<PrimaryKey>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A play session with its player and game resolved. `durationSeconds` is
/// computed at read time: elapsed while active, frozen after close.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: PrimaryKey,
    player: Player,
    game: Game,
    score: i64,
    active: bool,
    duration_seconds: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<Player> for PlayerData {
    fn to_serialized(&self) -> Player {
        Player {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            role: self.role.to_string(),
            total_score: self.total_score,
            sessions: self.session_ids.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl ToSerialized<Genre> for GenreData {
    fn to_serialized(&self) -> Genre {
        Genre {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl ToSerialized<Platform> for PlatformData {
    fn to_serialized(&self) -> Platform {
        Platform {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl ToSerialized<Game> for GameData {
    fn to_serialized(&self) -> Game {
        Game {
            id: self.id,
            title: self.title.clone(),
            slug: self.slug.clone(),
            genre: self.genre.to_serialized(),
            platform: self.platform.to_serialized(),
            sessions: self.session_ids.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl ToSerialized<Session> for SessionData {
    fn to_serialized(&self) -> Session {
        Session {
            id: self.id,
            player: self.player.to_serialized(),
            game: self.game.to_serialized(),
            score: self.score,
            active: self.active,
            duration_seconds: self.duration_seconds(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
    pub code: u16,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub code: u16,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub player: Player,
    pub message: String,
    pub code: u16,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerListResponse {
    pub players: Vec<Player>,
    pub current_page: i64,
    pub total: i64,
    pub message: String,
    pub code: u16,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    pub game: Game,
    pub message: String,
    pub code: u16,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameListResponse {
    pub games: Vec<Game>,
    pub current_page: i64,
    pub total: i64,
    pub message: String,
    pub code: u16,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenreResponse {
    pub genre: Genre,
    pub message: String,
    pub code: u16,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenreListResponse {
    pub genres: Vec<Genre>,
    pub current_page: i64,
    pub total: i64,
    pub message: String,
    pub code: u16,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlatformResponse {
    pub platform: Platform,
    pub message: String,
    pub code: u16,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlatformListResponse {
    pub platforms: Vec<Platform>,
    pub current_page: i64,
    pub total: i64,
    pub message: String,
    pub code: u16,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session: Session,
    pub message: String,
    pub code: u16,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionListResponse {
    pub sessions: Vec<Session>,
    pub current_page: i64,
    pub total: i64,
    pub message: String,
    pub code: u16,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_players: i64,
    pub total_games: i64,
    pub total_genres: i64,
    pub total_platforms: i64,
    pub total_sessions: i64,
    pub top_five_player: Vec<Player>,
    pub message: String,
    pub code: u16,
}

impl StatsResponse {
    pub fn from_overview(overview: &StatsData, message: &str, code: u16) -> Self {
        Self {
            total_players: overview.total_players,
            total_games: overview.total_games,
            total_genres: overview.total_genres,
            total_platforms: overview.total_platforms,
            total_sessions: overview.total_sessions,
            top_five_player: overview.top_players.to_serialized(),
            message: message.to_string(),
            code,
        }
    }
}

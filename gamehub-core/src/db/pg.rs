use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, Error as SqlxError, PgPool};

use crate::{
    CatalogOrder, CatalogSortKey, Database, DatabaseError, DatabaseResult, GameData, GameOrder,
    GameSortKey, GenreData, IntoDatabaseError, NewCatalogEntry, NewGame, NewPlayer, NewSession,
    PlatformData, PlayerData, PlayerOrder, PlayerSortKey, PrimaryKey, Result, SessionData,
    SessionOrder, SessionSortKey, SortDirection, UpdatedCatalogEntry, UpdatedGame, UpdatedPlayer,
    UpdatedSession,
};

/// Name of the partial unique index guarding the one-active-session-per-player
/// invariant at the database level.
const ACTIVE_SESSION_INDEX: &str = "sessions_one_active_per_player";

/// A postgres database implementation for GameHub
pub struct PgDatabase {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct PlayerRow {
    id: PrimaryKey,
    email: String,
    username: String,
    password: String,
    role: String,
    total_score: i64,
    session_ids: Vec<PrimaryKey>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PlayerRow {
    fn into_data(self) -> Result<PlayerData> {
        let role = self
            .role
            .parse()
            .map_err(|e: String| DatabaseError::Internal(e.into()))?;

        Ok(PlayerData {
            id: self.id,
            email: self.email,
            username: self.username,
            password: self.password,
            role,
            total_score: self.total_score,
            session_ids: self.session_ids,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct GameRow {
    id: PrimaryKey,
    title: String,
    slug: String,
    genre_id: PrimaryKey,
    platform_id: PrimaryKey,
    session_ids: Vec<PrimaryKey>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: PrimaryKey,
    player_id: PrimaryKey,
    game_id: PrimaryKey,
    score: i64,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn direction_sql(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Ascending => "ASC",
        SortDirection::Descending => "DESC",
    }
}

fn player_order_sql(order: PlayerOrder) -> String {
    let column = match order.key {
        PlayerSortKey::Username => "username",
        PlayerSortKey::Email => "email",
        PlayerSortKey::TotalScore => "total_score",
        PlayerSortKey::CreatedAt => "created_at",
    };

    format!("{} {}", column, direction_sql(order.direction))
}

fn catalog_order_sql(order: CatalogOrder) -> String {
    let column = match order.key {
        CatalogSortKey::Name => "name",
        CatalogSortKey::Slug => "slug",
        CatalogSortKey::CreatedAt => "created_at",
    };

    format!("{} {}", column, direction_sql(order.direction))
}

fn game_order_sql(order: GameOrder) -> String {
    let column = match order.key {
        GameSortKey::Title => "title",
        GameSortKey::Slug => "slug",
        GameSortKey::CreatedAt => "created_at",
    };

    format!("{} {}", column, direction_sql(order.direction))
}

fn session_order_sql(order: SessionOrder) -> String {
    let column = match order.key {
        SessionSortKey::Score => "sessions.score",
        SessionSortKey::Active => "sessions.active",
        SessionSortKey::CreatedAt => "sessions.created_at",
        SessionSortKey::UpdatedAt => "sessions.updated_at",
        SessionSortKey::PlayerUsername => "players.username",
        SessionSortKey::PlayerEmail => "players.email",
        SessionSortKey::PlayerTotalScore => "players.total_score",
        SessionSortKey::GameTitle => "games.title",
        SessionSortKey::GameSlug => "games.slug",
    };

    format!("{} {}", column, direction_sql(order.direction))
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn player_by_id(&self, player_id: PrimaryKey) -> Result<PlayerData> {
        sqlx::query_as::<_, PlayerRow>("SELECT * FROM players WHERE id = $1")
            .bind(player_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("Player", "id"))?
            .into_data()
    }

    async fn player_by_email(&self, email: &str) -> Result<PlayerData> {
        sqlx::query_as::<_, PlayerRow>("SELECT * FROM players WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("Player", "email"))?
            .into_data()
    }

    async fn player_by_username(&self, username: &str) -> Result<PlayerData> {
        sqlx::query_as::<_, PlayerRow>("SELECT * FROM players WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("Player", "username"))?
            .into_data()
    }

    async fn list_players(
        &self,
        order: Option<PlayerOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PlayerData>> {
        let order_sql = match order {
            Some(order) => format!("ORDER BY {}, id ASC", player_order_sql(order)),
            None => "ORDER BY id ASC".to_string(),
        };

        let sql = format!("SELECT * FROM players {} OFFSET $1 LIMIT $2", order_sql);

        sqlx::query_as::<_, PlayerRow>(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?
            .into_iter()
            .map(PlayerRow::into_data)
            .collect()
    }

    async fn count_players(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM players")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn top_players(&self, limit: i64) -> Result<Vec<PlayerData>> {
        sqlx::query_as::<_, PlayerRow>(
            "SELECT * FROM players ORDER BY total_score DESC, id ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?
        .into_iter()
        .map(PlayerRow::into_data)
        .collect()
    }

    async fn create_player(&self, new_player: NewPlayer) -> Result<PlayerData> {
        self.player_by_email(&new_player.email)
            .await
            .conflict_or_ok("Player", "email", &new_player.email)?;

        self.player_by_username(&new_player.username)
            .await
            .conflict_or_ok("Player", "username", &new_player.username)?;

        let id: PrimaryKey = sqlx::query_scalar(
            "INSERT INTO players (email, username, password, role) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&new_player.email)
        .bind(&new_player.username)
        .bind(&new_player.password)
        .bind(new_player.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.player_by_id(id).await
    }

    async fn update_player(&self, updated_player: UpdatedPlayer) -> Result<PlayerData> {
        let player = self.player_by_id(updated_player.id).await?;

        sqlx::query(
            "UPDATE players SET
                email = $1,
                username = $2,
                password = $3,
                role = $4,
                updated_at = now()
            WHERE id = $5",
        )
        .bind(updated_player.email.unwrap_or(player.email))
        .bind(updated_player.username.unwrap_or(player.username))
        .bind(updated_player.password.unwrap_or(player.password))
        .bind(updated_player.role.unwrap_or(player.role).as_str())
        .bind(updated_player.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.player_by_id(updated_player.id).await
    }

    async fn delete_player(&self, player_id: PrimaryKey) -> Result<()> {
        // Ensure player exists
        let _ = self.player_by_id(player_id).await?;

        sqlx::query("DELETE FROM players WHERE id = $1")
            .bind(player_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn genre_by_id(&self, genre_id: PrimaryKey) -> Result<GenreData> {
        sqlx::query_as::<_, GenreData>("SELECT * FROM genres WHERE id = $1")
            .bind(genre_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("Genre", "id"))
    }

    async fn genre_by_name(&self, name: &str) -> Result<GenreData> {
        sqlx::query_as::<_, GenreData>("SELECT * FROM genres WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("Genre", "name"))
    }

    async fn genre_by_slug(&self, slug: &str) -> Result<GenreData> {
        sqlx::query_as::<_, GenreData>("SELECT * FROM genres WHERE slug = $1")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("Genre", "slug"))
    }

    async fn list_genres(
        &self,
        order: Option<CatalogOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<GenreData>> {
        let order_sql = match order {
            Some(order) => format!("ORDER BY {}, id ASC", catalog_order_sql(order)),
            None => "ORDER BY id ASC".to_string(),
        };

        let sql = format!("SELECT * FROM genres {} OFFSET $1 LIMIT $2", order_sql);

        sqlx::query_as::<_, GenreData>(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn count_genres(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM genres")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn create_genre(&self, new_genre: NewCatalogEntry) -> Result<GenreData> {
        self.genre_by_name(&new_genre.name)
            .await
            .conflict_or_ok("Genre", "name", &new_genre.name)?;

        self.genre_by_slug(&new_genre.slug)
            .await
            .conflict_or_ok("Genre", "slug", &new_genre.slug)?;

        let id: PrimaryKey =
            sqlx::query_scalar("INSERT INTO genres (name, slug) VALUES ($1, $2) RETURNING id")
                .bind(&new_genre.name)
                .bind(&new_genre.slug)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| e.any())?;

        self.genre_by_id(id).await
    }

    async fn update_genre(&self, updated_genre: UpdatedCatalogEntry) -> Result<GenreData> {
        let genre = self.genre_by_id(updated_genre.id).await?;

        sqlx::query("UPDATE genres SET name = $1, slug = $2, updated_at = now() WHERE id = $3")
            .bind(updated_genre.name.unwrap_or(genre.name))
            .bind(updated_genre.slug.unwrap_or(genre.slug))
            .bind(updated_genre.id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.genre_by_id(updated_genre.id).await
    }

    async fn delete_genre(&self, genre_id: PrimaryKey) -> Result<()> {
        // Ensure genre exists
        let _ = self.genre_by_id(genre_id).await?;

        sqlx::query("DELETE FROM genres WHERE id = $1")
            .bind(genre_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn count_games_with_genre(&self, genre_id: PrimaryKey) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM games WHERE genre_id = $1")
            .bind(genre_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn platform_by_id(&self, platform_id: PrimaryKey) -> Result<PlatformData> {
        sqlx::query_as::<_, PlatformData>("SELECT * FROM platforms WHERE id = $1")
            .bind(platform_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("Plateforme", "id"))
    }

    async fn platform_by_name(&self, name: &str) -> Result<PlatformData> {
        sqlx::query_as::<_, PlatformData>("SELECT * FROM platforms WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("Plateforme", "name"))
    }

    async fn platform_by_slug(&self, slug: &str) -> Result<PlatformData> {
        sqlx::query_as::<_, PlatformData>("SELECT * FROM platforms WHERE slug = $1")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("Plateforme", "slug"))
    }

    async fn list_platforms(
        &self,
        order: Option<CatalogOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PlatformData>> {
        let order_sql = match order {
            Some(order) => format!("ORDER BY {}, id ASC", catalog_order_sql(order)),
            None => "ORDER BY id ASC".to_string(),
        };

        let sql = format!("SELECT * FROM platforms {} OFFSET $1 LIMIT $2", order_sql);

        sqlx::query_as::<_, PlatformData>(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn count_platforms(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM platforms")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn create_platform(&self, new_platform: NewCatalogEntry) -> Result<PlatformData> {
        self.platform_by_name(&new_platform.name)
            .await
            .conflict_or_ok("Plateforme", "name", &new_platform.name)?;

        self.platform_by_slug(&new_platform.slug)
            .await
            .conflict_or_ok("Plateforme", "slug", &new_platform.slug)?;

        let id: PrimaryKey =
            sqlx::query_scalar("INSERT INTO platforms (name, slug) VALUES ($1, $2) RETURNING id")
                .bind(&new_platform.name)
                .bind(&new_platform.slug)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| e.any())?;

        self.platform_by_id(id).await
    }

    async fn update_platform(
        &self,
        updated_platform: UpdatedCatalogEntry,
    ) -> Result<PlatformData> {
        let platform = self.platform_by_id(updated_platform.id).await?;

        sqlx::query("UPDATE platforms SET name = $1, slug = $2, updated_at = now() WHERE id = $3")
            .bind(updated_platform.name.unwrap_or(platform.name))
            .bind(updated_platform.slug.unwrap_or(platform.slug))
            .bind(updated_platform.id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.platform_by_id(updated_platform.id).await
    }

    async fn delete_platform(&self, platform_id: PrimaryKey) -> Result<()> {
        // Ensure platform exists
        let _ = self.platform_by_id(platform_id).await?;

        sqlx::query("DELETE FROM platforms WHERE id = $1")
            .bind(platform_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn count_games_with_platform(&self, platform_id: PrimaryKey) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM games WHERE platform_id = $1")
            .bind(platform_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn game_by_id(&self, game_id: PrimaryKey) -> Result<GameData> {
        let row = sqlx::query_as::<_, GameRow>("SELECT * FROM games WHERE id = $1")
            .bind(game_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("Jeu", "id"))?;

        let genre = self.genre_by_id(row.genre_id).await?;
        let platform = self.platform_by_id(row.platform_id).await?;

        Ok(GameData {
            id: row.id,
            title: row.title,
            slug: row.slug,
            genre,
            platform,
            session_ids: row.session_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn game_by_title(&self, title: &str) -> Result<GameData> {
        let id: PrimaryKey = sqlx::query_scalar("SELECT id FROM games WHERE title = $1")
            .bind(title)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("Jeu", "title"))?;

        self.game_by_id(id).await
    }

    async fn game_by_slug(&self, slug: &str) -> Result<GameData> {
        let id: PrimaryKey = sqlx::query_scalar("SELECT id FROM games WHERE slug = $1")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("Jeu", "slug"))?;

        self.game_by_id(id).await
    }

    async fn list_games(
        &self,
        order: Option<GameOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<GameData>> {
        let order_sql = match order {
            Some(order) => format!("ORDER BY {}, id ASC", game_order_sql(order)),
            None => "ORDER BY id ASC".to_string(),
        };

        let sql = format!("SELECT id FROM games {} OFFSET $1 LIMIT $2", order_sql);

        let ids: Vec<PrimaryKey> = sqlx::query_scalar(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        let mut games = Vec::with_capacity(ids.len());

        for id in ids {
            games.push(self.game_by_id(id).await?);
        }

        Ok(games)
    }

    async fn count_games(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM games")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn create_game(&self, new_game: NewGame) -> Result<GameData> {
        self.game_by_title(&new_game.title)
            .await
            .conflict_or_ok("Jeu", "title", &new_game.title)?;

        self.game_by_slug(&new_game.slug)
            .await
            .conflict_or_ok("Jeu", "slug", &new_game.slug)?;

        let id: PrimaryKey = sqlx::query_scalar(
            "INSERT INTO games (title, slug, genre_id, platform_id) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&new_game.title)
        .bind(&new_game.slug)
        .bind(new_game.genre_id)
        .bind(new_game.platform_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.game_by_id(id).await
    }

    async fn update_game(&self, updated_game: UpdatedGame) -> Result<GameData> {
        let game = self.game_by_id(updated_game.id).await?;

        sqlx::query(
            "UPDATE games SET
                title = $1,
                slug = $2,
                genre_id = $3,
                platform_id = $4,
                updated_at = now()
            WHERE id = $5",
        )
        .bind(updated_game.title.unwrap_or(game.title))
        .bind(updated_game.slug.unwrap_or(game.slug))
        .bind(updated_game.genre_id.unwrap_or(game.genre.id))
        .bind(updated_game.platform_id.unwrap_or(game.platform.id))
        .bind(updated_game.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.game_by_id(updated_game.id).await
    }

    async fn delete_game(&self, game_id: PrimaryKey) -> Result<()> {
        // Ensure game exists
        let _ = self.game_by_id(game_id).await?;

        sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(game_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn session_by_id(&self, session_id: PrimaryKey) -> Result<SessionData> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("Session", "id"))?;

        let player = self.player_by_id(row.player_id).await?;
        let game = self.game_by_id(row.game_id).await?;

        Ok(SessionData {
            id: row.id,
            player,
            game,
            score: row.score,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn active_session_for_player(
        &self,
        player_id: PrimaryKey,
        exclude: Option<PrimaryKey>,
    ) -> Result<Option<PrimaryKey>> {
        sqlx::query_scalar(
            "SELECT id FROM sessions
            WHERE player_id = $1 AND active AND ($2::int4 IS NULL OR id <> $2::int4)",
        )
        .bind(player_id)
        .bind(exclude)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn list_sessions(
        &self,
        order: SessionOrder,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<SessionData>> {
        let sql = format!(
            "SELECT sessions.id FROM sessions
                INNER JOIN players ON players.id = sessions.player_id
                INNER JOIN games ON games.id = sessions.game_id
            ORDER BY {}, sessions.id ASC
            OFFSET $1 LIMIT $2",
            session_order_sql(order)
        );

        let ids: Vec<PrimaryKey> = sqlx::query_scalar(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        let mut sessions = Vec::with_capacity(ids.len());

        for id in ids {
            sessions.push(self.session_by_id(id).await?);
        }

        Ok(sessions)
    }

    async fn count_sessions(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let id: PrimaryKey = sqlx::query_scalar(
            "INSERT INTO sessions (player_id, game_id, score, active) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(new_session.player_id)
        .bind(new_session.game_id)
        .bind(new_session.score)
        .bind(new_session.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.active_conflict_or_any(new_session.player_id))?;

        self.session_by_id(id).await
    }

    async fn update_session(&self, updated_session: UpdatedSession) -> Result<SessionData> {
        let session = self.session_by_id(updated_session.id).await?;

        sqlx::query(
            "UPDATE sessions SET
                player_id = $1,
                game_id = $2,
                score = $3,
                active = $4,
                updated_at = now()
            WHERE id = $5",
        )
        .bind(updated_session.player_id.unwrap_or(session.player.id))
        .bind(updated_session.game_id.unwrap_or(session.game.id))
        .bind(updated_session.score.unwrap_or(session.score))
        .bind(updated_session.active.unwrap_or(session.active))
        .bind(updated_session.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.active_conflict_or_any(session.player.id))?;

        self.session_by_id(updated_session.id).await
    }

    async fn delete_session(&self, session_id: PrimaryKey) -> Result<()> {
        // Ensure session exists
        let _: PrimaryKey = sqlx::query_scalar("SELECT id FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("Session", "id"))?;

        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn adjust_player_score(&self, player_id: PrimaryKey, delta: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE players SET total_score = total_score + $1, updated_at = now() WHERE id = $2",
        )
        .bind(delta)
        .bind(player_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "Player",
                identifier: "id",
            });
        }

        Ok(())
    }

    async fn add_session_to_player(
        &self,
        player_id: PrimaryKey,
        session_id: PrimaryKey,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE players SET
                session_ids = array_append(array_remove(session_ids, $1), $1),
                updated_at = now()
            WHERE id = $2",
        )
        .bind(session_id)
        .bind(player_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "Player",
                identifier: "id",
            });
        }

        Ok(())
    }

    async fn remove_session_from_player(
        &self,
        player_id: PrimaryKey,
        session_id: PrimaryKey,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE players SET
                session_ids = array_remove(session_ids, $1),
                updated_at = now()
            WHERE id = $2",
        )
        .bind(session_id)
        .bind(player_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "Player",
                identifier: "id",
            });
        }

        Ok(())
    }

    async fn add_session_to_game(
        &self,
        game_id: PrimaryKey,
        session_id: PrimaryKey,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE games SET
                session_ids = array_append(array_remove(session_ids, $1), $1),
                updated_at = now()
            WHERE id = $2",
        )
        .bind(session_id)
        .bind(game_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "Jeu",
                identifier: "id",
            });
        }

        Ok(())
    }

    async fn remove_session_from_game(
        &self,
        game_id: PrimaryKey,
        session_id: PrimaryKey,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE games SET
                session_ids = array_remove(session_ids, $1),
                updated_at = now()
            WHERE id = $2",
        )
        .bind(session_id)
        .bind(game_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "Jeu",
                identifier: "id",
            });
        }

        Ok(())
    }
}

/// Helper for mapping unique violations on the active-session index to the
/// conflict the engine's own invariant check produces.
trait IntoSessionConflict {
    fn active_conflict_or_any(self, player_id: PrimaryKey) -> DatabaseError;
}

impl IntoSessionConflict for SqlxError {
    fn active_conflict_or_any(self, player_id: PrimaryKey) -> DatabaseError {
        if let SqlxError::Database(e) = &self {
            if e.constraint() == Some(ACTIVE_SESSION_INDEX) {
                return DatabaseError::Conflict {
                    resource: "Session",
                    field: "active",
                    value: player_id.to_string(),
                };
            }
        }

        self.any()
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    CatalogOrder, CatalogSortKey, Database, DatabaseError, GameData, GameOrder, GameSortKey,
    GenreData, NewCatalogEntry, NewGame, NewPlayer, NewSession, PlatformData, PlayerData,
    PlayerOrder, PlayerSortKey, PrimaryKey, Result, SessionData, SessionOrder, SessionSortKey,
    SortDirection, UpdatedCatalogEntry, UpdatedGame, UpdatedPlayer, UpdatedSession, UserRole,
};

/// An in-memory database implementation, used by the test suites and as a
/// throwaway backend for local development. All operations run under one lock,
/// so check-then-write sequences are serialized and the active-session
/// invariant cannot be raced here.
#[derive(Default)]
pub struct MemoryDatabase {
    state: Mutex<State>,
}

#[derive(Debug, Clone)]
struct PlayerRecord {
    id: PrimaryKey,
    email: String,
    username: String,
    password: String,
    role: UserRole,
    total_score: i64,
    session_ids: Vec<PrimaryKey>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct GameRecord {
    id: PrimaryKey,
    title: String,
    slug: String,
    genre_id: PrimaryKey,
    platform_id: PrimaryKey,
    session_ids: Vec<PrimaryKey>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct SessionRecord {
    id: PrimaryKey,
    player_id: PrimaryKey,
    game_id: PrimaryKey,
    score: i64,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    players: HashMap<PrimaryKey, PlayerRecord>,
    genres: HashMap<PrimaryKey, GenreData>,
    platforms: HashMap<PrimaryKey, PlatformData>,
    games: HashMap<PrimaryKey, GameRecord>,
    sessions: HashMap<PrimaryKey, SessionRecord>,
    last_id: PrimaryKey,
}

fn not_found(resource: &'static str, identifier: &'static str) -> DatabaseError {
    DatabaseError::NotFound {
        resource,
        identifier,
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

fn page<T>(items: Vec<T>, offset: i64, limit: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

impl State {
    fn next_id(&mut self) -> PrimaryKey {
        self.last_id += 1;
        self.last_id
    }

    fn player_data(&self, player_id: PrimaryKey) -> Result<PlayerData> {
        let record = self
            .players
            .get(&player_id)
            .ok_or(not_found("Player", "id"))?;

        Ok(PlayerData {
            id: record.id,
            email: record.email.clone(),
            username: record.username.clone(),
            password: record.password.clone(),
            role: record.role,
            total_score: record.total_score,
            session_ids: record.session_ids.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn game_data(&self, game_id: PrimaryKey) -> Result<GameData> {
        let record = self.games.get(&game_id).ok_or(not_found("Jeu", "id"))?;

        let genre = self
            .genres
            .get(&record.genre_id)
            .cloned()
            .ok_or(not_found("Genre", "id"))?;

        let platform = self
            .platforms
            .get(&record.platform_id)
            .cloned()
            .ok_or(not_found("Plateforme", "id"))?;

        Ok(GameData {
            id: record.id,
            title: record.title.clone(),
            slug: record.slug.clone(),
            genre,
            platform,
            session_ids: record.session_ids.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn session_data(&self, session_id: PrimaryKey) -> Result<SessionData> {
        let record = self
            .sessions
            .get(&session_id)
            .ok_or(not_found("Session", "id"))?;

        Ok(SessionData {
            id: record.id,
            player: self.player_data(record.player_id)?,
            game: self.game_data(record.game_id)?,
            score: record.score,
            active: record.active,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn other_active_session(
        &self,
        player_id: PrimaryKey,
        exclude: Option<PrimaryKey>,
    ) -> Option<PrimaryKey> {
        self.sessions
            .values()
            .find(|s| s.player_id == player_id && s.active && Some(s.id) != exclude)
            .map(|s| s.id)
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn player_by_id(&self, player_id: PrimaryKey) -> Result<PlayerData> {
        self.state.lock().player_data(player_id)
    }

    async fn player_by_email(&self, email: &str) -> Result<PlayerData> {
        let state = self.state.lock();

        let id = state
            .players
            .values()
            .find(|p| p.email == email)
            .map(|p| p.id)
            .ok_or(not_found("Player", "email"))?;

        state.player_data(id)
    }

    async fn player_by_username(&self, username: &str) -> Result<PlayerData> {
        let state = self.state.lock();

        let id = state
            .players
            .values()
            .find(|p| p.username == username)
            .map(|p| p.id)
            .ok_or(not_found("Player", "username"))?;

        state.player_data(id)
    }

    async fn list_players(
        &self,
        order: Option<PlayerOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PlayerData>> {
        let state = self.state.lock();

        let mut players: Vec<_> = state
            .players
            .keys()
            .map(|id| state.player_data(*id))
            .collect::<Result<_>>()?;

        match order {
            Some(order) => players.sort_by(|a, b| {
                let ordering = match order.key {
                    PlayerSortKey::Username => a.username.cmp(&b.username),
                    PlayerSortKey::Email => a.email.cmp(&b.email),
                    PlayerSortKey::TotalScore => a.total_score.cmp(&b.total_score),
                    PlayerSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                };

                directed(ordering, order.direction).then(a.id.cmp(&b.id))
            }),
            None => players.sort_by_key(|p| p.id),
        }

        Ok(page(players, offset, limit))
    }

    async fn count_players(&self) -> Result<i64> {
        Ok(self.state.lock().players.len() as i64)
    }

    async fn top_players(&self, limit: i64) -> Result<Vec<PlayerData>> {
        let state = self.state.lock();

        let mut players: Vec<_> = state
            .players
            .keys()
            .map(|id| state.player_data(*id))
            .collect::<Result<_>>()?;

        players.sort_by(|a, b| b.total_score.cmp(&a.total_score).then(a.id.cmp(&b.id)));

        Ok(page(players, 0, limit))
    }

    async fn create_player(&self, new_player: NewPlayer) -> Result<PlayerData> {
        let mut state = self.state.lock();

        if state.players.values().any(|p| p.email == new_player.email) {
            return Err(DatabaseError::Conflict {
                resource: "Player",
                field: "email",
                value: new_player.email,
            });
        }

        if state
            .players
            .values()
            .any(|p| p.username == new_player.username)
        {
            return Err(DatabaseError::Conflict {
                resource: "Player",
                field: "username",
                value: new_player.username,
            });
        }

        let id = state.next_id();
        let now = Utc::now();

        state.players.insert(
            id,
            PlayerRecord {
                id,
                email: new_player.email,
                username: new_player.username,
                password: new_player.password,
                role: new_player.role,
                total_score: 0,
                session_ids: vec![],
                created_at: now,
                updated_at: now,
            },
        );

        state.player_data(id)
    }

    async fn update_player(&self, updated_player: UpdatedPlayer) -> Result<PlayerData> {
        let mut state = self.state.lock();

        let record = state
            .players
            .get_mut(&updated_player.id)
            .ok_or(not_found("Player", "id"))?;

        if let Some(email) = updated_player.email {
            record.email = email;
        }
        if let Some(username) = updated_player.username {
            record.username = username;
        }
        if let Some(password) = updated_player.password {
            record.password = password;
        }
        if let Some(role) = updated_player.role {
            record.role = role;
        }

        record.updated_at = Utc::now();

        state.player_data(updated_player.id)
    }

    async fn delete_player(&self, player_id: PrimaryKey) -> Result<()> {
        let mut state = self.state.lock();

        state
            .players
            .remove(&player_id)
            .map(|_| ())
            .ok_or(not_found("Player", "id"))
    }

    async fn genre_by_id(&self, genre_id: PrimaryKey) -> Result<GenreData> {
        self.state
            .lock()
            .genres
            .get(&genre_id)
            .cloned()
            .ok_or(not_found("Genre", "id"))
    }

    async fn genre_by_name(&self, name: &str) -> Result<GenreData> {
        self.state
            .lock()
            .genres
            .values()
            .find(|g| g.name == name)
            .cloned()
            .ok_or(not_found("Genre", "name"))
    }

    async fn genre_by_slug(&self, slug: &str) -> Result<GenreData> {
        self.state
            .lock()
            .genres
            .values()
            .find(|g| g.slug == slug)
            .cloned()
            .ok_or(not_found("Genre", "slug"))
    }

    async fn list_genres(
        &self,
        order: Option<CatalogOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<GenreData>> {
        let state = self.state.lock();
        let mut genres: Vec<_> = state.genres.values().cloned().collect();

        match order {
            Some(order) => genres.sort_by(|a, b| {
                let ordering = match order.key {
                    CatalogSortKey::Name => a.name.cmp(&b.name),
                    CatalogSortKey::Slug => a.slug.cmp(&b.slug),
                    CatalogSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                };

                directed(ordering, order.direction).then(a.id.cmp(&b.id))
            }),
            None => genres.sort_by_key(|g| g.id),
        }

        Ok(page(genres, offset, limit))
    }

    async fn count_genres(&self) -> Result<i64> {
        Ok(self.state.lock().genres.len() as i64)
    }

    async fn create_genre(&self, new_genre: NewCatalogEntry) -> Result<GenreData> {
        let mut state = self.state.lock();

        if state.genres.values().any(|g| g.name == new_genre.name) {
            return Err(DatabaseError::Conflict {
                resource: "Genre",
                field: "name",
                value: new_genre.name,
            });
        }

        if state.genres.values().any(|g| g.slug == new_genre.slug) {
            return Err(DatabaseError::Conflict {
                resource: "Genre",
                field: "slug",
                value: new_genre.slug,
            });
        }

        let id = state.next_id();
        let now = Utc::now();

        let genre = GenreData {
            id,
            name: new_genre.name,
            slug: new_genre.slug,
            created_at: now,
            updated_at: now,
        };

        state.genres.insert(id, genre.clone());

        Ok(genre)
    }

    async fn update_genre(&self, updated_genre: UpdatedCatalogEntry) -> Result<GenreData> {
        let mut state = self.state.lock();

        let genre = state
            .genres
            .get_mut(&updated_genre.id)
            .ok_or(not_found("Genre", "id"))?;

        if let Some(name) = updated_genre.name {
            genre.name = name;
        }
        if let Some(slug) = updated_genre.slug {
            genre.slug = slug;
        }

        genre.updated_at = Utc::now();

        Ok(genre.clone())
    }

    async fn delete_genre(&self, genre_id: PrimaryKey) -> Result<()> {
        self.state
            .lock()
            .genres
            .remove(&genre_id)
            .map(|_| ())
            .ok_or(not_found("Genre", "id"))
    }

    async fn count_games_with_genre(&self, genre_id: PrimaryKey) -> Result<i64> {
        Ok(self
            .state
            .lock()
            .games
            .values()
            .filter(|g| g.genre_id == genre_id)
            .count() as i64)
    }

    async fn platform_by_id(&self, platform_id: PrimaryKey) -> Result<PlatformData> {
        self.state
            .lock()
            .platforms
            .get(&platform_id)
            .cloned()
            .ok_or(not_found("Plateforme", "id"))
    }

    async fn platform_by_name(&self, name: &str) -> Result<PlatformData> {
        self.state
            .lock()
            .platforms
            .values()
            .find(|p| p.name == name)
            .cloned()
            .ok_or(not_found("Plateforme", "name"))
    }

    async fn platform_by_slug(&self, slug: &str) -> Result<PlatformData> {
        self.state
            .lock()
            .platforms
            .values()
            .find(|p| p.slug == slug)
            .cloned()
            .ok_or(not_found("Plateforme", "slug"))
    }

    async fn list_platforms(
        &self,
        order: Option<CatalogOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PlatformData>> {
        let state = self.state.lock();
        let mut platforms: Vec<_> = state.platforms.values().cloned().collect();

        match order {
            Some(order) => platforms.sort_by(|a, b| {
                let ordering = match order.key {
                    CatalogSortKey::Name => a.name.cmp(&b.name),
                    CatalogSortKey::Slug => a.slug.cmp(&b.slug),
                    CatalogSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                };

                directed(ordering, order.direction).then(a.id.cmp(&b.id))
            }),
            None => platforms.sort_by_key(|p| p.id),
        }

        Ok(page(platforms, offset, limit))
    }

    async fn count_platforms(&self) -> Result<i64> {
        Ok(self.state.lock().platforms.len() as i64)
    }

    async fn create_platform(&self, new_platform: NewCatalogEntry) -> Result<PlatformData> {
        let mut state = self.state.lock();

        if state.platforms.values().any(|p| p.name == new_platform.name) {
            return Err(DatabaseError::Conflict {
                resource: "Plateforme",
                field: "name",
                value: new_platform.name,
            });
        }

        if state.platforms.values().any(|p| p.slug == new_platform.slug) {
            return Err(DatabaseError::Conflict {
                resource: "Plateforme",
                field: "slug",
                value: new_platform.slug,
            });
        }

        let id = state.next_id();
        let now = Utc::now();

        let platform = PlatformData {
            id,
            name: new_platform.name,
            slug: new_platform.slug,
            created_at: now,
            updated_at: now,
        };

        state.platforms.insert(id, platform.clone());

        Ok(platform)
    }

    async fn update_platform(
        &self,
        updated_platform: UpdatedCatalogEntry,
    ) -> Result<PlatformData> {
        let mut state = self.state.lock();

        let platform = state
            .platforms
            .get_mut(&updated_platform.id)
            .ok_or(not_found("Plateforme", "id"))?;

        if let Some(name) = updated_platform.name {
            platform.name = name;
        }
        if let Some(slug) = updated_platform.slug {
            platform.slug = slug;
        }

        platform.updated_at = Utc::now();

        Ok(platform.clone())
    }

    async fn delete_platform(&self, platform_id: PrimaryKey) -> Result<()> {
        self.state
            .lock()
            .platforms
            .remove(&platform_id)
            .map(|_| ())
            .ok_or(not_found("Plateforme", "id"))
    }

    async fn count_games_with_platform(&self, platform_id: PrimaryKey) -> Result<i64> {
        Ok(self
            .state
            .lock()
            .games
            .values()
            .filter(|g| g.platform_id == platform_id)
            .count() as i64)
    }

    async fn game_by_id(&self, game_id: PrimaryKey) -> Result<GameData> {
        self.state.lock().game_data(game_id)
    }

    async fn game_by_title(&self, title: &str) -> Result<GameData> {
        let state = self.state.lock();

        let id = state
            .games
            .values()
            .find(|g| g.title == title)
            .map(|g| g.id)
            .ok_or(not_found("Jeu", "title"))?;

        state.game_data(id)
    }

    async fn game_by_slug(&self, slug: &str) -> Result<GameData> {
        let state = self.state.lock();

        let id = state
            .games
            .values()
            .find(|g| g.slug == slug)
            .map(|g| g.id)
            .ok_or(not_found("Jeu", "slug"))?;

        state.game_data(id)
    }

    async fn list_games(
        &self,
        order: Option<GameOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<GameData>> {
        let state = self.state.lock();

        let mut games: Vec<_> = state
            .games
            .keys()
            .map(|id| state.game_data(*id))
            .collect::<Result<_>>()?;

        match order {
            Some(order) => games.sort_by(|a, b| {
                let ordering = match order.key {
                    GameSortKey::Title => a.title.cmp(&b.title),
                    GameSortKey::Slug => a.slug.cmp(&b.slug),
                    GameSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                };

                directed(ordering, order.direction).then(a.id.cmp(&b.id))
            }),
            None => games.sort_by_key(|g| g.id),
        }

        Ok(page(games, offset, limit))
    }

    async fn count_games(&self) -> Result<i64> {
        Ok(self.state.lock().games.len() as i64)
    }

    async fn create_game(&self, new_game: NewGame) -> Result<GameData> {
        let mut state = self.state.lock();

        if state.games.values().any(|g| g.title == new_game.title) {
            return Err(DatabaseError::Conflict {
                resource: "Jeu",
                field: "title",
                value: new_game.title,
            });
        }

        if state.games.values().any(|g| g.slug == new_game.slug) {
            return Err(DatabaseError::Conflict {
                resource: "Jeu",
                field: "slug",
                value: new_game.slug,
            });
        }

        let id = state.next_id();
        let now = Utc::now();

        state.games.insert(
            id,
            GameRecord {
                id,
                title: new_game.title,
                slug: new_game.slug,
                genre_id: new_game.genre_id,
                platform_id: new_game.platform_id,
                session_ids: vec![],
                created_at: now,
                updated_at: now,
            },
        );

        state.game_data(id)
    }

    async fn update_game(&self, updated_game: UpdatedGame) -> Result<GameData> {
        let mut state = self.state.lock();

        let record = state
            .games
            .get_mut(&updated_game.id)
            .ok_or(not_found("Jeu", "id"))?;

        if let Some(title) = updated_game.title {
            record.title = title;
        }
        if let Some(slug) = updated_game.slug {
            record.slug = slug;
        }
        if let Some(genre_id) = updated_game.genre_id {
            record.genre_id = genre_id;
        }
        if let Some(platform_id) = updated_game.platform_id {
            record.platform_id = platform_id;
        }

        record.updated_at = Utc::now();

        state.game_data(updated_game.id)
    }

    async fn delete_game(&self, game_id: PrimaryKey) -> Result<()> {
        self.state
            .lock()
            .games
            .remove(&game_id)
            .map(|_| ())
            .ok_or(not_found("Jeu", "id"))
    }

    async fn session_by_id(&self, session_id: PrimaryKey) -> Result<SessionData> {
        self.state.lock().session_data(session_id)
    }

    async fn active_session_for_player(
        &self,
        player_id: PrimaryKey,
        exclude: Option<PrimaryKey>,
    ) -> Result<Option<PrimaryKey>> {
        Ok(self.state.lock().other_active_session(player_id, exclude))
    }

    async fn list_sessions(
        &self,
        order: SessionOrder,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<SessionData>> {
        let state = self.state.lock();

        let mut sessions: Vec<_> = state
            .sessions
            .keys()
            .map(|id| state.session_data(*id))
            .collect::<Result<_>>()?;

        sessions.sort_by(|a, b| {
            let ordering = match order.key {
                SessionSortKey::Score => a.score.cmp(&b.score),
                SessionSortKey::Active => a.active.cmp(&b.active),
                SessionSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                SessionSortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SessionSortKey::PlayerUsername => a.player.username.cmp(&b.player.username),
                SessionSortKey::PlayerEmail => a.player.email.cmp(&b.player.email),
                SessionSortKey::PlayerTotalScore => a.player.total_score.cmp(&b.player.total_score),
                SessionSortKey::GameTitle => a.game.title.cmp(&b.game.title),
                SessionSortKey::GameSlug => a.game.slug.cmp(&b.game.slug),
            };

            directed(ordering, order.direction).then(a.id.cmp(&b.id))
        });

        Ok(page(sessions, offset, limit))
    }

    async fn count_sessions(&self) -> Result<i64> {
        Ok(self.state.lock().sessions.len() as i64)
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let mut state = self.state.lock();

        // Same backstop as the partial unique index on the postgres side
        if new_session.active
            && state
                .other_active_session(new_session.player_id, None)
                .is_some()
        {
            return Err(DatabaseError::Conflict {
                resource: "Session",
                field: "active",
                value: new_session.player_id.to_string(),
            });
        }

        let id = state.next_id();
        let now = Utc::now();

        state.sessions.insert(
            id,
            SessionRecord {
                id,
                player_id: new_session.player_id,
                game_id: new_session.game_id,
                score: new_session.score,
                active: new_session.active,
                created_at: now,
                updated_at: now,
            },
        );

        state.session_data(id)
    }

    async fn update_session(&self, updated_session: UpdatedSession) -> Result<SessionData> {
        let mut state = self.state.lock();

        let record = state
            .sessions
            .get(&updated_session.id)
            .cloned()
            .ok_or(not_found("Session", "id"))?;

        let player_id = updated_session.player_id.unwrap_or(record.player_id);
        let active = updated_session.active.unwrap_or(record.active);

        if active
            && state
                .other_active_session(player_id, Some(updated_session.id))
                .is_some()
        {
            return Err(DatabaseError::Conflict {
                resource: "Session",
                field: "active",
                value: player_id.to_string(),
            });
        }

        let record = state
            .sessions
            .get_mut(&updated_session.id)
            .ok_or(not_found("Session", "id"))?;

        record.player_id = player_id;
        record.active = active;

        if let Some(game_id) = updated_session.game_id {
            record.game_id = game_id;
        }
        if let Some(score) = updated_session.score {
            record.score = score;
        }

        record.updated_at = Utc::now();

        state.session_data(updated_session.id)
    }

    async fn delete_session(&self, session_id: PrimaryKey) -> Result<()> {
        self.state
            .lock()
            .sessions
            .remove(&session_id)
            .map(|_| ())
            .ok_or(not_found("Session", "id"))
    }

    async fn adjust_player_score(&self, player_id: PrimaryKey, delta: i64) -> Result<()> {
        let mut state = self.state.lock();

        let record = state
            .players
            .get_mut(&player_id)
            .ok_or(not_found("Player", "id"))?;

        record.total_score += delta;
        record.updated_at = Utc::now();

        Ok(())
    }

    async fn add_session_to_player(
        &self,
        player_id: PrimaryKey,
        session_id: PrimaryKey,
    ) -> Result<()> {
        let mut state = self.state.lock();

        let record = state
            .players
            .get_mut(&player_id)
            .ok_or(not_found("Player", "id"))?;

        if !record.session_ids.contains(&session_id) {
            record.session_ids.push(session_id);
        }

        record.updated_at = Utc::now();

        Ok(())
    }

    async fn remove_session_from_player(
        &self,
        player_id: PrimaryKey,
        session_id: PrimaryKey,
    ) -> Result<()> {
        let mut state = self.state.lock();

        let record = state
            .players
            .get_mut(&player_id)
            .ok_or(not_found("Player", "id"))?;

        record.session_ids.retain(|id| *id != session_id);
        record.updated_at = Utc::now();

        Ok(())
    }

    async fn add_session_to_game(
        &self,
        game_id: PrimaryKey,
        session_id: PrimaryKey,
    ) -> Result<()> {
        let mut state = self.state.lock();

        let record = state.games.get_mut(&game_id).ok_or(not_found("Jeu", "id"))?;

        if !record.session_ids.contains(&session_id) {
            record.session_ids.push(session_id);
        }

        record.updated_at = Utc::now();

        Ok(())
    }

    async fn remove_session_from_game(
        &self,
        game_id: PrimaryKey,
        session_id: PrimaryKey,
    ) -> Result<()> {
        let mut state = self.state.lock();

        let record = state.games.get_mut(&game_id).ok_or(not_found("Jeu", "id"))?;

        record.session_ids.retain(|id| *id != session_id);
        record.updated_at = Utc::now();

        Ok(())
    }
}

use std::sync::Arc;

use thiserror::Error;

use crate::{Database, DatabaseError, GameData, GameOrder, NewGame, PrimaryKey, UpdatedGame};

/// Manages the game catalog. Referenced genres and platforms must exist;
/// session back-references on games are owned by the session engine.
pub struct GameManager<Db> {
    db: Arc<Db>,
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("Jeu introuvable")]
    NotFound,
    #[error("Le champ title, slug, genre et platform est requis")]
    MissingFields,
    #[error("Genre avec l'ID spécifié introuvable")]
    GenreNotFound,
    #[error("Plateforme avec l'ID spécifié introuvable")]
    PlatformNotFound,
    #[error("Le champ title, slug, genre ou platform est requis")]
    NoFieldsToUpdate,
    #[error("Impossible de supprimer un jeu ayant des sessions associées")]
    HasSessions,
    #[error("Champ de tri invalide: {0}")]
    InvalidSort(String),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
}

#[derive(Debug, Default)]
pub struct NewGameRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub genre: Option<PrimaryKey>,
    pub platform: Option<PrimaryKey>,
}

#[derive(Debug, Default)]
pub struct GameChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub genre: Option<PrimaryKey>,
    pub platform: Option<PrimaryKey>,
}

impl GameChanges {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.slug.is_none()
            && self.genre.is_none()
            && self.platform.is_none()
    }
}

/// One page of a game listing
#[derive(Debug)]
pub struct GamePage {
    pub games: Vec<GameData>,
    pub total: i64,
}

fn game_missing(e: DatabaseError) -> GameError {
    if e.is_not_found() {
        GameError::NotFound
    } else {
        GameError::Db(e)
    }
}

fn genre_missing(e: DatabaseError) -> GameError {
    if e.is_not_found() {
        GameError::GenreNotFound
    } else {
        GameError::Db(e)
    }
}

fn platform_missing(e: DatabaseError) -> GameError {
    if e.is_not_found() {
        GameError::PlatformNotFound
    } else {
        GameError::Db(e)
    }
}

impl<Db> GameManager<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(&self, new_game: NewGameRequest) -> Result<GameData, GameError> {
        let (title, slug, genre_id, platform_id) = match (
            new_game.title,
            new_game.slug,
            new_game.genre,
            new_game.platform,
        ) {
            (Some(title), Some(slug), Some(genre), Some(platform)) => {
                (title, slug, genre, platform)
            }
            _ => return Err(GameError::MissingFields),
        };

        let genre = self.db.genre_by_id(genre_id).await.map_err(genre_missing)?;
        let platform = self
            .db
            .platform_by_id(platform_id)
            .await
            .map_err(platform_missing)?;

        self.db
            .create_game(NewGame {
                title,
                slug,
                genre_id: genre.id,
                platform_id: platform.id,
            })
            .await
            .map_err(GameError::Db)
    }

    pub async fn get_by_id(&self, game_id: PrimaryKey) -> Result<GameData, GameError> {
        self.db.game_by_id(game_id).await.map_err(game_missing)
    }

    pub async fn list(
        &self,
        sort: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<GamePage, GameError> {
        let order = sort
            .map(|raw| GameOrder::parse(raw).ok_or_else(|| GameError::InvalidSort(raw.to_string())))
            .transpose()?;

        let total = self.db.count_games().await.map_err(GameError::Db)?;

        let offset = ((page - 1) * limit).max(0);
        let games = self
            .db
            .list_games(order, offset, limit.max(0))
            .await
            .map_err(GameError::Db)?;

        Ok(GamePage { games, total })
    }

    pub async fn update(
        &self,
        game_id: PrimaryKey,
        changes: GameChanges,
    ) -> Result<GameData, GameError> {
        let _ = self.db.game_by_id(game_id).await.map_err(game_missing)?;

        if changes.is_empty() {
            return Err(GameError::NoFieldsToUpdate);
        }

        if let Some(genre_id) = changes.genre {
            let _ = self.db.genre_by_id(genre_id).await.map_err(genre_missing)?;
        }

        if let Some(platform_id) = changes.platform {
            let _ = self
                .db
                .platform_by_id(platform_id)
                .await
                .map_err(platform_missing)?;
        }

        self.db
            .update_game(UpdatedGame {
                id: game_id,
                title: changes.title,
                slug: changes.slug,
                genre_id: changes.genre,
                platform_id: changes.platform,
            })
            .await
            .map_err(GameError::Db)
    }

    /// Deletes a game. Refused while sessions still reference it, since
    /// removing them is the session engine's job.
    pub async fn delete(&self, game_id: PrimaryKey) -> Result<(), GameError> {
        let game = self.db.game_by_id(game_id).await.map_err(game_missing)?;

        if !game.session_ids.is_empty() {
            return Err(GameError::HasSessions);
        }

        self.db.delete_game(game_id).await.map_err(game_missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryDatabase, NewCatalogEntry};

    fn manager() -> (Arc<MemoryDatabase>, GameManager<MemoryDatabase>) {
        let db = Arc::new(MemoryDatabase::new());
        let manager = GameManager::new(&db);

        (db, manager)
    }

    async fn make_refs(db: &MemoryDatabase) -> (PrimaryKey, PrimaryKey) {
        let genre = db
            .create_genre(NewCatalogEntry {
                name: "Action".to_string(),
                slug: "action".to_string(),
            })
            .await
            .expect("genre is created");

        let platform = db
            .create_platform(NewCatalogEntry {
                name: "Switch".to_string(),
                slug: "switch".to_string(),
            })
            .await
            .expect("platform is created");

        (genre.id, platform.id)
    }

    #[tokio::test]
    async fn create_resolves_genre_and_platform() {
        let (db, manager) = manager();
        let (genre_id, platform_id) = make_refs(&db).await;

        let game = manager
            .create(NewGameRequest {
                title: Some("Smash Bros Ultimate".to_string()),
                slug: Some("smash-bros-ultimate".to_string()),
                genre: Some(genre_id),
                platform: Some(platform_id),
            })
            .await
            .expect("game is created");

        assert_eq!(game.genre.name, "Action");
        assert_eq!(game.platform.name, "Switch");
    }

    #[tokio::test]
    async fn create_requires_every_field() {
        let (db, manager) = manager();
        let (genre_id, _) = make_refs(&db).await;

        let result = manager
            .create(NewGameRequest {
                title: Some("Incomplete".to_string()),
                genre: Some(genre_id),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(GameError::MissingFields)));
    }

    #[tokio::test]
    async fn create_rejects_unknown_genre() {
        let (db, manager) = manager();
        let (_, platform_id) = make_refs(&db).await;

        let result = manager
            .create(NewGameRequest {
                title: Some("Orphan".to_string()),
                slug: Some("orphan".to_string()),
                genre: Some(999),
                platform: Some(platform_id),
            })
            .await;

        assert!(matches!(result, Err(GameError::GenreNotFound)));
    }

    #[tokio::test]
    async fn update_requires_at_least_one_field() {
        let (db, manager) = manager();
        let (genre_id, platform_id) = make_refs(&db).await;

        let game = manager
            .create(NewGameRequest {
                title: Some("Still".to_string()),
                slug: Some("still".to_string()),
                genre: Some(genre_id),
                platform: Some(platform_id),
            })
            .await
            .expect("game is created");

        let result = manager.update(game.id, GameChanges::default()).await;

        assert!(matches!(result, Err(GameError::NoFieldsToUpdate)));
    }

    #[tokio::test]
    async fn delete_is_refused_while_sessions_exist() {
        let (db, manager) = manager();
        let (genre_id, platform_id) = make_refs(&db).await;

        let game = manager
            .create(NewGameRequest {
                title: Some("Sticky".to_string()),
                slug: Some("sticky".to_string()),
                genre: Some(genre_id),
                platform: Some(platform_id),
            })
            .await
            .expect("game is created");

        db.add_session_to_game(game.id, 42).await.expect("reference added");

        let result = manager.delete(game.id).await;

        assert!(matches!(result, Err(GameError::HasSessions)));
    }
}

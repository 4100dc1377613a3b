use std::sync::Arc;

use argon2::{password_hash::SaltString, Argon2, PasswordHasher};
use rand::rngs::OsRng;
use thiserror::Error;

use crate::{Database, DatabaseError, PlayerData, PlayerOrder, PrimaryKey, UpdatedPlayer, UserRole};

/// Manages player accounts. Scores and back-references on players are owned
/// by the session engine and are not editable from here.
pub struct PlayerManager<Db> {
    db: Arc<Db>,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Player introuvable")]
    NotFound,
    #[error("Email déjà utilisé")]
    EmailTaken,
    #[error("Username déjà utilisé")]
    UsernameTaken,
    #[error("Impossible de supprimer un joueur ayant des sessions associées")]
    HasSessions,
    #[error("Champ de tri invalide: {0}")]
    InvalidSort(String),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

/// Changes applied to a player. Only these fields are writable from the
/// outside; anything else on the record is derived.
#[derive(Debug, Default)]
pub struct PlayerChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

/// One page of a player listing
#[derive(Debug)]
pub struct PlayerPage {
    pub players: Vec<PlayerData>,
    pub total: i64,
}

fn player_missing(e: DatabaseError) -> PlayerError {
    if e.is_not_found() {
        PlayerError::NotFound
    } else {
        PlayerError::Db(e)
    }
}

impl<Db> PlayerManager<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self {
            db: db.clone(),
            argon: Argon2::default(),
        }
    }

    pub async fn list(
        &self,
        sort: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<PlayerPage, PlayerError> {
        let order = sort
            .map(|raw| {
                PlayerOrder::parse(raw).ok_or_else(|| PlayerError::InvalidSort(raw.to_string()))
            })
            .transpose()?;

        let total = self.db.count_players().await.map_err(PlayerError::Db)?;

        let offset = ((page - 1) * limit).max(0);
        let players = self
            .db
            .list_players(order, offset, limit.max(0))
            .await
            .map_err(PlayerError::Db)?;

        Ok(PlayerPage { players, total })
    }

    pub async fn get_by_id(&self, player_id: PrimaryKey) -> Result<PlayerData, PlayerError> {
        self.db.player_by_id(player_id).await.map_err(player_missing)
    }

    pub async fn update(
        &self,
        player_id: PrimaryKey,
        changes: PlayerChanges,
    ) -> Result<PlayerData, PlayerError> {
        let _ = self.db.player_by_id(player_id).await.map_err(player_missing)?;

        if let Some(email) = &changes.email {
            match self.db.player_by_email(email).await {
                Ok(existing) if existing.id != player_id => return Err(PlayerError::EmailTaken),
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(PlayerError::Db(e)),
            }
        }

        if let Some(username) = &changes.username {
            match self.db.player_by_username(username).await {
                Ok(existing) if existing.id != player_id => {
                    return Err(PlayerError::UsernameTaken)
                }
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(PlayerError::Db(e)),
            }
        }

        let password = changes
            .password
            .map(|plain| {
                let salt = SaltString::generate(&mut OsRng);

                self.argon
                    .hash_password(plain.as_bytes(), &salt)
                    .map(|hash| hash.to_string())
                    .map_err(|e| PlayerError::HashError(e.to_string()))
            })
            .transpose()?;

        self.db
            .update_player(UpdatedPlayer {
                id: player_id,
                email: changes.email,
                username: changes.username,
                password,
                role: changes.role,
            })
            .await
            .map_err(PlayerError::Db)
    }

    /// Deletes a player. Refused while sessions still reference the account,
    /// since removing them is the session engine's job.
    pub async fn delete(&self, player_id: PrimaryKey) -> Result<(), PlayerError> {
        let player = self.db.player_by_id(player_id).await.map_err(player_missing)?;

        if !player.session_ids.is_empty() {
            return Err(PlayerError::HasSessions);
        }

        self.db.delete_player(player_id).await.map_err(player_missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryDatabase, NewPlayer};

    fn manager() -> (Arc<MemoryDatabase>, PlayerManager<MemoryDatabase>) {
        let db = Arc::new(MemoryDatabase::new());
        let manager = PlayerManager::new(&db);

        (db, manager)
    }

    async fn make_player(db: &MemoryDatabase, username: &str) -> PlayerData {
        db.create_player(NewPlayer {
            email: format!("{username}@test.com"),
            username: username.to_string(),
            password: "hash".to_string(),
            role: UserRole::Player,
        })
        .await
        .expect("player is created")
    }

    #[tokio::test]
    async fn update_rejects_taken_email() {
        let (db, manager) = manager();

        make_player(&db, "first").await;
        let second = make_player(&db, "second").await;

        let result = manager
            .update(
                second.id,
                PlayerChanges {
                    email: Some("first@test.com".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(PlayerError::EmailTaken)));
    }

    #[tokio::test]
    async fn update_accepts_own_email() {
        let (db, manager) = manager();

        let player = make_player(&db, "self").await;

        let updated = manager
            .update(
                player.id,
                PlayerChanges {
                    email: Some("self@test.com".to_string()),
                    username: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update succeeds");

        assert_eq!(updated.username, "renamed");
    }

    #[tokio::test]
    async fn list_sorts_by_descending_total_score() {
        let (db, manager) = manager();

        let low = make_player(&db, "low").await;
        let high = make_player(&db, "high").await;

        db.adjust_player_score(low.id, 10).await.expect("score adjusted");
        db.adjust_player_score(high.id, 90).await.expect("score adjusted");

        let page = manager
            .list(Some("-totalScore"), 1, 5)
            .await
            .expect("listing succeeds");

        let names: Vec<_> = page.players.iter().map(|p| p.username.as_str()).collect();

        assert_eq!(names, vec!["high", "low"]);
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn delete_is_refused_while_sessions_exist() {
        let (db, manager) = manager();

        let player = make_player(&db, "busy").await;
        db.add_session_to_player(player.id, 42).await.expect("reference added");

        let result = manager.delete(player.id).await;

        assert!(matches!(result, Err(PlayerError::HasSessions)));
    }
}

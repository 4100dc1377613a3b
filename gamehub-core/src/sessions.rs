use std::sync::Arc;

use log::warn;
use thiserror::Error;

use crate::{
    Database, DatabaseError, NewSession, PrimaryKey, SessionData, SessionOrder, UpdatedSession,
};

/// Drives the session lifecycle: creation under the one-active-session-per-
/// player invariant, one-shot score settlement into the owning player's
/// total, back-reference upkeep on both player and game, and the sorted,
/// paginated listing.
pub struct SessionEngine<Db> {
    db: Arc<Db>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Le champ player et game est requis")]
    MissingFields,
    #[error("Session introuvable")]
    NotFound,
    #[error("Joueur avec l'ID spécifié introuvable")]
    PlayerNotFound,
    #[error("Jeu avec l'ID spécifié introuvable")]
    GameNotFound,
    #[error("Le joueur est déjà dans une session active")]
    PlayerAlreadyActive,
    #[error("Le champ player, game, score ou active est requis")]
    NoFieldsToUpdate,
    #[error("Champ de tri invalide: {0}")]
    InvalidSort(String),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
}

/// Payload of a session creation. The ids are optional so that their absence
/// is reported by the engine, with the same message for both.
#[derive(Debug, Default)]
pub struct NewSessionRequest {
    pub player: Option<PrimaryKey>,
    pub game: Option<PrimaryKey>,
    pub score: Option<i64>,
    pub active: Option<bool>,
}

/// Changes applied to an existing session. Presence is expressed with
/// `Option`, so explicit `score: 0` or `active: false` are applied instead of
/// being mistaken for "not supplied".
#[derive(Debug, Default)]
pub struct SessionChanges {
    pub player: Option<PrimaryKey>,
    pub game: Option<PrimaryKey>,
    pub score: Option<i64>,
    pub active: Option<bool>,
}

impl SessionChanges {
    fn is_empty(&self) -> bool {
        self.player.is_none()
            && self.game.is_none()
            && self.score.is_none()
            && self.active.is_none()
    }
}

/// One page of a session listing
#[derive(Debug)]
pub struct SessionPage {
    pub sessions: Vec<SessionData>,
    /// Count of all sessions, not just this page
    pub total: i64,
}

fn player_missing(e: DatabaseError) -> SessionError {
    if e.is_not_found() {
        SessionError::PlayerNotFound
    } else {
        SessionError::Db(e)
    }
}

fn game_missing(e: DatabaseError) -> SessionError {
    if e.is_not_found() {
        SessionError::GameNotFound
    } else {
        SessionError::Db(e)
    }
}

fn session_missing(e: DatabaseError) -> SessionError {
    if e.is_not_found() {
        SessionError::NotFound
    } else {
        SessionError::Db(e)
    }
}

fn active_conflict(e: DatabaseError) -> SessionError {
    if e.is_conflict() {
        SessionError::PlayerAlreadyActive
    } else {
        SessionError::Db(e)
    }
}

impl<Db> SessionEngine<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Creates a session for a player on a game.
    ///
    /// The player must not own another active session. The score supplied at
    /// creation (default 0) is settled into the player's total immediately,
    /// and this is the only time it ever is: later edits of the session do
    /// not reach the total until the session is deleted.
    pub async fn create(&self, new_session: NewSessionRequest) -> Result<SessionData, SessionError> {
        let (player_id, game_id) = match (new_session.player, new_session.game) {
            (Some(player), Some(game)) => (player, game),
            _ => return Err(SessionError::MissingFields),
        };

        let player = self.db.player_by_id(player_id).await.map_err(player_missing)?;

        if self
            .db
            .active_session_for_player(player.id, None)
            .await
            .map_err(SessionError::Db)?
            .is_some()
        {
            return Err(SessionError::PlayerAlreadyActive);
        }

        let game = self.db.game_by_id(game_id).await.map_err(game_missing)?;

        let session = self
            .db
            .create_session(NewSession {
                player_id: player.id,
                game_id: game.id,
                score: new_session.score.unwrap_or(0),
                active: new_session.active.unwrap_or(true),
            })
            .await
            .map_err(active_conflict)?;

        if let Err(e) = self.settle_creation(&session).await {
            // Compensate, so a failed settlement doesn't leave a session
            // behind whose score never reached the player
            if let Err(cleanup) = self.db.delete_session(session.id).await {
                warn!(
                    "session {} could not be removed after a settlement failure: {cleanup}",
                    session.id
                );
            }

            return Err(e);
        }

        self.db.session_by_id(session.id).await.map_err(SessionError::Db)
    }

    async fn settle_creation(&self, session: &SessionData) -> Result<(), SessionError> {
        if session.score != 0 {
            self.db
                .adjust_player_score(session.player.id, session.score)
                .await
                .map_err(SessionError::Db)?;
        }

        self.db
            .add_session_to_player(session.player.id, session.id)
            .await
            .map_err(SessionError::Db)?;

        self.db
            .add_session_to_game(session.game.id, session.id)
            .await
            .map_err(SessionError::Db)?;

        Ok(())
    }

    /// Returns a session with its player and game resolved
    pub async fn get_by_id(&self, session_id: PrimaryKey) -> Result<SessionData, SessionError> {
        self.db.session_by_id(session_id).await.map_err(session_missing)
    }

    /// Applies the supplied changes to a session.
    ///
    /// A reassigned player must exist and must not own another active session
    /// besides this one. Scores and the active flag are written verbatim and
    /// never re-settled; the back-reference sets follow the session to its
    /// new owners.
    pub async fn update(
        &self,
        session_id: PrimaryKey,
        changes: SessionChanges,
    ) -> Result<SessionData, SessionError> {
        let session = self.db.session_by_id(session_id).await.map_err(session_missing)?;

        if changes.is_empty() {
            return Err(SessionError::NoFieldsToUpdate);
        }

        if let Some(player_id) = changes.player {
            let _ = self.db.player_by_id(player_id).await.map_err(player_missing)?;

            if self
                .db
                .active_session_for_player(player_id, Some(session_id))
                .await
                .map_err(SessionError::Db)?
                .is_some()
            {
                return Err(SessionError::PlayerAlreadyActive);
            }
        }

        if let Some(game_id) = changes.game {
            let _ = self.db.game_by_id(game_id).await.map_err(game_missing)?;
        }

        let updated = self
            .db
            .update_session(UpdatedSession {
                id: session_id,
                player_id: changes.player,
                game_id: changes.game,
                score: changes.score,
                active: changes.active,
            })
            .await
            .map_err(active_conflict)?;

        if updated.player.id != session.player.id {
            self.db
                .remove_session_from_player(session.player.id, session_id)
                .await
                .map_err(SessionError::Db)?;
        }

        self.db
            .add_session_to_player(updated.player.id, session_id)
            .await
            .map_err(SessionError::Db)?;

        if updated.game.id != session.game.id {
            self.db
                .remove_session_from_game(session.game.id, session_id)
                .await
                .map_err(SessionError::Db)?;
        }

        self.db
            .add_session_to_game(updated.game.id, session_id)
            .await
            .map_err(SessionError::Db)?;

        self.db.session_by_id(session_id).await.map_err(SessionError::Db)
    }

    /// Deletes a session, reversing its settlement: the score the session
    /// holds at this moment is subtracted from the player's total, and the
    /// session id is pulled from both back-reference sets.
    pub async fn delete(&self, session_id: PrimaryKey) -> Result<(), SessionError> {
        let session = self.db.session_by_id(session_id).await.map_err(session_missing)?;

        self.db.delete_session(session_id).await.map_err(session_missing)?;

        self.db
            .adjust_player_score(session.player.id, -session.score)
            .await
            .map_err(SessionError::Db)?;

        self.db
            .remove_session_from_player(session.player.id, session_id)
            .await
            .map_err(SessionError::Db)?;

        self.db
            .remove_session_from_game(session.game.id, session_id)
            .await
            .map_err(SessionError::Db)?;

        Ok(())
    }

    /// Lists sessions sorted and paginated.
    ///
    /// `sort` accepts a field name with an optional `-` prefix for descending
    /// order, including the nested `player.*` and `game.*` paths; the default
    /// is most recent first. `total` on the returned page counts all sessions.
    pub async fn list(
        &self,
        sort: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<SessionPage, SessionError> {
        let order = match sort {
            Some(raw) => SessionOrder::parse(raw)
                .ok_or_else(|| SessionError::InvalidSort(raw.to_string()))?,
            None => SessionOrder::most_recent_first(),
        };

        let total = self.db.count_sessions().await.map_err(SessionError::Db)?;

        let offset = ((page - 1) * limit).max(0);
        let sessions = self
            .db
            .list_sessions(order, offset, limit.max(0))
            .await
            .map_err(SessionError::Db)?;

        Ok(SessionPage { sessions, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GameData, MemoryDatabase, NewCatalogEntry, NewGame, NewPlayer, PlayerData, UserRole};
    use chrono::Duration;

    fn engine() -> (Arc<MemoryDatabase>, SessionEngine<MemoryDatabase>) {
        let db = Arc::new(MemoryDatabase::new());
        let engine = SessionEngine::new(&db);

        (db, engine)
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

    async fn make_game(db: &MemoryDatabase, slug: &str) -> GameData {
        let genre = db
            .create_genre(NewCatalogEntry {
                name: format!("genre-{slug}"),
                slug: format!("genre-{slug}"),
            })
            .await
            .expect("genre is created");

        let platform = db
            .create_platform(NewCatalogEntry {
                name: format!("platform-{slug}"),
                slug: format!("platform-{slug}"),
            })
            .await
            .expect("platform is created");

        db.create_game(NewGame {
            title: slug.to_string(),
            slug: slug.to_string(),
            genre_id: genre.id,
            platform_id: platform.id,
        })
        .await
        .expect("game is created")
    }

    fn request(player: PrimaryKey, game: PrimaryKey) -> NewSessionRequest {
        NewSessionRequest {
            player: Some(player),
            game: Some(game),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_populates_player_and_game() {
        let (db, engine) = engine();

        let player = make_player(&db, "player1").await;
        let game = make_game(&db, "test-game").await;

        let session = engine.create(request(player.id, game.id)).await.expect("session is created");

        assert_eq!(session.player.id, player.id);
        assert_eq!(session.game.id, game.id);
        assert_eq!(session.score, 0);
        assert!(session.active);
    }

    #[tokio::test]
    async fn create_requires_player_and_game() {
        let (_, engine) = engine();

        let result = engine.create(NewSessionRequest::default()).await;

        assert!(matches!(result, Err(SessionError::MissingFields)));
    }

    #[tokio::test]
    async fn create_rejects_unknown_player() {
        let (db, engine) = engine();
        let game = make_game(&db, "some-game").await;

        let result = engine.create(request(999, game.id)).await;

        assert!(matches!(result, Err(SessionError::PlayerNotFound)));
    }

    #[tokio::test]
    async fn create_rejects_unknown_game() {
        let (db, engine) = engine();
        let player = make_player(&db, "player2").await;

        let result = engine.create(request(player.id, 999)).await;

        assert!(matches!(result, Err(SessionError::GameNotFound)));
    }

    #[tokio::test]
    async fn create_rejects_second_active_session() {
        let (db, engine) = engine();

        let player = make_player(&db, "player3").await;
        let first = make_game(&db, "game-one").await;
        let second = make_game(&db, "game-two").await;

        engine.create(request(player.id, first.id)).await.expect("first session is created");

        let result = engine.create(request(player.id, second.id)).await;

        assert!(matches!(result, Err(SessionError::PlayerAlreadyActive)));
    }

    #[tokio::test]
    async fn create_settles_supplied_score_into_total() {
        let (db, engine) = engine();

        let player = make_player(&db, "player4").await;
        let game = make_game(&db, "scored-game").await;

        let session = engine
            .create(NewSessionRequest {
                score: Some(300),
                ..request(player.id, game.id)
            })
            .await
            .expect("session is created");

        assert_eq!(session.score, 300);
        assert_eq!(session.player.total_score, 300);
        assert!(session.player.session_ids.contains(&session.id));
        assert!(session.game.session_ids.contains(&session.id));
    }

    #[tokio::test]
    async fn score_edits_never_resettle() {
        let (db, engine) = engine();

        let player = make_player(&db, "player5").await;
        let game = make_game(&db, "quiet-game").await;

        let session = engine.create(request(player.id, game.id)).await.expect("session is created");
        assert_eq!(session.player.total_score, 0);

        let updated = engine
            .update(
                session.id,
                SessionChanges {
                    score: Some(500),
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .expect("session is updated");

        assert_eq!(updated.score, 500);
        assert!(!updated.active);

        // Settlement happened once, at creation, with the score of 0
        let player = db.player_by_id(player.id).await.expect("player exists");
        assert_eq!(player.total_score, 0);
    }

    #[tokio::test]
    async fn update_applies_explicit_zero_and_false() {
        let (db, engine) = engine();

        let player = make_player(&db, "player6").await;
        let game = make_game(&db, "zeroed-game").await;

        let session = engine
            .create(NewSessionRequest {
                score: Some(250),
                ..request(player.id, game.id)
            })
            .await
            .expect("session is created");

        let updated = engine
            .update(
                session.id,
                SessionChanges {
                    score: Some(0),
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .expect("session is updated");

        assert_eq!(updated.score, 0);
        assert!(!updated.active);
    }

    #[tokio::test]
    async fn update_requires_at_least_one_field() {
        let (db, engine) = engine();

        let player = make_player(&db, "player7").await;
        let game = make_game(&db, "idle-game").await;

        let session = engine.create(request(player.id, game.id)).await.expect("session is created");

        let result = engine.update(session.id, SessionChanges::default()).await;

        assert!(matches!(result, Err(SessionError::NoFieldsToUpdate)));
    }

    #[tokio::test]
    async fn update_missing_session_is_not_found() {
        let (_, engine) = engine();

        let result = engine
            .update(
                999,
                SessionChanges {
                    score: Some(10),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn update_rejects_reassignment_to_busy_player() {
        let (db, engine) = engine();

        let first = make_player(&db, "player8").await;
        let second = make_player(&db, "player9").await;
        let game_one = make_game(&db, "busy-one").await;
        let game_two = make_game(&db, "busy-two").await;

        let session = engine.create(request(first.id, game_one.id)).await.expect("session is created");
        engine.create(request(second.id, game_two.id)).await.expect("other session is created");

        let result = engine
            .update(
                session.id,
                SessionChanges {
                    player: Some(second.id),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(SessionError::PlayerAlreadyActive)));
    }

    #[tokio::test]
    async fn update_excludes_itself_from_invariant_check() {
        let (db, engine) = engine();

        let player = make_player(&db, "player10").await;
        let game = make_game(&db, "same-game").await;

        let session = engine.create(request(player.id, game.id)).await.expect("session is created");

        // Re-submitting the same player must not collide with the session itself
        let updated = engine
            .update(
                session.id,
                SessionChanges {
                    player: Some(player.id),
                    ..Default::default()
                },
            )
            .await
            .expect("update is accepted");

        assert_eq!(updated.player.id, player.id);
    }

    #[tokio::test]
    async fn reactivation_is_refused_while_another_session_is_active() {
        let (db, engine) = engine();

        let player = make_player(&db, "player11").await;
        let game_one = make_game(&db, "re-one").await;
        let game_two = make_game(&db, "re-two").await;

        let closed = engine.create(request(player.id, game_one.id)).await.expect("session is created");
        engine
            .update(
                closed.id,
                SessionChanges {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .expect("session is closed");

        engine.create(request(player.id, game_two.id)).await.expect("second session is created");

        // The database-level guard refuses to reactivate the first one
        let result = engine
            .update(
                closed.id,
                SessionChanges {
                    active: Some(true),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(SessionError::PlayerAlreadyActive)));
    }

    #[tokio::test]
    async fn reassignment_moves_back_references() {
        let (db, engine) = engine();

        let first = make_player(&db, "player12").await;
        let second = make_player(&db, "player13").await;
        let game_one = make_game(&db, "move-one").await;
        let game_two = make_game(&db, "move-two").await;

        let session = engine.create(request(first.id, game_one.id)).await.expect("session is created");

        engine
            .update(
                session.id,
                SessionChanges {
                    player: Some(second.id),
                    game: Some(game_two.id),
                    ..Default::default()
                },
            )
            .await
            .expect("session is reassigned");

        let first = db.player_by_id(first.id).await.expect("player exists");
        let second = db.player_by_id(second.id).await.expect("player exists");
        let game_one = db.game_by_id(game_one.id).await.expect("game exists");
        let game_two = db.game_by_id(game_two.id).await.expect("game exists");

        assert!(!first.session_ids.contains(&session.id));
        assert!(second.session_ids.contains(&session.id));
        assert!(!game_one.session_ids.contains(&session.id));
        assert!(game_two.session_ids.contains(&session.id));

        // Reassignment settles nothing
        assert_eq!(first.total_score, 0);
        assert_eq!(second.total_score, 0);
    }

    #[tokio::test]
    async fn delete_subtracts_current_score_and_pulls_references() {
        let (db, engine) = engine();

        let player = make_player(&db, "player14").await;
        let game = make_game(&db, "gone-game").await;

        let session = engine
            .create(NewSessionRequest {
                score: Some(400),
                ..request(player.id, game.id)
            })
            .await
            .expect("session is created");

        // The total holds the creation-time score, even after the edit below
        engine
            .update(
                session.id,
                SessionChanges {
                    score: Some(100),
                    ..Default::default()
                },
            )
            .await
            .expect("session is updated");

        engine.delete(session.id).await.expect("session is deleted");

        let player = db.player_by_id(player.id).await.expect("player exists");
        let game = db.game_by_id(game.id).await.expect("game exists");

        // 400 settled at creation, 100 (the current score) reversed at deletion
        assert_eq!(player.total_score, 300);
        assert!(!player.session_ids.contains(&session.id));
        assert!(!game.session_ids.contains(&session.id));

        let result = engine.get_by_id(session.id).await;
        assert!(matches!(result, Err(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn delete_missing_session_is_not_found() {
        let (_, engine) = engine();

        let result = engine.delete(999).await;

        match result {
            Err(e) => assert_eq!(e.to_string(), "Session introuvable"),
            Ok(_) => panic!("deletion of a missing session must fail"),
        }
    }

    #[tokio::test]
    async fn get_by_id_round_trips_with_resolved_references() {
        let (db, engine) = engine();

        let player = make_player(&db, "player15").await;
        let game = make_game(&db, "round-trip").await;

        let created = engine.create(request(player.id, game.id)).await.expect("session is created");
        let fetched = engine.get_by_id(created.id).await.expect("session is found");

        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.player.username, player.username);
        assert_eq!(fetched.game.title, game.title);
        assert_eq!(fetched.game.genre.id, game.genre.id);
        assert_eq!(fetched.game.platform.id, game.platform.id);
    }

    #[tokio::test]
    async fn list_paginates_descending_scores() {
        let (db, engine) = engine();

        for i in 1..=12 {
            let player = make_player(&db, &format!("lister{i}")).await;
            let game = make_game(&db, &format!("list-game-{i}")).await;

            engine
                .create(NewSessionRequest {
                    score: Some(i * 100),
                    ..request(player.id, game.id)
                })
                .await
                .expect("session is created");
        }

        let page = engine.list(Some("-score"), 2, 5).await.expect("listing succeeds");

        assert_eq!(page.total, 12);

        let scores: Vec<_> = page.sessions.iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![700, 600, 500, 400, 300]);
    }

    #[tokio::test]
    async fn list_defaults_to_most_recent_first() {
        let (db, engine) = engine();

        let mut last = 0;

        for i in 1..=3 {
            let player = make_player(&db, &format!("recent{i}")).await;
            let game = make_game(&db, &format!("recent-game-{i}")).await;

            let session = engine.create(request(player.id, game.id)).await.expect("session is created");
            last = session.id;
        }

        let page = engine.list(None, 1, 5).await.expect("listing succeeds");

        assert_eq!(page.sessions.first().map(|s| s.id), Some(last));
    }

    #[tokio::test]
    async fn list_sorts_on_nested_player_field() {
        let (db, engine) = engine();

        for name in ["carol", "alice", "bob"] {
            let player = make_player(&db, name).await;
            let game = make_game(&db, &format!("nested-{name}")).await;

            engine.create(request(player.id, game.id)).await.expect("session is created");
        }

        let page = engine
            .list(Some("player.username"), 1, 5)
            .await
            .expect("listing succeeds");

        let names: Vec<_> = page
            .sessions
            .iter()
            .map(|s| s.player.username.as_str())
            .collect();

        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[tokio::test]
    async fn list_rejects_unknown_sort_key() {
        let (_, engine) = engine();

        let result = engine.list(Some("power"), 1, 5).await;

        assert!(matches!(result, Err(SessionError::InvalidSort(_))));
    }

    #[tokio::test]
    async fn duration_runs_while_active() {
        let (db, engine) = engine();

        let player = make_player(&db, "runner").await;
        let game = make_game(&db, "running-game").await;

        let session = engine.create(request(player.id, game.id)).await.expect("session is created");

        let later = session.created_at + Duration::seconds(90);
        assert_eq!(session.duration_seconds_at(later), 90);
    }

    #[tokio::test]
    async fn duration_freezes_once_closed() {
        let (db, engine) = engine();

        let player = make_player(&db, "stopper").await;
        let game = make_game(&db, "stopped-game").await;

        let session = engine.create(request(player.id, game.id)).await.expect("session is created");

        let closed = engine
            .update(
                session.id,
                SessionChanges {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .expect("session is closed");

        let frozen = (closed.updated_at - closed.created_at).num_seconds();

        let at_close = closed.duration_seconds_at(closed.updated_at);
        let much_later = closed.duration_seconds_at(closed.updated_at + Duration::hours(2));

        assert_eq!(at_close, frozen);
        assert_eq!(much_later, frozen);
    }
}

use std::sync::Arc;

use crate::{Database, DatabaseError, PlayerData};

/// Aggregates the read-only statistics overview: entity counts and the
/// best-scoring players.
pub struct StatsManager<Db> {
    db: Arc<Db>,
}

#[derive(Debug)]
pub struct StatsData {
    pub total_players: i64,
    pub total_games: i64,
    pub total_genres: i64,
    pub total_platforms: i64,
    pub total_sessions: i64,
    pub top_players: Vec<PlayerData>,
}

impl<Db> StatsManager<Db>
where
    Db: Database,
{
    const TOP_PLAYER_COUNT: i64 = 5;

    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    pub async fn overview(&self) -> Result<StatsData, DatabaseError> {
        let total_players = self.db.count_players().await?;
        let total_games = self.db.count_games().await?;
        let total_genres = self.db.count_genres().await?;
        let total_platforms = self.db.count_platforms().await?;
        let total_sessions = self.db.count_sessions().await?;

        let top_players = self.db.top_players(Self::TOP_PLAYER_COUNT).await?;

        Ok(StatsData {
            total_players,
            total_games,
            total_genres,
            total_platforms,
            total_sessions,
            top_players,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryDatabase, NewPlayer, UserRole};

    #[tokio::test]
    async fn overview_counts_and_ranks_players() {
        let db = Arc::new(MemoryDatabase::new());
        let stats = StatsManager::new(&db);

        for (name, score) in [("one", 10), ("two", 30), ("three", 20)] {
            let player = db
                .create_player(NewPlayer {
                    email: format!("{name}@test.com"),
                    username: name.to_string(),
                    password: "hash".to_string(),
                    role: UserRole::Player,
                })
                .await
                .expect("player is created");

            db.adjust_player_score(player.id, score)
                .await
                .expect("score adjusted");
        }

        let overview = stats.overview().await.expect("overview succeeds");

        assert_eq!(overview.total_players, 3);
        assert_eq!(overview.total_sessions, 0);

        let ranked: Vec<_> = overview
            .top_players
            .iter()
            .map(|p| p.username.as_str())
            .collect();

        assert_eq!(ranked, vec!["two", "three", "one"]);
    }
}

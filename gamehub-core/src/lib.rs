mod auth;
mod catalog;
mod db;
mod games;
mod players;
mod sessions;
mod stats;

use std::sync::Arc;

pub use auth::*;
pub use catalog::*;
pub use db::*;
pub use games::*;
pub use players::*;
pub use sessions::*;
pub use stats::*;

/// The GameHub domain system, facilitating authentication, catalog and player
/// management, and session score accounting over one shared database.
pub struct GameHub<Db> {
    database: Arc<Db>,

    pub auth: Auth<Db>,
    pub players: PlayerManager<Db>,
    pub games: GameManager<Db>,
    pub catalog: CatalogManager<Db>,
    pub sessions: SessionEngine<Db>,
    pub stats: StatsManager<Db>,
}

impl<Db> GameHub<Db>
where
    Db: Database,
{
    /// Creates the system on top of a database. `secret` signs the
    /// authentication tokens.
    pub fn new(database: Db, secret: &str) -> Self {
        let database = Arc::new(database);

        Self {
            auth: Auth::new(&database, secret),
            players: PlayerManager::new(&database),
            games: GameManager::new(&database),
            catalog: CatalogManager::new(&database),
            sessions: SessionEngine::new(&database),
            stats: StatsManager::new(&database),
            database,
        }
    }

    pub fn database(&self) -> &Arc<Db> {
        &self.database
    }
}

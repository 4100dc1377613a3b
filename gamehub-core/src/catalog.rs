use std::sync::Arc;

use thiserror::Error;

use crate::{
    CatalogOrder, Database, DatabaseError, GenreData, NewCatalogEntry, PlatformData, PrimaryKey,
    UpdatedCatalogEntry,
};

/// Manages the two catalog reference tables, genres and platforms. Both have
/// the same shape and the same rules: unique name and slug, and deletion is
/// blocked while any game references the entry.
pub struct CatalogManager<Db> {
    db: Arc<Db>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Genre introuvable")]
    GenreNotFound,
    #[error("Plateforme introuvable")]
    PlatformNotFound,
    #[error("Le champ name et slug est requis")]
    MissingFields,
    #[error("Nom déjà utilisé")]
    NameTaken,
    #[error("Slug déjà utilisé")]
    SlugTaken,
    #[error("Impossible de supprimer un genre ayant des jeux associés")]
    GenreHasGames,
    #[error("Impossible de supprimer une plateforme ayant des jeux associés")]
    PlatformHasGames,
    #[error("Champ de tri invalide: {0}")]
    InvalidSort(String),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
}

#[derive(Debug, Default)]
pub struct NewEntryRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Default)]
pub struct EntryChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
}

/// One page of a genre or platform listing
#[derive(Debug)]
pub struct CatalogPage<T> {
    pub entries: Vec<T>,
    pub total: i64,
}

fn genre_missing(e: DatabaseError) -> CatalogError {
    if e.is_not_found() {
        CatalogError::GenreNotFound
    } else {
        CatalogError::Db(e)
    }
}

fn platform_missing(e: DatabaseError) -> CatalogError {
    if e.is_not_found() {
        CatalogError::PlatformNotFound
    } else {
        CatalogError::Db(e)
    }
}

fn parse_order(sort: Option<&str>) -> Result<Option<CatalogOrder>, CatalogError> {
    sort.map(|raw| {
        CatalogOrder::parse(raw).ok_or_else(|| CatalogError::InvalidSort(raw.to_string()))
    })
    .transpose()
}

impl<Db> CatalogManager<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create_genre(&self, new_entry: NewEntryRequest) -> Result<GenreData, CatalogError> {
        let (name, slug) = match (new_entry.name, new_entry.slug) {
            (Some(name), Some(slug)) => (name, slug),
            _ => return Err(CatalogError::MissingFields),
        };

        self.db
            .create_genre(NewCatalogEntry { name, slug })
            .await
            .map_err(CatalogError::Db)
    }

    pub async fn genre_by_id(&self, genre_id: PrimaryKey) -> Result<GenreData, CatalogError> {
        self.db.genre_by_id(genre_id).await.map_err(genre_missing)
    }

    pub async fn list_genres(
        &self,
        sort: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<CatalogPage<GenreData>, CatalogError> {
        let order = parse_order(sort)?;

        let total = self.db.count_genres().await.map_err(CatalogError::Db)?;

        let offset = ((page - 1) * limit).max(0);
        let entries = self
            .db
            .list_genres(order, offset, limit.max(0))
            .await
            .map_err(CatalogError::Db)?;

        Ok(CatalogPage { entries, total })
    }

    pub async fn update_genre(
        &self,
        genre_id: PrimaryKey,
        changes: EntryChanges,
    ) -> Result<GenreData, CatalogError> {
        let _ = self.db.genre_by_id(genre_id).await.map_err(genre_missing)?;

        if let Some(name) = &changes.name {
            match self.db.genre_by_name(name).await {
                Ok(existing) if existing.id != genre_id => return Err(CatalogError::NameTaken),
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(CatalogError::Db(e)),
            }
        }

        if let Some(slug) = &changes.slug {
            match self.db.genre_by_slug(slug).await {
                Ok(existing) if existing.id != genre_id => return Err(CatalogError::SlugTaken),
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(CatalogError::Db(e)),
            }
        }

        self.db
            .update_genre(UpdatedCatalogEntry {
                id: genre_id,
                name: changes.name,
                slug: changes.slug,
            })
            .await
            .map_err(CatalogError::Db)
    }

    pub async fn delete_genre(&self, genre_id: PrimaryKey) -> Result<(), CatalogError> {
        let _ = self.db.genre_by_id(genre_id).await.map_err(genre_missing)?;

        let referencing_games = self
            .db
            .count_games_with_genre(genre_id)
            .await
            .map_err(CatalogError::Db)?;

        if referencing_games > 0 {
            return Err(CatalogError::GenreHasGames);
        }

        self.db.delete_genre(genre_id).await.map_err(genre_missing)
    }

    pub async fn create_platform(
        &self,
        new_entry: NewEntryRequest,
    ) -> Result<PlatformData, CatalogError> {
        let (name, slug) = match (new_entry.name, new_entry.slug) {
            (Some(name), Some(slug)) => (name, slug),
            _ => return Err(CatalogError::MissingFields),
        };

        self.db
            .create_platform(NewCatalogEntry { name, slug })
            .await
            .map_err(CatalogError::Db)
    }

    pub async fn platform_by_id(
        &self,
        platform_id: PrimaryKey,
    ) -> Result<PlatformData, CatalogError> {
        self.db
            .platform_by_id(platform_id)
            .await
            .map_err(platform_missing)
    }

    pub async fn list_platforms(
        &self,
        sort: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<CatalogPage<PlatformData>, CatalogError> {
        let order = parse_order(sort)?;

        let total = self.db.count_platforms().await.map_err(CatalogError::Db)?;

        let offset = ((page - 1) * limit).max(0);
        let entries = self
            .db
            .list_platforms(order, offset, limit.max(0))
            .await
            .map_err(CatalogError::Db)?;

        Ok(CatalogPage { entries, total })
    }

    pub async fn update_platform(
        &self,
        platform_id: PrimaryKey,
        changes: EntryChanges,
    ) -> Result<PlatformData, CatalogError> {
        let _ = self
            .db
            .platform_by_id(platform_id)
            .await
            .map_err(platform_missing)?;

        if let Some(name) = &changes.name {
            match self.db.platform_by_name(name).await {
                Ok(existing) if existing.id != platform_id => {
                    return Err(CatalogError::NameTaken)
                }
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(CatalogError::Db(e)),
            }
        }

        if let Some(slug) = &changes.slug {
            match self.db.platform_by_slug(slug).await {
                Ok(existing) if existing.id != platform_id => {
                    return Err(CatalogError::SlugTaken)
                }
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(CatalogError::Db(e)),
            }
        }

        self.db
            .update_platform(UpdatedCatalogEntry {
                id: platform_id,
                name: changes.name,
                slug: changes.slug,
            })
            .await
            .map_err(CatalogError::Db)
    }

    pub async fn delete_platform(&self, platform_id: PrimaryKey) -> Result<(), CatalogError> {
        let _ = self
            .db
            .platform_by_id(platform_id)
            .await
            .map_err(platform_missing)?;

        let referencing_games = self
            .db
            .count_games_with_platform(platform_id)
            .await
            .map_err(CatalogError::Db)?;

        if referencing_games > 0 {
            return Err(CatalogError::PlatformHasGames);
        }

        self.db
            .delete_platform(platform_id)
            .await
            .map_err(platform_missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, MemoryDatabase, NewGame};

    fn manager() -> (Arc<MemoryDatabase>, CatalogManager<MemoryDatabase>) {
        let db = Arc::new(MemoryDatabase::new());
        let manager = CatalogManager::new(&db);

        (db, manager)
    }

    fn entry(name: &str, slug: &str) -> NewEntryRequest {
        NewEntryRequest {
            name: Some(name.to_string()),
            slug: Some(slug.to_string()),
        }
    }

    #[tokio::test]
    async fn create_requires_name_and_slug() {
        let (_, manager) = manager();

        let result = manager
            .create_genre(NewEntryRequest {
                name: Some("RPG".to_string()),
                slug: None,
            })
            .await;

        assert!(matches!(result, Err(CatalogError::MissingFields)));
    }

    #[tokio::test]
    async fn genre_deletion_is_blocked_by_referencing_games() {
        let (db, manager) = manager();

        let genre = manager
            .create_genre(entry("Horreur", "horreur"))
            .await
            .expect("genre is created");

        let platform = manager
            .create_platform(entry("PC", "pc"))
            .await
            .expect("platform is created");

        db.create_game(NewGame {
            title: "Dead By Daylight".to_string(),
            slug: "dead-by-daylight".to_string(),
            genre_id: genre.id,
            platform_id: platform.id,
        })
        .await
        .expect("game is created");

        let genre_result = manager.delete_genre(genre.id).await;
        let platform_result = manager.delete_platform(platform.id).await;

        assert!(matches!(genre_result, Err(CatalogError::GenreHasGames)));
        assert!(matches!(
            platform_result,
            Err(CatalogError::PlatformHasGames)
        ));
    }

    #[tokio::test]
    async fn unreferenced_genre_can_be_deleted() {
        let (_, manager) = manager();

        let genre = manager
            .create_genre(entry("Puzzle", "puzzle"))
            .await
            .expect("genre is created");

        manager.delete_genre(genre.id).await.expect("deletion succeeds");

        let result = manager.genre_by_id(genre.id).await;
        assert!(matches!(result, Err(CatalogError::GenreNotFound)));
    }

    #[tokio::test]
    async fn update_rejects_taken_name() {
        let (_, manager) = manager();

        manager
            .create_genre(entry("Course", "course"))
            .await
            .expect("genre is created");

        let other = manager
            .create_genre(entry("Sport", "sport"))
            .await
            .expect("genre is created");

        let result = manager
            .update_genre(
                other.id,
                EntryChanges {
                    name: Some("Course".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(CatalogError::NameTaken)));
    }
}

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::data::{check_rating, CatalogItem, GameStatus};
use crate::backend::{CatalogStore, IdentityProvider};
use crate::error::{AuthError, Error, Result};

/// Database file name inside the data directory
pub const DB_FILE_NAME: &str = "games.db";

/// The Library manages the SQLite catalog database.
/// It stores one document per game, scoped to the user that owns it,
/// plus the integer-keyed table used by the first release of the app.
pub struct Library {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    identity: Arc<dyn IdentityProvider>,
}

/// Row from the first-release `legacy_games` table (auto-increment IDs, no cover)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyGame {
    /// 0 until inserted
    pub id: i64,
    pub title: String,
    pub platform: String,
    pub status: GameStatus,
    pub rating: u8,
    pub notes: String,
}

impl Library {
    /// Open (or create) the catalog database at `db_path`.
    ///
    /// Every catalog query is scoped to `identity`'s current user and fails
    /// with `AuthError::NotSignedIn` when there is none.
    pub fn open(db_path: impl Into<PathBuf>, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        let db_path = db_path.into();

        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::write)?;
        }

        let conn = Connection::open(&db_path).map_err(Error::write)?;
        init_schema(&conn).map_err(Error::write)?;

        tracing::info!(path = %db_path.display(), "📁 Catalog database initialized");

        Ok(Library {
            conn: Mutex::new(conn),
            db_path,
            identity,
        })
    }

    /// Get the path to the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Fetch("catalog connection poisoned".to_string()))
    }

    /// ID of the signed-in user; every catalog query is scoped to it
    fn user(&self) -> Result<String> {
        self.identity
            .current_user_id()
            .ok_or_else(|| AuthError::NotSignedIn.into())
    }

    // ========== First-release table ==========

    /// All legacy rows, newest first
    pub fn legacy_games(&self) -> Result<Vec<LegacyGame>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, title, platform, status, rating, notes
                 FROM legacy_games ORDER BY id DESC",
            )
            .map_err(Error::fetch)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(Error::fetch)?;

        let mut games = Vec::new();
        for row in rows {
            let (id, title, platform, status, rating, notes) = row.map_err(Error::fetch)?;
            games.push(LegacyGame {
                id,
                title,
                platform,
                status: status.parse()?,
                rating: check_rating(rating).map_err(Error::fetch)?,
                notes,
            });
        }

        Ok(games)
    }

    /// Insert a legacy row; an existing ID is replaced. Returns the row ID.
    pub fn insert_legacy(&self, game: &LegacyGame) -> Result<i64> {
        let conn = self.conn()?;
        if game.id == 0 {
            conn.execute(
                "INSERT INTO legacy_games (title, platform, status, rating, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![game.title, game.platform, game.status.name(), game.rating, game.notes],
            )
            .map_err(Error::write)?;
            Ok(conn.last_insert_rowid())
        } else {
            conn.execute(
                "INSERT OR REPLACE INTO legacy_games (id, title, platform, status, rating, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![game.id, game.title, game.platform, game.status.name(), game.rating, game.notes],
            )
            .map_err(Error::write)?;
            Ok(game.id)
        }
    }

    pub fn delete_legacy(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM legacy_games WHERE id = ?1", [id])
            .map_err(Error::write)?;
        Ok(())
    }

    /// Copy every legacy row into the signed-in user's catalog and drop it
    /// from the old table. Rows are removed one by one after their upsert
    /// succeeds, so an interrupted import can simply be run again.
    pub async fn import_legacy(&self) -> Result<usize> {
        let legacy = self.legacy_games()?;
        let mut imported = 0;

        for game in legacy {
            let item = CatalogItem {
                id: None,
                title: game.title,
                platform: game.platform,
                status: game.status,
                rating: game.rating,
                notes: game.notes,
                cover_url: String::new(),
            };
            let id = self.upsert(&item).await?;
            self.delete_legacy(game.id)?;
            tracing::debug!(legacy_id = game.id, id = %id, "Imported legacy game");
            imported += 1;
        }

        if imported > 0 {
            tracing::info!(imported, "📦 Imported games from the old local table");
        }

        Ok(imported)
    }
}

/// Initialize the database schema.
/// Creates all necessary tables and indexes if they don't exist.
pub(crate) fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    // One document per game, keyed per user like a remote collection
    conn.execute(
        "CREATE TABLE IF NOT EXISTS games (
            user_id         TEXT NOT NULL,
            id              TEXT NOT NULL,
            title           TEXT NOT NULL,
            platform        TEXT NOT NULL,
            status          TEXT NOT NULL,
            rating          INTEGER NOT NULL DEFAULT 0,
            notes           TEXT NOT NULL DEFAULT '',
            cover_url       TEXT NOT NULL DEFAULT '',
            updated_at      INTEGER NOT NULL,
            PRIMARY KEY (user_id, id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_games_user_title
         ON games(user_id, title)",
        [],
    )?;

    // First-release table, integer keys, no owner
    conn.execute(
        "CREATE TABLE IF NOT EXISTS legacy_games (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            title           TEXT NOT NULL,
            platform        TEXT NOT NULL,
            status          TEXT NOT NULL,
            rating          INTEGER NOT NULL,
            notes           TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            email           TEXT NOT NULL UNIQUE,
            password_hash   TEXT NOT NULL,
            created_at      INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS password_resets (
            token           TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL,
            requested_at    INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    Ok(())
}

type GameRow = (String, String, String, String, i64, String, String);

fn read_game_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GameRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_item(row: GameRow) -> Result<CatalogItem> {
    let (id, title, platform, status, rating, notes, cover_url) = row;
    Ok(CatalogItem {
        id: Some(id),
        title,
        platform,
        status: status.parse()?,
        rating: check_rating(rating).map_err(Error::fetch)?,
        notes,
        cover_url,
    })
}

#[async_trait]
impl CatalogStore for Library {
    async fn list(&self) -> Result<Vec<CatalogItem>> {
        let user = self.user()?;
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, title, platform, status, rating, notes, cover_url
                 FROM games WHERE user_id = ?1 ORDER BY title, id",
            )
            .map_err(Error::fetch)?;

        let rows = stmt.query_map([&user], read_game_row).map_err(Error::fetch)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(into_item(row.map_err(Error::fetch)?)?);
        }

        Ok(items)
    }

    async fn get(&self, id: &str) -> Result<Option<CatalogItem>> {
        let user = self.user()?;
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, title, platform, status, rating, notes, cover_url
                 FROM games WHERE user_id = ?1 AND id = ?2",
                params![user, id],
                read_game_row,
            )
            .optional()
            .map_err(Error::fetch)?;

        row.map(into_item).transpose()
    }

    async fn upsert(&self, item: &CatalogItem) -> Result<String> {
        let user = self.user()?;
        let id = item
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO games
                (user_id, id, title, platform, status, rating, notes, cover_url, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user,
                id,
                item.title,
                item.platform,
                item.status.name(),
                item.rating,
                item.notes,
                item.cover_url,
                Utc::now().timestamp(),
            ],
        )
        .map_err(Error::write)?;

        tracing::debug!(id = %id, title = %item.title, "Upserted game");
        Ok(id)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let user = self.user()?;
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM games WHERE user_id = ?1 AND id = ?2",
            params![user, id],
        )
        .map_err(Error::write)?;

        tracing::debug!(id, "Deleted game");
        Ok(())
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}

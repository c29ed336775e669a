//! Offline stand-in for the collage server: collage records read from JSON
//! files and a leaderboard kept in SQLite.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::UNIX_EPOCH;

use chrono::Utc;
use include_dir::{include_dir, Dir};
use itertools::Itertools;
use rusqlite::{params, Connection};

use crate::api::{CollageProvider, ScoreSink};
use crate::collage::{CollageRecord, GalleryItem};
use crate::error::ApiError;
use crate::leaderboard::LeaderboardEntry;

static BUNDLED_COLLAGES: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/collages");

/// How many entries a leaderboard response carries, as the server does.
pub const LEADERBOARD_LIMIT: usize = 10;

#[derive(Debug)]
pub struct LeaderboardDb {
    conn: Connection,
}

impl LeaderboardDb {
    pub fn open<P: AsRef<Path>>(path: P) -> rusqlite::Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> rusqlite::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS leaderboard (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collage_id TEXT NOT NULL,
                name TEXT NOT NULL,
                time REAL NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_leaderboard_collage ON leaderboard(collage_id, time)",
            [],
        )?;
        Ok(Self { conn })
    }

    pub fn record(&self, collage_id: &str, name: &str, time: f64) -> rusqlite::Result<()> {
        self.conn.execute(
            "INSERT INTO leaderboard (collage_id, name, time, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![collage_id, name, time, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Fastest entries first; ties keep insertion order.
    pub fn top(&self, collage_id: &str, limit: usize) -> rusqlite::Result<Vec<LeaderboardEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT name, time FROM leaderboard
            WHERE collage_id = ?1
            ORDER BY time ASC, id ASC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![collage_id, limit as i64], |row| {
            Ok(LeaderboardEntry {
                name: row.get(0)?,
                time: row.get(1)?,
            })
        })?;

        let entries = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

/// Serves collages from an optional directory of `<id>.json` files plus the
/// bundled demo collages, and keeps scores locally.
#[derive(Debug)]
pub struct LocalBackend {
    collages_dir: Option<PathBuf>,
    board: Mutex<LeaderboardDb>,
}

impl LocalBackend {
    pub fn new(collages_dir: Option<PathBuf>, board: LeaderboardDb) -> Self {
        Self {
            collages_dir,
            board: Mutex::new(board),
        }
    }

    fn read_record(&self, collage_id: &str) -> Result<CollageRecord, ApiError> {
        // ids double as file names
        if collage_id.is_empty()
            || collage_id.contains(['/', '\\'])
            || collage_id.starts_with('.')
        {
            return Err(ApiError::NotFound(collage_id.to_string()));
        }
        let file_name = format!("{collage_id}.json");

        if let Some(dir) = &self.collages_dir {
            let path = dir.join(&file_name);
            if path.is_file() {
                let bytes = fs::read(&path)?;
                return serde_json::from_slice(&bytes).map_err(|source| ApiError::Malformed {
                    path: path.display().to_string(),
                    source,
                });
            }
        }

        let file = BUNDLED_COLLAGES
            .get_file(&file_name)
            .ok_or_else(|| ApiError::NotFound(collage_id.to_string()))?;
        serde_json::from_slice(file.contents()).map_err(|source| ApiError::Malformed {
            path: file_name,
            source,
        })
    }

    fn board(&self) -> std::sync::MutexGuard<'_, LeaderboardDb> {
        self.board.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn json_stem(path: &Path) -> Option<String> {
    if path.extension()? != "json" {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}

impl CollageProvider for LocalBackend {
    fn fetch(&self, collage_id: &str) -> Result<CollageRecord, ApiError> {
        let mut record = self.read_record(collage_id)?;
        record.leaderboard = self.board().top(collage_id, LEADERBOARD_LIMIT)?;
        Ok(record)
    }

    fn gallery(&self) -> Result<Vec<GalleryItem>, ApiError> {
        let mut items: Vec<GalleryItem> = BUNDLED_COLLAGES
            .files()
            .filter_map(|f| json_stem(f.path()))
            .map(|id| GalleryItem {
                id,
                preview_src: String::new(),
                updated_at: 0.0,
            })
            .collect();

        let entries = self.collages_dir.as_ref().and_then(|dir| match fs::read_dir(dir) {
            Ok(entries) => Some(entries),
            Err(err) => {
                tracing::warn!(dir = %dir.display(), %err, "skipping unreadable collages dir");
                None
            }
        });

        if let Some(entries) = entries {
            for entry in entries {
                let entry = entry?;
                let Some(id) = json_stem(&entry.path()) else {
                    continue;
                };
                let updated_at = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs_f64())
                    .unwrap_or(0.0);
                items.retain(|item| item.id != id);
                items.push(GalleryItem {
                    id,
                    preview_src: entry.path().display().to_string(),
                    updated_at,
                });
            }
        }

        Ok(items
            .into_iter()
            .sorted_by(|a, b| {
                b.updated_at
                    .total_cmp(&a.updated_at)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .collect())
    }
}

impl ScoreSink for LocalBackend {
    fn submit(
        &self,
        collage_id: &str,
        time: f64,
        name: &str,
    ) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let board = self.board();
        board.record(collage_id, name, time)?;
        Ok(board.top(collage_id, LEADERBOARD_LIMIT)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn top_is_ascending_and_limited() {
        let db = LeaderboardDb::in_memory().unwrap();
        for i in 0..15 {
            db.record("c1", &format!("p{i}"), 30.0 - i as f64).unwrap();
        }
        db.record("other", "x", 0.1).unwrap();

        let top = db.top("c1", LEADERBOARD_LIMIT).unwrap();

        assert_eq!(top.len(), LEADERBOARD_LIMIT);
        assert_eq!(top[0], LeaderboardEntry::new("p14", 16.0));
        assert!(top.windows(2).all(|w| w[0].time <= w[1].time));
    }

    #[test]
    fn bundled_demo_is_playable() {
        let backend = LocalBackend::new(None, LeaderboardDb::in_memory().unwrap());
        let record = backend.fetch("demo").unwrap();

        assert!(!record.image_info.is_empty());
        assert_eq!(record.images.iter().filter(|i| i.is_target).count(), 1);
        assert!(record.leaderboard.is_empty());
        assert!(backend.gallery().unwrap().iter().any(|i| i.id == "demo"));
    }

    #[test]
    fn submit_returns_refreshed_board() {
        let backend = LocalBackend::new(None, LeaderboardDb::in_memory().unwrap());
        backend.submit("demo", 8.5, "amy").unwrap();
        let board = backend.submit("demo", 4.0, "bo").unwrap();

        assert_eq!(
            board,
            vec![LeaderboardEntry::new("bo", 4.0), LeaderboardEntry::new("amy", 8.5)]
        );
        assert_eq!(backend.fetch("demo").unwrap().leaderboard, board);
    }

    #[test]
    fn directory_collages_shadow_bundled_ones() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("mine.json"),
            r#"{"image_info":[{"x":0,"y":0,"w":10,"h":10}],"images":[{"img_path":"t.png","is_target":true}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let backend = LocalBackend::new(
            Some(dir.path().to_path_buf()),
            LeaderboardDb::in_memory().unwrap(),
        );

        let gallery = backend.gallery().unwrap();
        assert_eq!(gallery[0].id, "mine");
        assert!(gallery.iter().all(|i| i.id != "notes"));
        assert_eq!(backend.fetch("mine").unwrap().image_info.len(), 1);
    }

    #[test]
    fn missing_collages_dir_keeps_bundled_ones() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::new(
            Some(dir.path().join("nowhere")),
            LeaderboardDb::in_memory().unwrap(),
        );

        let gallery = backend.gallery().unwrap();
        assert!(gallery.iter().any(|i| i.id == "demo"));
        assert!(gallery.iter().any(|i| i.id == "crowd"));
        assert!(backend.fetch("demo").is_ok());
    }

    #[test]
    fn unknown_or_suspicious_ids_are_not_found() {
        let backend = LocalBackend::new(None, LeaderboardDb::in_memory().unwrap());
        assert!(matches!(backend.fetch("nope"), Err(ApiError::NotFound(_))));
        assert!(matches!(backend.fetch("../demo"), Err(ApiError::NotFound(_))));
        assert!(matches!(backend.fetch(""), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn malformed_files_are_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let backend = LocalBackend::new(
            Some(dir.path().to_path_buf()),
            LeaderboardDb::in_memory().unwrap(),
        );
        assert!(matches!(backend.fetch("bad"), Err(ApiError::Malformed { .. })));
    }

    #[test]
    fn scores_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("leaderboard.db");
        LeaderboardDb::open(&path)
            .unwrap()
            .record("c1", "amy", 3.0)
            .unwrap();

        let reopened = LeaderboardDb::open(&path).unwrap();
        assert_eq!(
            reopened.top("c1", 10).unwrap(),
            vec![LeaderboardEntry::new("amy", 3.0)]
        );
    }
}

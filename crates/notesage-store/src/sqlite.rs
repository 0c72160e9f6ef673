//! SQLite-backed document store for notes, attachments, users and sessions.
//!
//! All access goes through one connection guarded by a mutex, so every
//! method (and every transaction inside one) is serialized.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::schema::{NOTES_SQL, USERS_SQL};
use crate::types::*;
use notesage_core::{Error, Result};

/// SQLite store holding every user's notes.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open or create the SQLite store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be `db_dir/notesage.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("notesage.db");

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        info!(
            "SqliteStore initialized: {} notes, {} attachments, path={}",
            store.count("notes")?,
            store.count("attachments")?,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(db_err)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(db_err)?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        let full_schema = format!("{}\n{}", USERS_SQL, NOTES_SQL);
        conn.execute_batch(&full_schema)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    fn count(&self, table: &str) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
        .map_err(db_err)
    }

    // ---------------------------------------------------------------
    // Users
    // ---------------------------------------------------------------

    /// Insert a user on first login, refresh name and picture on later ones.
    pub fn upsert_user(&self, profile: &UserProfile) -> Result<User> {
        let now = now_millis();
        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO users (id, google_id, email, name, picture, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(google_id) DO UPDATE SET
                     name = excluded.name,
                     picture = excluded.picture,
                     updated_at = excluded.updated_at",
                params![
                    new_id(),
                    profile.google_id,
                    profile.email,
                    profile.name,
                    profile.picture,
                    now
                ],
            )
            .map_err(db_err)?;
        }

        let conn = self.conn.lock();
        let user = conn
            .prepare_cached("SELECT * FROM users WHERE google_id = ?1")
            .map_err(db_err)?
            .query_row(params![profile.google_id], |row| Ok(Self::row_to_user(row)))
            .map_err(db_err);
        user
    }

    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        let user = conn
            .prepare_cached("SELECT * FROM users WHERE id = ?1")
            .map_err(db_err)?
            .query_row(params![user_id], |row| Ok(Self::row_to_user(row)))
            .optional()
            .map_err(db_err);
        user
    }

    /// Set the profile picture URL. Returns the updated user.
    pub fn set_user_picture(&self, user_id: &str, picture: &str) -> Result<User> {
        {
            let conn = self.conn.lock();
            let count = conn
                .execute(
                    "UPDATE users SET picture = ?1, updated_at = ?2 WHERE id = ?3",
                    params![picture, now_millis(), user_id],
                )
                .map_err(db_err)?;
            if count == 0 {
                return Err(Error::NotFound("User not found".into()));
            }
        }
        self.get_user(user_id)?
            .ok_or_else(|| Error::NotFound("User not found".into()))
    }

    /// Add a folder name to the user's list. Adding an existing name is a no-op.
    pub fn add_folder(&self, user_id: &str, folder: &str) -> Result<Vec<String>> {
        let folder = folder.trim();
        if folder.is_empty() {
            return Err(Error::InvalidInput("Folder name is required".into()));
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        let mut folders = Self::load_folders(&tx, user_id)?;
        if folder != DEFAULT_FOLDER && !folders.iter().any(|f| f == folder) {
            folders.push(folder.to_string());
            Self::save_folders(&tx, user_id, &folders)?;
        }
        tx.commit().map_err(db_err)?;
        Ok(folders)
    }

    /// Remove a folder name; the user's notes in it move back to the default folder.
    pub fn remove_folder(&self, user_id: &str, folder: &str) -> Result<Vec<String>> {
        if folder == DEFAULT_FOLDER {
            return Err(Error::InvalidInput(format!(
                "The {} folder cannot be removed",
                DEFAULT_FOLDER
            )));
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        let mut folders = Self::load_folders(&tx, user_id)?;
        folders.retain(|f| f != folder);
        Self::save_folders(&tx, user_id, &folders)?;
        let moved = tx
            .execute(
                "UPDATE notes SET folder = ?1, updated_at = ?2 WHERE user_id = ?3 AND folder = ?4",
                params![DEFAULT_FOLDER, now_millis(), user_id, folder],
            )
            .map_err(db_err)?;
        tx.commit().map_err(db_err)?;

        debug!("Removed folder '{}', moved {} notes", folder, moved);
        Ok(folders)
    }

    fn load_folders(conn: &Connection, user_id: &str) -> Result<Vec<String>> {
        let json: String = conn
            .query_row(
                "SELECT folders_json FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| Error::NotFound("User not found".into()))?;
        Ok(serde_json::from_str(&json).unwrap_or_default())
    }

    fn save_folders(conn: &Connection, user_id: &str, folders: &[String]) -> Result<()> {
        conn.execute(
            "UPDATE users SET folders_json = ?1, updated_at = ?2 WHERE id = ?3",
            params![serde_json::to_string(folders)?, now_millis(), user_id],
        )
        .map_err(db_err)?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Sessions
    // ---------------------------------------------------------------

    /// Issue a session token for a user. Only its hash is persisted.
    pub fn create_session(&self, user_id: &str, ttl: chrono::Duration) -> Result<String> {
        let token = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        let now = now_millis();
        let expires = now + ttl.num_milliseconds();

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![token_hash(&token), user_id, now, expires],
        )
        .map_err(db_err)?;
        Ok(token)
    }

    /// Resolve a bearer token to its user id, if the session is still valid.
    pub fn resolve_session(&self, token: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let user_id = conn
            .prepare_cached("SELECT user_id FROM sessions WHERE token_hash = ?1 AND expires_at > ?2")
            .map_err(db_err)?
            .query_row(params![token_hash(token), now_millis()], |row| row.get(0))
            .optional()
            .map_err(db_err);
        user_id
    }

    /// Drop expired sessions. Returns how many were removed.
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![now_millis()],
        )
        .map_err(db_err)
    }

    // ---------------------------------------------------------------
    // Notes
    // ---------------------------------------------------------------

    /// All notes owned by the user, most recently updated first.
    pub fn list_notes(&self, user_id: &str) -> Result<Vec<Note>> {
        let conn = self.conn.lock();

        let mut attachments: HashMap<String, Vec<Attachment>> = HashMap::new();
        {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT a.* FROM attachments a JOIN notes n ON n.id = a.note_id
                     WHERE n.user_id = ?1 ORDER BY a.seq ASC",
                )
                .map_err(db_err)?;
            let rows = stmt
                .query_map(params![user_id], |row| {
                    let note_id: String = row.get("note_id")?;
                    Ok((note_id, Self::row_to_attachment(row)))
                })
                .map_err(db_err)?;
            for row in rows {
                let (note_id, attachment) = row.map_err(db_err)?;
                attachments.entry(note_id).or_default().push(attachment);
            }
        }

        let mut stmt = conn
            .prepare_cached(
                "SELECT * FROM notes WHERE user_id = ?1 ORDER BY updated_at DESC, created_at DESC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![user_id], |row| Ok(Self::row_to_note(row)))
            .map_err(db_err)?;

        let mut notes = Vec::new();
        for row in rows {
            let mut note = row.map_err(db_err)?;
            note.attachments = attachments.remove(&note.id).unwrap_or_default();
            notes.push(note);
        }
        Ok(notes)
    }

    /// A single note, if it exists and belongs to the user.
    pub fn get_note(&self, user_id: &str, note_id: &str) -> Result<Option<Note>> {
        let conn = self.conn.lock();
        Self::load_note(&conn, user_id, note_id)
    }

    /// Whether the note exists and belongs to the user.
    pub fn note_exists(&self, user_id: &str, note_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        Self::owns_note(&conn, user_id, note_id)
    }

    pub fn create_note(&self, user_id: &str, new: NewNote) -> Result<Note> {
        let id = new_id();
        let now = now_millis();
        let title = new
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let folder = new
            .folder
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FOLDER.to_string());
        let tags = normalize_tags(&new.tags.unwrap_or_default());

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO notes (id, user_id, title, content, folder, tags_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                id,
                user_id,
                title,
                new.content.unwrap_or_default(),
                folder,
                serde_json::to_string(&tags)?,
                now
            ],
        )
        .map_err(db_err)?;

        Self::load_note(&conn, user_id, &id)?
            .ok_or_else(|| Error::Internal("Note vanished after insert".into()))
    }

    /// Apply a partial update. Returns `None` when the note is not the user's.
    pub fn update_note(
        &self,
        user_id: &str,
        note_id: &str,
        update: NoteUpdate,
    ) -> Result<Option<Note>> {
        let conn = self.conn.lock();
        let Some(mut note) = Self::load_note(&conn, user_id, note_id)? else {
            return Ok(None);
        };

        if let Some(title) = update.title {
            if title.trim().is_empty() {
                return Err(Error::InvalidInput("Title is required".into()));
            }
            note.title = title;
        }
        if let Some(content) = update.content {
            note.content = content;
        }
        if let Some(folder) = update.folder {
            note.folder = if folder.trim().is_empty() {
                DEFAULT_FOLDER.to_string()
            } else {
                folder
            };
        }
        if let Some(tags) = update.tags {
            note.tags = normalize_tags(&tags);
        }
        if let Some(summary) = update.summary {
            note.summary = Some(summary);
        }

        conn.execute(
            "UPDATE notes SET title = ?1, content = ?2, folder = ?3, tags_json = ?4,
                 summary = ?5, updated_at = ?6
             WHERE id = ?7 AND user_id = ?8",
            params![
                note.title,
                note.content,
                note.folder,
                serde_json::to_string(&note.tags)?,
                note.summary,
                now_millis(),
                note_id,
                user_id
            ],
        )
        .map_err(db_err)?;

        Self::load_note(&conn, user_id, note_id)
    }

    /// Delete a note. Returns its attachments (whose files the caller removes),
    /// or `None` when the note is not the user's.
    pub fn delete_note(&self, user_id: &str, note_id: &str) -> Result<Option<Vec<Attachment>>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        if !Self::owns_note(&tx, user_id, note_id)? {
            return Ok(None);
        }
        let attachments = Self::load_attachments(&tx, note_id)?;
        tx.execute("DELETE FROM notes WHERE id = ?1", params![note_id])
            .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(Some(attachments))
    }

    /// Delete the `count` oldest notes, or all of them when `count` is `None`.
    /// Returns the number of notes removed and their attachments.
    pub fn delete_notes(
        &self,
        user_id: &str,
        count: Option<usize>,
    ) -> Result<(usize, Vec<Attachment>)> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;

        let limit = count.map(|c| c as i64).unwrap_or(-1);
        let ids: Vec<String> = {
            let mut stmt = tx
                .prepare("SELECT id FROM notes WHERE user_id = ?1 ORDER BY created_at ASC LIMIT ?2")
                .map_err(db_err)?;
            let rows = stmt
                .query_map(params![user_id, limit], |row| row.get(0))
                .map_err(db_err)?;
            rows.collect::<std::result::Result<_, _>>().map_err(db_err)?
        };

        let mut attachments = Vec::new();
        for id in &ids {
            attachments.extend(Self::load_attachments(&tx, id)?);
            tx.execute("DELETE FROM notes WHERE id = ?1", params![id])
                .map_err(db_err)?;
        }
        tx.commit().map_err(db_err)?;
        Ok((ids.len(), attachments))
    }

    // ---------------------------------------------------------------
    // Attachments
    // ---------------------------------------------------------------

    /// Append an attachment to a note and bump the note's `updated_at`.
    ///
    /// The append is a single insert inside one transaction, so concurrent
    /// appends to the same note all land. Returns `None` when the note is not
    /// the user's.
    pub fn add_attachment(
        &self,
        user_id: &str,
        note_id: &str,
        new: NewAttachment,
    ) -> Result<Option<Note>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        if !Self::owns_note(&tx, user_id, note_id)? {
            return Ok(None);
        }

        let now = now_millis();
        tx.execute(
            "INSERT INTO attachments (id, note_id, name, url, path, size, mime_type, extracted_text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                new_id(),
                note_id,
                new.name,
                new.url,
                new.path,
                new.size,
                new.mime_type,
                normalize_extracted(new.extracted_text),
                now
            ],
        )
        .map_err(db_err)?;
        tx.execute(
            "UPDATE notes SET updated_at = ?1 WHERE id = ?2",
            params![now, note_id],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;

        Self::load_note(&conn, user_id, note_id)
    }

    /// Remove one attachment. Returns the updated note and the removed record,
    /// or `None` when either the note or the attachment is missing.
    pub fn remove_attachment(
        &self,
        user_id: &str,
        note_id: &str,
        attachment_id: &str,
    ) -> Result<Option<(Note, Attachment)>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        if !Self::owns_note(&tx, user_id, note_id)? {
            return Ok(None);
        }

        let removed = tx
            .query_row(
                "SELECT * FROM attachments WHERE id = ?1 AND note_id = ?2",
                params![attachment_id, note_id],
                |row| Ok(Self::row_to_attachment(row)),
            )
            .optional()
            .map_err(db_err)?;
        let Some(removed) = removed else {
            return Ok(None);
        };

        tx.execute("DELETE FROM attachments WHERE id = ?1", params![attachment_id])
            .map_err(db_err)?;
        tx.execute(
            "UPDATE notes SET updated_at = ?1 WHERE id = ?2",
            params![now_millis(), note_id],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;

        let note = Self::load_note(&conn, user_id, note_id)?
            .ok_or_else(|| Error::Internal("Note vanished during attachment removal".into()))?;
        Ok(Some((note, removed)))
    }

    // ---------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------

    fn owns_note(conn: &Connection, user_id: &str, note_id: &str) -> Result<bool> {
        let found = conn
            .prepare_cached("SELECT 1 FROM notes WHERE id = ?1 AND user_id = ?2")
            .map_err(db_err)?
            .query_row(params![note_id, user_id], |_| Ok(()))
            .optional()
            .map_err(db_err)?;
        Ok(found.is_some())
    }

    fn load_note(conn: &Connection, user_id: &str, note_id: &str) -> Result<Option<Note>> {
        let note = conn
            .prepare_cached("SELECT * FROM notes WHERE id = ?1 AND user_id = ?2")
            .map_err(db_err)?
            .query_row(params![note_id, user_id], |row| Ok(Self::row_to_note(row)))
            .optional()
            .map_err(db_err)?;

        match note {
            Some(mut note) => {
                note.attachments = Self::load_attachments(conn, note_id)?;
                Ok(Some(note))
            }
            None => Ok(None),
        }
    }

    fn load_attachments(conn: &Connection, note_id: &str) -> Result<Vec<Attachment>> {
        let mut stmt = conn
            .prepare_cached("SELECT * FROM attachments WHERE note_id = ?1 ORDER BY seq ASC")
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![note_id], |row| Ok(Self::row_to_attachment(row)))
            .map_err(db_err)?;
        rows.collect::<std::result::Result<_, _>>().map_err(db_err)
    }

    fn row_to_user(row: &Row<'_>) -> User {
        User {
            id: row.get("id").unwrap_or_default(),
            google_id: row.get("google_id").unwrap_or_default(),
            email: row.get("email").unwrap_or_default(),
            name: row.get("name").unwrap_or_default(),
            picture: row.get("picture").ok().flatten(),
            folders: row
                .get::<_, String>("folders_json")
                .ok()
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            created_at: from_millis(row.get("created_at").unwrap_or(0)),
            updated_at: from_millis(row.get("updated_at").unwrap_or(0)),
        }
    }

    fn row_to_note(row: &Row<'_>) -> Note {
        Note {
            id: row.get("id").unwrap_or_default(),
            title: row.get("title").unwrap_or_default(),
            content: row.get("content").unwrap_or_default(),
            folder: row
                .get("folder")
                .unwrap_or_else(|_| DEFAULT_FOLDER.to_string()),
            tags: row
                .get::<_, String>("tags_json")
                .ok()
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            summary: row.get("summary").ok().flatten(),
            user: row.get("user_id").unwrap_or_default(),
            attachments: Vec::new(),
            created_at: from_millis(row.get("created_at").unwrap_or(0)),
            updated_at: from_millis(row.get("updated_at").unwrap_or(0)),
        }
    }

    fn row_to_attachment(row: &Row<'_>) -> Attachment {
        Attachment {
            id: row.get("id").unwrap_or_default(),
            name: row.get("name").unwrap_or_default(),
            url: row.get("url").unwrap_or_default(),
            path: row.get("path").unwrap_or_default(),
            size: row.get("size").unwrap_or(0),
            mime_type: row.get("mime_type").unwrap_or_default(),
            extracted_text: normalize_extracted(row.get("extracted_text").ok().flatten()),
            created_at: from_millis(row.get("created_at").unwrap_or(0)),
        }
    }
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn token_hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

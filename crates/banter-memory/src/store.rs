//! Persistent Message Store.
//!
//! Persists every ingested [`Event`] (with its optional embedding vector) and
//! the latest snapshot of every author [`Profile`] to a local SQLite
//! database.
//!
//! # Storage layout
//!
//! Table `messages`, one row per event:
//!
//! | column            | type    | description                               |
//! |-------------------|---------|-------------------------------------------|
//! | id                | INTEGER | Autoincrement primary key                 |
//! | user_id           | INTEGER | Author id                                 |
//! | username          | TEXT    | Author display name at the time           |
//! | text              | TEXT    | Message text                              |
//! | timestamp         | REAL    | Unix seconds (UTC)                        |
//! | chat_id           | INTEGER | Conversation id                           |
//! | message_id        | INTEGER | Gateway sequence id                       |
//! | is_reply          | INTEGER | Reply flag                                |
//! | reply_to_user     | TEXT    | Replied-to author name                    |
//! | sentiment         | TEXT    | `positive` / `negative` / `neutral`       |
//! | importance        | REAL    | Importance score in `[0, 1]`              |
//! | embedding         | BLOB    | Little-endian f32 vector (4 × N bytes)    |
//! | has_image         | INTEGER | Attachment flag (added by migration)      |
//! | image_description | TEXT    | Attachment description (added by migration) |
//!
//! Table `user_profiles`, one row per author; `personality_traits` and
//! `interests` are JSON blobs.
//!
//! # Example
//!
//! ```rust
//! use banter_memory::store::MessageStore;
//! use banter_types::{Event, InboundMessage, Sentiment};
//!
//! let store = MessageStore::open_in_memory().unwrap();
//! let event = Event::from_inbound(&InboundMessage::new(1, "Вася", "привет"), Sentiment::Neutral, 0.5);
//! store.append(&event, None).unwrap();
//!
//! let recent = store.load_recent(10).unwrap();
//! assert_eq!(recent[0].text, "привет");
//! ```

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use banter_types::{AuthorId, Event, Profile, RelationshipTier, Sentiment, Trait};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::{debug, info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from message store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Malformed record: {0}")]
    Malformed(String),
    #[error("Store connection lock poisoned")]
    Poisoned,
}

// ─────────────────────────────────────────────────────────────────────────────
// Encoding helpers
// ─────────────────────────────────────────────────────────────────────────────

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

#[cfg(test)]
fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn to_epoch_secs(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64 / 1000.0
}

fn from_epoch_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

const EVENT_COLUMNS: &str = "user_id, username, text, timestamp, chat_id, message_id, is_reply,
     reply_to_user, sentiment, importance, has_image, image_description";

/// Raw `messages` row before validation.
struct MessageRow {
    user_id: i64,
    username: Option<String>,
    text: Option<String>,
    timestamp: f64,
    chat_id: Option<i64>,
    message_id: Option<i64>,
    is_reply: Option<bool>,
    reply_to_user: Option<String>,
    sentiment: Option<String>,
    importance: Option<f64>,
    has_image: Option<bool>,
    image_description: Option<String>,
}

impl MessageRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            username: row.get(1)?,
            text: row.get(2)?,
            timestamp: row.get(3)?,
            chat_id: row.get(4)?,
            message_id: row.get(5)?,
            is_reply: row.get(6)?,
            reply_to_user: row.get(7)?,
            sentiment: row.get(8)?,
            importance: row.get(9)?,
            has_image: row.get(10)?,
            image_description: row.get(11)?,
        })
    }

    fn into_event(self) -> Result<Event, StoreError> {
        let timestamp = from_epoch_secs(self.timestamp)
            .ok_or_else(|| StoreError::Malformed(format!("bad timestamp {}", self.timestamp)))?;
        let sentiment = match self.sentiment.as_deref() {
            None => Sentiment::Neutral,
            Some(s) => Sentiment::parse(s)
                .ok_or_else(|| StoreError::Malformed(format!("unknown sentiment {s:?}")))?,
        };
        let importance = self.importance.unwrap_or(0.5);
        if !(0.0..=1.0).contains(&importance) {
            return Err(StoreError::Malformed(format!("importance {importance} out of range")));
        }
        Ok(Event {
            author_id: self.user_id,
            display_name: self.username.unwrap_or_default(),
            text: self.text.unwrap_or_default(),
            timestamp,
            conversation_id: self.chat_id.unwrap_or_default(),
            sequence_id: self.message_id.unwrap_or_default(),
            is_reply: self.is_reply.unwrap_or(false),
            reply_to: self.reply_to_user,
            sentiment,
            importance,
            has_attachment: self.has_image.unwrap_or(false),
            attachment_description: self.image_description,
        })
    }
}

/// Raw `user_profiles` row before the JSON blobs are decoded.
struct ProfileRow {
    user_id: i64,
    username: Option<String>,
    traits: Vec<u8>,
    interests: Vec<u8>,
    interaction_count: i64,
    last_seen: f64,
}

impl ProfileRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            username: row.get(1)?,
            traits: row.get::<_, Option<Vec<u8>>>(2)?.unwrap_or_default(),
            interests: row.get::<_, Option<Vec<u8>>>(3)?.unwrap_or_default(),
            interaction_count: row.get::<_, Option<i64>>(4)?.unwrap_or_default(),
            last_seen: row.get::<_, Option<f64>>(5)?.unwrap_or_default(),
        })
    }

    fn into_profile(self) -> Result<Profile, StoreError> {
        let traits: BTreeMap<Trait, f64> = serde_json::from_slice(&self.traits)?;
        let interests: Vec<String> = serde_json::from_slice(&self.interests)?;
        let interaction_count = u64::try_from(self.interaction_count).map_err(|_| {
            StoreError::Malformed(format!("negative interaction count {}", self.interaction_count))
        })?;
        let last_seen = from_epoch_secs(self.last_seen)
            .ok_or_else(|| StoreError::Malformed(format!("bad last_seen {}", self.last_seen)))?;
        Ok(Profile {
            author_id: self.user_id,
            display_name: self.username.unwrap_or_default(),
            traits,
            interests,
            interaction_count,
            last_seen,
            // The tier is a pure function of the count; the stored label is
            // informational only.
            tier: RelationshipTier::from_interactions(interaction_count),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MessageStore
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite-backed durable message log and profile table.
///
/// The connection is guarded by a mutex so the store can be shared between
/// the ingestion path and background write tasks behind an `Arc`.
pub struct MessageStore {
    conn: Mutex<Connection>,
}

impl MessageStore {
    /// Open (or create) a persistent SQLite database at `path`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open a temporary in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS messages (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id           INTEGER NOT NULL,
                username          TEXT,
                text              TEXT,
                timestamp         REAL NOT NULL,
                chat_id           INTEGER,
                message_id        INTEGER,
                is_reply          BOOLEAN,
                reply_to_user     TEXT,
                sentiment         TEXT,
                importance        REAL,
                embedding         BLOB,
                has_image         BOOLEAN DEFAULT FALSE,
                image_description TEXT
            );
            CREATE TABLE IF NOT EXISTS user_profiles (
                user_id            INTEGER PRIMARY KEY,
                username           TEXT,
                personality_traits BLOB,
                interests          BLOB,
                interaction_count  INTEGER,
                last_seen          REAL,
                relationship_level TEXT
            );",
        )?;
        Self::migrate_attachment_columns(&conn)?;
        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_user_id   ON messages(user_id);
             CREATE INDEX IF NOT EXISTS idx_timestamp ON messages(timestamp);
             CREATE INDEX IF NOT EXISTS idx_chat_id   ON messages(chat_id);
             CREATE INDEX IF NOT EXISTS idx_has_image ON messages(has_image);",
        )?;
        Ok(())
    }

    /// Add the attachment columns to a `messages` table created before they
    /// existed.  Rows written earlier read back as "no attachment".
    fn migrate_attachment_columns(conn: &Connection) -> Result<(), StoreError> {
        let columns = {
            let mut stmt = conn.prepare("PRAGMA table_info(messages)")?;
            stmt.query_map([], |row| row.get::<_, String>(1))?
                .collect::<Result<Vec<_>, _>>()?
        };

        if !columns.iter().any(|c| c == "has_image") {
            info!("migrating message store: adding has_image column");
            conn.execute("ALTER TABLE messages ADD COLUMN has_image BOOLEAN DEFAULT FALSE", [])?;
        }
        if !columns.iter().any(|c| c == "image_description") {
            info!("migrating message store: adding image_description column");
            conn.execute("ALTER TABLE messages ADD COLUMN image_description TEXT", [])?;
        }
        Ok(())
    }

    /// Append `event` to the message log, with its embedding when available.
    pub fn append(&self, event: &Event, vector: Option<&[f32]>) -> Result<(), StoreError> {
        let blob = vector.map(embedding_to_bytes);
        self.conn()?.execute(
            "INSERT INTO messages
                 (user_id, username, text, timestamp, chat_id, message_id, is_reply,
                  reply_to_user, sentiment, importance, embedding, has_image, image_description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                event.author_id,
                event.display_name,
                event.text,
                to_epoch_secs(event.timestamp),
                event.conversation_id,
                event.sequence_id,
                event.is_reply,
                event.reply_to,
                event.sentiment.as_str(),
                event.importance,
                blob,
                event.has_attachment,
                event.attachment_description,
            ],
        )?;
        Ok(())
    }

    /// The `limit` most recent events of `author_id`, newest first.
    ///
    /// Rows that fail to decode are skipped and logged.
    pub fn recent_for_author(&self, author_id: AuthorId, limit: usize) -> Result<Vec<Event>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM messages
             WHERE user_id = ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![author_id, limit as i64], MessageRow::from_row)?;
        Ok(decode_events(rows))
    }

    /// The `limit` most recent events across all authors, oldest first.
    ///
    /// Used once at startup to warm the in-memory structures.
    pub fn load_recent(&self, limit: usize) -> Result<Vec<Event>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM messages
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], MessageRow::from_row)?;
        let mut events = decode_events(rows);
        events.reverse();
        Ok(events)
    }

    /// Delete every event older than `days` days.  Returns the number deleted.
    pub fn purge_older_than(&self, days: u32) -> Result<usize, StoreError> {
        self.purge_before(Utc::now() - Duration::days(i64::from(days)))
    }

    /// Delete every event timestamped strictly before `cutoff`.
    pub fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let deleted = self.conn()?.execute(
            "DELETE FROM messages WHERE timestamp < ?1",
            params![to_epoch_secs(cutoff)],
        )?;
        info!(deleted, cutoff = %cutoff, "purged old messages");
        Ok(deleted)
    }

    /// Total number of stored events.
    pub fn message_count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Fetch the profile of `author_id`.
    ///
    /// A row whose blobs cannot be decoded is logged and reported as absent.
    pub fn profile_get(&self, author_id: AuthorId) -> Result<Option<Profile>, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT user_id, username, personality_traits, interests, interaction_count, last_seen
                 FROM user_profiles WHERE user_id = ?1",
                params![author_id],
                ProfileRow::from_row,
            )
            .optional()?;
        match row.map(ProfileRow::into_profile) {
            None => Ok(None),
            Some(Ok(profile)) => Ok(Some(profile)),
            Some(Err(e)) => {
                warn!(author_id, error = %e, "skipping undecodable profile row");
                Ok(None)
            }
        }
    }

    /// Insert or replace the profile snapshot (last write wins).
    pub fn profile_put(&self, profile: &Profile) -> Result<(), StoreError> {
        let traits = serde_json::to_vec(&profile.traits)?;
        let interests = serde_json::to_vec(&profile.interests)?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO user_profiles
                 (user_id, username, personality_traits, interests, interaction_count,
                  last_seen, relationship_level)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                profile.author_id,
                profile.display_name,
                traits,
                interests,
                profile.interaction_count as i64,
                to_epoch_secs(profile.last_seen),
                profile.tier.as_str(),
            ],
        )?;
        debug!(author_id = profile.author_id, count = profile.interaction_count, "profile persisted");
        Ok(())
    }

    /// Every decodable profile; malformed rows are skipped and logged.
    pub fn load_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, username, personality_traits, interests, interaction_count, last_seen
             FROM user_profiles ORDER BY user_id ASC",
        )?;
        let rows = stmt.query_map([], ProfileRow::from_row)?;
        let mut profiles = Vec::new();
        for row in rows {
            match row.map_err(StoreError::from).and_then(ProfileRow::into_profile) {
                Ok(p) => profiles.push(p),
                Err(e) => warn!(error = %e, "skipping undecodable profile row"),
            }
        }
        Ok(profiles)
    }
}

fn decode_events<I>(rows: I) -> Vec<Event>
where
    I: Iterator<Item = rusqlite::Result<MessageRow>>,
{
    let mut events = Vec::new();
    for row in rows {
        match row.map_err(StoreError::from).and_then(MessageRow::into_event) {
            Ok(e) => events.push(e),
            Err(e) => warn!(error = %e, "skipping undecodable message row"),
        }
    }
    events
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use banter_types::InboundMessage;

    fn event_at(author: AuthorId, text: &str, ts: DateTime<Utc>) -> Event {
        Event::from_inbound(
            &InboundMessage::new(author, format!("user{author}"), text).sent_at(ts),
            Sentiment::Neutral,
            0.5,
        )
    }

    #[test]
    fn embedding_bytes_roundtrip() {
        let original = vec![1.5f32, -0.25, 0.0, 42.0];
        assert_eq!(bytes_to_embedding(&embedding_to_bytes(&original)), original);
    }

    #[test]
    fn append_and_load_recent_oldest_first() {
        let store = MessageStore::open_in_memory().unwrap();
        let now = Utc::now();
        store.append(&event_at(1, "first", now - Duration::minutes(2)), None).unwrap();
        store.append(&event_at(2, "second", now - Duration::minutes(1)), Some(&[1.0, 0.0])).unwrap();
        store.append(&event_at(1, "third", now), None).unwrap();

        let recent = store.load_recent(2).unwrap();
        let texts: Vec<_> = recent.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["second", "third"]);
    }

    #[test]
    fn recent_for_author_is_newest_first_and_filtered() {
        let store = MessageStore::open_in_memory().unwrap();
        let now = Utc::now();
        store.append(&event_at(1, "a1", now - Duration::minutes(3)), None).unwrap();
        store.append(&event_at(2, "b1", now - Duration::minutes(2)), None).unwrap();
        store.append(&event_at(1, "a2", now - Duration::minutes(1)), None).unwrap();

        let history = store.recent_for_author(1, 10).unwrap();
        let texts: Vec<_> = history.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["a2", "a1"]);
    }

    #[test]
    fn event_fields_survive_roundtrip() {
        let store = MessageStore::open_in_memory().unwrap();
        let mut inbound = InboundMessage::new(9, "Петя", "мем").with_attachment(Some("кот в коробке".into()));
        inbound.reply_to = Some("Вася".into());
        inbound.sequence_id = 77;
        let event = Event::from_inbound(&inbound, Sentiment::Positive, 0.8);
        store.append(&event, None).unwrap();

        let back = &store.load_recent(1).unwrap()[0];
        assert_eq!(back.author_id, 9);
        assert_eq!(back.sequence_id, 77);
        assert!(back.is_reply);
        assert_eq!(back.reply_to.as_deref(), Some("Вася"));
        assert_eq!(back.sentiment, Sentiment::Positive);
        assert!((back.importance - 0.8).abs() < 1e-9);
        assert!(back.has_attachment);
        assert_eq!(back.attachment_description.as_deref(), Some("кот в коробке"));
        assert_eq!(back.timestamp.timestamp_millis(), event.timestamp.timestamp_millis());
    }

    #[test]
    fn purge_deletes_only_events_past_horizon() {
        let store = MessageStore::open_in_memory().unwrap();
        let now = Utc::now();
        store.append(&event_at(1, "old", now - Duration::days(31)), None).unwrap();
        store.append(&event_at(1, "fresh", now - Duration::days(1)), None).unwrap();

        assert_eq!(store.purge_older_than(30).unwrap(), 1);
        let left = store.load_recent(10).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].text, "fresh");
    }

    #[test]
    fn profile_put_and_get_roundtrip() {
        let store = MessageStore::open_in_memory().unwrap();
        let mut profile = Profile::new(5, "Оля", Utc::now());
        profile.interaction_count = 22;
        profile.tier = RelationshipTier::Friend;
        profile.interests.push("мемы".into());
        profile.traits.insert(Trait::Humor, 0.9);
        store.profile_put(&profile).unwrap();

        let back = store.profile_get(5).unwrap().expect("profile stored");
        assert_eq!(back.display_name, "Оля");
        assert_eq!(back.interaction_count, 22);
        assert_eq!(back.tier, RelationshipTier::Friend);
        assert_eq!(back.interests, vec!["мемы".to_string()]);
        assert!((back.trait_value(Trait::Humor) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn profile_put_is_last_write_wins() {
        let store = MessageStore::open_in_memory().unwrap();
        let mut profile = Profile::new(5, "old", Utc::now());
        store.profile_put(&profile).unwrap();
        profile.display_name = "new".into();
        profile.interaction_count = 3;
        store.profile_put(&profile).unwrap();

        let back = store.profile_get(5).unwrap().unwrap();
        assert_eq!(back.display_name, "new");
        assert_eq!(back.interaction_count, 3);
        assert_eq!(store.load_profiles().unwrap().len(), 1);
    }

    #[test]
    fn missing_profile_is_none() {
        let store = MessageStore::open_in_memory().unwrap();
        assert!(store.profile_get(404).unwrap().is_none());
    }

    #[test]
    fn malformed_profile_blob_is_skipped() {
        let store = MessageStore::open_in_memory().unwrap();
        store.profile_put(&Profile::new(1, "good", Utc::now())).unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO user_profiles VALUES (2, 'bad', X'80049500', X'8004', 3, 0.0, 'stranger')",
                [],
            )
            .unwrap();

        assert!(store.profile_get(2).unwrap().is_none());
        let all = store.load_profiles().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].author_id, 1);
    }

    #[test]
    fn malformed_message_row_is_skipped() {
        let store = MessageStore::open_in_memory().unwrap();
        store.append(&event_at(1, "ok", Utc::now()), None).unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO messages (user_id, username, text, timestamp, sentiment)
                 VALUES (1, 'x', 'broken', 1.0, 'furious')",
                [],
            )
            .unwrap();

        let events = store.load_recent(10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].text, "ok");
    }

    #[test]
    fn opens_store_created_without_attachment_columns() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("legacy.db");
        let path_str = path.to_string_lossy().to_string();
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER, username TEXT, text TEXT, timestamp REAL,
                    chat_id INTEGER, message_id INTEGER, is_reply BOOLEAN,
                    reply_to_user TEXT, sentiment TEXT, importance REAL, embedding BLOB
                 );
                 INSERT INTO messages (user_id, username, text, timestamp, chat_id, message_id,
                                       is_reply, sentiment, importance)
                 VALUES (3, 'ветеран', 'старое сообщение', 1700000000.0, 10, 1, 0, 'neutral', 0.5);",
            )
            .unwrap();
        }

        let store = MessageStore::open(&path_str).unwrap();
        let events = store.load_recent(10).unwrap();
        assert_eq!(events.len(), 1);
        assert!(!events[0].has_attachment);
        assert!(events[0].attachment_description.is_none());

        let with_image = Event::from_inbound(
            &InboundMessage::new(3, "ветеран", "новое").with_attachment(Some("скриншот".into())),
            Sentiment::Neutral,
            0.8,
        );
        store.append(&with_image, None).unwrap();
        let events = store.load_recent(10).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[1].has_attachment);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("memory.db").to_string_lossy().to_string();
        {
            let store = MessageStore::open(&path).unwrap();
            store.append(&event_at(1, "persisted", Utc::now()), None).unwrap();
            store.profile_put(&Profile::new(1, "user1", Utc::now())).unwrap();
        }
        let store = MessageStore::open(&path).unwrap();
        assert_eq!(store.message_count().unwrap(), 1);
        assert!(store.profile_get(1).unwrap().is_some());
    }
}

// SQLite persistence layer for tournament collections.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::{Club, Entrant, Match, Official};

/// Read-full / replace-full access to the four tournament collections.
///
/// Writers replace a whole collection at once. Nothing is merged, so a
/// holder of a stale read that writes back wins over whatever was stored.
pub trait TournamentStore {
    fn load_entrants(&self) -> Result<Vec<Entrant>>;
    fn replace_entrants(&self, entrants: &[Entrant]) -> Result<()>;

    fn load_matches(&self) -> Result<Vec<Match>>;
    fn replace_matches(&self, matches: &[Match]) -> Result<()>;

    fn load_clubs(&self) -> Result<Vec<Club>>;
    fn replace_clubs(&self, clubs: &[Club]) -> Result<()>;

    fn load_officials(&self) -> Result<Vec<Official>>;
    fn replace_officials(&self, officials: &[Official]) -> Result<()>;

    /// Replace all four collections together: either every write lands or
    /// none does.
    fn replace_all(
        &self,
        entrants: &[Entrant],
        matches: &[Match],
        clubs: &[Club],
        officials: &[Official],
    ) -> Result<()>;
}

const ENTRANTS_KEY: &str = "entrants";
const MATCHES_KEY: &str = "matches";
const CLUBS_KEY: &str = "clubs";
const OFFICIALS_KEY: &str = "officials";

/// SQLite-backed key-value store holding each collection as one JSON
/// document.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure the schema
    /// exists. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS collections (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection. A poisoned lock is recovered: every
    /// write is a single statement or transaction, so the connection is never
    /// left half-updated.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Serialize `value` and store it under `key`, replacing any previous
    /// value.
    pub fn replace_collection<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)
            .with_context(|| format!("failed to serialize collection {key}"))?;
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO collections (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![key, json],
            )
            .with_context(|| format!("failed to save collection {key}"))?;
        Ok(())
    }

    /// Load the value stored under `key`. Returns `None` if the key has never
    /// been written.
    pub fn load_collection<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let json: Option<String> = self
            .conn()
            .query_row(
                "SELECT value FROM collections WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("failed to query collection {key}"))?;

        json.map(|s| {
            serde_json::from_str(&s)
                .with_context(|| format!("failed to deserialize collection {key}"))
        })
        .transpose()
    }
}

impl TournamentStore for Database {
    fn load_entrants(&self) -> Result<Vec<Entrant>> {
        Ok(self.load_collection(ENTRANTS_KEY)?.unwrap_or_default())
    }

    fn replace_entrants(&self, entrants: &[Entrant]) -> Result<()> {
        self.replace_collection(ENTRANTS_KEY, entrants)
    }

    fn load_matches(&self) -> Result<Vec<Match>> {
        Ok(self.load_collection(MATCHES_KEY)?.unwrap_or_default())
    }

    fn replace_matches(&self, matches: &[Match]) -> Result<()> {
        self.replace_collection(MATCHES_KEY, matches)
    }

    fn load_clubs(&self) -> Result<Vec<Club>> {
        Ok(self.load_collection(CLUBS_KEY)?.unwrap_or_default())
    }

    fn replace_clubs(&self, clubs: &[Club]) -> Result<()> {
        self.replace_collection(CLUBS_KEY, clubs)
    }

    fn load_officials(&self) -> Result<Vec<Official>> {
        Ok(self.load_collection(OFFICIALS_KEY)?.unwrap_or_default())
    }

    fn replace_officials(&self, officials: &[Official]) -> Result<()> {
        self.replace_collection(OFFICIALS_KEY, officials)
    }

    fn replace_all(
        &self,
        entrants: &[Entrant],
        matches: &[Match],
        clubs: &[Club],
        officials: &[Official],
    ) -> Result<()> {
        let documents = [
            (ENTRANTS_KEY, serde_json::to_string(entrants)),
            (MATCHES_KEY, serde_json::to_string(matches)),
            (CLUBS_KEY, serde_json::to_string(clubs)),
            (OFFICIALS_KEY, serde_json::to_string(officials)),
        ];

        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        for (key, json) in documents {
            let json = json.with_context(|| format!("failed to serialize collection {key}"))?;
            tx.execute(
                "INSERT OR REPLACE INTO collections (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![key, json],
            )
            .with_context(|| format!("failed to save collection {key}"))?;
        }
        tx.commit().context("failed to commit replace_all")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! SQLite persistence for the catalog, state records, and transition log.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use convoy_core::error::Error;
use convoy_core::protocol::StateUpdate;
use convoy_core::types::{AppStateRecord, Application, ApplicationState, LogEntry};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS apps (
    app_id  TEXT NOT NULL,
    name    TEXT NOT NULL,
    version TEXT NOT NULL,
    url     TEXT NOT NULL,
    PRIMARY KEY (app_id, version)
);

CREATE TABLE IF NOT EXISTS app_states (
    state_id          TEXT PRIMARY KEY,
    app_id            TEXT NOT NULL,
    robot_id          TEXT NOT NULL,
    state             TEXT NOT NULL,
    version           TEXT NOT NULL,
    installed_version TEXT NOT NULL,
    retries           INTEGER NOT NULL,
    created_at        TEXT NOT NULL,
    modified_at       TEXT NOT NULL,
    op_performed_at   TEXT NOT NULL,
    UNIQUE (app_id, robot_id)
);

CREATE TABLE IF NOT EXISTS app_logs (
    log_id          TEXT PRIMARY KEY,
    state_id        TEXT NOT NULL,
    app_id          TEXT NOT NULL,
    robot_id        TEXT NOT NULL,
    state           TEXT NOT NULL,
    message         TEXT,
    version         TEXT NOT NULL,
    retries         INTEGER NOT NULL,
    entered_at      TEXT NOT NULL,
    op_performed_at TEXT NOT NULL
);
";

/// Shared handle over the store's SQLite database.
///
/// All access goes through one connection behind a mutex; statements are
/// single-row, so contention stays negligible at fleet scale.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).map_err(Error::storage)?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().map_err(Error::storage)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, Error> {
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(Error::storage)?;
        conn.execute_batch(SCHEMA).map_err(Error::storage)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Insert-or-update catalog entries, keyed by (app_id, version).
    pub fn upsert_catalog(&self, apps: &[Application]) -> Result<(), Error> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(Error::storage)?;
        for app in apps {
            tx.execute(
                "INSERT INTO apps (app_id, name, version, url) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (app_id, version) DO UPDATE SET name = excluded.name, url = excluded.url",
                params![app.app_id, app.name, app.version, app.url],
            )
            .map_err(Error::storage)?;
        }
        tx.commit().map_err(Error::storage)
    }

    pub fn catalog(&self) -> Result<Vec<Application>, Error> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT app_id, name, version, url FROM apps ORDER BY app_id, version")
            .map_err(Error::storage)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Application {
                    app_id: row.get(0)?,
                    name: row.get(1)?,
                    version: row.get(2)?,
                    url: row.get(3)?,
                })
            })
            .map_err(Error::storage)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Error::storage)
    }

    /// Apply one state transition and return the record's stable state id.
    ///
    /// Lookup and insert run inside a single transaction, and the table
    /// carries a UNIQUE (app_id, robot_id) index, so concurrent first-time
    /// reports for the same pair cannot mint two state ids.
    ///
    /// Only a COMPLETED transition advances `installed_version`; a first
    /// report initializes it to the reported version.
    pub fn upsert_state(&self, update: &StateUpdate, now: DateTime<Utc>) -> Result<String, Error> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(Error::storage)?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT state_id FROM app_states WHERE app_id = ?1 AND robot_id = ?2",
                params![update.app_id, update.robot_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Error::storage)?;

        let state_id = match existing {
            Some(state_id) => {
                if update.state == ApplicationState::Completed {
                    tx.execute(
                        "UPDATE app_states
                         SET state = ?1, version = ?2, retries = ?3, modified_at = ?4,
                             op_performed_at = ?5, installed_version = ?2
                         WHERE state_id = ?6",
                        params![
                            update.state.as_str(),
                            update.version,
                            update.retry_count,
                            now.to_rfc3339(),
                            update.timestamp.to_rfc3339(),
                            state_id,
                        ],
                    )
                    .map_err(Error::storage)?;
                } else {
                    tx.execute(
                        "UPDATE app_states
                         SET state = ?1, version = ?2, retries = ?3, modified_at = ?4,
                             op_performed_at = ?5
                         WHERE state_id = ?6",
                        params![
                            update.state.as_str(),
                            update.version,
                            update.retry_count,
                            now.to_rfc3339(),
                            update.timestamp.to_rfc3339(),
                            state_id,
                        ],
                    )
                    .map_err(Error::storage)?;
                }
                state_id
            }
            None => {
                let state_id = Uuid::new_v4().to_string();
                tx.execute(
                    "INSERT INTO app_states
                     (state_id, app_id, robot_id, state, version, installed_version, retries,
                      created_at, modified_at, op_performed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?9)",
                    params![
                        state_id,
                        update.app_id,
                        update.robot_id,
                        update.state.as_str(),
                        update.version,
                        update.version,
                        update.retry_count,
                        now.to_rfc3339(),
                        update.timestamp.to_rfc3339(),
                    ],
                )
                .map_err(Error::storage)?;
                state_id
            }
        };

        tx.commit().map_err(Error::storage)?;
        Ok(state_id)
    }

    pub fn state_record(
        &self,
        app_id: &str,
        robot_id: &str,
    ) -> Result<Option<AppStateRecord>, Error> {
        let conn = self.conn();
        conn.query_row(
            "SELECT state_id, app_id, robot_id, state, version, installed_version, retries,
                    created_at, modified_at, op_performed_at
             FROM app_states WHERE app_id = ?1 AND robot_id = ?2",
            params![app_id, robot_id],
            map_state_row,
        )
        .optional()
        .map_err(Error::storage)
    }

    pub fn append_log(&self, entry: &LogEntry) -> Result<(), Error> {
        self.conn()
            .execute(
                "INSERT INTO app_logs
                 (log_id, state_id, app_id, robot_id, state, message, version, retries,
                  entered_at, op_performed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    entry.log_id,
                    entry.state_id,
                    entry.app_id,
                    entry.robot_id,
                    entry.state.as_str(),
                    entry.message,
                    entry.version,
                    entry.retries,
                    entry.entered_at.to_rfc3339(),
                    entry.op_performed_at.to_rfc3339(),
                ],
            )
            .map(|_| ())
            .map_err(Error::storage)
    }

    pub fn logs_for(&self, app_id: &str, robot_id: &str) -> Result<Vec<LogEntry>, Error> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT log_id, state_id, app_id, robot_id, state, message, version, retries,
                        entered_at, op_performed_at
                 FROM app_logs WHERE app_id = ?1 AND robot_id = ?2 ORDER BY rowid",
            )
            .map_err(Error::storage)?;
        let rows = stmt
            .query_map(params![app_id, robot_id], |row| {
                Ok(LogEntry {
                    log_id: row.get(0)?,
                    state_id: row.get(1)?,
                    app_id: row.get(2)?,
                    robot_id: row.get(3)?,
                    state: parse_state(row.get::<_, String>(4)?)?,
                    message: row.get(5)?,
                    version: row.get(6)?,
                    retries: row.get(7)?,
                    entered_at: parse_timestamp(row.get::<_, String>(8)?)?,
                    op_performed_at: parse_timestamp(row.get::<_, String>(9)?)?,
                })
            })
            .map_err(Error::storage)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Error::storage)
    }
}

fn map_state_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppStateRecord> {
    Ok(AppStateRecord {
        state_id: row.get(0)?,
        app_id: row.get(1)?,
        robot_id: row.get(2)?,
        state: parse_state(row.get::<_, String>(3)?)?,
        version: row.get(4)?,
        installed_version: row.get(5)?,
        retries: row.get(6)?,
        created_at: parse_timestamp(row.get::<_, String>(7)?)?,
        modified_at: parse_timestamp(row.get::<_, String>(8)?)?,
        op_performed_at: parse_timestamp(row.get::<_, String>(9)?)?,
    })
}

fn parse_state(raw: String) -> rusqlite::Result<ApplicationState> {
    ApplicationState::from_str(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, err.into()))
}

fn parse_timestamp(raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
        })
}

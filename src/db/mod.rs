pub mod catalog;
pub mod progress;
pub mod reviews;
pub mod schema;

use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{Card, CardId, CardMemoryState, Grade, LevelId, Scope};
use crate::srs::{self, StudyClock};
use crate::store::{CardFilter, ProgressStore, StoreError, StoreResult};

pub use schema::run_migrations;

pub type DbPool = Arc<Mutex<Connection>>;

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
    /// Log the error at warn level and return None
    fn log_warn(self, context: &str) -> Option<T>;
    /// Log the error at warn level and return the default
    fn log_warn_default(self, context: &str) -> T
    where
        T: Default;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
    fn log_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                None
            }
        }
    }

    fn log_warn_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                T::default()
            }
        }
    }
}

/// Try to acquire the database lock, reporting a poisoned mutex as unavailable
pub fn try_lock(pool: &DbPool) -> StoreResult<MutexGuard<'_, Connection>> {
    pool.lock().map_err(|_| {
        tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
        StoreError::Unavailable("database lock poisoned".to_string())
    })
}

pub fn init_db(path: &Path) -> rusqlite::Result<DbPool> {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Could not create {}: {}", parent.display(), e);
        }
    }

    // Create backup before migrations if database exists
    if path.exists() {
        let backup_path = path.with_extension("db.backup");
        if let Err(e) = std::fs::copy(path, &backup_path) {
            tracing::warn!("Could not create database backup: {}", e);
        }
    }

    let conn = Connection::open(path)?;
    run_migrations(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// SQLite-backed progress store.
///
/// All access goes through one connection behind a mutex; `apply_grade`
/// holds it for a whole IMMEDIATE transaction, which serializes concurrent
/// grades of the same (learner, card).
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn open(path: &Path) -> StoreResult<Self> {
        Ok(Self::new(init_db(path)?))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        try_lock(&self.pool)
    }
}

impl ProgressStore for SqliteStore {
    fn read_memory_state(
        &self,
        learner_id: &str,
        card_id: CardId,
    ) -> StoreResult<Option<CardMemoryState>> {
        let conn = self.conn()?;
        Ok(progress::read_memory_state(&conn, learner_id, card_id)?)
    }

    fn write_memory_state(&self, state: &CardMemoryState) -> StoreResult<()> {
        let conn = self.conn()?;
        if !catalog::card_exists(&conn, state.card_id)? {
            return Err(StoreError::NotFound);
        }
        Ok(progress::write_memory_state(&conn, state)?)
    }

    fn query_cards(&self, scope: Scope, filter: CardFilter<'_>) -> StoreResult<Vec<Card>> {
        let conn = self.conn()?;
        if !catalog::scope_exists(&conn, scope)? {
            return Err(StoreError::NotFound);
        }
        let cards = match filter.due_for {
            Some((learner_id, today)) => progress::get_due_cards(&conn, scope, learner_id, today)?,
            None => progress::get_cards_in_scope(&conn, scope)?,
        };
        Ok(cards)
    }

    fn query_due_counts(
        &self,
        scope: Scope,
        learner_id: &str,
        today: NaiveDate,
    ) -> StoreResult<BTreeMap<LevelId, u32>> {
        let conn = self.conn()?;
        if !catalog::scope_exists(&conn, scope)? {
            return Err(StoreError::NotFound);
        }
        Ok(progress::get_due_counts(&conn, scope, learner_id, today)?)
    }

    fn apply_grade(
        &self,
        learner_id: &str,
        card_id: CardId,
        grade: Grade,
        clock: &StudyClock,
    ) -> StoreResult<CardMemoryState> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !catalog::card_exists(&tx, card_id)? {
            return Err(StoreError::NotFound);
        }

        let current = progress::read_memory_state(&tx, learner_id, card_id)?;
        let next = srs::next_state(learner_id, card_id, current.as_ref(), grade, clock);
        progress::write_memory_state(&tx, &next)?;
        reviews::insert_review_log(&tx, &next, grade)?;
        tx.commit()?;

        Ok(next)
    }
}

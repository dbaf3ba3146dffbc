//! Persistence seam between the scheduling core and the record store.
//!
//! The core needs four primitives from whatever holds learner progress and
//! the card catalog. [`crate::db::SqliteStore`] is the production
//! implementation; [`crate::testing::MemoryStore`] backs unit tests.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::{Card, CardId, CardMemoryState, Grade, LevelId, Scope};
use crate::srs::{self, StudyClock};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Transient failure; retrying the whole operation is safe.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The referenced scope or card does not exist.
    #[error("not found")]
    NotFound,
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound,
            other => Self::Unavailable(other.to_string()),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Card query filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardFilter<'a> {
    /// Restrict to cards due for this learner on this day; `None` returns
    /// every card in scope.
    pub due_for: Option<(&'a str, NaiveDate)>,
}

impl<'a> CardFilter<'a> {
    pub fn all() -> Self {
        Self { due_for: None }
    }

    pub fn due(learner_id: &'a str, today: NaiveDate) -> Self {
        Self {
            due_for: Some((learner_id, today)),
        }
    }
}

pub trait ProgressStore {
    fn read_memory_state(
        &self,
        learner_id: &str,
        card_id: CardId,
    ) -> StoreResult<Option<CardMemoryState>>;

    fn write_memory_state(&self, state: &CardMemoryState) -> StoreResult<()>;

    /// Cards in `scope` matching `filter`, in storage order.
    ///
    /// Returns `NotFound` when the scope itself does not exist.
    fn query_cards(&self, scope: Scope, filter: CardFilter<'_>) -> StoreResult<Vec<Card>>;

    /// Due cards per level for every level in `scope` (zero counts included).
    fn query_due_counts(
        &self,
        scope: Scope,
        learner_id: &str,
        today: NaiveDate,
    ) -> StoreResult<BTreeMap<LevelId, u32>>;

    /// Read-modify-write of one card's state for one grade.
    ///
    /// The default is not atomic; stores shared between sessions override it
    /// so that the read and the write cannot interleave with another grade
    /// of the same (learner, card).
    fn apply_grade(
        &self,
        learner_id: &str,
        card_id: CardId,
        grade: Grade,
        clock: &StudyClock,
    ) -> StoreResult<CardMemoryState> {
        let current = self.read_memory_state(learner_id, card_id)?;
        let next = srs::next_state(learner_id, card_id, current.as_ref(), grade, clock);
        self.write_memory_state(&next)?;
        Ok(next)
    }
}

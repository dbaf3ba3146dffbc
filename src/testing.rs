//! Test utilities.
//!
//! [`MemoryStore`] is an in-process [`ProgressStore`] for scheduler tests;
//! [`TestEnv`] is a real SQLite store in a temporary directory, seeded with
//! one course, one level and three cards.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;

use crate::db::{catalog, SqliteStore};
use crate::domain::{Card, CardId, CardMemoryState, CourseId, Grade, LevelId, Scope};
use crate::srs::{self, StudyClock};
use crate::store::{CardFilter, ProgressStore, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    courses: BTreeMap<CourseId, Vec<LevelId>>,
    cards: BTreeMap<CardId, Card>,
    states: HashMap<(String, CardId), CardMemoryState>,
    unavailable: bool,
}

impl Inner {
    fn check(&self) -> StoreResult<()> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }

    fn levels_in(&self, scope: Scope) -> Option<Vec<LevelId>> {
        match scope {
            Scope::Course(id) => self.courses.get(&id).cloned(),
            Scope::Level(id) => self
                .courses
                .values()
                .any(|levels| levels.contains(&id))
                .then(|| vec![id]),
        }
    }

    fn is_due(&self, learner_id: &str, card_id: CardId, today: NaiveDate) -> bool {
        self.states
            .get(&(learner_id.to_string(), card_id))
            .is_none_or(|s| s.is_due(today))
    }
}

/// Progress store held in memory behind a mutex.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_course(&self, course_id: CourseId, levels: &[LevelId]) {
        self.lock().courses.insert(course_id, levels.to_vec());
    }

    pub fn add_card(&self, card: Card) {
        self.lock().cards.insert(card.id, card);
    }

    /// Store a state directly, bypassing the unavailable switch
    pub fn put_state(&self, state: CardMemoryState) {
        self.lock()
            .states
            .insert((state.learner_id.clone(), state.card_id), state);
    }

    /// Make every subsequent call fail with `Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    pub fn state_count(&self) -> usize {
        self.lock().states.len()
    }
}

impl ProgressStore for MemoryStore {
    fn read_memory_state(
        &self,
        learner_id: &str,
        card_id: CardId,
    ) -> StoreResult<Option<CardMemoryState>> {
        let inner = self.lock();
        inner.check()?;
        Ok(inner.states.get(&(learner_id.to_string(), card_id)).cloned())
    }

    fn write_memory_state(&self, state: &CardMemoryState) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.check()?;
        if !inner.cards.contains_key(&state.card_id) {
            return Err(StoreError::NotFound);
        }
        inner
            .states
            .insert((state.learner_id.clone(), state.card_id), state.clone());
        Ok(())
    }

    fn query_cards(&self, scope: Scope, filter: CardFilter<'_>) -> StoreResult<Vec<Card>> {
        let inner = self.lock();
        inner.check()?;
        let levels = inner.levels_in(scope).ok_or(StoreError::NotFound)?;
        Ok(inner
            .cards
            .values()
            .filter(|c| levels.contains(&c.level_id))
            .filter(|c| match filter.due_for {
                Some((learner_id, today)) => inner.is_due(learner_id, c.id, today),
                None => true,
            })
            .cloned()
            .collect())
    }

    fn query_due_counts(
        &self,
        scope: Scope,
        learner_id: &str,
        today: NaiveDate,
    ) -> StoreResult<BTreeMap<LevelId, u32>> {
        let inner = self.lock();
        inner.check()?;
        let levels = inner.levels_in(scope).ok_or(StoreError::NotFound)?;
        let mut counts: BTreeMap<LevelId, u32> = levels.iter().map(|&l| (l, 0)).collect();
        for card in inner.cards.values() {
            if let Some(count) = counts.get_mut(&card.level_id) {
                if inner.is_due(learner_id, card.id, today) {
                    *count += 1;
                }
            }
        }
        Ok(counts)
    }

    fn apply_grade(
        &self,
        learner_id: &str,
        card_id: CardId,
        grade: Grade,
        clock: &StudyClock,
    ) -> StoreResult<CardMemoryState> {
        let mut inner = self.lock();
        inner.check()?;
        if !inner.cards.contains_key(&card_id) {
            return Err(StoreError::NotFound);
        }
        let key = (learner_id.to_string(), card_id);
        let next = srs::next_state(learner_id, card_id, inner.states.get(&key), grade, clock);
        inner.states.insert(key, next.clone());
        Ok(next)
    }
}

/// SQLite store in a temporary directory with a small seeded catalog.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    pub store: SqliteStore,
    pub course: CourseId,
    pub level: LevelId,
    pub cards: Vec<CardId>,
}

impl TestEnv {
    pub fn new() -> StoreResult<Self> {
        let temp = TempDir::new().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let store = SqliteStore::open(&temp.path().join("vocab.db"))?;

        let (course, level, cards) = {
            let conn = store.conn()?;
            let course = catalog::insert_course(&conn, "siSwati 1", Some("First words"))?;
            let level = catalog::insert_level(&conn, course, "Greetings", 1)?;
            let mut cards = Vec::new();
            for (front, back) in [("Sawubona", "Hello"), ("Yebo", "Yes"), ("Cha", "No")] {
                cards.push(catalog::insert_card(&conn, &Card::new(level, front, back))?);
            }
            (course, level, cards)
        };

        Ok(Self {
            temp,
            store,
            course,
            level,
            cards,
        })
    }

    /// Get the temporary directory path for creating test files.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}

//! Due-set selection for a learner and a level or course.
//!
//! A card is due when the learner has no memory state for it yet, or its
//! `due_date` is on or before the clock's `today`. Without a learner (guest
//! mode) every card in scope is returned, unfiltered.

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

use crate::db::LogOnError;
use crate::domain::{Card, LevelId, Scope};
use crate::store::{CardFilter, ProgressStore, StoreError, StoreResult};

use super::clock::StudyClock;

/// Cards to study now, uniformly shuffled.
///
/// A scope that does not exist yields an empty list. Transient store
/// failures are returned so the caller can retry.
pub fn due_cards<S, R>(
  store: &S,
  learner_id: Option<&str>,
  scope: Scope,
  clock: &StudyClock,
  rng: &mut R,
) -> StoreResult<Vec<Card>>
where
  S: ProgressStore + ?Sized,
  R: Rng + ?Sized,
{
  let filter = match learner_id {
    Some(learner) => CardFilter::due(learner, clock.today),
    None => CardFilter::all(),
  };

  let mut cards = match store.query_cards(scope, filter) {
    Ok(cards) => cards,
    Err(StoreError::NotFound) => {
      tracing::debug!("No such {}, nothing due", scope);
      return Ok(Vec::new());
    }
    Err(e) => return Err(e),
  };

  cards.shuffle(rng);
  tracing::debug!(
    "{} cards due in {} for {}",
    cards.len(),
    scope,
    learner_id.unwrap_or("guest")
  );
  Ok(cards)
}

/// Per-level due tally, ordered by level id.
///
/// Never randomized. Guest mode and store failures yield an empty map.
pub fn due_counts<S>(
  store: &S,
  learner_id: Option<&str>,
  scope: Scope,
  clock: &StudyClock,
) -> BTreeMap<LevelId, u32>
where
  S: ProgressStore + ?Sized,
{
  let Some(learner) = learner_id else {
    return BTreeMap::new();
  };

  match store.query_due_counts(scope, learner, clock.today) {
    Err(StoreError::NotFound) => BTreeMap::new(),
    other => other.log_warn_default("Failed to count due cards"),
  }
}

//! One study sitting over a snapshot of due cards.
//!
//! The queue only shrinks: every graded card is removed, so a card is shown
//! at most once per sitting even if its new due date is still today. After a
//! removal the cursor stays on the same index, which now holds the card that
//! followed the removed one, wrapping to the front at the end of the queue.

use rand::Rng;
use std::collections::VecDeque;
use thiserror::Error;

use crate::domain::{Card, CardId, CardMemoryState, Grade, Scope};
use crate::store::{ProgressStore, StoreError};

use super::clock::StudyClock;
use super::due::due_cards;

#[derive(Debug, Error)]
pub enum ReviewError {
  /// The queue is empty; the sitting is over.
  #[error("review session finished")]
  SessionFinished,
  #[error(transparent)]
  Store(#[from] StoreError),
}

/// What a successful `grade` did.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
  pub card_id: CardId,
  pub grade: Grade,
  /// Persisted state; `None` in guest mode or when the card was dropped
  pub state: Option<CardMemoryState>,
  pub remaining: usize,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
  learner_id: Option<String>,
  queue: VecDeque<Card>,
  position: usize,
  revealed: bool,
  graded: usize,
  persisted: usize,
}

impl ReviewSession {
  /// Session over an existing snapshot of cards, presented in the given order.
  pub fn new(learner_id: Option<String>, cards: Vec<Card>) -> Self {
    Self {
      learner_id,
      queue: cards.into(),
      position: 0,
      revealed: false,
      graded: 0,
      persisted: 0,
    }
  }

  /// Session over the current due set of `scope`.
  pub fn start<S, R>(
    store: &S,
    learner_id: Option<String>,
    scope: Scope,
    clock: &StudyClock,
    rng: &mut R,
  ) -> Result<Self, StoreError>
  where
    S: ProgressStore + ?Sized,
    R: Rng + ?Sized,
  {
    let cards = due_cards(store, learner_id.as_deref(), scope, clock, rng)?;
    tracing::info!(
      "Starting session over {} with {} cards for {}",
      scope,
      cards.len(),
      learner_id.as_deref().unwrap_or("guest")
    );
    Ok(Self::new(learner_id, cards))
  }

  pub fn learner_id(&self) -> Option<&str> {
    self.learner_id.as_deref()
  }

  /// Card currently presented, `None` once finished.
  pub fn current(&self) -> Option<&Card> {
    self.queue.get(self.position)
  }

  pub fn position(&self) -> usize {
    self.position
  }

  pub fn is_revealed(&self) -> bool {
    self.revealed
  }

  /// Cards left in the sitting, including the current one.
  pub fn remaining(&self) -> usize {
    self.queue.len()
  }

  pub fn is_finished(&self) -> bool {
    self.queue.is_empty()
  }

  /// Grades applied this sitting (guest grades included).
  pub fn graded(&self) -> usize {
    self.graded
  }

  /// Grades that reached the store this sitting.
  pub fn persisted(&self) -> usize {
    self.persisted
  }

  /// Toggle between front and back of the current card.
  pub fn flip(&mut self) -> Result<bool, ReviewError> {
    if self.is_finished() {
      return Err(ReviewError::SessionFinished);
    }
    self.revealed = !self.revealed;
    Ok(self.revealed)
  }

  /// Grade the current card and move on.
  ///
  /// With a learner, the new memory state is computed and written through
  /// the store before the queue changes; if the store is unavailable the
  /// session is left exactly as it was. A card that no longer exists in the
  /// store is dropped without a state. In guest mode the card only leaves
  /// the local queue.
  pub fn grade<S>(
    &mut self,
    store: &S,
    grade: Grade,
    clock: &StudyClock,
  ) -> Result<GradeOutcome, ReviewError>
  where
    S: ProgressStore + ?Sized,
  {
    let card_id = self.current().map(|c| c.id).ok_or(ReviewError::SessionFinished)?;

    let state = match self.learner_id.as_deref() {
      Some(learner) => match store.apply_grade(learner, card_id, grade, clock) {
        Ok(state) => {
          tracing::debug!(
            "Card {} graded {} by {}: interval {}d, due {}",
            card_id,
            grade,
            learner,
            state.interval_days,
            state.due_date
          );
          self.persisted += 1;
          Some(state)
        }
        // Card deleted since the snapshot was taken: drop it from the queue
        Err(StoreError::NotFound) => {
          tracing::warn!("Card {} no longer exists, dropping it from the session", card_id);
          None
        }
        Err(e) => return Err(e.into()),
      },
      None => {
        tracing::debug!("Guest graded card {} {}, not persisted", card_id, grade);
        None
      }
    };

    self.remove_current();
    self.graded += 1;

    Ok(GradeOutcome {
      card_id,
      grade,
      state,
      remaining: self.queue.len(),
    })
  }

  fn remove_current(&mut self) {
    self.queue.remove(self.position);
    self.revealed = false;
    self.position = if self.queue.is_empty() {
      0
    } else {
      self.position % self.queue.len()
    };
  }
}

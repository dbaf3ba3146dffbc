use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::card::CardId;
use super::review::Grade;
use crate::config;

/// Review statistics for one (learner, card) pair.
///
/// Absent until the learner first grades the card; an absent state means the
/// card is due.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardMemoryState {
  pub learner_id: String,
  pub card_id: CardId,
  /// Consecutive successful recalls since the last lapse
  pub repetition: u32,
  /// Never below `config::MIN_EASINESS`
  pub easiness: f64,
  pub interval_days: u32,
  pub due_date: NaiveDate,
  pub last_result: Option<Grade>,
  pub updated_at: DateTime<Utc>,
}

impl CardMemoryState {
  /// Defaults for a never-reviewed card.
  pub fn fresh(learner_id: &str, card_id: CardId, today: NaiveDate, now: DateTime<Utc>) -> Self {
    Self {
      learner_id: learner_id.to_string(),
      card_id,
      repetition: 0,
      easiness: config::DEFAULT_EASINESS,
      interval_days: 0,
      due_date: today,
      last_result: None,
      updated_at: now,
    }
  }

  pub fn is_due(&self, today: NaiveDate) -> bool {
    self.due_date <= today
  }
}

use crate::config::{
  DEFAULT_EASINESS, FIRST_INTERVAL_DAYS, LAPSE_INTERVAL_DAYS, MIN_EASINESS, SECOND_INTERVAL_DAYS,
};
use crate::domain::{CardId, CardMemoryState, Grade};

use super::clock::StudyClock;

/// Compute the memory state that follows grading a card.
///
/// Pure: the result depends only on the arguments. `current = None` means the
/// learner has never reviewed the card. Persisting the result is the caller's
/// job.
pub fn next_state(
  learner_id: &str,
  card_id: CardId,
  current: Option<&CardMemoryState>,
  grade: Grade,
  clock: &StudyClock,
) -> CardMemoryState {
  let (repetition, easiness, interval) = match current {
    Some(s) => (s.repetition, s.easiness, s.interval_days),
    None => (0, DEFAULT_EASINESS, 0),
  };

  let q = f64::from(grade.quality());

  // EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02))
  let ease_delta = 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
  let new_easiness = (easiness + ease_delta).max(MIN_EASINESS);

  let (new_interval, new_repetition) = if grade.is_lapse() {
    (LAPSE_INTERVAL_DAYS, 0)
  } else {
    let repetition = repetition.saturating_add(1);
    let interval = match repetition {
      1 => FIRST_INTERVAL_DAYS,
      2 => SECOND_INTERVAL_DAYS,
      _ => grow_interval(interval, new_easiness),
    };
    (interval, repetition)
  };

  CardMemoryState {
    learner_id: learner_id.to_string(),
    card_id,
    repetition: new_repetition,
    easiness: new_easiness,
    interval_days: new_interval,
    due_date: clock.days_from_today(new_interval),
    last_result: Some(grade),
    updated_at: clock.now,
  }
}

/// round(interval * easiness), half away from zero, clamped to u32
fn grow_interval(interval: u32, easiness: f64) -> u32 {
  let grown = (f64::from(interval) * easiness).round();
  if grown >= f64::from(u32::MAX) {
    u32::MAX
  } else {
    grown as u32
  }
}

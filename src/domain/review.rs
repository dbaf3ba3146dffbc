use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use super::card::CardId;

/// Learner's self-assessed recall for one card in one review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
  Again,
  Hard,
  Good,
  Easy,
}

impl Grade {
  pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

  /// SM-2 quality score (0-5 scale)
  pub fn quality(&self) -> u8 {
    match self {
      Self::Again => 0,
      Self::Hard => 3,
      Self::Good => 4,
      Self::Easy => 5,
    }
  }

  /// A lapse resets repetition progress
  pub fn is_lapse(&self) -> bool {
    self.quality() < 3
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Again => "again",
      Self::Hard => "hard",
      Self::Good => "good",
      Self::Easy => "easy",
    }
  }

  /// Keyboard shortcut used in the study screen (a/h/g/e)
  pub fn from_key(key: char) -> Option<Self> {
    match key.to_ascii_lowercase() {
      'a' => Some(Self::Again),
      'h' => Some(Self::Hard),
      'g' => Some(Self::Good),
      'e' => Some(Self::Easy),
      _ => None,
    }
  }
}

impl std::fmt::Display for Grade {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl std::str::FromStr for Grade {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "again" => Ok(Self::Again),
      "hard" => Ok(Self::Hard),
      "good" => Ok(Self::Good),
      "easy" => Ok(Self::Easy),
      _ => Err(format!("Invalid grade: {}", s)),
    }
  }
}

impl ToSql for Grade {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(ToSqlOutput::from(self.as_str()))
  }
}

impl FromSql for Grade {
  fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
    value
      .as_str()?
      .parse()
      .map_err(|e: String| FromSqlError::Other(e.into()))
  }
}

/// One persisted grade, appended after every review that reached the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewLog {
  pub id: i64,
  pub learner_id: String,
  pub card_id: CardId,
  pub grade: Grade,
  /// Interval scheduled by this review
  pub interval_days: u32,
  pub reviewed_at: DateTime<Utc>,
}

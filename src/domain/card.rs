use serde::{Deserialize, Serialize};

pub type CourseId = i64;
pub type LevelId = i64;
pub type CardId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
  pub id: CourseId,
  pub title: String,
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
  pub id: LevelId,
  pub course_id: CourseId,
  pub name: String,
  /// Display order within the course (lower first)
  pub sort: i64,
}

/// A vocabulary word as presented during study.
///
/// Cards are read-only to the scheduler: review progress lives in
/// [`CardMemoryState`](super::CardMemoryState), keyed by learner and card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
  pub id: CardId,
  pub level_id: LevelId,
  /// Target-language side shown first
  pub front: String,
  /// Translation revealed on flip
  pub back: String,
  pub part_of_speech: Option<String>,
  /// Opaque storage path of the pronunciation clip
  pub audio_path: Option<String>,
}

impl Card {
  pub fn new(level_id: LevelId, front: impl Into<String>, back: impl Into<String>) -> Self {
    Self {
      id: 0,
      level_id,
      front: front.into(),
      back: back.into(),
      part_of_speech: None,
      audio_path: None,
    }
  }

  pub fn with_audio(mut self, path: impl Into<String>) -> Self {
    self.audio_path = Some(path.into());
    self
  }

  /// Resolve the audio reference against a public asset base URL.
  ///
  /// Returns `None` when the card has no audio. Absolute URLs are passed
  /// through untouched.
  pub fn audio_url(&self, base_url: &str) -> Option<String> {
    let path = self.audio_path.as_deref()?.trim();
    if path.is_empty() {
      return None;
    }
    if path.starts_with("http://") || path.starts_with("https://") {
      return Some(path.to_string());
    }
    Some(format!(
      "{}/{}",
      base_url.trim_end_matches('/'),
      path.trim_start_matches('/')
    ))
  }

  /// Text for the visible side of the card.
  pub fn side(&self, revealed: bool) -> &str {
    if revealed { &self.back } else { &self.front }
  }
}

/// Filter used by due-set queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
  Level(LevelId),
  Course(CourseId),
}

impl std::fmt::Display for Scope {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Scope::Level(id) => write!(f, "level {}", id),
      Scope::Course(id) => write!(f, "course {}", id),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_card_new_defaults() {
    let card = Card::new(3, "Sawubona", "Hello");
    assert_eq!(card.id, 0);
    assert_eq!(card.level_id, 3);
    assert_eq!(card.front, "Sawubona");
    assert_eq!(card.back, "Hello");
    assert!(card.part_of_speech.is_none());
    assert!(card.audio_path.is_none());
  }

  #[test]
  fn test_side_follows_reveal_state() {
    let card = Card::new(1, "Ngiyabonga", "Thank you");
    assert_eq!(card.side(false), "Ngiyabonga");
    assert_eq!(card.side(true), "Thank you");
  }

  #[test]
  fn test_audio_url_joins_base() {
    let card = Card::new(1, "Yebo", "Yes").with_audio("greetings/yebo.mp3");
    assert_eq!(
      card.audio_url("https://cdn.example.org/course-assets/"),
      Some("https://cdn.example.org/course-assets/greetings/yebo.mp3".to_string())
    );
  }

  #[test]
  fn test_audio_url_strips_leading_slash() {
    let card = Card::new(1, "Yebo", "Yes").with_audio("/yebo.mp3");
    assert_eq!(
      card.audio_url("https://cdn.example.org"),
      Some("https://cdn.example.org/yebo.mp3".to_string())
    );
  }

  #[test]
  fn test_audio_url_passes_absolute_through() {
    let card = Card::new(1, "Yebo", "Yes").with_audio("https://other.example.org/a.mp3");
    assert_eq!(
      card.audio_url("https://cdn.example.org"),
      Some("https://other.example.org/a.mp3".to_string())
    );
  }

  #[test]
  fn test_audio_url_none_without_audio() {
    let card = Card::new(1, "Cha", "No");
    assert_eq!(card.audio_url("https://cdn.example.org"), None);

    let blank = Card::new(1, "Cha", "No").with_audio("  ");
    assert_eq!(blank.audio_url("https://cdn.example.org"), None);
  }

  #[test]
  fn test_scope_display() {
    assert_eq!(Scope::Level(4).to_string(), "level 4");
    assert_eq!(Scope::Course(2).to_string(), "course 2");
  }
}

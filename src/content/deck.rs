//! Course deck loading - reads a course, its levels and words from a TOML file.
//!
//! ```toml
//! [course]
//! title = "siSwati 1"
//! description = "First words"
//!
//! [[levels]]
//! name = "Greetings"
//!
//! [[levels.words]]
//! front = "Sawubona"
//! back = "Hello"
//! part_of_speech = "interjection"
//! audio = "greetings/sawubona.mp3"
//! ```
//!
//! Importing always creates a new course; decks are not merged.

use rusqlite::Connection;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::db::catalog;
use crate::domain::{Card, CourseId};

#[derive(Debug, Clone, Deserialize)]
pub struct Deck {
    pub course: DeckCourse,
    #[serde(default)]
    pub levels: Vec<DeckLevel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeckCourse {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeckLevel {
    pub name: String,
    /// Display order; defaults to the level's position in the file
    #[serde(default)]
    pub sort: Option<i64>,
    #[serde(default)]
    pub words: Vec<DeckWord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeckWord {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub part_of_speech: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
}

impl Deck {
    pub fn word_count(&self) -> usize {
        self.levels.iter().map(|l| l.words.len()).sum()
    }

    fn validate(&self) -> Result<(), DeckError> {
        if self.course.title.trim().is_empty() {
            return Err(DeckError::Invalid("course title is empty".to_string()));
        }
        if self.levels.is_empty() {
            return Err(DeckError::Invalid("deck has no levels".to_string()));
        }
        for (i, level) in self.levels.iter().enumerate() {
            if level.name.trim().is_empty() {
                return Err(DeckError::Invalid(format!("level {} has no name", i + 1)));
            }
            for (j, word) in level.words.iter().enumerate() {
                if word.front.trim().is_empty() || word.back.trim().is_empty() {
                    return Err(DeckError::Invalid(format!(
                        "word {} in level '{}' needs both front and back",
                        j + 1,
                        level.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid deck: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl DeckError {
    /// Returns a user-facing error message without exposing filesystem paths.
    pub fn user_message(&self) -> &'static str {
        match self {
            DeckError::Io { .. } => "Failed to read deck file",
            DeckError::Parse(_) => "Failed to parse deck file",
            DeckError::Invalid(_) => "Deck file is incomplete",
            DeckError::Store(_) => "Failed to save deck",
        }
    }
}

/// Parse and validate deck TOML.
pub fn parse_deck(content: &str) -> Result<Deck, DeckError> {
    let deck: Deck = toml::from_str(content)?;
    deck.validate()?;
    Ok(deck)
}

pub fn load_deck(path: &Path) -> Result<Deck, DeckError> {
    let content = fs::read_to_string(path).map_err(|source| DeckError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_deck(&content)
}

/// Result of importing a deck
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResult {
    pub course_id: CourseId,
    pub levels_inserted: usize,
    pub cards_inserted: usize,
}

/// Insert a deck as a new course, all or nothing.
pub fn import_deck(conn: &mut Connection, deck: &Deck) -> Result<ImportResult, DeckError> {
    deck.validate()?;
    let tx = conn.transaction()?;

    let course_id = catalog::insert_course(&tx, deck.course.title.trim(), deck.course.description.as_deref())?;
    let mut cards_inserted = 0;

    for (i, level) in deck.levels.iter().enumerate() {
        let sort = level.sort.unwrap_or(i as i64 + 1);
        let level_id = catalog::insert_level(&tx, course_id, level.name.trim(), sort)?;

        for word in &level.words {
            let mut card = Card::new(level_id, word.front.trim(), word.back.trim());
            card.part_of_speech = word.part_of_speech.clone();
            card.audio_path = word.audio.clone();
            catalog::insert_card(&tx, &card)?;
            cards_inserted += 1;
        }
    }

    tx.commit()?;

    tracing::info!(
        "Imported '{}' as course {} ({} levels, {} cards)",
        deck.course.title,
        course_id,
        deck.levels.len(),
        cards_inserted
    );

    Ok(ImportResult {
        course_id,
        levels_inserted: deck.levels.len(),
        cards_inserted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;
    use crate::domain::Scope;

    const DECK: &str = r#"
[course]
title = "siSwati 1"
description = "First words"

[[levels]]
name = "Greetings"

[[levels.words]]
front = "Sawubona"
back = "Hello"
part_of_speech = "interjection"
audio = "greetings/sawubona.mp3"

[[levels.words]]
front = "Yebo"
back = "Yes"

[[levels]]
name = "Family"
sort = 5

[[levels.words]]
front = "Make"
back = "Mother"
"#;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_parse_deck() {
        let deck = parse_deck(DECK).unwrap();
        assert_eq!(deck.course.title, "siSwati 1");
        assert_eq!(deck.levels.len(), 2);
        assert_eq!(deck.word_count(), 3);
        assert_eq!(deck.levels[0].words[0].audio.as_deref(), Some("greetings/sawubona.mp3"));
        assert_eq!(deck.levels[1].sort, Some(5));
    }

    #[test]
    fn test_import_deck() {
        let mut conn = conn();
        let deck = parse_deck(DECK).unwrap();
        let result = import_deck(&mut conn, &deck).unwrap();
        assert_eq!(result.levels_inserted, 2);
        assert_eq!(result.cards_inserted, 3);

        let levels = catalog::list_levels(&conn, result.course_id).unwrap();
        assert_eq!(levels.iter().map(|l| l.sort).collect::<Vec<_>>(), vec![1, 5]);

        let cards =
            crate::db::progress::get_cards_in_scope(&conn, Scope::Level(levels[0].id)).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].part_of_speech.as_deref(), Some("interjection"));
        assert_eq!(cards[0].audio_path.as_deref(), Some("greetings/sawubona.mp3"));
        assert_eq!(cards[1].audio_path, None);
    }

    #[test]
    fn test_import_twice_creates_two_courses() {
        let mut conn = conn();
        let deck = parse_deck(DECK).unwrap();
        let a = import_deck(&mut conn, &deck).unwrap();
        let b = import_deck(&mut conn, &deck).unwrap();
        assert_ne!(a.course_id, b.course_id);
        assert_eq!(catalog::list_courses(&conn).unwrap().len(), 2);
    }

    #[test]
    fn test_rejects_blank_word() {
        let content = r#"
[course]
title = "Broken"

[[levels]]
name = "One"

[[levels.words]]
front = "Yebo"
back = "  "
"#;
        let err = parse_deck(content).unwrap_err();
        assert!(matches!(err, DeckError::Invalid(_)));
        assert_eq!(err.user_message(), "Deck file is incomplete");
    }

    #[test]
    fn test_rejects_deck_without_levels() {
        let err = parse_deck("[course]\ntitle = \"Empty\"\n").unwrap_err();
        assert!(matches!(err, DeckError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = parse_deck("[course\ntitle = ").unwrap_err();
        assert!(matches!(err, DeckError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_deck(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, DeckError::Io { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("deck.toml");
        fs::write(&path, DECK).unwrap();
        assert_eq!(load_deck(&path).unwrap().word_count(), 3);
    }
}

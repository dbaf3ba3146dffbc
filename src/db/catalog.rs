//! Course, level and card records.
//!
//! Read-only to the scheduler; written only by deck import and tests.

use chrono::Utc;
use rusqlite::{params, Connection, Result};

use crate::domain::{Card, CardId, Course, CourseId, Level, LevelId, Scope};

pub fn insert_course(conn: &Connection, title: &str, description: Option<&str>) -> Result<CourseId> {
    conn.execute(
        "INSERT INTO courses (title, description, created_at) VALUES (?1, ?2, ?3)",
        params![title, description, Utc::now().to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_level(conn: &Connection, course_id: CourseId, name: &str, sort: i64) -> Result<LevelId> {
    conn.execute(
        "INSERT INTO levels (course_id, name, sort) VALUES (?1, ?2, ?3)",
        params![course_id, name, sort],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_card(conn: &Connection, card: &Card) -> Result<CardId> {
    conn.execute(
        r#"
    INSERT INTO cards (level_id, front, back, part_of_speech, audio_path)
    VALUES (?1, ?2, ?3, ?4, ?5)
    "#,
        params![
            card.level_id,
            card.front,
            card.back,
            card.part_of_speech,
            card.audio_path,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Courses, newest first
pub fn list_courses(conn: &Connection) -> Result<Vec<Course>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description FROM courses ORDER BY created_at DESC, id DESC",
    )?;

    let courses = stmt
        .query_map([], |row| {
            Ok(Course {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(courses)
}

/// Levels of a course in display order
pub fn list_levels(conn: &Connection, course_id: CourseId) -> Result<Vec<Level>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT id, course_id, name, sort
    FROM levels
    WHERE course_id = ?1
    ORDER BY sort ASC, id ASC
    "#,
    )?;

    let levels = stmt
        .query_map(params![course_id], |row| {
            Ok(Level {
                id: row.get(0)?,
                course_id: row.get(1)?,
                name: row.get(2)?,
                sort: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(levels)
}

pub fn card_exists(conn: &Connection, id: CardId) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM cards WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )
}

pub fn scope_exists(conn: &Connection, scope: Scope) -> Result<bool> {
    let (sql, id) = match scope {
        Scope::Level(id) => ("SELECT EXISTS(SELECT 1 FROM levels WHERE id = ?1)", id),
        Scope::Course(id) => ("SELECT EXISTS(SELECT 1 FROM courses WHERE id = ?1)", id),
    };
    conn.query_row(sql, params![id], |row| row.get(0))
}

/// SQL predicate restricting `cards c` to a scope; binds the scope id as ?1
pub(crate) fn card_scope_clause(scope: Scope) -> (&'static str, i64) {
    match scope {
        Scope::Level(id) => ("c.level_id = ?1", id),
        Scope::Course(id) => (
            "c.level_id IN (SELECT id FROM levels WHERE course_id = ?1)",
            id,
        ),
    }
}

/// Convert a database row to a Card struct
pub(crate) fn row_to_card(row: &rusqlite::Row) -> Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        level_id: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        part_of_speech: row.get(4)?,
        audio_path: row.get(5)?,
    })
}

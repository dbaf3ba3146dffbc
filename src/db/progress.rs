//! Per-learner memory state and due-set queries

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::collections::BTreeMap;

use crate::domain::{Card, CardId, CardMemoryState, LevelId, Scope};

use super::catalog::{card_scope_clause, row_to_card};

/// Due dates are stored as day numbers (0001-01-01 = 1) so that SQL
/// comparisons order them correctly for every representable year.
pub(crate) fn day_number(date: NaiveDate) -> i32 {
    date.num_days_from_ce()
}

pub fn read_memory_state(
    conn: &Connection,
    learner_id: &str,
    card_id: CardId,
) -> Result<Option<CardMemoryState>> {
    conn.query_row(
        r#"
    SELECT learner_id, card_id, repetition, easiness, interval_days, due_date, last_result, updated_at
    FROM progress
    WHERE learner_id = ?1 AND card_id = ?2
    "#,
        params![learner_id, card_id],
        row_to_state,
    )
    .optional()
}

pub fn write_memory_state(conn: &Connection, state: &CardMemoryState) -> Result<()> {
    conn.execute(
        r#"
    INSERT INTO progress (learner_id, card_id, repetition, easiness, interval_days, due_date,
                          last_result, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(learner_id, card_id) DO UPDATE SET
      repetition = excluded.repetition,
      easiness = excluded.easiness,
      interval_days = excluded.interval_days,
      due_date = excluded.due_date,
      last_result = excluded.last_result,
      updated_at = excluded.updated_at
    "#,
        params![
            state.learner_id,
            state.card_id,
            state.repetition,
            state.easiness,
            state.interval_days,
            day_number(state.due_date),
            state.last_result,
            state.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Every card in scope, in id order
pub fn get_cards_in_scope(conn: &Connection, scope: Scope) -> Result<Vec<Card>> {
    let (clause, scope_id) = card_scope_clause(scope);
    let query = format!(
        r#"
    SELECT c.id, c.level_id, c.front, c.back, c.part_of_speech, c.audio_path
    FROM cards c
    WHERE {}
    ORDER BY c.id ASC
    "#,
        clause
    );
    let mut stmt = conn.prepare(&query)?;

    let cards = stmt
        .query_map(params![scope_id], row_to_card)?
        .collect::<Result<Vec<_>>>()?;
    Ok(cards)
}

/// Cards in scope the learner has never reviewed or whose due date has arrived
pub fn get_due_cards(
    conn: &Connection,
    scope: Scope,
    learner_id: &str,
    today: NaiveDate,
) -> Result<Vec<Card>> {
    let (clause, scope_id) = card_scope_clause(scope);
    let query = format!(
        r#"
    SELECT c.id, c.level_id, c.front, c.back, c.part_of_speech, c.audio_path
    FROM cards c
    LEFT JOIN progress p ON p.card_id = c.id AND p.learner_id = ?2
    WHERE {}
      AND (p.card_id IS NULL OR p.due_date <= ?3)
    ORDER BY c.id ASC
    "#,
        clause
    );
    let mut stmt = conn.prepare(&query)?;

    let cards = stmt
        .query_map(
            params![scope_id, learner_id, day_number(today)],
            row_to_card,
        )?
        .collect::<Result<Vec<_>>>()?;
    Ok(cards)
}

/// Due tally for every level in scope, zero counts included
pub fn get_due_counts(
    conn: &Connection,
    scope: Scope,
    learner_id: &str,
    today: NaiveDate,
) -> Result<BTreeMap<LevelId, u32>> {
    let (level_clause, scope_id) = match scope {
        Scope::Level(id) => ("l.id = ?1", id),
        Scope::Course(id) => ("l.course_id = ?1", id),
    };
    let query = format!(
        r#"
    SELECT l.id,
           (SELECT COUNT(*)
            FROM cards c
            LEFT JOIN progress p ON p.card_id = c.id AND p.learner_id = ?2
            WHERE c.level_id = l.id
              AND (p.card_id IS NULL OR p.due_date <= ?3)) AS due_count
    FROM levels l
    WHERE {}
    ORDER BY l.id ASC
    "#,
        level_clause
    );
    let mut stmt = conn.prepare(&query)?;

    let counts = stmt
        .query_map(
            params![scope_id, learner_id, day_number(today)],
            |row| Ok((row.get::<_, LevelId>(0)?, row.get::<_, u32>(1)?)),
        )?
        .collect::<Result<BTreeMap<_, _>>>()?;
    Ok(counts)
}

fn row_to_state(row: &rusqlite::Row) -> Result<CardMemoryState> {
    let due_day: i32 = row.get(5)?;
    let updated_at_str: String = row.get(7)?;

    Ok(CardMemoryState {
        learner_id: row.get(0)?,
        card_id: row.get(1)?,
        repetition: row.get(2)?,
        easiness: row.get(3)?,
        interval_days: row.get(4)?,
        due_date: NaiveDate::from_num_days_from_ce_opt(due_day).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                Type::Integer,
                format!("due day {} out of range", due_day).into(),
            )
        })?,
        last_result: row.get(6)?,
        updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{catalog, run_migrations};
    use crate::domain::Grade;

    struct Fixture {
        conn: Connection,
        course: i64,
        greetings: i64,
        family: i64,
        cards: Vec<i64>,
    }

    /// Course with two levels: three cards in greetings, one in family
    fn fixture() -> Fixture {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let course = catalog::insert_course(&conn, "siSwati 1", None).unwrap();
        let greetings = catalog::insert_level(&conn, course, "Greetings", 1).unwrap();
        let family = catalog::insert_level(&conn, course, "Family", 2).unwrap();
        let mut cards = Vec::new();
        for (front, back) in [("Sawubona", "Hello"), ("Yebo", "Yes"), ("Cha", "No")] {
            cards.push(catalog::insert_card(&conn, &Card::new(greetings, front, back)).unwrap());
        }
        cards.push(catalog::insert_card(&conn, &Card::new(family, "Make", "Mother")).unwrap());
        Fixture { conn, course, greetings, family, cards }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, d).unwrap()
    }

    fn state(card_id: i64, due: NaiveDate) -> CardMemoryState {
        CardMemoryState {
            learner_id: "thandi".to_string(),
            card_id,
            repetition: 2,
            easiness: 2.36,
            interval_days: 3,
            due_date: due,
            last_result: Some(Grade::Hard),
            updated_at: DateTime::parse_from_rfc3339("2025-02-01T08:15:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn test_write_then_read_state() {
        let f = fixture();
        let s = state(f.cards[0], day(4));
        write_memory_state(&f.conn, &s).unwrap();
        assert_eq!(read_memory_state(&f.conn, "thandi", f.cards[0]).unwrap(), Some(s));
    }

    #[test]
    fn test_write_overwrites_existing_row() {
        let f = fixture();
        write_memory_state(&f.conn, &state(f.cards[0], day(4))).unwrap();
        let mut updated = state(f.cards[0], day(12));
        updated.repetition = 3;
        write_memory_state(&f.conn, &updated).unwrap();

        let rows: i64 = f
            .conn
            .query_row("SELECT COUNT(*) FROM progress", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(read_memory_state(&f.conn, "thandi", f.cards[0]).unwrap(), Some(updated));
    }

    #[test]
    fn test_read_absent_state() {
        let f = fixture();
        assert_eq!(read_memory_state(&f.conn, "thandi", f.cards[0]).unwrap(), None);
    }

    #[test]
    fn test_due_cards_boundaries() {
        let f = fixture();
        write_memory_state(&f.conn, &state(f.cards[0], day(9))).unwrap();
        write_memory_state(&f.conn, &state(f.cards[1], day(10))).unwrap();
        write_memory_state(&f.conn, &state(f.cards[2], day(11))).unwrap();

        let due = get_due_cards(&f.conn, Scope::Level(f.greetings), "thandi", day(10)).unwrap();
        let ids: Vec<_> = due.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![f.cards[0], f.cards[1]]);
    }

    #[test]
    fn test_due_dates_past_year_9999_are_not_due() {
        let f = fixture();
        let far = NaiveDate::from_ymd_opt(10_000, 1, 1).unwrap();
        let s = state(f.cards[0], far);
        write_memory_state(&f.conn, &s).unwrap();
        write_memory_state(&f.conn, &state(f.cards[1], NaiveDate::MAX)).unwrap();

        assert!(!s.is_due(day(10)));
        let due = get_due_cards(&f.conn, Scope::Level(f.greetings), "thandi", day(10)).unwrap();
        let ids: Vec<_> = due.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![f.cards[2]]);

        let counts = get_due_counts(&f.conn, Scope::Level(f.greetings), "thandi", day(10)).unwrap();
        assert_eq!(counts, BTreeMap::from([(f.greetings, 1)]));

        assert_eq!(read_memory_state(&f.conn, "thandi", f.cards[0]).unwrap(), Some(s));
        let max = read_memory_state(&f.conn, "thandi", f.cards[1]).unwrap().unwrap();
        assert_eq!(max.due_date, NaiveDate::MAX);
    }

    #[test]
    fn test_due_day_ordering_matches_dates() {
        let dates = [
            NaiveDate::from_ymd_opt(1999, 12, 31).unwrap(),
            day(10),
            NaiveDate::from_ymd_opt(9_999, 12, 31).unwrap(),
            NaiveDate::from_ymd_opt(10_000, 1, 1).unwrap(),
            NaiveDate::MAX,
        ];
        for pair in dates.windows(2) {
            assert!(day_number(pair[0]) < day_number(pair[1]));
        }
    }

    #[test]
    fn test_due_cards_per_learner() {
        let f = fixture();
        write_memory_state(&f.conn, &state(f.cards[0], day(20))).unwrap();

        let sipho = get_due_cards(&f.conn, Scope::Level(f.greetings), "sipho", day(10)).unwrap();
        assert_eq!(sipho.len(), 3);
        let thandi = get_due_cards(&f.conn, Scope::Level(f.greetings), "thandi", day(10)).unwrap();
        assert_eq!(thandi.len(), 2);
    }

    #[test]
    fn test_course_scope() {
        let f = fixture();
        let all = get_cards_in_scope(&f.conn, Scope::Course(f.course)).unwrap();
        assert_eq!(all.len(), 4);
        let due = get_due_cards(&f.conn, Scope::Course(f.course), "thandi", day(10)).unwrap();
        assert_eq!(due.len(), 4);
        let level = get_cards_in_scope(&f.conn, Scope::Level(f.family)).unwrap();
        assert_eq!(level.len(), 1);
        assert_eq!(level[0].front, "Make");
    }

    #[test]
    fn test_due_counts_include_zero_levels() {
        let f = fixture();
        write_memory_state(&f.conn, &state(f.cards[3], day(30))).unwrap();
        write_memory_state(&f.conn, &state(f.cards[2], day(30))).unwrap();

        let counts = get_due_counts(&f.conn, Scope::Course(f.course), "thandi", day(10)).unwrap();
        assert_eq!(counts, BTreeMap::from([(f.greetings, 2), (f.family, 0)]));

        let single = get_due_counts(&f.conn, Scope::Level(f.family), "thandi", day(30)).unwrap();
        assert_eq!(single, BTreeMap::from([(f.family, 1)]));
    }

    #[test]
    fn test_due_counts_unknown_scope_empty() {
        let f = fixture();
        let counts = get_due_counts(&f.conn, Scope::Course(f.course + 1), "thandi", day(10)).unwrap();
        assert!(counts.is_empty());
    }

    #[test]
    fn test_corrupt_due_date_is_an_error() {
        let f = fixture();
        f.conn
            .execute(
                "INSERT INTO progress (learner_id, card_id, due_date, updated_at) VALUES ('thandi', ?1, 'soon', '2025-02-01T00:00:00Z')",
                params![f.cards[0]],
            )
            .unwrap();
        assert!(read_memory_state(&f.conn, "thandi", f.cards[0]).is_err());

        f.conn
            .execute(
                "INSERT INTO progress (learner_id, card_id, due_date, updated_at) VALUES ('thandi', ?1, ?2, '2025-02-01T00:00:00Z')",
                params![f.cards[1], i32::MAX],
            )
            .unwrap();
        assert!(read_memory_state(&f.conn, "thandi", f.cards[1]).is_err());
    }
}

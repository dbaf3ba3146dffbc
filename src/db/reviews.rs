//! Review history

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Result};

use crate::domain::{CardId, CardMemoryState, Grade, ReviewLog};

/// Append the review that produced `state`.
pub fn insert_review_log(conn: &Connection, state: &CardMemoryState, grade: Grade) -> Result<i64> {
    conn.execute(
        r#"
    INSERT INTO review_logs (learner_id, card_id, grade, interval_days, reviewed_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    "#,
        params![
            state.learner_id,
            state.card_id,
            grade,
            state.interval_days,
            state.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Reviews of one card by one learner, oldest first
pub fn get_review_logs(conn: &Connection, learner_id: &str, card_id: CardId) -> Result<Vec<ReviewLog>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT id, learner_id, card_id, grade, interval_days, reviewed_at
    FROM review_logs
    WHERE learner_id = ?1 AND card_id = ?2
    ORDER BY id ASC
    "#,
    )?;

    let logs = stmt
        .query_map(params![learner_id, card_id], |row| {
            let reviewed_at_str: String = row.get(5)?;
            Ok(ReviewLog {
                id: row.get(0)?,
                learner_id: row.get(1)?,
                card_id: row.get(2)?,
                grade: row.get(3)?,
                interval_days: row.get(4)?,
                reviewed_at: DateTime::parse_from_rfc3339(&reviewed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;

    Ok(logs)
}

/// Number of reviews a learner has logged since `since`
pub fn count_reviews_since(conn: &Connection, learner_id: &str, since: DateTime<Utc>) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM review_logs WHERE learner_id = ?1 AND reviewed_at >= ?2",
        params![learner_id, since.to_rfc3339()],
        |row| row.get(0),
    )
}

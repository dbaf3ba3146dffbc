use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Complete schema for new databases; migrations below upgrade older files
  conn.execute_batch(
    r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS courses (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      title TEXT NOT NULL,
      description TEXT,
      created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS levels (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      course_id INTEGER NOT NULL,
      name TEXT NOT NULL,
      sort INTEGER NOT NULL DEFAULT 0,
      FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS cards (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      level_id INTEGER NOT NULL,
      front TEXT NOT NULL,
      back TEXT NOT NULL,
      part_of_speech TEXT,
      audio_path TEXT,
      FOREIGN KEY (level_id) REFERENCES levels(id) ON DELETE CASCADE
    );

    -- One row per (learner, card); absent row = never reviewed = due
    CREATE TABLE IF NOT EXISTS progress (
      learner_id TEXT NOT NULL,
      card_id INTEGER NOT NULL,
      repetition INTEGER NOT NULL DEFAULT 0,
      easiness REAL NOT NULL DEFAULT 2.5,
      interval_days INTEGER NOT NULL DEFAULT 0,
      -- Days since 0001-01-01 (day 1), see progress::day_number
      due_date INTEGER NOT NULL,
      last_result TEXT,
      updated_at TEXT NOT NULL,
      PRIMARY KEY (learner_id, card_id),
      FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS review_logs (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      learner_id TEXT NOT NULL,
      card_id INTEGER NOT NULL,
      grade TEXT NOT NULL,
      interval_days INTEGER NOT NULL,
      reviewed_at TEXT NOT NULL,
      FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_levels_course_id ON levels(course_id);
    CREATE INDEX IF NOT EXISTS idx_cards_level_id ON cards(level_id);
    CREATE INDEX IF NOT EXISTS idx_progress_learner_due ON progress(learner_id, due_date);
    CREATE INDEX IF NOT EXISTS idx_review_logs_learner_card ON review_logs(learner_id, card_id);
    "#,
  )?;

  // ============================================================
  // MIGRATIONS FOR EXISTING DATABASES
  // No-ops for new databases (columns already exist)
  // ============================================================

  // Word metadata added after the first deck imports
  add_column_if_missing(conn, "cards", "part_of_speech", "TEXT")?;

  Ok(())
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
  conn
    .prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
    .is_ok()
}

/// Add a column if it doesn't already exist
fn add_column_if_missing(conn: &Connection, table: &str, column: &str, column_def: &str) -> Result<()> {
  if !column_exists(conn, table, column) {
    tracing::info!("Migrating: adding {}.{}", table, column);
    conn.execute(
      &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def),
      [],
    )?;
  }
  Ok(())
}

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vocab_srs::config::{self, Settings};
use vocab_srs::content::{self, DeckError};
use vocab_srs::db::{catalog, reviews, LogOnError, SqliteStore};
use vocab_srs::domain::{Course, Grade, Level, LevelId, Scope};
use vocab_srs::srs::{self, ReviewError, ReviewSession, StudyClock};
use vocab_srs::store::StoreError;

#[derive(Parser)]
#[command(name = "vocab-srs")]
#[command(about = "Vocabulary flashcards with spaced repetition", long_about = None)]
struct Cli {
  /// Database file (overrides config.toml and DATABASE_PATH)
  #[arg(long, global = true)]
  db: Option<PathBuf>,

  /// Learner to study as; omit for guest mode
  #[arg(long, global = true)]
  learner: Option<String>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Import a course deck from a TOML file
  Import { path: PathBuf },
  /// List courses with the number of words due per level
  Courses {
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
  },
  /// Study the due words of one level
  Study { level_id: LevelId },
}

#[derive(Debug, Error)]
enum CliError {
  #[error(transparent)]
  Store(#[from] StoreError),
  #[error(transparent)]
  Deck(#[from] DeckError),
  #[error(transparent)]
  Review(#[from] ReviewError),
  #[error("no level with id {0}")]
  UnknownLevel(LevelId),
  #[error(transparent)]
  Io(#[from] io::Error),
  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct CourseOverview {
  #[serde(flatten)]
  course: Course,
  levels: Vec<LevelOverview>,
}

#[derive(Serialize)]
struct LevelOverview {
  #[serde(flatten)]
  level: Level,
  /// Absent in guest mode
  due: Option<u32>,
}

fn main() -> ExitCode {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vocab_srs=info".into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
    .init();

  let cli = Cli::parse();
  let mut settings = config::load_settings();
  if let Some(db) = cli.db {
    settings.database_path = db;
  }
  if let Some(learner) = cli.learner.filter(|l| !l.trim().is_empty()) {
    settings.learner = Some(learner);
  }

  let result = SqliteStore::open(&settings.database_path)
    .map_err(CliError::from)
    .and_then(|store| match cli.command {
      Commands::Import { path } => import(&store, &path),
      Commands::Courses { json } => courses(&store, &settings, json),
      Commands::Study { level_id } => study(&store, &settings, level_id),
    });

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      tracing::error!("{}", e);
      if let CliError::Deck(deck) = &e {
        eprintln!("{}", deck.user_message());
      } else {
        eprintln!("error: {}", e);
      }
      ExitCode::FAILURE
    }
  }
}

fn import(store: &SqliteStore, path: &std::path::Path) -> Result<(), CliError> {
  let deck = content::load_deck(path)?;
  let mut conn = store.conn()?;
  let result = content::import_deck(&mut conn, &deck)?;
  println!(
    "Imported \"{}\": {} levels, {} words (course {})",
    deck.course.title, result.levels_inserted, result.cards_inserted, result.course_id
  );
  Ok(())
}

fn courses(store: &SqliteStore, settings: &Settings, json: bool) -> Result<(), CliError> {
  let clock = StudyClock::with_offset_minutes(settings.utc_offset_minutes);
  let learner = settings.learner.as_deref();

  let courses = {
    let conn = store.conn()?;
    catalog::list_courses(&conn).map_err(StoreError::from)?
  };

  let mut overview = Vec::with_capacity(courses.len());
  for course in courses {
    let levels = {
      let conn = store.conn()?;
      catalog::list_levels(&conn, course.id).map_err(StoreError::from)?
    };
    let counts = srs::due_counts(store, learner, Scope::Course(course.id), &clock);
    let levels = levels
      .into_iter()
      .map(|level| LevelOverview {
        due: learner.map(|_| counts.get(&level.id).copied().unwrap_or(0)),
        level,
      })
      .collect();
    overview.push(CourseOverview { course, levels });
  }

  if json {
    println!("{}", serde_json::to_string_pretty(&overview)?);
    return Ok(());
  }

  if overview.is_empty() {
    println!("No courses yet. Import one with `vocab-srs import <deck.toml>`.");
    return Ok(());
  }

  for entry in &overview {
    println!("{} (course {})", entry.course.title, entry.course.id);
    if let Some(description) = &entry.course.description {
      println!("  {}", description);
    }
    for level in &entry.levels {
      match level.due {
        Some(0) => println!("  [{:>4}] {}", level.level.id, level.level.name),
        Some(due) => println!("  [{:>4}] {}  ({} due)", level.level.id, level.level.name, due),
        None => println!("  [{:>4}] {}", level.level.id, level.level.name),
      }
    }
  }

  if let Some(learner) = learner {
    let start = clock.day_start();
    let conn = store.conn()?;
    let today = reviews::count_reviews_since(&conn, learner, start)
      .log_warn_default("Failed to count today's reviews");
    println!("\n{} reviews today for {}", today, learner);
  }
  Ok(())
}

fn study(store: &SqliteStore, settings: &Settings, level_id: LevelId) -> Result<(), CliError> {
  let clock = StudyClock::with_offset_minutes(settings.utc_offset_minutes);
  {
    let conn = store.conn()?;
    if !catalog::scope_exists(&conn, Scope::Level(level_id)).map_err(StoreError::from)? {
      return Err(CliError::UnknownLevel(level_id));
    }
  }

  let mut rng = rand::rng();
  let mut session = ReviewSession::start(
    store,
    settings.learner.clone(),
    Scope::Level(level_id),
    &clock,
    &mut rng,
  )?;

  if session.is_finished() {
    println!("Nothing due in this level. Come back tomorrow!");
    return Ok(());
  }
  if session.learner_id().is_none() {
    println!("Guest mode: progress will not be saved.");
  }

  let stdin = io::stdin();
  let mut lines = stdin.lock().lines();
  let mut stdout = io::stdout();

  while let Some(card) = session.current() {
    println!();
    println!("{}", card.side(session.is_revealed()));
    if session.is_revealed() {
      if let Some(pos) = &card.part_of_speech {
        println!("  ({})", pos);
      }
      if let Some(url) = settings
        .audio_base_url
        .as_deref()
        .and_then(|base| card.audio_url(base))
      {
        println!("  audio: {}", url);
      }
    }
    print!(
      "[{} left] enter: flip, a: again, h: hard, g: good, e: easy, q: quit > ",
      session.remaining()
    );
    stdout.flush()?;

    let Some(line) = lines.next().transpose()? else {
      break;
    };
    let input = line.trim();
    if input.is_empty() {
      session.flip()?;
      continue;
    }
    if input.eq_ignore_ascii_case("q") {
      break;
    }

    let grade = input
      .chars()
      .next()
      .filter(|_| input.chars().count() == 1)
      .and_then(Grade::from_key);
    let Some(grade) = grade else {
      println!("Unknown key '{}'", input);
      continue;
    };

    match session.grade(store, grade, &clock) {
      Ok(outcome) => {
        match outcome.state {
          Some(state) => println!("{} - next review on {}", grade, state.due_date),
          None if session.learner_id().is_some() => {
            println!("This word was removed from the course, skipping it.")
          }
          None => {}
        }
      }
      Err(ReviewError::Store(e)) if e.is_retryable() => {
        println!("Could not save this review ({}). Try again.", e);
      }
      Err(e) => return Err(e.into()),
    }
  }

  println!();
  println!(
    "Session over: {} graded, {} saved, {} left.",
    session.graded(),
    session.persisted(),
    session.remaining()
  );
  Ok(())
}

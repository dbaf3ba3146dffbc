//! Application configuration.
//!
//! Scheduling constants live here next to the runtime settings so every
//! tunable value has one home. Runtime settings are resolved with priority
//! config.toml > environment (.env) > defaults.

use serde::Deserialize;
use std::path::PathBuf;

// ==================== Scheduling Constants ====================

/// Easiness assigned to a card that has never been reviewed
pub const DEFAULT_EASINESS: f64 = 2.5;

/// Floor for the easiness factor; keeps interval growth positive
pub const MIN_EASINESS: f64 = 1.3;

/// Interval after the first successful recall
pub const FIRST_INTERVAL_DAYS: u32 = 1;

/// Interval after the second consecutive successful recall
pub const SECOND_INTERVAL_DAYS: u32 = 3;

/// Interval after a lapse
pub const LAPSE_INTERVAL_DAYS: u32 = 1;

// ==================== Runtime Settings ====================

/// Config file read from the working directory
pub const CONFIG_FILE: &str = "config.toml";

/// Database used when nothing else is configured
pub const DEFAULT_DB_PATH: &str = "data/vocab.db";

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    database: Option<DatabaseSection>,
    study: Option<StudySection>,
    audio: Option<AudioSection>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StudySection {
    learner: Option<String>,
    utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct AudioSection {
    base_url: Option<String>,
}

/// Resolved settings for one process.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_path: PathBuf,
    /// Learner used when none is given on the command line; `None` = guest
    pub learner: Option<String>,
    /// Fixed offset of the canonical study clock, in minutes east of UTC
    pub utc_offset_minutes: i32,
    /// Public base URL that audio paths are resolved against
    pub audio_base_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            learner: None,
            utc_offset_minutes: 0,
            audio_base_url: None,
        }
    }
}

impl Settings {
    /// Merge a config file (already read) with an environment lookup.
    ///
    /// File values win over environment values. Unparseable files are
    /// logged and ignored.
    pub fn resolve<F>(file_contents: Option<&str>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file_contents
            .and_then(|contents| match toml::from_str::<FileConfig>(contents) {
                Ok(cfg) => Some(cfg),
                Err(e) => {
                    tracing::warn!("Ignoring malformed {}: {}", CONFIG_FILE, e);
                    None
                }
            })
            .unwrap_or_default();

        let database = file.database.unwrap_or_default();
        let study = file.study.unwrap_or_default();
        let audio = file.audio.unwrap_or_default();
        let defaults = Settings::default();

        let database_path = database
            .path
            .or_else(|| env("DATABASE_PATH"))
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let learner = study
            .learner
            .or_else(|| env("STUDY_LEARNER"))
            .filter(|l| !l.trim().is_empty());

        let utc_offset_minutes = study
            .utc_offset_minutes
            .or_else(|| {
                env("STUDY_UTC_OFFSET_MINUTES").and_then(|v| match v.trim().parse() {
                    Ok(m) => Some(m),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid STUDY_UTC_OFFSET_MINUTES: {}", v);
                        None
                    }
                })
            })
            .unwrap_or(defaults.utc_offset_minutes);

        let audio_base_url = audio.base_url.or_else(|| env("AUDIO_BASE_URL"));

        Settings {
            database_path,
            learner,
            utc_offset_minutes,
            audio_base_url,
        }
    }
}

/// Load settings from config.toml, .env and the process environment.
pub fn load_settings() -> Settings {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let contents = std::fs::read_to_string(CONFIG_FILE).ok();
    let settings = Settings::resolve(contents.as_deref(), |key| std::env::var(key).ok());
    tracing::info!("Using database at {}", settings.database_path.display());
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_sources() {
        let settings = Settings::resolve(None, env_from(&[]));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.database_path, PathBuf::from("data/vocab.db"));
    }

    #[test]
    fn test_env_fills_missing_values() {
        let settings = Settings::resolve(
            None,
            env_from(&[
                ("DATABASE_PATH", "/tmp/x.db"),
                ("STUDY_LEARNER", "thandi"),
                ("STUDY_UTC_OFFSET_MINUTES", "120"),
                ("AUDIO_BASE_URL", "https://cdn.example.org"),
            ]),
        );
        assert_eq!(settings.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(settings.learner.as_deref(), Some("thandi"));
        assert_eq!(settings.utc_offset_minutes, 120);
        assert_eq!(settings.audio_base_url.as_deref(), Some("https://cdn.example.org"));
    }

    #[test]
    fn test_file_wins_over_env() {
        let file = r#"
            [database]
            path = "from-file.db"

            [study]
            learner = "sipho"
            utc_offset_minutes = -300
        "#;
        let settings = Settings::resolve(
            Some(file),
            env_from(&[("DATABASE_PATH", "from-env.db"), ("STUDY_LEARNER", "thandi")]),
        );
        assert_eq!(settings.database_path, PathBuf::from("from-file.db"));
        assert_eq!(settings.learner.as_deref(), Some("sipho"));
        assert_eq!(settings.utc_offset_minutes, -300);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let settings = Settings::resolve(
            Some("[database\npath = "),
            env_from(&[("DATABASE_PATH", "env.db")]),
        );
        assert_eq!(settings.database_path, PathBuf::from("env.db"));
    }

    #[test]
    fn test_invalid_offset_ignored() {
        let settings =
            Settings::resolve(None, env_from(&[("STUDY_UTC_OFFSET_MINUTES", "soon")]));
        assert_eq!(settings.utc_offset_minutes, 0);
    }

    #[test]
    fn test_blank_learner_is_guest() {
        let settings = Settings::resolve(None, env_from(&[("STUDY_LEARNER", "  ")]));
        assert!(settings.learner.is_none());
    }
}

//! Spaced-repetition core for a vocabulary study app.
//!
//! The SM-2 scheduler lives in [`srs`]; [`db`] persists courses, cards and
//! per-learner progress in SQLite behind the [`store::ProgressStore`] seam.

pub mod config;
pub mod content;
pub mod db;
pub mod domain;
pub mod srs;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

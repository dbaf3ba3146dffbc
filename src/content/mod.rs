//! Course content loading.

pub mod deck;

pub use deck::{import_deck, load_deck, parse_deck, Deck, DeckError, ImportResult};

pub mod clock;
pub mod due;
pub mod review_session;
pub mod sm2;

pub use clock::StudyClock;
pub use due::{due_cards, due_counts};
pub use review_session::{GradeOutcome, ReviewError, ReviewSession};
pub use sm2::next_state;

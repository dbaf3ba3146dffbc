pub mod card;
pub mod memory;
pub mod review;

pub use card::{Card, CardId, Course, CourseId, Level, LevelId, Scope};
pub use memory::CardMemoryState;
pub use review::{Grade, ReviewLog};

mod outcome;
mod summary;
mod task;

pub use outcome::{Outcome, OutcomeKind};
pub use summary::{Entry, MAX_FAILURE_EXIT_CODE, Summary};
pub use task::Task;

//! The submission workflow: driving every submission into a writable
//! state, then writing answers and accumulating the report.

pub mod executor;
pub mod state_machine;

pub use executor::submit_answers;
pub use state_machine::{ensure_attempting, fetch_student_submissions};

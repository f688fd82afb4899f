//! Pure per-run services: identity resolution, filename routing, file
//! discovery, and report serialization.

pub mod files;
pub mod identity;
pub mod reporting;
pub mod router;

pub use files::{get_user_files, load_fname_user_map, MappedUser};
pub use identity::resolve_students;
pub use reporting::save_report;
pub use router::QuestionRouter;

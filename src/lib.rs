//! # Coursemology uploader
//!
//! Automates bulk submission of student programming-assignment files
//! into Coursemology assessments: filenames are resolved to enrolled
//! students and assessment questions, every submission is driven into a
//! writable workflow state, and file contents are written into the
//! matching answer slots.
//!
//! ## Layers
//!
//! - `client` — the Coursemology HTTP API, behind a trait so workflows
//!   are testable without a server.
//! - `services` — pure per-run logic: identity resolution, filename
//!   routing, file discovery, report serialization.
//! - `workflow` — the submission state machine and the answer executor.
//! - `download` — optional archive fetch and extraction pre-step.
//! - `orchestrator` — sequences one batch run end to end.

pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod workflow;

pub use config::Config;
pub use error::{Result, UploaderError};
pub use orchestrator::run;

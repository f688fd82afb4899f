//! Routes filenames to questions via an ordered regex table.

use regex::Regex;

use crate::config::QuestionRouteEntry;
use crate::error::{Result, UploaderError};

/// Compiled filename-pattern to question-title routes.
///
/// Patterns are tried in declaration order and must match at the start of
/// the filename; trailing content is ignored. Patterns need not be
/// mutually exclusive, the first match wins.
#[derive(Debug)]
pub struct QuestionRouter {
    routes: Vec<(Regex, String)>,
}

impl QuestionRouter {
    /// Compile the declared route table once for the whole run.
    pub fn from_entries(entries: &[QuestionRouteEntry]) -> Result<Self> {
        let routes = entries
            .iter()
            .map(|entry| {
                Regex::new(&entry.pattern)
                    .map(|re| (re, entry.question.clone()))
                    .map_err(|source| UploaderError::InvalidPattern {
                        pattern: entry.pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { routes })
    }

    /// Return the index of the first route whose pattern matches at byte
    /// position 0 of `filename`, or `None` when no route matches.
    pub fn route(&self, filename: &str) -> Option<usize> {
        self.routes
            .iter()
            .position(|(re, _)| re.find(filename).is_some_and(|m| m.start() == 0))
    }

    /// Question title of the route at `index`.
    pub fn question(&self, index: usize) -> &str {
        &self.routes[index].1
    }

    /// Pattern source of the route at `index`.
    pub fn pattern(&self, index: usize) -> &str {
        self.routes[index].0.as_str()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

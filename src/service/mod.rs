//! Student operations: mutations, typed queries and score analytics.

mod analytics;
mod students;

pub use analytics::AVG_SCORE_FIELD;

use crate::config::StudentsConfig;
use crate::repo::StudentRepository;
use std::sync::Arc;

/// Default good-mark threshold.
pub const DEFAULT_GOOD_MARK: i32 = 80;

/// Entry point for every student operation.
///
/// Cheap to clone; clones share the repository.
#[derive(Clone)]
pub struct StudentsService {
    repo: Arc<dyn StudentRepository>,
    good_mark: i32,
}

impl std::fmt::Debug for StudentsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudentsService").field("good_mark", &self.good_mark).finish_non_exhaustive()
    }
}

impl StudentsService {
    #[must_use]
    pub fn new(repo: Arc<dyn StudentRepository>) -> Self {
        Self { repo, good_mark: DEFAULT_GOOD_MARK }
    }

    #[must_use]
    pub fn with_config(repo: Arc<dyn StudentRepository>, config: &StudentsConfig) -> Self {
        Self { repo, good_mark: config.good_mark }
    }

    #[must_use]
    pub fn with_good_mark(mut self, good_mark: i32) -> Self {
        self.good_mark = good_mark;
        self
    }

    #[must_use]
    pub const fn good_mark(&self) -> i32 {
        self.good_mark
    }
}

use crate::query::{Filter, SortSpec};
use serde::{Deserialize, Serialize};

/// Field holding the group key in `Group` output documents.
pub const GROUP_ID: &str = "_id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accumulator {
    /// Mean of the numeric values at a path; `null` when there are none.
    Avg(String),
    Sum(String),
    Min(String),
    Max(String),
    Count,
    /// Every value at a path, in input order.
    Push(String),
    First(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

#[derive(Debug, Clone)]
pub enum Stage {
    /// Emits one document per element of the top-level array `path`.
    /// Documents with a missing, null or empty array are dropped.
    Unwind(String),
    /// Groups by the values at `keys`; `_id` is null without keys, otherwise a sub-document
    /// named by each key's last path segment. Output order is first appearance.
    Group { keys: Vec<String>, accumulators: Vec<(String, Accumulator)> },
    Match(Filter),
    /// Stable multi-key sort.
    Sort(Vec<SortSpec>),
    Limit(usize),
    Project(Projection),
    /// Equal-population buckets over the numeric values at `group_by`.
    BucketAuto { group_by: String, buckets: usize },
}

/// Fluent pipeline builder.
///
/// ```
/// use student_marks::aggregation::{Accumulator, Pipeline};
/// let p = Pipeline::new()
///     .unwind("marks")
///     .group(&[], vec![("avg".into(), Accumulator::Avg("marks.score".into()))]);
/// assert_eq!(p.stages().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    #[must_use]
    pub fn unwind(self, path: &str) -> Self {
        self.stage(Stage::Unwind(path.to_string()))
    }

    #[must_use]
    pub fn group(self, keys: &[&str], accumulators: Vec<(String, Accumulator)>) -> Self {
        let keys = keys.iter().map(|k| (*k).to_string()).collect();
        self.stage(Stage::Group { keys, accumulators })
    }

    #[must_use]
    pub fn matching(self, filter: Filter) -> Self {
        self.stage(Stage::Match(filter))
    }

    #[must_use]
    pub fn sort(self, specs: Vec<SortSpec>) -> Self {
        self.stage(Stage::Sort(specs))
    }

    #[must_use]
    pub fn limit(self, n: usize) -> Self {
        self.stage(Stage::Limit(n))
    }

    #[must_use]
    pub fn project(self, projection: Projection) -> Self {
        self.stage(Stage::Project(projection))
    }

    #[must_use]
    pub fn bucket_auto(self, group_by: &str, buckets: usize) -> Self {
        self.stage(Stage::BucketAuto { group_by: group_by.to_string(), buckets })
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

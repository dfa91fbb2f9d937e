use crate::errors::DbError;
use bson::Bson;
use serde::{Deserialize, Serialize};

// Safety limits to prevent resource abuse
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_SORT_FIELDS: usize = 8;
pub(crate) const MAX_PROJECTION_FIELDS: usize = 64;

/// Path used by `$elemMatch` operator expressions applied to scalar array elements.
pub(crate) const ELEM_SELF: &str = "$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, order: Order) -> Self {
        Self { field: field.into(), order }
    }
}

/// Options for `find_docs`.
///
/// Semantics:
/// - Sorting is stable and applied before projection; documents keep natural order otherwise.
/// - When `projection` is `Some(fields)`, the returned documents contain only those fields.
/// - Results are sliced by `skip`/`limit` last.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindOptions {
    pub projection: Option<Vec<String>>,
    pub sort: Option<Vec<SortSpec>>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Bson> },
    Nin { path: String, values: Vec<Bson> },
    Cmp { path: String, op: CmpOp, value: Bson },
    Regex { path: String, regex: regex::Regex },
    /// Array length comparison; non-array values never match.
    Size { path: String, op: CmpOp, len: usize },
    /// At least one array element satisfies the inner filter on its own.
    ElemMatch { path: String, filter: Box<Filter> },
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Cmp { path: path.into(), op: CmpOp::Eq, value: value.into() }
    }

    pub fn cmp(path: impl Into<String>, op: CmpOp, value: impl Into<Bson>) -> Self {
        Self::Cmp { path: path.into(), op, value: value.into() }
    }

    pub fn size(path: impl Into<String>, op: CmpOp, len: usize) -> Self {
        Self::Size { path: path.into(), op, len }
    }

    pub fn elem_match(path: impl Into<String>, filter: Self) -> Self {
        Self::ElemMatch { path: path.into(), filter: Box::new(filter) }
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(filter: Self) -> Self {
        Self::Not(Box::new(filter))
    }

    /// Builds a regex clause.
    ///
    /// # Errors
    /// Returns `DbError::QueryError` when the pattern does not compile.
    pub fn regex(
        path: impl Into<String>,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Self, DbError> {
        let regex = regex::RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| DbError::QueryError(format!("invalid $regex {pattern:?}: {e}")))?;
        Ok(Self::Regex { path: path.into(), regex })
    }

    /// Left-anchored literal prefix match.
    ///
    /// # Errors
    /// Returns `DbError::QueryError` if the escaped pattern cannot be compiled.
    pub fn prefix(path: impl Into<String>, prefix: &str) -> Result<Self, DbError> {
        Self::regex(path, &format!("^{}", regex::escape(prefix)), false)
    }
}

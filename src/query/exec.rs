use crate::collection::Collection;
use crate::utils::devlog::bench;
use serde_json::Value;
use bson::Document as BsonDocument;

use super::cursor::Cursor;
use super::eval::{compare_docs, eval_filter, project_fields};
use super::types::{Filter, FindOptions, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS};

pub fn find_docs(col: &Collection, filter: &Filter, opts: &FindOptions) -> Cursor {
    let bench_start = std::time::Instant::now();
    let mut docs: Vec<BsonDocument> =
        col.get_all_documents().into_iter().filter(|d| eval_filter(d, filter)).collect();

    if let Some(sort) = &opts.sort {
        if sort.len() > MAX_SORT_FIELDS {
            log::warn!("sort spec too long: {}", sort.len());
        }
        docs.sort_by(|a, b| compare_docs(a, b, sort));
    }

    if let Some(fields) = &opts.projection {
        let fields: Vec<String> = fields.iter().take(MAX_PROJECTION_FIELDS).cloned().collect();
        for d in &mut docs {
            *d = project_fields(d, &fields);
        }
    }

    let skip = opts.skip.unwrap_or(0);
    let limit = opts.limit.unwrap_or(usize::MAX);
    let docs: Vec<BsonDocument> = docs.into_iter().skip(skip).take(limit).collect();
    bench(
        "query",
        "find",
        bench_start,
        &[
            ("collection", Value::from(col.name())),
            ("result_count", Value::from(docs.len())),
            ("limit", Value::from(opts.limit)),
            ("skip", Value::from(skip)),
        ],
    );
    Cursor::new(docs)
}

#[must_use]
pub fn count_docs(col: &Collection, filter: &Filter) -> usize {
    let start = std::time::Instant::now();
    let n = col.get_all_documents().iter().filter(|d| eval_filter(d, filter)).count();
    bench("query", "count", start, &[("collection", Value::from(col.name())), ("result_count", Value::from(n))]);
    n
}

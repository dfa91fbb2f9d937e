use super::stage::{Accumulator, GROUP_ID, Pipeline, Projection, Stage};
use crate::collection::Collection;
use crate::errors::DbError;
use crate::query::{bson_equals, compare_bson, compare_docs, eval_filter, exclude_fields, project_fields, resolve_path};
use crate::utils::devlog::bench;
use crate::utils::num::bson_as_f64;
use bson::{Bson, Document as BsonDocument};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Runs `stages` in order over `docs`.
///
/// # Errors
/// Returns `DbError::QueryError` for a `BucketAuto` stage with zero buckets.
pub fn run_pipeline(docs: Vec<BsonDocument>, stages: &[Stage]) -> Result<Vec<BsonDocument>, DbError> {
    let mut docs = docs;
    for stage in stages {
        docs = match stage {
            Stage::Unwind(path) => unwind(&docs, path),
            Stage::Group { keys, accumulators } => group(&docs, keys, accumulators),
            Stage::Match(filter) => docs.into_iter().filter(|d| eval_filter(d, filter)).collect(),
            Stage::Sort(specs) => {
                docs.sort_by(|a, b| compare_docs(a, b, specs));
                docs
            }
            Stage::Limit(n) => {
                docs.truncate(*n);
                docs
            }
            Stage::Project(Projection::Include(fields)) => {
                docs.iter().map(|d| project_fields(d, fields)).collect()
            }
            Stage::Project(Projection::Exclude(fields)) => {
                docs.iter().map(|d| exclude_fields(d, fields)).collect()
            }
            Stage::BucketAuto { group_by, buckets } => bucket_auto(&docs, group_by, *buckets)?,
        };
    }
    Ok(docs)
}

fn unwind(docs: &[BsonDocument], path: &str) -> Vec<BsonDocument> {
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        match doc.get(path) {
            Some(Bson::Array(items)) => {
                for item in items {
                    let mut row = doc.clone();
                    row.insert(path, item.clone());
                    out.push(row);
                }
            }
            None | Some(Bson::Null) => {}
            Some(_) => out.push(doc.clone()),
        }
    }
    out
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

fn group_key(doc: &BsonDocument, keys: &[String]) -> Bson {
    if keys.is_empty() {
        return Bson::Null;
    }
    let mut key = BsonDocument::new();
    for k in keys {
        let v = resolve_path(doc, k).into_iter().next().cloned().unwrap_or(Bson::Null);
        key.insert(last_segment(k), v);
    }
    Bson::Document(key)
}

enum AccState {
    Avg { sum: f64, n: u64 },
    Sum { sum: f64, int_sum: i64, all_int: bool },
    Min(Option<Bson>),
    Max(Option<Bson>),
    Count(i64),
    Push(Vec<Bson>),
    First(Option<Bson>),
}

impl AccState {
    const fn new(acc: &Accumulator) -> Self {
        match acc {
            Accumulator::Avg(_) => Self::Avg { sum: 0.0, n: 0 },
            Accumulator::Sum(_) => Self::Sum { sum: 0.0, int_sum: 0, all_int: true },
            Accumulator::Min(_) => Self::Min(None),
            Accumulator::Max(_) => Self::Max(None),
            Accumulator::Count => Self::Count(0),
            Accumulator::Push(_) => Self::Push(Vec::new()),
            Accumulator::First(_) => Self::First(None),
        }
    }

    fn feed(&mut self, acc: &Accumulator, doc: &BsonDocument) {
        let values = match acc {
            Accumulator::Avg(p)
            | Accumulator::Sum(p)
            | Accumulator::Min(p)
            | Accumulator::Max(p)
            | Accumulator::Push(p)
            | Accumulator::First(p) => resolve_path(doc, p),
            Accumulator::Count => Vec::new(),
        };
        match self {
            Self::Avg { sum, n } => {
                for f in values.iter().filter_map(|v| bson_as_f64(v)) {
                    *sum += f;
                    *n += 1;
                }
            }
            Self::Sum { sum, int_sum, all_int } => {
                for v in values {
                    match v {
                        Bson::Int32(i) => *int_sum = int_sum.saturating_add(i64::from(*i)),
                        Bson::Int64(i) => *int_sum = int_sum.saturating_add(*i),
                        Bson::Double(f) => {
                            *all_int = false;
                            *sum += f;
                        }
                        _ => {}
                    }
                }
            }
            Self::Min(cur) => {
                for v in values.into_iter().filter(|v| !matches!(v, Bson::Null)) {
                    if cur.as_ref().is_none_or(|c| compare_bson(v, c) == Ordering::Less) {
                        *cur = Some(v.clone());
                    }
                }
            }
            Self::Max(cur) => {
                for v in values.into_iter().filter(|v| !matches!(v, Bson::Null)) {
                    if cur.as_ref().is_none_or(|c| compare_bson(v, c) == Ordering::Greater) {
                        *cur = Some(v.clone());
                    }
                }
            }
            Self::Count(n) => *n += 1,
            Self::Push(items) => items.extend(values.into_iter().cloned()),
            Self::First(first) => {
                if first.is_none() {
                    *first = Some(values.into_iter().next().cloned().unwrap_or(Bson::Null));
                }
            }
        }
    }

    fn finish(self) -> Bson {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Avg { sum, n } if n > 0 => Bson::Double(sum / n as f64),
            Self::Avg { .. } => Bson::Null,
            Self::Sum { int_sum, all_int: true, .. } => Bson::Int64(int_sum),
            #[allow(clippy::cast_precision_loss)]
            Self::Sum { sum, int_sum, .. } => Bson::Double(sum + int_sum as f64),
            Self::Min(v) | Self::Max(v) | Self::First(v) => v.unwrap_or(Bson::Null),
            Self::Count(n) => Bson::Int64(n),
            Self::Push(items) => Bson::Array(items),
        }
    }
}

fn group(docs: &[BsonDocument], keys: &[String], accumulators: &[(String, Accumulator)]) -> Vec<BsonDocument> {
    let mut slot_of: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Bson, Vec<AccState>)> = Vec::new();
    for doc in docs {
        let key = group_key(doc, keys);
        let fingerprint = format!("{key}");
        let idx = match slot_of.get(&fingerprint) {
            Some(i) => *i,
            None => {
                groups.push((key, accumulators.iter().map(|(_, a)| AccState::new(a)).collect()));
                slot_of.insert(fingerprint, groups.len() - 1);
                groups.len() - 1
            }
        };
        for ((_, acc), state) in accumulators.iter().zip(groups[idx].1.iter_mut()) {
            state.feed(acc, doc);
        }
    }
    groups
        .into_iter()
        .map(|(key, states)| {
            let mut out = BsonDocument::new();
            out.insert(GROUP_ID, key);
            for ((name, _), state) in accumulators.iter().zip(states) {
                out.insert(name.clone(), state.finish());
            }
            out
        })
        .collect()
}

fn bucket_auto(docs: &[BsonDocument], path: &str, buckets: usize) -> Result<Vec<BsonDocument>, DbError> {
    if buckets == 0 {
        return Err(DbError::QueryError("bucketAuto requires at least one bucket".into()));
    }
    let mut values: Vec<(OrderedFloat<f64>, Bson)> = docs
        .iter()
        .flat_map(|d| resolve_path(d, path))
        .filter_map(|v| bson_as_f64(v).map(|f| (OrderedFloat(f), v.clone())))
        .collect();
    values.sort_by_key(|(f, _)| *f);
    let total = values.len();
    let target = total.div_ceil(buckets);
    let mut out = Vec::new();
    let mut start = 0usize;
    while start < total {
        let mut end = if out.len() + 1 == buckets { total } else { (start + target).min(total) };
        while end < total && bson_equals(&values[end].1, &values[end - 1].1) {
            end += 1;
        }
        let (min, max) = (values[start].1.clone(), values[end - 1].1.clone());
        let count = i64::try_from(end - start).unwrap_or(i64::MAX);
        let mut bucket = BsonDocument::new();
        bucket.insert(GROUP_ID, bson::doc! { "min": min, "max": max });
        bucket.insert("count", count);
        out.push(bucket);
        start = end;
    }
    Ok(out)
}

impl Collection {
    /// Runs `pipeline` over a snapshot of the collection in natural order.
    ///
    /// # Errors
    /// Propagates stage errors from [`run_pipeline`].
    pub fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<BsonDocument>, DbError> {
        let start = std::time::Instant::now();
        let out = run_pipeline(self.get_all_documents(), pipeline.stages())?;
        bench(
            "aggregate",
            "pipeline",
            start,
            &[
                ("collection", serde_json::Value::from(self.name())),
                ("stages", serde_json::Value::from(pipeline.stages().len())),
                ("result_count", serde_json::Value::from(out.len())),
            ],
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{CmpOp, Filter, Order, SortSpec};
    use bson::doc;

    fn docs() -> Vec<BsonDocument> {
        vec![
            doc! {"id": 1_i64, "name": "a", "marks": [{"s": "M", "score": 80}, {"s": "P", "score": 70}]},
            doc! {"id": 2_i64, "name": "b", "marks": [{"s": "M", "score": 90}]},
            doc! {"id": 3_i64, "name": "c", "marks": []},
            doc! {"id": 4_i64, "name": "d"},
        ]
    }

    #[test]
    fn unwind_drops_missing_and_empty() {
        let out = run_pipeline(docs(), &[Stage::Unwind("marks".into())]).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].get_document("marks").unwrap().get_i32("score").unwrap(), 80);
    }

    #[test]
    fn group_keeps_first_appearance_order() {
        let p = Pipeline::new().unwind("marks").group(
            &["id", "name"],
            vec![
                ("avg".into(), Accumulator::Avg("marks.score".into())),
                ("n".into(), Accumulator::Count),
                ("total".into(), Accumulator::Sum("marks.score".into())),
                ("lo".into(), Accumulator::Min("marks.score".into())),
                ("hi".into(), Accumulator::Max("marks.score".into())),
                ("marks".into(), Accumulator::Push("marks".into())),
                ("first".into(), Accumulator::First("marks.s".into())),
            ],
        );
        let out = run_pipeline(docs(), p.stages()).unwrap();
        assert_eq!(out.len(), 2);
        let g = &out[0];
        assert_eq!(g.get_document(GROUP_ID).unwrap(), &doc! {"id": 1_i64, "name": "a"});
        assert!((g.get_f64("avg").unwrap() - 75.0).abs() < 1e-9);
        assert_eq!(g.get_i64("n").unwrap(), 2);
        assert_eq!(g.get_i64("total").unwrap(), 150);
        assert_eq!(g.get_i32("lo").unwrap(), 70);
        assert_eq!(g.get_i32("hi").unwrap(), 80);
        assert_eq!(g.get_array("marks").unwrap().len(), 2);
        assert_eq!(g.get_str("first").unwrap(), "M");
    }

    #[test]
    fn group_without_keys_yields_null_id_and_avg_null_when_empty() {
        let stages = [Stage::Group {
            keys: vec![],
            accumulators: vec![("avg".into(), Accumulator::Avg("missing".into()))],
        }];
        let out = run_pipeline(docs(), &stages).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get(GROUP_ID), Some(&Bson::Null));
        assert_eq!(out[0].get("avg"), Some(&Bson::Null));
        assert!(run_pipeline(Vec::new(), &stages).unwrap().is_empty());
    }

    #[test]
    fn match_sort_limit_project() {
        let p = Pipeline::new()
            .unwind("marks")
            .group(&["id"], vec![("avg".into(), Accumulator::Avg("marks.score".into()))])
            .matching(Filter::cmp("avg", CmpOp::Gt, 70))
            .sort(vec![SortSpec::new("avg", Order::Desc)])
            .limit(1)
            .project(Projection::Exclude(vec!["avg".into()]));
        let out = run_pipeline(docs(), p.stages()).unwrap();
        assert_eq!(out, vec![doc! {"_id": {"id": 2_i64}}]);
    }

    #[test]
    fn bucket_auto_never_splits_equal_values() {
        let rows: Vec<BsonDocument> = [3, 1, 1, 2, 1, 1].iter().map(|s| doc! {"score": *s}).collect();
        let out = run_pipeline(rows, &[Stage::BucketAuto { group_by: "score".into(), buckets: 3 }]).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get_document(GROUP_ID).unwrap(), &doc! {"min": 1, "max": 1});
        assert_eq!(out[0].get_i64("count").unwrap(), 4);
        assert_eq!(out[1].get_document(GROUP_ID).unwrap(), &doc! {"min": 2, "max": 3});
        assert_eq!(out[1].get_i64("count").unwrap(), 2);
        assert!(run_pipeline(vec![], &[Stage::BucketAuto { group_by: "score".into(), buckets: 0 }]).is_err());
    }
}

use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::types::{
    CmpOp, ELEM_SELF, Filter, MAX_IN_SET, MAX_PATH_DEPTH, MAX_SORT_FIELDS, Order, SortSpec,
};
use crate::utils::num::{bson_as_f64, is_numeric};

pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Exists { path, exists } => !resolve_path(doc, path).is_empty() == *exists,
        Filter::In { path, values } => {
            any_value(&resolve_path(doc, path), &|v| is_in_set(v, values))
        }
        Filter::Nin { path, values } => {
            !any_value(&resolve_path(doc, path), &|v| is_in_set(v, values))
        }
        Filter::Cmp { path, op, value } => {
            any_value(&resolve_path(doc, path), &|v| cmp_matches(v, *op, value))
        }
        Filter::Regex { path, regex } => any_value(&resolve_path(doc, path), &|v| {
            matches!(v, Bson::String(s) if regex.is_match(s))
        }),
        Filter::Size { path, op, len } => resolve_path(doc, path).iter().any(|v| match v {
            Bson::Array(items) => ord_matches(items.len().cmp(len), *op),
            _ => false,
        }),
        Filter::ElemMatch { path, filter } => resolve_path(doc, path).iter().any(|v| match v {
            Bson::Array(items) => items.iter().any(|item| match item {
                Bson::Document(sub) => eval_filter(sub, filter),
                scalar => {
                    let mut wrapped = BsonDocument::new();
                    wrapped.insert(ELEM_SELF, scalar.clone());
                    eval_filter(&wrapped, filter)
                }
            }),
            _ => false,
        }),
    }
}

/// A value matches when it satisfies `pred` itself, or when it is an array with a satisfying element.
fn any_value(values: &[&Bson], pred: &dyn Fn(&Bson) -> bool) -> bool {
    values.iter().copied().any(|v| {
        pred(v) || matches!(v, Bson::Array(items) if items.iter().any(pred))
    })
}

fn is_in_set(v: &Bson, set: &[Bson]) -> bool {
    set.iter().take(MAX_IN_SET).any(|x| bson_equals(v, x))
}

fn cmp_matches(v: &Bson, op: CmpOp, target: &Bson) -> bool {
    if op == CmpOp::Eq {
        return bson_equals(v, target);
    }
    if !comparable(v, target) {
        return false;
    }
    ord_matches(compare_bson(v, target), op)
}

const fn ord_matches(ord: Ordering, op: CmpOp) -> bool {
    match op {
        CmpOp::Eq => matches!(ord, Ordering::Equal),
        CmpOp::Gt => matches!(ord, Ordering::Greater),
        CmpOp::Gte => matches!(ord, Ordering::Greater | Ordering::Equal),
        CmpOp::Lt => matches!(ord, Ordering::Less),
        CmpOp::Lte => matches!(ord, Ordering::Less | Ordering::Equal),
    }
}

/// Equality with numbers compared by value across Int32/Int64/Double.
#[must_use]
pub fn bson_equals(a: &Bson, b: &Bson) -> bool {
    if is_numeric(a) && is_numeric(b) {
        return compare_bson(a, b) == Ordering::Equal;
    }
    a == b
}

/// Range operators only match values of the same type class.
fn comparable(a: &Bson, b: &Bson) -> bool {
    (is_numeric(a) && is_numeric(b))
        || matches!(
            (a, b),
            (Bson::String(_), Bson::String(_))
                | (Bson::Boolean(_), Bson::Boolean(_))
                | (Bson::DateTime(_), Bson::DateTime(_))
        )
}

/// Resolves a dotted path, fanning out across arrays of sub-documents.
///
/// `marks.score` yields every mark's score; a numeric segment (`marks.0`) indexes into an array.
#[must_use]
pub fn resolve_path<'a>(doc: &'a BsonDocument, path: &str) -> Vec<&'a Bson> {
    let mut out = Vec::new();
    if path.is_empty() || path.len() > 1024 {
        return out;
    }
    let parts: Vec<&str> = path.split('.').collect();
    if parts.len() > MAX_PATH_DEPTH {
        return out;
    }
    if let Some(v) = doc.get(parts[0]) {
        collect_path(v, &parts[1..], &mut out);
    }
    out
}

fn collect_path<'a>(cur: &'a Bson, rest: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((head, tail)) = rest.split_first() else {
        out.push(cur);
        return;
    };
    match cur {
        Bson::Document(d) => {
            if let Some(v) = d.get(*head) {
                collect_path(v, tail, out);
            }
        }
        Bson::Array(items) => {
            if let Ok(idx) = head.parse::<usize>() {
                if let Some(v) = items.get(idx) {
                    collect_path(v, tail, out);
                }
                return;
            }
            for item in items {
                if let Bson::Document(d) = item {
                    if let Some(v) = d.get(*head) {
                        collect_path(v, tail, out);
                    }
                }
            }
        }
        _ => {}
    }
}

pub fn compare_docs(a: &BsonDocument, b: &BsonDocument, sort: &[SortSpec]) -> Ordering {
    for s in sort.iter().take(MAX_SORT_FIELDS) {
        let va = resolve_path(a, &s.field).into_iter().next();
        let vb = resolve_path(b, &s.field).into_iter().next();
        let ord = match (va, vb) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if s.order == Order::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    use bson::Bson as T;
    if is_numeric(a) && is_numeric(b) {
        let x = bson_as_f64(a).unwrap_or(f64::NAN);
        let y = bson_as_f64(b).unwrap_or(f64::NAN);
        return x.total_cmp(&y);
    }
    match (a, b) {
        (T::String(x), T::String(y)) => x.cmp(y),
        (T::Boolean(x), T::Boolean(y)) => x.cmp(y),
        (T::DateTime(x), T::DateTime(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

const fn type_rank(v: &Bson) -> u8 {
    use bson::Bson as T;
    match v {
        T::MinKey => 0,
        T::Null | T::Undefined => 1,
        T::Int32(_) | T::Int64(_) | T::Double(_) | T::Decimal128(_) => 2,
        T::String(_) | T::Symbol(_) => 3,
        T::Document(_) => 4,
        T::Array(_) => 5,
        T::Binary(_) => 6,
        T::ObjectId(_) => 7,
        T::Boolean(_) => 8,
        T::DateTime(_) => 9,
        T::Timestamp(_) => 10,
        T::RegularExpression(_) => 11,
        T::DbPointer(_) => 12,
        T::JavaScriptCode(_) | T::JavaScriptCodeWithScope(_) => 13,
        T::MaxKey => 255,
    }
}

#[must_use]
pub fn project_fields(doc: &BsonDocument, fields: &[String]) -> BsonDocument {
    let mut out = BsonDocument::new();
    for f in fields {
        if let Some(v) = doc.get(f) {
            out.insert(f.clone(), v.clone());
        }
    }
    out
}

#[must_use]
pub fn exclude_fields(doc: &BsonDocument, fields: &[String]) -> BsonDocument {
    let mut out = doc.clone();
    for f in fields {
        out.remove(f);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn student() -> BsonDocument {
        doc! {
            "id": 1_i64,
            "phone": "050-1234567",
            "marks": [
                {"subject": "Math", "score": 80, "date": "2024-01-10"},
                {"subject": "Physics", "score": 65, "date": "2024-02-10"},
            ],
            "tags": ["a", "b"],
        }
    }

    #[test]
    fn dotted_path_fans_out_over_arrays() {
        let d = student();
        let scores: Vec<&Bson> = resolve_path(&d, "marks.score");
        assert_eq!(scores, vec![&Bson::Int32(80), &Bson::Int32(65)]);
        assert_eq!(resolve_path(&d, "marks.1.subject"), vec![&Bson::String("Physics".into())]);
        assert!(resolve_path(&d, "marks.7.subject").is_empty());
    }

    #[test]
    fn numeric_equality_ignores_width() {
        let d = student();
        assert!(eval_filter(&d, &Filter::eq("id", 1_i32)));
        assert!(eval_filter(&d, &Filter::eq("id", 1.0_f64)));
        assert!(eval_filter(&d, &Filter::eq("marks.score", 65_i64)));
    }

    #[test]
    fn scalar_array_matches_any_element() {
        let d = student();
        assert!(eval_filter(&d, &Filter::eq("tags", "b")));
        assert!(!eval_filter(&d, &Filter::eq("tags", "c")));
    }

    #[test]
    fn range_operators_do_not_cross_types() {
        let d = student();
        assert!(!eval_filter(&d, &Filter::cmp("phone", CmpOp::Gt, 5)));
        assert!(eval_filter(&d, &Filter::cmp("phone", CmpOp::Gt, "050")));
    }

    #[test]
    fn size_and_elem_match() {
        let d = student();
        assert!(eval_filter(&d, &Filter::size("marks", CmpOp::Eq, 2)));
        assert!(eval_filter(&d, &Filter::size("marks", CmpOp::Lt, 3)));
        assert!(!eval_filter(&d, &Filter::size("phone", CmpOp::Lt, 3)));
        let both = Filter::And(vec![Filter::eq("subject", "Math"), Filter::cmp("score", CmpOp::Lt, 70)]);
        assert!(!eval_filter(&d, &Filter::elem_match("marks", both)));
        let scalar = Filter::cmp(ELEM_SELF, CmpOp::Eq, "a");
        assert!(eval_filter(&d, &Filter::elem_match("tags", scalar)));
    }

    #[test]
    fn sort_puts_missing_first_ascending() {
        let a = doc! {"v": 2};
        let b = doc! {};
        let spec = [SortSpec::new("v", Order::Asc)];
        assert_eq!(compare_docs(&a, &b, &spec), Ordering::Greater);
        let spec = [SortSpec::new("v", Order::Desc)];
        assert_eq!(compare_docs(&a, &b, &spec), Ordering::Less);
    }
}

use crate::errors::DbError;
use crate::utils::json::json_to_bson;
use bson::Bson;
use serde_json::{Map, Value};

use super::types::{CmpOp, ELEM_SELF, Filter, MAX_IN_SET};

/// Parses a Mongo-style JSON filter, e.g. `{"phone": {"$regex": "^050"}, "marks.score": {"$gt": 70}}`.
///
/// # Errors
/// Returns an error if the JSON is malformed or uses an unknown operator.
pub fn parse_filter_json(json: &str) -> Result<Filter, DbError> {
    let value: Value = serde_json::from_str(json)?;
    parse_filter_value(&value)
}

/// # Errors
/// Returns `DbError::QueryError` if `value` is not a valid filter object.
pub fn parse_filter_value(value: &Value) -> Result<Filter, DbError> {
    let obj = value
        .as_object()
        .ok_or_else(|| DbError::QueryError("filter must be a JSON object".into()))?;
    let mut clauses = Vec::with_capacity(obj.len());
    for (key, v) in obj {
        let clause = match key.as_str() {
            "$and" => Filter::And(parse_filter_list(key, v)?),
            "$or" => Filter::Or(parse_filter_list(key, v)?),
            "$nor" => Filter::not(Filter::Or(parse_filter_list(key, v)?)),
            op if op.starts_with('$') => {
                return Err(DbError::QueryError(format!("unknown top-level operator {op}")));
            }
            path => parse_field(path, v)?,
        };
        clauses.push(clause);
    }
    Ok(combine(clauses))
}

fn combine(mut clauses: Vec<Filter>) -> Filter {
    match clauses.len() {
        0 => Filter::True,
        1 => clauses.remove(0),
        _ => Filter::And(clauses),
    }
}

fn parse_filter_list(op: &str, v: &Value) -> Result<Vec<Filter>, DbError> {
    let items = v
        .as_array()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| DbError::QueryError(format!("{op} requires a non-empty array")))?;
    items.iter().map(parse_filter_value).collect()
}

/// Single-key objects that are extended JSON values rather than query operators.
const EXTJSON_KEYS: &[&str] = &[
    "$date",
    "$numberInt",
    "$numberLong",
    "$numberDouble",
    "$numberDecimal",
    "$oid",
    "$binary",
    "$timestamp",
    "$minKey",
    "$maxKey",
];

fn is_operator_object(ops: &Map<String, Value>) -> bool {
    !ops.is_empty()
        && ops.keys().all(|k| k.starts_with('$'))
        && !(ops.len() == 1 && ops.keys().all(|k| EXTJSON_KEYS.contains(&k.as_str())))
}

fn parse_field(path: &str, v: &Value) -> Result<Filter, DbError> {
    match v {
        Value::Object(ops) if is_operator_object(ops) => parse_operators(path, ops),
        other => cmp(path, CmpOp::Eq, other),
    }
}

fn parse_operators(path: &str, ops: &Map<String, Value>) -> Result<Filter, DbError> {
    let options_ci = match ops.get("$options") {
        Some(Value::String(o)) => o.contains('i'),
        Some(_) => return Err(DbError::QueryError("$options must be a string".into())),
        None => false,
    };
    let mut clauses = Vec::with_capacity(ops.len());
    for (op, arg) in ops {
        let clause = match op.as_str() {
            "$eq" => cmp(path, CmpOp::Eq, arg)?,
            "$ne" => Filter::not(cmp(path, CmpOp::Eq, arg)?),
            "$gt" => cmp(path, CmpOp::Gt, arg)?,
            "$gte" => cmp(path, CmpOp::Gte, arg)?,
            "$lt" => cmp(path, CmpOp::Lt, arg)?,
            "$lte" => cmp(path, CmpOp::Lte, arg)?,
            "$in" => Filter::In { path: path.to_string(), values: value_set(op, arg)? },
            "$nin" => Filter::Nin { path: path.to_string(), values: value_set(op, arg)? },
            "$exists" => Filter::Exists { path: path.to_string(), exists: truthy(arg) },
            "$regex" => {
                let Value::String(raw) = arg else {
                    return Err(DbError::QueryError("$regex must be a string".into()));
                };
                let (pattern, flags) = split_regex_literal(raw);
                Filter::regex(path, pattern, options_ci || flags.contains('i'))?
            }
            "$options" => continue,
            "$size" => {
                let len = arg
                    .as_u64()
                    .and_then(crate::utils::num::u64_to_usize)
                    .ok_or_else(|| DbError::QueryError("$size requires a non-negative integer".into()))?;
                Filter::size(path, CmpOp::Eq, len)
            }
            "$elemMatch" => Filter::elem_match(path, parse_elem_match(arg)?),
            "$not" => match arg {
                Value::Object(inner) if is_operator_object(inner) => {
                    Filter::not(parse_operators(path, inner)?)
                }
                Value::String(raw) => {
                    let (pattern, flags) = split_regex_literal(raw);
                    Filter::not(Filter::regex(path, pattern, flags.contains('i'))?)
                }
                _ => {
                    return Err(DbError::QueryError(
                        "$not requires an operator object or a regex".into(),
                    ));
                }
            },
            other => return Err(DbError::QueryError(format!("unknown operator {other}"))),
        };
        clauses.push(clause);
    }
    Ok(combine(clauses))
}

fn cmp(path: &str, op: CmpOp, arg: &Value) -> Result<Filter, DbError> {
    Ok(Filter::Cmp { path: path.to_string(), op, value: json_to_bson(arg)? })
}

fn value_set(op: &str, arg: &Value) -> Result<Vec<Bson>, DbError> {
    let items =
        arg.as_array().ok_or_else(|| DbError::QueryError(format!("{op} requires an array")))?;
    items.iter().take(MAX_IN_SET).map(json_to_bson).collect()
}

fn truthy(arg: &Value) -> bool {
    match arg {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null => false,
        _ => true,
    }
}

fn parse_elem_match(arg: &Value) -> Result<Filter, DbError> {
    match arg {
        Value::Object(inner) if is_operator_object(inner) => parse_operators(ELEM_SELF, inner),
        Value::Object(_) => parse_filter_value(arg),
        _ => Err(DbError::QueryError("$elemMatch requires an object".into())),
    }
}

/// Accepts both `^050` and the slash-delimited literal form `/^050/i`.
fn split_regex_literal(raw: &str) -> (&str, &str) {
    if let Some(body) = raw.strip_prefix('/') {
        if let Some(end) = body.rfind('/') {
            return (&body[..end], &body[end + 1..]);
        }
    }
    (raw, "")
}

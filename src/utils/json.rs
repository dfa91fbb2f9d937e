use crate::errors::DbError;
use bson::Bson;
use serde_json::Value;

/// Converts a JSON value into BSON, reading it as MongoDB Extended JSON.
///
/// Integers that fit 32 bits become `Int32`, larger ones `Int64`; `{"$numberLong": "7"}`,
/// `{"$date": ..}` and the other extended forms become their BSON types.
///
/// # Errors
/// Returns `DbError::QueryError` for malformed extended JSON such as `{"$numberLong": 7}`.
pub fn json_to_bson(val: &Value) -> Result<Bson, DbError> {
    Bson::try_from(val.clone()).map_err(|e| DbError::QueryError(format!("invalid extended JSON {val}: {e}")))
}

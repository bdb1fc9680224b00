//! Row shaping: raw result rows into the caller-facing value

use std::collections::BTreeMap;

use super::errors::{FunctionError, FunctionResult};
use super::method::Method;
use crate::db::Row;
use crate::value::Value;

/// Shape one row according to the method's flags
///
/// Struct rows are zipped with the declared outputs by position; null
/// columns are left out of the object. Scalar rows yield their single
/// column.
pub fn shape_row(method: &Method, row: Row) -> Value {
    if !method.is_struct {
        return row.into_iter().next().unwrap_or(Value::Null);
    }

    let object: BTreeMap<String, Value> = method
        .outputs
        .iter()
        .zip(row)
        .filter(|(_, value)| !value.is_null())
        .map(|(output, value)| (output.name.clone(), value))
        .collect();

    Value::Object(object)
}

/// Shape all rows and apply the singular/set contract
pub fn shape_rows(method: &Method, rows: Vec<Row>) -> FunctionResult<Value> {
    let mut shaped: Vec<Value> = rows.into_iter().map(|row| shape_row(method, row)).collect();

    if method.is_set {
        return Ok(Value::Array(shaped));
    }

    if shaped.len() != 1 {
        return Err(FunctionError::Cardinality(shaped.len()));
    }

    Ok(shaped.remove(0))
}

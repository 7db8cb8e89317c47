use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo, FilterWhereOptions};
use crate::types::Record;

/// In-memory evaluation of `where` clauses against records
pub struct FilterWhere;

impl FilterWhere {
    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    /// Soft-delete visibility check applied before any user conditions
    pub fn visible(record: &Record, options: &FilterWhereOptions) -> bool {
        let is_set = |field: &str| record.get(field).map_or(false, |v| !v.is_null());
        if !options.include_trashed && is_set("trashed_at") {
            return false;
        }
        if !options.include_deleted && is_set("deleted_at") {
            return false;
        }
        true
    }

    /// Test a record against a where clause and visibility options
    pub fn matches(where_data: Option<&Value>, record: &Record, options: &FilterWhereOptions) -> Result<bool, FilterError> {
        if !Self::visible(record, options) {
            return Ok(false);
        }
        match where_data {
            None | Some(Value::Null) => Ok(true),
            Some(data) => Self::evaluate(data, record),
        }
    }

    fn evaluate(where_data: &Value, record: &Record) -> Result<bool, FilterError> {
        let obj = match where_data {
            Value::Object(obj) => obj,
            Value::Null => return Ok(true),
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        for (key, value) in obj {
            if key.starts_with('$') {
                if !Self::evaluate_logical(key, value, record)? {
                    return Ok(false);
                }
                continue;
            }
            for condition in Self::parse_field_condition(key, value)? {
                if !Self::evaluate_condition(&condition, record)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn evaluate_logical(op: &str, value: &Value, record: &Record) -> Result<bool, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value.as_array().ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let mut results = Vec::with_capacity(arr.len());
                for clause in arr {
                    results.push(Self::evaluate(clause, record)?);
                }
                Ok(if op == "$and" {
                    results.iter().all(|r| *r)
                } else {
                    results.iter().any(|r| *r)
                })
            }
            "$not" => Ok(!Self::evaluate(value, record)?),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<FilterWhereInfo>, FilterError> {
        let mut conditions = Vec::new();
        match value {
            Value::Object(obj) if obj.keys().all(|k| k.starts_with('$')) && !obj.is_empty() => {
                for (op_key, op_val) in obj {
                    let operator = Self::map_operator(op_key)?;
                    conditions.push(FilterWhereInfo { column: field.to_string(), operator, data: op_val.clone() });
                }
            }
            // Implicit equality: { field: value }
            _ => conditions.push(FilterWhereInfo { column: field.to_string(), operator: FilterOp::Eq, data: value.clone() }),
        }
        Ok(conditions)
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$exists" => FilterOp::Exists,
            "$null" => FilterOp::Null,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn evaluate_condition(condition: &FilterWhereInfo, record: &Record) -> Result<bool, FilterError> {
        let actual = record.get(&condition.column);
        let actual_or_null = actual.unwrap_or(&Value::Null);

        Ok(match condition.operator {
            FilterOp::Eq => actual_or_null == &condition.data,
            FilterOp::Ne => actual_or_null != &condition.data,
            FilterOp::Gt => Self::compare(actual_or_null, &condition.data) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(Self::compare(actual_or_null, &condition.data), Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt => Self::compare(actual_or_null, &condition.data) == Some(Ordering::Less),
            FilterOp::Lte => matches!(Self::compare(actual_or_null, &condition.data), Some(Ordering::Less | Ordering::Equal)),
            FilterOp::In | FilterOp::NIn => {
                let values = condition.data.as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$in/$nin require an array".to_string()))?;
                let found = values.iter().any(|v| v == actual_or_null);
                if condition.operator == FilterOp::In { found } else { !found }
            }
            FilterOp::Exists => {
                let wanted = condition.data.as_bool()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$exists requires a boolean".to_string()))?;
                actual.is_some() == wanted
            }
            FilterOp::Null => {
                let wanted = condition.data.as_bool()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$null requires a boolean".to_string()))?;
                actual_or_null.is_null() == wanted
            }
        })
    }

    fn compare(left: &Value, right: &Value) -> Option<Ordering> {
        match (left, right) {
            (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn in_operator_matches_ids() {
        let row = record(json!({ "id": "a1", "trashed_at": null }));
        let filter = json!({ "id": { "$in": ["a1", "b2"] } });
        assert!(FilterWhere::matches(Some(&filter), &row, &FilterWhereOptions::default()).unwrap());

        let filter = json!({ "id": { "$nin": ["a1"] } });
        assert!(!FilterWhere::matches(Some(&filter), &row, &FilterWhereOptions::default()).unwrap());
    }

    #[test]
    fn trashed_rows_hidden_unless_requested() {
        let row = record(json!({ "id": "a1", "trashed_at": "2024-01-01T00:00:00Z" }));
        assert!(!FilterWhere::matches(None, &row, &FilterWhereOptions::default()).unwrap());

        let options = FilterWhereOptions { include_trashed: true, include_deleted: false };
        assert!(FilterWhere::matches(None, &row, &options).unwrap());
    }

    #[test]
    fn logical_and_comparison_operators() {
        let row = record(json!({ "balance": 800, "name": "checking" }));
        let filter = json!({
            "$or": [
                { "balance": { "$gt": 1000 } },
                { "$and": [{ "balance": { "$gte": 800 } }, { "name": "checking" }] }
            ]
        });
        assert!(FilterWhere::matches(Some(&filter), &row, &FilterWhereOptions::default()).unwrap());

        let filter = json!({ "$not": { "balance": { "$lte": 800 } } });
        assert!(!FilterWhere::matches(Some(&filter), &row, &FilterWhereOptions::default()).unwrap());
    }

    #[test]
    fn unsupported_operator_is_rejected() {
        let row = record(json!({ "name": "x" }));
        let filter = json!({ "name": { "$regex": "x" } });
        assert_eq!(
            FilterWhere::matches(Some(&filter), &row, &FilterWhereOptions::default()),
            Err(FilterError::UnsupportedOperator("$regex".to_string()))
        );
    }
}

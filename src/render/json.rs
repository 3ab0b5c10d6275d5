use serde::Serialize;

use crate::error::MedQueryError;

pub fn to_pretty<T: Serialize>(value: &T) -> Result<String, MedQueryError> {
    Ok(serde_json::to_string_pretty(value)?)
}

//! Response decoding

use narvii_core::{ApiError, ApiResult};
use serde_json::Value;

/// Decode a response body, mapping non-success statuses to `InvalidRequest`
///
/// Bodies that are not JSON become `ApiError::Html`, whatever the status.
pub(crate) fn parse_response(status: u16, body: &str) -> ApiResult<Value> {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return Err(ApiError::Html(body.to_string()));
    };

    if status != 200 {
        return Err(ApiError::InvalidRequest {
            message: json
                .get("api:message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            status_code: json
                .get("api:statuscode")
                .and_then(Value::as_i64)
                .unwrap_or_else(|| i64::from(status)),
        });
    }

    Ok(json)
}

/// Take a field out of a response object
pub(crate) fn field(mut response: Value, name: &'static str) -> ApiResult<Value> {
    response
        .get_mut(name)
        .map(Value::take)
        .ok_or_else(|| ApiError::Decode(format!("missing field `{name}`")))
}

//! Integer arithmetic tools.

use rmcp::model::ErrorData;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Input for `add` and `minus`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ArithmeticRequest {
    /// Left operand.
    pub a: i64,
    /// Right operand.
    pub b: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ArithmeticResponse {
    pub result: i64,
}

pub fn add(request: &ArithmeticRequest) -> Result<ArithmeticResponse, ErrorData> {
    request
        .a
        .checked_add(request.b)
        .map(|result| ArithmeticResponse { result })
        .ok_or_else(|| overflow("add", request))
}

pub fn minus(request: &ArithmeticRequest) -> Result<ArithmeticResponse, ErrorData> {
    request
        .a
        .checked_sub(request.b)
        .map(|result| ArithmeticResponse { result })
        .ok_or_else(|| overflow("minus", request))
}

fn overflow(operation: &'static str, request: &ArithmeticRequest) -> ErrorData {
    ErrorData::invalid_params(
        format!("{operation} overflows a 64-bit integer"),
        Some(json!({
            "code": "integer_overflow",
            "a": request.a,
            "b": request.b,
        })),
    )
}

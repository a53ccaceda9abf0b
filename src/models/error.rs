use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub error_code: String, // BAD_REQUEST | NOT_FOUND | CONFLICT | INTERNAL_ERROR
    pub message: String,
}

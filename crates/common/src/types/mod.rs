use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Success envelope shared by every JSON endpoint.
#[derive(Serialize, Debug)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { status: "success", message: None, data }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self { status: "success", message: Some(message.into()), data }
    }
}

/// Envelope for endpoints that only report an outcome.
pub fn message_only(message: impl Into<String>) -> ApiResponse<serde_json::Value> {
    ApiResponse::with_message(message, serde_json::Value::Null)
}

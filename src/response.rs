//! Response envelope shared by every operation.
//!
//! ```json
//! { "success": true, "status": 200, "message": "Table created", "data": { ... } }
//! { "success": false, "status": 409, "error": "Conflict during ...", "details": { ... } }
//! ```

use crate::error::DbError;
use serde::Serialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable error kind, e.g. `validation_error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            error: None,
            kind: None,
            status: 200,
            data: Some(data),
            details: None,
        }
    }

    /// Successful response with a human-readable message.
    pub fn ok_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    /// Set the success status (e.g. 201 for created objects).
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

impl ApiResponse<JsonValue> {
    /// Error response. Native details (engine code, SQL state, progress
    /// counters) are attached only when `diagnostics` is set.
    pub fn from_error(err: &DbError, diagnostics: bool) -> Self {
        let mut message = err.to_string();
        if let Some(suggestion) = err.suggestion() {
            message = format!("{}. {}", message, suggestion);
        }
        Self {
            success: false,
            message: None,
            error: Some(message),
            kind: Some(err.kind()),
            status: err.status_code(),
            data: None,
            details: if diagnostics { err.details() } else { None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_envelope_omits_error_fields() {
        let response = ApiResponse::ok_with_message("Database created", json!({"name": "shop"}))
            .with_status(201);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["status"], 201);
        assert_eq!(value["message"], "Database created");
        assert_eq!(value["data"]["name"], "shop");
        assert!(value.get("error").is_none());
        assert!(value.get("details").is_none());
    }

    #[test]
    fn test_error_envelope_status_classes() {
        let cases = [
            (DbError::validation("bad"), 400),
            (DbError::not_found("Table", "missing"), 404),
            (DbError::conflict("create table", "exists"), 409),
            (DbError::NotInitialized, 503),
            (DbError::export("boom"), 500),
        ];
        for (err, status) in cases {
            let response = ApiResponse::from_error(&err, false);
            assert!(!response.success);
            assert_eq!(response.status, status);
            assert!(response.data.is_none());
        }
    }

    #[test]
    fn test_details_only_with_diagnostics() {
        let err = DbError::engine("query", "syntax", Some(1064), Some("42000".to_string()));

        let plain = serde_json::to_value(ApiResponse::from_error(&err, false)).unwrap();
        assert!(plain.get("details").is_none());

        let detailed = serde_json::to_value(ApiResponse::from_error(&err, true)).unwrap();
        assert_eq!(detailed["details"]["code"], 1064);
        assert_eq!(detailed["details"]["sqlState"], "42000");
    }

    #[test]
    fn test_partial_failure_details() {
        let cause = DbError::engine("delete", "lock wait timeout", Some(1205), None);
        let err = DbError::partial_failure("delete from shop.t", 1, 3, 1, &cause);
        let value = serde_json::to_value(ApiResponse::from_error(&err, true)).unwrap();
        assert_eq!(value["details"]["completed"], 1);
        assert_eq!(value["details"]["affectedRows"], 1);
        assert_eq!(value["kind"], "partial_failure");
    }
}

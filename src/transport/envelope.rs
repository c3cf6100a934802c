//! The uniform `{ success, data?, error? }` result shape.
//!
//! Backend envelopes pass through unchanged; everything else (transport
//! errors, bare JSON, HTML error pages, empty bodies) is folded into it here.

use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CODE_NETWORK: &str = "network";
pub const CODE_TIMEOUT: &str = "timeout";
pub const CODE_MALFORMED: &str = "malformed_response";
pub const CODE_HTTP_STATUS: &str = "http_status";
pub const CODE_SESSION_EXPIRED: &str = "session_expired";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), code: None }
    }

    pub fn with_code(message: impl Into<String>, code: &str) -> Self {
        Self { message: message.into(), code: Some(code.to_owned()) }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn empty() -> Self {
        Self { success: true, data: None, error: None }
    }

    pub fn failure(error: ApiError) -> Self {
        Self { success: false, data: None, error: Some(error) }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.code.as_deref())
    }

    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.error.unwrap_or_else(|| ApiError::new("Request failed")))
        }
    }
}

impl Envelope<Value> {
    /// Deserialize `data` into `U`. A shape mismatch becomes a malformed-response failure.
    pub fn decode<U: DeserializeOwned>(self) -> Envelope<U> {
        if !self.success {
            return Envelope { success: false, data: None, error: self.error };
        }
        match self.data {
            None => Envelope::empty(),
            Some(data) => match serde_json::from_value::<U>(data) {
                Ok(typed) => Envelope::ok(typed),
                Err(err) => Envelope::failure(ApiError::with_code(
                    format!("Unexpected response data: {}", err),
                    CODE_MALFORMED,
                )),
            },
        }
    }
}

/// Build the envelope for a backend response.
pub fn normalize(status: StatusCode, body: &[u8]) -> Envelope {
    if body.iter().all(u8::is_ascii_whitespace) {
        return if status.is_success() {
            Envelope::empty()
        } else {
            Envelope::failure(status_error(status))
        };
    }

    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) if status.is_success() => {
            return Envelope::failure(ApiError::with_code(
                "Malformed response from server",
                CODE_MALFORMED,
            ))
        }
        Err(_) => return Envelope::failure(status_error(status)),
    };

    if let Some(success) = value.get("success").and_then(Value::as_bool) {
        return pass_through(status, success, value);
    }

    if status.is_success() {
        Envelope::ok(value)
    } else {
        let error = message_from(&value)
            .map(|message| ApiError::with_code(message, CODE_HTTP_STATUS))
            .unwrap_or_else(|| status_error(status));
        Envelope::failure(error)
    }
}

fn pass_through(status: StatusCode, success: bool, mut value: Value) -> Envelope {
    let data = value.get_mut("data").map(Value::take).filter(|d| !d.is_null());
    if success {
        return Envelope { success, data, error: None };
    }
    let error = match value.get("error") {
        Some(Value::Object(fields)) => fields
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(|message| ApiError {
                message: message.to_owned(),
                code: fields.get("code").and_then(Value::as_str).map(str::to_owned),
            }),
        Some(Value::String(message)) if !message.is_empty() => Some(ApiError::new(message.as_str())),
        _ => None,
    }
    .or_else(|| message_from(&value).map(ApiError::new))
    .unwrap_or_else(|| status_error(status));

    Envelope { success, data, error: Some(error) }
}

/// Human readable message from common error bodies (`detail`, `message`, `error`)
fn message_from(value: &Value) -> Option<String> {
    ["detail", "message", "error"]
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.to_owned()),
            Value::Object(fields) => fields
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned),
            _ => None,
        })
}

fn status_error(status: StatusCode) -> ApiError {
    if status.is_success() {
        ApiError::new("Request failed")
    } else {
        ApiError::with_code(
            format!("Request failed with status code {}", status.as_u16()),
            CODE_HTTP_STATUS,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn backend_envelope_passes_through() {
        let env = normalize(StatusCode::OK, &body(json!({"success": true, "data": {"id": 3}})));
        assert_eq!(env, Envelope::ok(json!({"id": 3})));

        let env = normalize(
            StatusCode::BAD_REQUEST,
            &body(json!({"success": false, "error": {"message": "Title is required", "code": "validation"}})),
        );
        assert!(!env.success);
        assert_eq!(env.error_message(), Some("Title is required"));
        assert_eq!(env.error_code(), Some("validation"));
    }

    #[test]
    fn failure_envelope_always_gets_a_message() {
        let env = normalize(StatusCode::UNAUTHORIZED, &body(json!({"success": false})));
        assert_eq!(env.error_message(), Some("Request failed with status code 401"));

        let env = normalize(StatusCode::OK, &body(json!({"success": false, "error": "Nope"})));
        assert_eq!(env.error_message(), Some("Nope"));

        let env = normalize(StatusCode::FORBIDDEN, &body(json!({"success": false, "detail": "Forbidden"})));
        assert_eq!(env.error_message(), Some("Forbidden"));
    }

    #[test]
    fn bare_json_is_wrapped() {
        let env = normalize(StatusCode::OK, &body(json!({"access": "t2", "refresh": "r2"})));
        assert!(env.success);
        assert_eq!(env.data.unwrap()["access"], "t2");

        let env = normalize(
            StatusCode::UNAUTHORIZED,
            &body(json!({"detail": "Given token not valid for any token type"})),
        );
        assert_eq!(env.error_message(), Some("Given token not valid for any token type"));
        assert_eq!(env.error_code(), Some(CODE_HTTP_STATUS));
    }

    #[test]
    fn empty_and_garbage_bodies() {
        assert_eq!(normalize(StatusCode::NO_CONTENT, b""), Envelope::empty());

        let env = normalize(StatusCode::BAD_GATEWAY, b"");
        assert_eq!(env.error_message(), Some("Request failed with status code 502"));

        let env = normalize(StatusCode::OK, b"<html>oops</html>");
        assert_eq!(env.error_code(), Some(CODE_MALFORMED));

        let env = normalize(StatusCode::INTERNAL_SERVER_ERROR, b"<html>oops</html>");
        assert_eq!(env.error_message(), Some("Request failed with status code 500"));
    }

    #[test]
    fn decode_into_typed_data() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Pair {
            access: String,
        }

        let env: Envelope<Pair> = Envelope::ok(json!({"access": "t1"})).decode();
        assert_eq!(env.data, Some(Pair { access: "t1".into() }));

        let env: Envelope<Pair> = Envelope::ok(json!({"nope": 1})).decode();
        assert_eq!(env.error_code(), Some(CODE_MALFORMED));

        let failed: Envelope<Pair> = Envelope::<Value>::failure(ApiError::new("x")).decode();
        assert_eq!(failed.into_result().unwrap_err().message, "x");
    }
}

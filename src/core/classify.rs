// Classification of API error payloads into a closed set of failure kinds.
// Rules are checked in a fixed order; the first match decides the kind.
use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::fmt;
use tracing::debug;

pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error from the API.";

const AUTH_SUBCODES: &[i64] = &[458, 459, 460, 463, 464, 467];
const AUTH_CODES: &[i64] = &[100, 102, 190];
const SERVER_CODES: &[i64] = &[1, 2];
const THROTTLE_CODES: &[i64] = &[4, 17, 341];
const DUPLICATE_POST_CODE: i64 = 506;
const MISSING_PERMISSION_CODE: i64 = 10;
const PERMISSION_CODE_RANGE: std::ops::RangeInclusive<i64> = 200..=299;
const OAUTH_EXCEPTION_TYPE: &str = "OAuthException";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ApiErrorKind {
    Authentication,
    Authorization,
    Server,
    Throttle,
    Client,
    Default,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiError {
    kind: ApiErrorKind,
    message: String,
    code: Option<i64>,
    subcode: i64,
    error_type: String,
    http_status: Option<u16>,
    raw_body: String,
    payload: Value,
}

impl ApiError {
    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<i64> {
        self.code
    }

    /// `error.error_subcode` from the payload, `-1` when absent.
    pub fn subcode(&self) -> i64 {
        self.subcode
    }

    /// `error.type` from the payload, empty when absent.
    pub fn error_type(&self) -> &str {
        &self.error_type
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    /// The normalized payload the classification was computed from.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ApiErrorKind::Server | ApiErrorKind::Throttle)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(code) = self.code {
            write!(f, " (code: {code}")?;
            if self.subcode != -1 {
                write!(f, ", subcode: {}", self.subcode)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl StdError for ApiError {}

pub fn classify(payload: &Value, http_status: Option<u16>, raw_body: &str) -> ApiError {
    let payload = normalize(payload);
    let error = payload.get("error");
    let field = |key: &str| error.and_then(|error| error.get(key));

    let message = field("message")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_ERROR_MESSAGE)
        .to_string();
    let code = field("code").and_then(integer_of);
    let subcode = field("error_subcode").and_then(integer_of);
    let error_type = field("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let kind = kind_for(code, subcode, &error_type);
    debug!(?kind, ?code, ?subcode, %error_type, "classified api error");

    ApiError {
        kind,
        message,
        code,
        subcode: subcode.unwrap_or(-1),
        error_type,
        http_status,
        raw_body: raw_body.to_string(),
        payload,
    }
}

fn kind_for(code: Option<i64>, subcode: Option<i64>, error_type: &str) -> ApiErrorKind {
    if subcode.is_some_and(|subcode| AUTH_SUBCODES.contains(&subcode)) {
        return ApiErrorKind::Authentication;
    }
    if let Some(code) = code {
        if AUTH_CODES.contains(&code) {
            return ApiErrorKind::Authentication;
        }
        if SERVER_CODES.contains(&code) {
            return ApiErrorKind::Server;
        }
        if THROTTLE_CODES.contains(&code) {
            return ApiErrorKind::Throttle;
        }
        if code == DUPLICATE_POST_CODE {
            return ApiErrorKind::Client;
        }
        if code == MISSING_PERMISSION_CODE || PERMISSION_CODE_RANGE.contains(&code) {
            return ApiErrorKind::Authorization;
        }
    }
    if error_type == OAUTH_EXCEPTION_TYPE {
        return ApiErrorKind::Authentication;
    }
    ApiErrorKind::Default
}

// Some endpoints return the error object flattened at the top level.
fn normalize(payload: &Value) -> Value {
    let has_nested_code = payload
        .get("error")
        .and_then(|error| error.get("code"))
        .is_some_and(|code| !code.is_null());
    let has_top_level_code = payload.get("code").is_some_and(|code| !code.is_null());
    if !has_nested_code && has_top_level_code {
        let mut wrapped = Map::new();
        wrapped.insert("error".to_string(), payload.clone());
        return Value::Object(wrapped);
    }
    payload.clone()
}

fn integer_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiErrorKind, UNKNOWN_ERROR_MESSAGE, classify};
    use serde_json::json;

    fn kind_of(payload: serde_json::Value) -> ApiErrorKind {
        classify(&payload, Some(400), "").kind()
    }

    #[test]
    fn subcode_rule_outranks_code_rule() {
        let payload = json!({"error": {"code": 190, "error_subcode": 458, "message": "x"}});
        let err = classify(&payload, Some(400), "raw");
        assert_eq!(err.kind(), ApiErrorKind::Authentication);
        assert_eq!(err.subcode(), 458);
        assert_eq!(err.code(), Some(190));
        assert_eq!(err.message(), "x");
    }

    #[test]
    fn subcode_wins_over_throttle_code() {
        assert_eq!(
            kind_of(json!({"error": {"code": 4, "error_subcode": 463}})),
            ApiErrorKind::Authentication
        );
    }

    #[test]
    fn code_table_maps_each_kind() {
        let cases = [
            (100, ApiErrorKind::Authentication),
            (102, ApiErrorKind::Authentication),
            (190, ApiErrorKind::Authentication),
            (1, ApiErrorKind::Server),
            (2, ApiErrorKind::Server),
            (4, ApiErrorKind::Throttle),
            (17, ApiErrorKind::Throttle),
            (341, ApiErrorKind::Throttle),
            (506, ApiErrorKind::Client),
            (10, ApiErrorKind::Authorization),
            (200, ApiErrorKind::Authorization),
            (250, ApiErrorKind::Authorization),
            (299, ApiErrorKind::Authorization),
            (300, ApiErrorKind::Default),
            (199, ApiErrorKind::Default),
        ];
        for (code, kind) in cases {
            assert_eq!(kind_of(json!({"error": {"code": code}})), kind, "code {code}");
        }
    }

    #[test]
    fn oauth_type_is_checked_after_codes() {
        assert_eq!(
            kind_of(json!({"error": {"code": 999, "type": "OAuthException"}})),
            ApiErrorKind::Authentication
        );
        assert_eq!(
            kind_of(json!({"error": {"code": 2, "type": "OAuthException"}})),
            ApiErrorKind::Server
        );
    }

    #[test]
    fn flat_payload_is_wrapped_before_classification() {
        let err = classify(&json!({"code": "abc", "message": "bad"}), Some(500), "");
        assert_eq!(err.kind(), ApiErrorKind::Default);
        assert_eq!(err.message(), "bad");
        assert_eq!(err.code(), None);
        assert_eq!(err.payload(), &json!({"error": {"code": "abc", "message": "bad"}}));
    }

    #[test]
    fn numeric_string_codes_match_rules() {
        assert_eq!(kind_of(json!({"code": "17"})), ApiErrorKind::Throttle);
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let err = classify(&json!({"error": {}}), None, "{\"error\":{}}");
        assert_eq!(err.kind(), ApiErrorKind::Default);
        assert_eq!(err.message(), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(err.code(), None);
        assert_eq!(err.subcode(), -1);
        assert_eq!(err.error_type(), "");
        assert_eq!(err.http_status(), None);
        assert_eq!(err.raw_body(), "{\"error\":{}}");
    }

    #[test]
    fn error_type_and_status_are_carried() {
        let err = classify(
            &json!({"error": {"code": 10, "type": "PermissionError"}}),
            Some(403),
            "",
        );
        assert_eq!(err.error_type(), "PermissionError");
        assert_eq!(err.http_status(), Some(403));
        assert!(!err.is_retryable());
    }
}

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;

use super::response::{ApiError, ErrorCode};

/// `Json` extractor whose rejections use the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection)
    }
}

fn map_json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let message = err.body_text();
            if let Some(field) = extract_missing_field(&message) {
                ApiError::new(
                    ErrorCode::InvalidRequest,
                    format!("Missing required field: {field}"),
                )
            } else {
                ApiError::new(ErrorCode::InvalidRequest, format!("Invalid JSON: {message}"))
            }
        }
        JsonRejection::JsonSyntaxError(err) => ApiError::new(
            ErrorCode::InvalidRequest,
            format!("JSON syntax error: {}", err.body_text()),
        ),
        JsonRejection::MissingJsonContentType(_) => ApiError::new(
            ErrorCode::InvalidRequest,
            "Missing `Content-Type: application/json` header",
        ),
        JsonRejection::BytesRejection(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            ApiError::new(ErrorCode::PayloadTooLarge, "Request body exceeds the size limit")
        }
        JsonRejection::BytesRejection(_) => {
            ApiError::new(ErrorCode::InvalidRequest, "Failed to read request body")
        }
        _ => ApiError::new(ErrorCode::InvalidRequest, rejection.body_text()),
    }
}

fn extract_missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let remaining = message.get(start..)?;
    let end = remaining.find('`')?;
    remaining.get(..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_is_extracted() {
        let msg = "Failed to deserialize the JSON body into the target type: missing field `language_code` at line 1 column 2";
        assert_eq!(extract_missing_field(msg), Some("language_code"));
        assert_eq!(extract_missing_field("something else"), None);
    }
}

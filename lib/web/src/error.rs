use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Request failures surfaced to clients as JSON `{message, data?}` bodies.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("query parameter is required")]
    MissingQuery,
    #[error("Query parse failed")]
    Parse(String),
    #[error("Query type not allowed")]
    QueryTypeNotAllowed,
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("queue is full")]
    QueueFull,
    #[error("job timed out")]
    Timeout,
    #[error("job was cancelled")]
    Cancelled,
    #[error("authentication required")]
    Unauthorized,
    #[error("no job found for this token")]
    JobNotFound,
    #[error("internal server error: {0}")]
    Internal(anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, data) = match &self {
            ProxyError::MissingQuery
            | ProxyError::QueryTypeNotAllowed
            | ProxyError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            ProxyError::Parse(message) => {
                (StatusCode::BAD_REQUEST, Some(Value::String(message.clone())))
            }
            ProxyError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, None),
            ProxyError::QueueFull | ProxyError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, None),
            ProxyError::Timeout => (StatusCode::GATEWAY_TIMEOUT, None),
            ProxyError::Unauthorized => (StatusCode::UNAUTHORIZED, None),
            ProxyError::JobNotFound => (StatusCode::NOT_FOUND, None),
            ProxyError::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };
        let unauthorized = matches!(self, ProxyError::Unauthorized);

        let body = ErrorBody {
            message: self.to_string(),
            data,
        };
        let mut response = (status, Json(body)).into_response();
        if unauthorized {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"sparql-proxy\""),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_carry_the_parser_message_as_data() {
        let response = ProxyError::Parse("unexpected token".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unauthorized_challenges_with_basic_auth() {
        let response = ProxyError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(WWW_AUTHENTICATE));
    }
}

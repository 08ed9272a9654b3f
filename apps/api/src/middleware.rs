use axum::extract::{Extension, Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use keyfort_application::RateLimitRule;
use keyfort_core::AppError;

use crate::error::ApiResult;
use crate::state::AppState;

/// Resolves the bearer credential and stores the validation result as a
/// request extension for handlers to consume.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let bearer = extract_bearer(request.headers())?;
    let credential = state.credential_service.validate(bearer).await?;

    request.extensions_mut().insert(credential);
    Ok(next.run(request).await)
}

/// Applies the rate limit rule attached to the route group, keyed by
/// client IP.
pub async fn rate_limit(
    State(state): State<AppState>,
    Extension(rule): Extension<RateLimitRule>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let client_ip = client_ip(request.headers());
    state
        .rate_limit_service
        .check_rate_limit(&rule, &client_ip)
        .await?;

    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::CredentialMalformed("missing Authorization header".to_owned())
        })?;

    value.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::CredentialMalformed("Authorization header is not a Bearer value".to_owned())
    })
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_owned())
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, header};

    use super::{client_ip, extract_bearer};

    #[test]
    fn bearer_value_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer sk-abc123"),
        );
        assert_eq!(extract_bearer(&headers).ok(), Some("sk-abc123"));
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(extract_bearer(&HeaderMap::new()).is_err());
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert!(extract_bearer(&headers).is_err());
    }

    #[test]
    fn first_forwarded_address_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn unknown_when_no_forwarding_header() {
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }
}

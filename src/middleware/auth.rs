use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{verify_access_token, AuthGate, Principal};
use crate::error::ApiError;
use crate::state::AppState;

/// The caller's raw platform access token, kept so calls made on the
/// user's own behalf (password update, sign-out) can forward it.
#[derive(Clone, Debug)]
pub struct BearerToken(pub String);

/// Session-resolution middleware: validates the bearer token locally and
/// injects the `Principal` into the request.
pub async fn require_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (principal, token) = resolve_principal(&headers, &state.jwt_secret)?;

    request.extensions_mut().insert(principal);
    request.extensions_mut().insert(BearerToken(token));

    Ok(next.run(request).await)
}

/// Admin gate middleware: everything `require_session` does, plus the
/// server-side role check against the profiles table. Every privileged
/// route goes through here; handlers never re-check the role themselves.
pub async fn require_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (principal, token) = resolve_principal(&headers, &state.jwt_secret)?;
    let admin = AuthGate::check_admin(state.platform.as_ref(), &principal).await?;

    request.extensions_mut().insert(principal);
    request.extensions_mut().insert(BearerToken(token));
    request.extensions_mut().insert(admin);

    Ok(next.run(request).await)
}

fn resolve_principal(headers: &HeaderMap, secret: &str) -> Result<(Principal, String), ApiError> {
    let token = extract_bearer_token(headers).map_err(ApiError::unauthorized)?;
    let claims = verify_access_token(&token, secret).map_err(ApiError::unauthorized)?;
    Ok((Principal::from(claims), token))
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def");
    }

    #[test]
    fn rejects_missing_and_malformed_headers() {
        assert!(extract_bearer_token(&HeaderMap::new()).is_err());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic xyz"));
        assert!(extract_bearer_token(&headers).is_err());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert!(extract_bearer_token(&headers).is_err());
    }
}

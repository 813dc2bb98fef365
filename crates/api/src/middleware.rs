use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use loyalty_auth::JwtValidator;

use crate::context::UserContext;

/// Cookie set at login/registration carrying the bearer token.
pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_token(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = state.jwt.validate(&token).map_err(|e| {
        debug!(error = %e, "rejected bearer token");
        StatusCode::UNAUTHORIZED
    })?;

    req.extensions_mut().insert(UserContext::new(claims.sub));

    Ok(next.run(req).await)
}

/// `Authorization: Bearer …` wins over the cookie.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    extract_bearer(headers).or_else(|| extract_cookie(headers))
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn extract_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == AUTH_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn bearer_header() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer abc")]);
        assert_eq!(extract_token(&h).as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_fallback() {
        let h = headers(&[(header::COOKIE, "theme=dark; auth_token=xyz")]);
        assert_eq!(extract_token(&h).as_deref(), Some("xyz"));
    }

    #[test]
    fn header_beats_cookie() {
        let h = headers(&[
            (header::AUTHORIZATION, "Bearer abc"),
            (header::COOKIE, "auth_token=xyz"),
        ]);
        assert_eq!(extract_token(&h).as_deref(), Some("abc"));
    }

    #[test]
    fn missing_or_malformed() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
        assert_eq!(extract_token(&headers(&[(header::AUTHORIZATION, "Basic abc")])), None);
        assert_eq!(extract_token(&headers(&[(header::AUTHORIZATION, "Bearer ")])), None);
        assert_eq!(extract_token(&headers(&[(header::COOKIE, "auth_token=")])), None);
    }
}

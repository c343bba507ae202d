use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::server::AppState;

/// Bearer token presented by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

/// Rejection type returned when auth fails.
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let msg = match self {
            AuthError::MissingToken => "missing bearer token",
            AuthError::InvalidToken => "invalid token",
        };
        (StatusCode::UNAUTHORIZED, msg).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::MissingToken)?;
        Ok(BearerToken(bearer.token().to_string()))
    }
}

/// Guard that passes when the server has no token configured, or when the
/// request carries the configured one.
#[derive(Debug, Clone, Copy)]
pub struct Authorized;

#[async_trait]
impl FromRequestParts<AppState> for Authorized {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.api_token.as_deref() else {
            return Ok(Authorized);
        };
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        if token == expected {
            Ok(Authorized)
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, Request};

    async fn extract(header: Option<&str>) -> Result<BearerToken, AuthError> {
        let mut builder = Request::builder().uri("/api/products");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        BearerToken::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_bearer_token() {
        let token = extract(Some("Bearer abc")).await.unwrap();
        assert_eq!(token, BearerToken("abc".into()));
    }

    #[tokio::test]
    async fn rejects_missing_or_foreign_schemes() {
        assert!(matches!(extract(None).await, Err(AuthError::MissingToken)));
        assert!(matches!(
            extract(Some("Basic YWxhZGRpbjpvcGVuc2VzYW1l")).await,
            Err(AuthError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn guard_compares_configured_token() {
        let state = AppState::new(Default::default(), Some("secret".into()));
        let (mut parts, _) = Request::builder()
            .header(AUTHORIZATION, "Bearer other")
            .body(())
            .unwrap()
            .into_parts();
        let result = Authorized::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));

        let open = AppState::default();
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        assert!(Authorized::from_request_parts(&mut parts, &open).await.is_ok());
    }
}

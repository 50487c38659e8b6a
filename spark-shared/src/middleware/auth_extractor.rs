use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Once;

use super::is_production;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::types::auth::{AuthUser, Claims};

const DEV_JWT_SECRET: &str = "development-secret-change-in-production";

/// HS256 secret shared with the identity service.
///
/// Outside production an unset or empty `JWT_SECRET` falls back to a
/// development secret, with a warning. In production it is an error.
pub fn jwt_secret() -> AppResult<String> {
    resolve_secret(std::env::var("JWT_SECRET").ok(), is_production())
}

fn resolve_secret(configured: Option<String>, production: bool) -> AppResult<String> {
    match configured {
        Some(secret) if !secret.is_empty() => Ok(secret),
        _ if production => Err(AppError::internal("JWT_SECRET must be set when SPARK_ENV=production")),
        _ => {
            static WARNED: Once = Once::new();
            WARNED.call_once(|| tracing::warn!("JWT_SECRET not set, using the development secret"));
            Ok(DEV_JWT_SECRET.to_string())
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let claims = validate_jwt(token, &jwt_secret()?)?;

        if claims.is_expired() {
            return Err(AppError::new(ErrorCode::TokenExpired, "token has expired"));
        }

        Ok(AuthUser::from(claims))
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::unauthorized("missing authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("invalid authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("authorization header must use Bearer scheme"))
}

fn validate_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::new(ErrorCode::TokenExpired, "token has expired")
        }
        _ => AppError::new(ErrorCode::TokenInvalid, format!("invalid token: {e}")),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::auth::UserRole;
    use axum::http::Request;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    fn token_for(claims: &Claims, secret: &str) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    async fn extract(header: Option<String>) -> Result<AuthUser, AppError> {
        let mut builder = Request::builder().uri("/matches");
        if let Some(value) = header {
            builder = builder.header("Authorization", value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn accepts_valid_bearer_token() {
        let user_id = Uuid::now_v7();
        let token = token_for(&Claims::new(user_id, UserRole::User, 3600), &jwt_secret().unwrap());

        let user = extract(Some(format!("Bearer {token}"))).await.unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.role, UserRole::User);
    }

    #[tokio::test]
    async fn rejects_missing_header() {
        let err = extract(None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn rejects_non_bearer_scheme() {
        let err = extract(Some("Basic abc".into())).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[test]
    fn dev_secret_fallback_is_refused_in_production() {
        let err = resolve_secret(None, true).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(resolve_secret(Some(String::new()), true).is_err());

        assert_eq!(resolve_secret(None, false).unwrap(), DEV_JWT_SECRET);
        assert_eq!(resolve_secret(Some("s3cret".into()), true).unwrap(), "s3cret");
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let token = token_for(&Claims::new(Uuid::now_v7(), UserRole::User, 3600), "someone-else");
        let err = validate_jwt(&token, "expected-secret").unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenInvalid);
    }
}

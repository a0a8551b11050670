use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};
use chauffeur_core::{Role, User};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::{AppState, AuthConfig};

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

pub fn issue_token(auth: &AuthConfig, user: &User) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

pub fn decode_token(auth: &AuthConfig, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        AppError::AuthenticationError("Not authorized, token failed".to_string())
    })
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Decodes the bearer token and reloads its user, so a deleted account or a
/// changed role takes effect immediately.
pub async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = bearer_token(headers)
        .ok_or_else(|| AppError::AuthenticationError("Not authorized, no token".to_string()))?;
    let claims = decode_token(&state.auth, token)?;
    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::AuthenticationError("Not authorized, token failed".to_string()))?;

    state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::AuthenticationError("Not authorized, user not found".to_string()))
}

// ============================================================================
// Middleware
// ============================================================================

/// The authenticated caller, inserted into request extensions by [`authenticate`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn require(&self, roles: &[Role]) -> Result<(), AppError> {
        if self.0.has_role(roles) {
            Ok(())
        } else {
            Err(AppError::AuthorizationError(format!(
                "Access denied for role '{}'",
                self.0.role
            )))
        }
    }
}

pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve_user(&state, req.headers()).await?;
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

pub async fn require_admin(
    Extension(current): Extension<CurrentUser>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if current.0.role != Role::Admin {
        return Err(AppError::AuthorizationError(
            "Not authorized as an admin".to_string(),
        ));
    }
    Ok(next.run(req).await)
}

pub async fn require_back_office(
    Extension(current): Extension<CurrentUser>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    current.require(&[Role::Admin, Role::Staff])?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn auth() -> AuthConfig {
        AuthConfig {
            secret: "test-secret".into(),
            expiration: 3600,
        }
    }

    fn staff() -> User {
        User::new(
            "Mona".into(),
            "Ali".into(),
            "mona@example.com",
            "1".into(),
            "hash".into(),
            Role::Staff,
        )
    }

    #[test]
    fn test_token_round_trip() {
        let user = staff();
        let token = issue_token(&auth(), &user).unwrap();
        let claims = decode_token(&auth(), &token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, Role::Staff);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let token = issue_token(&auth(), &staff()).unwrap();
        let other = AuthConfig {
            secret: "another-secret".into(),
            expiration: 3600,
        };
        assert!(matches!(
            decode_token(&other, &token),
            Err(AppError::AuthenticationError(_))
        ));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_none());
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[test]
    fn test_require_checks_role() {
        let current = CurrentUser(staff());
        assert!(current.require(&[Role::Admin, Role::Staff]).is_ok());
        assert!(matches!(
            current.require(&[Role::Driver]),
            Err(AppError::AuthorizationError(_))
        ));
    }
}

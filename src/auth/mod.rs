//! Session authentication and role checks.
//!
//! The session layer resolves the `session` cookie (or a bearer token) into a
//! [`CurrentUser`] stored in request extensions. Handlers take `CurrentUser` as
//! an extractor, which rejects unauthenticated requests with 401, and call
//! [`CurrentUser::require`] and [`CurrentUser::station_scope`] for the rest.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Duration;

use crate::errors::AppError;
use crate::models::{Role, User};
use crate::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub station_id: Option<String>,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            station_id: user.station_id,
        }
    }
}

impl CurrentUser {
    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// Fail with 403 unless the caller has one of `allowed`.
    pub fn require(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role {} may not perform this action",
                self.role.as_str()
            )))
        }
    }

    /// Station filter to apply to a query.
    ///
    /// SuperAdmin gets whatever was requested (`None` means all stations). Every
    /// other role is pinned to its own station whatever was requested, and is
    /// refused when it has none.
    pub fn station_scope(&self, requested: Option<String>) -> Result<Option<String>, AppError> {
        if self.is_super_admin() {
            return Ok(requested);
        }
        match &self.station_id {
            Some(own) => Ok(Some(own.clone())),
            None => Err(AppError::Forbidden(
                "No station is assigned to this account".to_string(),
            )),
        }
    }

    /// Whether a record belonging to `station_id` is visible to the caller.
    pub fn can_access_station(&self, station_id: &str) -> bool {
        self.is_super_admin() || self.station_id.as_deref() == Some(station_id)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Session token carried by the request, from the cookie or a bearer header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.trim().to_string())
    })
    .filter(|token| !token.is_empty())
}

/// Middleware that attaches the session's user, if any, to the request.
///
/// Requests without a valid session pass through unauthenticated; the
/// `CurrentUser` extractor decides whether that is acceptable.
pub async fn session_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = session_token(request.headers()) {
        match state.repo.find_session_user(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(CurrentUser::from(user));
            }
            Ok(None) => tracing::debug!("Unknown or expired session token"),
            Err(e) => tracing::warn!("Session lookup failed: {}", e),
        }
    }
    next.run(request).await
}

/// `Set-Cookie` value that stores a session.
pub fn session_cookie(token: &str, ttl: Duration, secure: bool) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        SESSION_COOKIE,
        token,
        ttl.num_seconds(),
        if secure { "; Secure" } else { "" }
    )
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
        SESSION_COOKIE,
        if secure { "; Secure" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user(role: Role, station_id: Option<&str>) -> CurrentUser {
        CurrentUser {
            id: "u1".to_string(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            role,
            station_id: station_id.map(str::to_string),
        }
    }

    #[test]
    fn test_super_admin_scope_follows_request() {
        let admin = user(Role::SuperAdmin, None);
        assert_eq!(admin.station_scope(None).unwrap(), None);
        assert_eq!(
            admin.station_scope(Some("s2".to_string())).unwrap(),
            Some("s2".to_string())
        );
    }

    #[test]
    fn test_station_roles_are_pinned_to_own_station() {
        for role in [Role::StationManager, Role::Staff] {
            let caller = user(role, Some("s1"));
            assert_eq!(caller.station_scope(None).unwrap(), Some("s1".to_string()));
            assert_eq!(
                caller.station_scope(Some("s2".to_string())).unwrap(),
                Some("s1".to_string())
            );
        }
    }

    #[test]
    fn test_scope_without_station_is_forbidden() {
        let caller = user(Role::StationManager, None);
        let err = caller.station_scope(Some("s2".to_string())).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_require() {
        let staff = user(Role::Staff, Some("s1"));
        assert!(staff.require(&[Role::Staff, Role::SuperAdmin]).is_ok());
        assert!(matches!(
            staff.require(&[Role::SuperAdmin]),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_session_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc123; lang=en"),
        );
        assert_eq!(session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn test_session_token_from_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(session_token(&headers), Some("xyz".to_string()));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_cookie_strings() {
        let cookie = session_cookie("tok", Duration::hours(2), true);
        assert!(cookie.starts_with("session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=7200"));
        assert!(cookie.ends_with("; Secure"));
        assert!(!session_cookie("tok", Duration::hours(2), false).contains("Secure"));

        let cleared = clear_session_cookie(true);
        assert!(cleared.contains("Max-Age=0"));
        assert!(cleared.contains("Secure"));
    }
}

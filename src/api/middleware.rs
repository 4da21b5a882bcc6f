//! HTTP middleware and shared handler plumbing
//!
//! Contains:
//! - `AppState`, the services shared by every handler
//! - Session resolution from the `session` cookie
//! - `PageError`, mapping service failures onto HTTP statuses
//! - Rendering of themed error pages

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::models::Session;
use crate::services::{
    AuthError, AuthService, ContactService, ContactServiceError, ImageError, PostService,
    PostServiceError,
};
use crate::theme::ThemeEngine;

/// Plain-text body for admin routes requested without an admin session
pub const FORBIDDEN_MESSAGE: &str = "Only admin can access this page";

/// Name of the cookie holding the session token
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub post_service: Arc<PostService>,
    pub contact_service: Arc<ContactService>,
    pub theme: Arc<ThemeEngine>,
    pub settings: Arc<PageSettings>,
}

/// Request-independent values handlers need from configuration
#[derive(Debug, Clone)]
pub struct PageSettings {
    pub max_content_length: usize,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
}

/// Session attached to the current request, if the cookie named a live one
#[derive(Debug, Clone, Default)]
pub struct CurrentSession(pub Option<Session>);

impl CurrentSession {
    pub fn session(&self) -> Option<&Session> {
        self.0.as_ref()
    }
}

/// Failure of a page handler
#[derive(Debug)]
pub enum PageError {
    BadRequest(String),
    Forbidden,
    NotFound(String),
    Internal(String),
}

/// Marker left on error responses so `render_error_pages` can theme them
#[derive(Debug, Clone)]
struct ErrorPage {
    message: String,
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            PageError::Forbidden => {
                return (StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE).into_response();
            }
            PageError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            PageError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            PageError::Internal(message) => {
                tracing::error!("Request failed: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong.".to_string(),
                )
            }
        };

        let mut response = (status, message.clone()).into_response();
        response.extensions_mut().insert(ErrorPage { message });
        response
    }
}

impl From<AuthError> for PageError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotAdmin => PageError::Forbidden,
            AuthError::InvalidCredentials => PageError::BadRequest(err.to_string()),
            AuthError::Internal(e) => PageError::Internal(format!("{:#}", e)),
        }
    }
}

impl From<PostServiceError> for PageError {
    fn from(err: PostServiceError) -> Self {
        match err {
            PostServiceError::NotFound(_) => PageError::NotFound("Post not found".to_string()),
            PostServiceError::ValidationError(msg) => PageError::BadRequest(msg),
            PostServiceError::BadRequest(_) => PageError::BadRequest(
                "Invalid page requested. If you entered the URL manually, check it and try again."
                    .to_string(),
            ),
            PostServiceError::Image(ImageError::Io(e)) => {
                PageError::Internal(format!("Failed to store image: {}", e))
            }
            PostServiceError::Image(e) => PageError::BadRequest(e.to_string()),
            PostServiceError::StorageError(e) => PageError::Internal(format!("{:#}", e)),
        }
    }
}

impl From<ContactServiceError> for PageError {
    fn from(err: ContactServiceError) -> Self {
        match err {
            ContactServiceError::ValidationError(msg) => PageError::BadRequest(msg),
            ContactServiceError::StorageError(e) => PageError::Internal(format!("{:#}", e)),
        }
    }
}

impl From<anyhow::Error> for PageError {
    fn from(err: anyhow::Error) -> Self {
        PageError::Internal(format!("{:#}", err))
    }
}

/// Parse a numeric path id, rejecting anything else with 400
pub fn parse_post_id(raw: &str) -> Result<i64, PageError> {
    raw.parse::<i64>()
        .map_err(|_| PageError::BadRequest(format!("Invalid post id: {}", raw)))
}

/// Render a page template with `is_admin` set from the current session
pub fn render(
    state: &AppState,
    session: &CurrentSession,
    template: &str,
    mut context: TeraContext,
) -> Result<Html<String>, PageError> {
    context.insert("is_admin", &state.auth_service.is_admin(session.session()));
    let html = state.theme.render_page(template, &context)?;
    Ok(Html(html))
}

/// Extract the session token from the `session` cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().strip_prefix("session="))
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

/// `Set-Cookie` value opening a session
pub fn session_cookie(token: &str, settings: &PageSettings) -> Result<HeaderValue, PageError> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        settings.session_ttl_hours.saturating_mul(60 * 60)
    );
    if settings.cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| PageError::Internal(format!("Invalid session cookie: {}", e)))
}

/// `Set-Cookie` value clearing the session
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Resolve the session cookie into a [`CurrentSession`] request extension.
///
/// Lookup failures are logged and treated as anonymous.
pub async fn resolve_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut current = CurrentSession::default();

    if let Some(token) = extract_session_token(request.headers()) {
        match state.auth_service.resolve(&token).await {
            Ok(session) => current.0 = session,
            Err(e) => tracing::warn!("Session lookup failed: {}", e),
        }
    }

    request.extensions_mut().insert(current);
    next.run(request).await
}

/// Replace the body of 400/404/500 responses produced by [`PageError`] with
/// the themed error page
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let is_admin = request
        .extensions()
        .get::<CurrentSession>()
        .map(|session| state.auth_service.is_admin(session.session()))
        .unwrap_or(false);

    let response = next.run(request).await;
    let Some(page) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };

    let status = response.status();
    let mut context = TeraContext::new();
    context.insert("status", &status.as_u16());
    context.insert("error_message", &page.message);
    context.insert("is_admin", &is_admin);

    (status, Html(state.theme.render_with_fallback("error.html", &context))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_extract_session_token_from_cookie() {
        let headers = headers_with_cookie("theme=dark; session=abc-123; other=1");
        assert_eq!(extract_session_token(&headers), Some("abc-123".to_string()));
    }

    #[test]
    fn test_extract_session_token_none() {
        assert!(extract_session_token(&HeaderMap::new()).is_none());
        assert!(extract_session_token(&headers_with_cookie("session=")).is_none());
        assert!(extract_session_token(&headers_with_cookie("sessionid=x")).is_none());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let settings = PageSettings {
            max_content_length: 255,
            session_ttl_hours: 2,
            cookie_secure: true,
        };

        let cookie = session_cookie("tok", &settings).unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "session=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=7200; Secure"
        );
    }

    #[test]
    fn test_session_cookie_huge_ttl_saturates() {
        let settings = PageSettings {
            max_content_length: 255,
            session_ttl_hours: i64::MAX,
            cookie_secure: false,
        };

        let cookie = session_cookie("tok", &settings).unwrap();
        assert!(cookie
            .to_str()
            .unwrap()
            .ends_with(&format!("Max-Age={}", i64::MAX)));
    }

    #[test]
    fn test_parse_post_id() {
        assert_eq!(parse_post_id("42").unwrap(), 42);
        assert!(matches!(parse_post_id("abc"), Err(PageError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_forbidden_is_plain_text() {
        let response = PageError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.extensions().get::<ErrorPage>().is_none());

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], FORBIDDEN_MESSAGE.as_bytes());
    }

    #[test]
    fn test_service_error_mapping() {
        assert!(matches!(
            PageError::from(PostServiceError::NotFound(3)),
            PageError::NotFound(_)
        ));
        assert!(matches!(PageError::from(AuthError::NotAdmin), PageError::Forbidden));
        assert!(matches!(
            PageError::from(PostServiceError::Image(ImageError::TooLarge { size: 2, max: 1 })),
            PageError::BadRequest(_)
        ));
        assert!(matches!(
            PageError::from(ContactServiceError::StorageError(anyhow::anyhow!("db down"))),
            PageError::Internal(_)
        ));
    }
}

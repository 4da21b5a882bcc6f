//! Public pages: home, about, single post and contact

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Extension, Form,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::middleware::{render, AppState, CurrentSession, PageError};
use crate::services::{ContactInput, ContactServiceError};

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    pub load_more: Option<String>,
}

/// GET / - growing list of posts with a "load more" link
pub async fn home(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<HomeQuery>,
) -> Result<Html<String>, PageError> {
    let page = state
        .post_service
        .list_page(query.load_more.as_deref())
        .await?;

    let mut context = TeraContext::new();
    context.insert("posts", &page.posts);
    context.insert("load_more_url", page.window.href());
    render(&state, &session, "index.html", context)
}

/// GET /about
pub async fn about(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Html<String>, PageError> {
    render(&state, &session, "about.html", TeraContext::new())
}

/// GET /post/{slug}
pub async fn post(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(slug): Path<String>,
) -> Result<Html<String>, PageError> {
    let post = state
        .post_service
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| PageError::NotFound(format!("No post at /post/{}", slug)))?;

    let mut context = TeraContext::new();
    context.insert("post", &post);
    render(&state, &session, "post.html", context)
}

/// GET /contact
pub async fn contact_form(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Html<String>, PageError> {
    render(&state, &session, "contact.html", TeraContext::new())
}

/// POST /contact - store the message and notify the owner
///
/// Invalid input re-renders the form with the problem and a 400 status.
pub async fn contact_submit(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Form(input): Form<ContactInput>,
) -> Result<Response, PageError> {
    let mut context = TeraContext::new();

    match state.contact_service.submit(input).await {
        Ok(_) => {
            context.insert("sent", &true);
            Ok(render(&state, &session, "contact.html", context)?.into_response())
        }
        Err(ContactServiceError::ValidationError(msg)) => {
            context.insert("error", &msg);
            let page = render(&state, &session, "contact.html", context)?;
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Fallback for unknown paths
pub async fn not_found() -> PageError {
    PageError::NotFound("Page not found".to_string())
}

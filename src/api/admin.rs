//! Admin area: login, dashboard, post editing and logout
//!
//! Every handler except login and logout starts by asking the auth service
//! for an `AdminCapability`; without one the request ends with 403.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::middleware::{
    clear_session_cookie, extract_session_token, parse_post_id, render, session_cookie, AppState,
    CurrentSession, PageError,
};
use crate::services::{AdminCapability, AuthError, PostDraft, UploadedImage};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// GET /admin - dashboard for the admin, login form for everyone else
pub async fn admin_page(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Html<String>, PageError> {
    match state.auth_service.authorize(session.session()) {
        Ok(admin) => dashboard(&state, &session, &admin).await,
        Err(AuthError::NotAdmin) => render(&state, &session, "admin.html", TeraContext::new()),
        Err(e) => Err(e.into()),
    }
}

/// POST /admin - check credentials and open a session
pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    if state.auth_service.is_admin(session.session()) {
        return Ok(Redirect::to("/admin").into_response());
    }

    match state.auth_service.login(&form.username, &form.password).await {
        Ok(new_session) => {
            let cookie = session_cookie(&new_session.id, &state.settings)?;
            Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/admin")).into_response())
        }
        Err(e @ AuthError::InvalidCredentials) => {
            let mut context = TeraContext::new();
            context.insert("message", &e.to_string());
            Ok(render(&state, &session, "admin.html", context)?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /logout - close the session; fine without one
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, PageError> {
    let token = extract_session_token(&headers);
    state.auth_service.logout(token.as_deref()).await?;

    Ok(([(header::SET_COOKIE, clear_session_cookie())], Redirect::to("/")).into_response())
}

/// GET /add
pub async fn add_form(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Html<String>, PageError> {
    state.auth_service.authorize(session.session())?;

    let mut context = TeraContext::new();
    context.insert("max_content_length", &state.settings.max_content_length);
    render(&state, &session, "add.html", context)
}

/// POST /add - multipart `title`, `content` and optional file `postimg`
pub async fn add_submit(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    multipart: Multipart,
) -> Result<Redirect, PageError> {
    let admin = state.auth_service.authorize(session.session())?;

    let draft = read_post_form(multipart, "postimg").await?;
    let post = state.post_service.create(&admin, draft).await?;

    Ok(Redirect::to(&format!("/edit/{}", post.id)))
}

/// GET /edit/{id}
pub async fn edit_form(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<String>,
) -> Result<Html<String>, PageError> {
    state.auth_service.authorize(session.session())?;
    let id = parse_post_id(&id)?;

    let post = state
        .post_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| PageError::NotFound(format!("Post {} not found", id)))?;

    let mut context = TeraContext::new();
    context.insert("post", &post);
    context.insert("max_content_length", &state.settings.max_content_length);
    render(&state, &session, "edit.html", context)
}

/// POST /edit/{id} - multipart `title`, `content`, file `imgfile`, carried `postimg`
pub async fn edit_submit(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Redirect, PageError> {
    let admin = state.auth_service.authorize(session.session())?;
    let id = parse_post_id(&id)?;

    let draft = read_post_form(multipart, "imgfile").await?;
    state.post_service.update(&admin, id, draft).await?;

    Ok(Redirect::to(&format!("/edit/{}", id)))
}

/// GET /delete/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<String>,
) -> Result<Redirect, PageError> {
    let admin = state.auth_service.authorize(session.session())?;
    let id = parse_post_id(&id)?;

    state.post_service.delete(&admin, id).await?;

    Ok(Redirect::to("/admin"))
}

async fn dashboard(
    state: &AppState,
    session: &CurrentSession,
    admin: &AdminCapability,
) -> Result<Html<String>, PageError> {
    let posts = state.post_service.list_all(admin).await?;
    let inbox = state.contact_service.inbox(admin).await?;

    let mut context = TeraContext::new();
    context.insert("posts", &posts);
    context.insert("inbox", &inbox);
    render(state, session, "dashboard.html", context)
}

/// Collect the add/edit form fields. `file_field` names the upload input; a
/// text field called `postimg` carries the current image on the edit form.
async fn read_post_form(mut multipart: Multipart, file_field: &str) -> Result<PostDraft, PageError> {
    let mut draft = PostDraft::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PageError::BadRequest(format!("Failed to read form: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| PageError::BadRequest(format!("Failed to read file: {}", e)))?;
            // Browsers send an empty part when no file was chosen
            if !filename.is_empty() {
                draft.image = Some(UploadedImage {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| PageError::BadRequest(format!("Failed to read form: {}", e)))?;
        match name.as_str() {
            "title" => draft.title = value,
            "content" => draft.content = value,
            "postimg" => draft.existing_image = Some(value),
            _ => {}
        }
    }

    Ok(draft)
}

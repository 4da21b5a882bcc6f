//! HTTP layer - handlers and routing
//!
//! This module contains:
//! - Public pages (home, about, post, contact)
//! - The admin area (login, dashboard, add, edit, delete, logout)
//! - Static serving of uploaded images under `/uploads`
//! - Session resolution, error pages, tracing, compression and timeouts

pub mod admin;
pub mod middleware;
pub mod pages;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::config::{ServerConfig, UploadConfig};
use crate::services::image::UPLOADS_ROUTE;

pub use middleware::{AppState, CurrentSession, PageError, PageSettings};

/// Extra room for the text fields sent along with an image upload
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the page routes
pub fn build_page_router(upload: &UploadConfig) -> Router<AppState> {
    let upload_limit = usize::try_from(upload.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(pages::home))
        .route("/about", get(pages::about))
        .route("/post/{slug}", get(pages::post))
        .route(
            "/contact",
            get(pages::contact_form).post(pages::contact_submit),
        )
        .route("/admin", get(admin::admin_page).post(admin::login))
        .route(
            "/add",
            get(admin::add_form)
                .post(admin::add_submit)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/edit/{id}",
            get(admin::edit_form)
                .post(admin::edit_submit)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/delete/{id}", get(admin::delete))
        .route("/logout", get(admin::logout))
        .fallback(pages::not_found)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, server: &ServerConfig, upload: &UploadConfig) -> Router {
    Router::new()
        .merge(build_page_router(upload))
        .nest_service(UPLOADS_ROUTE, ServeDir::new(&upload.path))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::render_error_pages,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_session,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.request_timeout_secs),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdminConfig;
    use crate::db::repositories::{
        ContactRepository, SqlxContactRepository, SqlxPostRepository, SqlxSessionRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::services::notifier::testing::RecordingNotifier;
    use crate::services::{
        AuthService, ContactService, ImageStore, NotificationQueue, PostService,
    };
    use crate::theme::{SiteVars, ThemeEngine};
    use axum::http::{header, HeaderValue, StatusCode};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct TestApp {
        server: TestServer,
        contacts: Arc<dyn ContactRepository>,
        notifier: Arc<RecordingNotifier>,
        uploads: TempDir,
    }

    async fn test_app() -> TestApp {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let uploads = TempDir::new().unwrap();
        let upload = UploadConfig {
            path: uploads.path().to_path_buf(),
            max_file_size: 1024 * 1024,
        };
        let admin = AdminConfig {
            username: "admin".to_string(),
            password: "letmein".to_string(),
            ..AdminConfig::default()
        };

        let contacts = SqlxContactRepository::boxed(pool.clone());
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, _worker) = NotificationQueue::spawn(notifier.clone(), 16);

        let state = AppState {
            auth_service: Arc::new(AuthService::new(
                SqlxSessionRepository::boxed(pool.clone()),
                admin,
            )),
            post_service: Arc::new(PostService::new(
                SqlxPostRepository::boxed(pool.clone()),
                ImageStore::new(&upload.path, upload.max_file_size),
                3,
                255,
            )),
            contact_service: Arc::new(ContactService::new(contacts.clone(), queue, "Technify")),
            theme: Arc::new(
                ThemeEngine::builtin(SiteVars {
                    name: "Technify".to_string(),
                    ..SiteVars::default()
                })
                .unwrap(),
            ),
            settings: Arc::new(PageSettings {
                max_content_length: 255,
                session_ttl_hours: 24,
                cookie_secure: false,
            }),
        };

        let app = build_router(state, &ServerConfig::default(), &upload);
        TestApp {
            server: TestServer::new(app).unwrap(),
            contacts,
            notifier,
            uploads,
        }
    }

    /// Log in and return the `Cookie` header value for the new session
    async fn login(server: &TestServer) -> HeaderValue {
        let response = server
            .post("/admin")
            .form(&[("username", "admin"), ("password", "letmein")])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        let set_cookie = response.header(header::SET_COOKIE);
        let pair = set_cookie
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        HeaderValue::from_str(&pair).unwrap()
    }

    async fn create_post(server: &TestServer, cookie: &HeaderValue, title: &str) -> String {
        let response = server
            .post("/add")
            .add_header(header::COOKIE, cookie.clone())
            .multipart(
                MultipartForm::new()
                    .add_text("title", title)
                    .add_text("content", format!("Body of {}", title)),
            )
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        response.header(header::LOCATION).to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_home_renders_first_page() {
        let app = test_app().await;
        let cookie = login(&app.server).await;
        for n in 1..=4 {
            create_post(&app.server, &cookie, &format!("Post {}", n)).await;
        }

        let response = app.server.get("/").await;
        response.assert_status_ok();
        let html = response.text();
        assert!(html.contains("/post/post-3"));
        assert!(!html.contains("/post/post-4"));
        assert!(html.contains("/?load_more=3"));

        let more = app.server.get("/").add_query_param("load_more", "3").await.text();
        assert!(more.contains("/post/post-4"));
        assert!(!more.contains("Older Posts"));
    }

    #[tokio::test]
    async fn test_home_rejects_non_numeric_offset() {
        let app = test_app().await;

        let response = app.server.get("/").add_query_param("load_more", "abc").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(!response.text().contains("class=\"post-preview\""));
    }

    #[tokio::test]
    async fn test_about_page() {
        let app = test_app().await;
        app.server.get("/about").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_missing_post_is_404_page() {
        let app = test_app().await;

        let response = app.server.get("/post/nothing-here").await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert!(response.text().contains("<html"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_404_page() {
        let app = test_app().await;

        let response = app.server.get("/no/such/page").await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert!(response.text().contains("Page not found"));
    }

    #[tokio::test]
    async fn test_admin_routes_forbidden_without_session() {
        let app = test_app().await;

        for path in ["/add", "/edit/1", "/delete/1", "/edit/abc"] {
            let response = app.server.get(path).await;
            response.assert_status(StatusCode::FORBIDDEN);
            assert_eq!(response.text(), "Only admin can access this page");
        }
    }

    #[tokio::test]
    async fn test_admin_get_shows_login_form() {
        let app = test_app().await;

        let html = app.server.get("/admin").await.text();

        assert!(html.contains("name=\"password\""));
    }

    #[tokio::test]
    async fn test_wrong_credentials_show_generic_message() {
        let app = test_app().await;

        let response = app
            .server
            .post("/admin")
            .form(&[("username", "admin"), ("password", "nope")])
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("Wrong username or password"));
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_add_edit_delete_flow() {
        let app = test_app().await;
        let cookie = login(&app.server).await;

        let dashboard = app
            .server
            .get("/admin")
            .add_header(header::COOKIE, cookie.clone())
            .await
            .text();
        assert!(dashboard.contains("Add a new post"));

        let location = create_post(&app.server, &cookie, "Hello World").await;
        assert!(location.starts_with("/edit/"));
        app.server.get("/post/hello-world").await.assert_status_ok();

        let edit = app
            .server
            .post(&location)
            .add_header(header::COOKIE, cookie.clone())
            .multipart(
                MultipartForm::new()
                    .add_text("title", "Hello  World!")
                    .add_text("content", "Edited")
                    .add_text("postimg", "")
                    .add_part(
                        "imgfile",
                        Part::bytes(b"fake-png".to_vec())
                            .file_name("new cover.png")
                            .mime_type("image/png"),
                    ),
            )
            .await;
        edit.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(edit.header(header::LOCATION).to_str().unwrap(), location);

        let post_page = app.server.get("/post/hello--world!").await;
        post_page.assert_status_ok();
        assert!(post_page.text().contains("/uploads/new_cover.png"));
        assert!(app.uploads.path().join("new_cover.png").exists());
        app.server.get("/uploads/new_cover.png").await.assert_status_ok();

        let id = location.trim_start_matches("/edit/");
        let deleted = app
            .server
            .get(&format!("/delete/{}", id))
            .add_header(header::COOKIE, cookie.clone())
            .await;
        deleted.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(deleted.header(header::LOCATION).to_str().unwrap(), "/admin");

        app.server
            .get("/post/hello--world!")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        app.server
            .get(&format!("/delete/{}", id))
            .add_header(header::COOKIE, cookie)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_home_links_reach_posts_with_reserved_characters() {
        let app = test_app().await;
        let cookie = login(&app.server).await;
        create_post(&app.server, &cookie, "Why Rust?").await;
        create_post(&app.server, &cookie, "A/B testing").await;

        let html = app.server.get("/").await.text();
        let links: Vec<&str> = html
            .split("href=\"/post/")
            .skip(1)
            .filter_map(|rest| rest.split('"').next())
            .collect();

        assert!(links.contains(&"why-rust%3F"));
        assert!(links.contains(&"a%2Fb-testing"));
        for link in links {
            let page = app.server.get(&format!("/post/{}", link)).await;
            page.assert_status_ok();
        }
        assert!(app
            .server
            .get("/post/why-rust%3F")
            .await
            .text()
            .contains("Why Rust?"));
    }

    #[tokio::test]
    async fn test_dashboard_lists_contact_messages() {
        let app = test_app().await;
        let cookie = login(&app.server).await;
        app.server
            .post("/contact")
            .form(&[
                ("name", "Grace"),
                ("email", "grace@example.com"),
                ("phone", "555-0199"),
                ("message", "Nice blog"),
            ])
            .await
            .assert_status_ok();

        let dashboard = app
            .server
            .get("/admin")
            .add_header(header::COOKIE, cookie)
            .await
            .text();

        assert!(dashboard.contains("Messages (1)"));
        assert!(dashboard.contains("grace@example.com"));
        assert!(dashboard.contains("Nice blog"));
    }

    #[tokio::test]
    async fn test_admin_bad_id_is_400() {
        let app = test_app().await;
        let cookie = login(&app.server).await;

        app.server
            .get("/edit/abc")
            .add_header(header::COOKIE, cookie)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_edit_missing_post_is_404() {
        let app = test_app().await;
        let cookie = login(&app.server).await;

        app.server
            .post("/edit/99")
            .add_header(header::COOKIE, cookie)
            .multipart(
                MultipartForm::new()
                    .add_text("title", "Ghost")
                    .add_text("content", "Boo"),
            )
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let app = test_app().await;
        let cookie = login(&app.server).await;

        let response = app
            .server
            .get("/logout")
            .add_header(header::COOKIE, cookie.clone())
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert!(response
            .header(header::SET_COOKIE)
            .to_str()
            .unwrap()
            .contains("Max-Age=0"));

        app.server
            .get("/add")
            .add_header(header::COOKIE, cookie)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_logout_without_session() {
        let app = test_app().await;

        let response = app.server.get("/logout").await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header(header::LOCATION).to_str().unwrap(), "/");
    }

    #[tokio::test]
    async fn test_contact_submission() {
        let app = test_app().await;

        let response = app
            .server
            .post("/contact")
            .form(&[
                ("name", "Ada"),
                ("email", "ada@example.com"),
                ("phone", "555-0100"),
                ("message", "Hello!"),
            ])
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("your message has been sent"));
        assert_eq!(app.contacts.count().await.unwrap(), 1);

        // The worker delivers asynchronously
        for _ in 0..50 {
            if !app.notifier.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let sent = app.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].reply_to, "ada@example.com");
    }

    #[tokio::test]
    async fn test_contact_missing_field_is_400() {
        let app = test_app().await;

        let response = app
            .server
            .post("/contact")
            .form(&[("name", "Ada"), ("email", "ada@example.com")])
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.text().contains("phone is required"));
        assert_eq!(app.contacts.count().await.unwrap(), 0);
    }
}

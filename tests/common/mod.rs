#![allow(dead_code)]

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::web;
use card_vault::application::auth_service::AuthService;
use card_vault::application::card_service::CardService;
use card_vault::application::upload::UploadStore;
use card_vault::data::card_repository::InMemoryCardRepository;
use card_vault::data::session_store::InMemorySessionStore;
use card_vault::data::user_repository::InMemoryUserRepository;
use card_vault::presentation::auth::SESSION_COOKIE;
use card_vault::presentation::handlers::AppState;
use std::sync::Arc;
use tempfile::TempDir;

pub const BOUNDARY: &str = "----cardvaultboundary";

pub struct TestContext {
    pub state: web::Data<AppState>,
    // Keeps the upload directory alive for the test
    pub upload_dir: TempDir,
}

pub fn test_context() -> TestContext {
    test_context_with_upload_limit(1024 * 1024)
}

pub fn test_context_with_upload_limit(max_upload_bytes: usize) -> TestContext {
    let upload_dir = tempfile::tempdir().expect("temp upload dir");
    let auth_service = AuthService::new(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(InMemorySessionStore::new()),
        chrono::Duration::minutes(30),
    );
    let state = web::Data::new(AppState {
        auth_service: Arc::new(auth_service),
        card_service: CardService::new(Arc::new(InMemoryCardRepository::new())),
        uploads: UploadStore::new(upload_dir.path(), max_upload_bytes),
        cookie_secure: false,
    });
    TestContext { state, upload_dir }
}

pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.into_owned())
}

pub fn location<B>(resp: &ServiceResponse<B>) -> Option<String> {
    resp.headers()
        .get(actix_web::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Builds a multipart/form-data body. Returns the content type header value and the body.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

#[macro_export]
macro_rules! init_app {
    ($ctx:expr) => {{
        let uploads = $ctx.state.uploads.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($ctx.state.clone())
                .wrap(card_vault::presentation::middleware::TimingMiddleware)
                .wrap(card_vault::presentation::middleware::RequestIdMiddleware)
                .configure(|cfg| card_vault::presentation::routes::configure(cfg, &uploads)),
        )
        .await
    }};
}

/// Registers `$username` and logs in, evaluating to the session cookie.
#[macro_export]
macro_rules! register_and_login {
    ($app:expr, $username:expr, $password:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/register")
            .set_form(&card_vault::domain::user::CreateUser {
                username: $username.to_string(),
                password: $password.to_string(),
            })
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::SEE_OTHER);

        let req = actix_web::test::TestRequest::post()
            .uri("/login")
            .set_form(&card_vault::domain::user::LoginRequest {
                username: $username.to_string(),
                password: $password.to_string(),
            })
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::SEE_OTHER);
        common::session_cookie(&resp).expect("login sets a session cookie")
    }};
}

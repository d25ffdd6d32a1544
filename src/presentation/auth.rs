use crate::domain::session::Session;
use crate::domain::user::{CreateUser, LoginRequest};
use crate::presentation::handlers::{
    AppState, DASHBOARD_PATH, LOGIN_PATH, WebError, html, see_other,
};
use crate::presentation::views;
use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::{error, info, instrument};

pub const SESSION_COOKIE: &str = "session_id";

fn session_cookie(session: &Session, secure: bool) -> Cookie<'static> {
    let max_age = (session.expires_at - session.created_at).num_seconds().max(0);
    Cookie::build(SESSION_COOKIE, session.token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(CookieDuration::seconds(max_age))
        .finish()
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

pub async fn register_form() -> HttpResponse {
    html(StatusCode::OK, views::register_page())
}

#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn register(
    state: web::Data<AppState>,
    form: web::Form<CreateUser>,
) -> Result<HttpResponse, WebError> {
    info!("Registration request received");

    let user = state
        .auth_service
        .register(form.into_inner())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to register user");
            WebError::from(e)
        })?;

    info!(user_id = user.id, "User registered, redirecting to login");
    Ok(see_other(LOGIN_PATH))
}

pub async fn login_form() -> HttpResponse {
    html(StatusCode::OK, views::login_page())
}

#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn login(
    state: web::Data<AppState>,
    form: web::Form<LoginRequest>,
) -> Result<HttpResponse, WebError> {
    info!("Login request received");

    let session = state
        .auth_service
        .login(form.into_inner())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to login");
            WebError::from(e)
        })?;

    info!(user_id = session.user_id, "Login successful");
    Ok(HttpResponse::SeeOther()
        .cookie(session_cookie(&session, state.cookie_secure))
        .insert_header((actix_web::http::header::LOCATION, DASHBOARD_PATH))
        .finish())
}

#[instrument(skip_all)]
pub async fn logout(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, WebError> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        state.auth_service.logout(cookie.value()).await?;
        info!("Logged out");
    }

    Ok(HttpResponse::SeeOther()
        .cookie(removal_cookie())
        .insert_header((actix_web::http::header::LOCATION, LOGIN_PATH))
        .finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_session_cookie_attributes() {
        let now = Utc::now();
        let session = Session {
            token: "abc".to_string(),
            user_id: 1,
            created_at: now,
            expires_at: now + Duration::minutes(30),
        };

        let cookie = session_cookie(&session, true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(CookieDuration::minutes(30)));
    }

    #[test]
    fn test_removal_cookie_is_expired() {
        let cookie = removal_cookie();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
    }
}

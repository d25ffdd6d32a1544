use crate::application::auth_service::AuthService;
use crate::application::card_service::CardService;
use crate::application::upload::UploadStore;
use crate::domain::card::NewCard;
use crate::domain::error::DomainError;
use crate::presentation::middleware::CurrentUser;
use crate::presentation::views;
use actix_multipart::form::{MultipartForm, bytes::Bytes, text::Text};
use actix_web::http::{StatusCode, header};
use actix_web::{HttpResponse, ResponseError, web};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

// Shared handles for every worker
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub card_service: CardService,
    pub uploads: UploadStore,
    pub cookie_secure: bool,
}

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Username already exists")]
    DuplicateUsername,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Upload failed: {0}")]
    Upload(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WebError {
    fn back_link(&self) -> &'static str {
        match self {
            WebError::DuplicateUsername => "/register",
            WebError::InvalidCredentials | WebError::Unauthenticated => LOGIN_PATH,
            WebError::Upload(_) => "/add",
            _ => DASHBOARD_PATH,
        }
    }
}

pub fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub fn html(status: StatusCode, page: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(page)
}

impl ResponseError for WebError {
    fn status_code(&self) -> StatusCode {
        match self {
            WebError::Validation(_) => StatusCode::BAD_REQUEST,
            WebError::DuplicateUsername => StatusCode::CONFLICT,
            WebError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            WebError::Unauthenticated => StatusCode::SEE_OTHER,
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::Upload(_) => StatusCode::BAD_REQUEST,
            WebError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_msg = self.to_string();

        match self {
            WebError::Unauthenticated => {
                info!(status = %status, "Unauthenticated request, redirecting to login");
                return see_other(LOGIN_PATH);
            }
            WebError::Database(_) | WebError::Internal(_) => {
                error!(error = %error_msg, status = %status, "Server error")
            }
            _ => warn!(error = %error_msg, status = %status, "Request rejected"),
        }

        // Server-side details stay in the log
        let shown = if status.is_server_error() {
            "Something went wrong. Please try again later.".to_string()
        } else {
            error_msg
        };
        let title = status.canonical_reason().unwrap_or("Error");
        html(status, views::error_page(title, &shown, self.back_link()))
    }
}

impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::DuplicateUsername) => WebError::DuplicateUsername,
            Some(DomainError::InvalidCredentials) => WebError::InvalidCredentials,
            Some(DomainError::Unauthenticated) => WebError::Unauthenticated,
            Some(DomainError::Upload(msg)) => WebError::Upload(msg.clone()),
            Some(DomainError::NotFound(msg)) => WebError::NotFound(msg.clone()),
            Some(DomainError::Validation(msg)) => WebError::Validation(msg.clone()),
            Some(DomainError::Internal(msg)) => WebError::Internal(msg.clone()),
            None => WebError::Database(err.to_string()),
        }
    }
}

#[derive(Debug, MultipartForm)]
pub struct CardForm {
    pub name: Text<String>,
    #[multipart(rename = "type")]
    pub card_type: Option<Text<String>>,
    pub rarity: Option<Text<String>>,
    pub image: Option<Bytes>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
}

#[instrument]
pub async fn health_check() -> HttpResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };
    HttpResponse::Ok().json(response)
}

pub async fn index() -> HttpResponse {
    see_other(DASHBOARD_PATH)
}

#[instrument(skip(state), fields(user_id = user.user_id))]
pub async fn dashboard(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, WebError> {
    let owner = state.auth_service.user(user.user_id).await?;
    let cards = state.card_service.list_cards(user.user_id).await?;
    info!(count = cards.len(), "Rendering dashboard");
    Ok(html(
        StatusCode::OK,
        views::dashboard_page(&owner.username, &cards),
    ))
}

pub async fn new_card_form(_user: CurrentUser) -> HttpResponse {
    html(StatusCode::OK, views::add_card_page())
}

#[instrument(skip(state, form), fields(user_id = user.user_id, card_id))]
pub async fn create_card(
    state: web::Data<AppState>,
    user: CurrentUser,
    form: MultipartForm<CardForm>,
) -> Result<HttpResponse, WebError> {
    let form = form.into_inner();
    // Browsers send an empty part when no file was chosen
    let image = form.image.filter(|image| !image.data.is_empty());

    let stored = match &image {
        Some(image) => {
            let original = image.file_name.as_deref().unwrap_or_default();
            Some(state.uploads.store(&image.data, original).await.map_err(|e| {
                error!(error = %e, "Failed to store card image");
                WebError::from(e)
            })?)
        }
        None => None,
    };

    let card = NewCard {
        name: form.name.into_inner(),
        card_type: form.card_type.map(Text::into_inner),
        rarity: form.rarity.map(Text::into_inner),
        image_path: stored.as_ref().map(|s| s.file_name.clone()),
    };

    let card = match state.card_service.create_card(user.user_id, card).await {
        Ok(card) => card,
        Err(e) => {
            if let Some(stored) = &stored {
                if let Err(cleanup) = tokio::fs::remove_file(&stored.path).await {
                    warn!(
                        path = %stored.path.display(),
                        error = %cleanup,
                        "Failed to remove image of unsaved card"
                    );
                }
            }
            error!(error = %e, "Failed to create card");
            return Err(e.into());
        }
    };

    tracing::Span::current().record("card_id", card.id);
    info!(card_id = card.id, "Card created, redirecting to dashboard");
    Ok(see_other(DASHBOARD_PATH))
}

#[instrument(skip(state), fields(user_id = user.user_id, card_id = %*path))]
pub async fn show_card(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, WebError> {
    let card = state
        .card_service
        .get_card(user.user_id, path.into_inner())
        .await?;
    Ok(html(StatusCode::OK, views::card_page(&card)))
}

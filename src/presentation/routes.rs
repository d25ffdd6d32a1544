use crate::application::upload::{PUBLIC_PREFIX, UploadStore};
use crate::presentation::auth::{login, login_form, logout, register, register_form};
use crate::presentation::handlers::{
    WebError, create_card, dashboard, health_check, index, new_card_form, show_card,
};
use actix_files::Files;
use actix_multipart::MultipartError;
use actix_multipart::form::MultipartFormConfig;
use actix_web::web;

// Room for the text fields that travel alongside the image.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Form-shape problems are the client's input; everything else is the upload itself.
fn multipart_error(err: MultipartError) -> WebError {
    match err {
        MultipartError::MissingField(_)
        | MultipartError::DuplicateField(_)
        | MultipartError::UnknownField(_)
        | MultipartError::Field { .. } => WebError::Validation(err.to_string()),
        _ => WebError::Upload(err.to_string()),
    }
}

/// Registers every route. Both the `/dashboard` + `/add` and the `/cards`
/// route families map onto the same handlers.
pub fn configure(cfg: &mut web::ServiceConfig, uploads: &UploadStore) {
    let multipart = MultipartFormConfig::default()
        .total_limit(uploads.max_bytes() + FORM_OVERHEAD_BYTES)
        .memory_limit(uploads.max_bytes() + FORM_OVERHEAD_BYTES)
        .error_handler(|err, _req| multipart_error(err).into());

    cfg.app_data(multipart)
        .route("/", web::get().to(index))
        .route("/health", web::get().to(health_check))
        .route("/register", web::get().to(register_form))
        .route("/register", web::post().to(register))
        .route("/login", web::get().to(login_form))
        .route("/login", web::post().to(login))
        .route("/logout", web::get().to(logout))
        .route("/logout", web::post().to(logout))
        .route("/dashboard", web::get().to(dashboard))
        .route("/add", web::get().to(new_card_form))
        .route("/add", web::post().to(create_card))
        .route("/cards", web::get().to(dashboard))
        .route("/cards", web::post().to(create_card))
        .route("/cards/new", web::get().to(new_card_form))
        .route("/cards/{id}", web::get().to(show_card))
        .service(Files::new(PUBLIC_PREFIX, uploads.dir().to_path_buf()));
}

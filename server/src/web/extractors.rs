// server/src/web/extractors.rs

use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;

use crate::errors::AppError;
use crate::services::auth_service::verify_admin_key;
use crate::state::AppState;

pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

/// Marker extractor for routes that mutate orders upstream.
///
/// Succeeds only when `X-Admin-Key` verifies against the configured
/// `ADMIN_KEY_HASH`. With no hash configured every request is refused.
#[derive(Debug)]
pub struct AdminAccess;

fn authorize(req: &HttpRequest) -> Result<AdminAccess, AppError> {
  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state is not registered".to_string()))?;

  let Some(stored_hash) = state.config.admin_key_hash.as_deref() else {
    warn!("Protected route called but ADMIN_KEY_HASH is not configured.");
    return Err(AppError::Auth("Order actions are disabled on this server.".to_string()));
  };

  let presented = req
    .headers()
    .get(ADMIN_KEY_HEADER)
    .and_then(|value| value.to_str().ok())
    .unwrap_or_default();

  if verify_admin_key(stored_hash, presented)? {
    Ok(AdminAccess)
  } else {
    warn!(path = %req.path(), "Rejected order action: missing or invalid admin key.");
    Err(AppError::Auth("Missing or invalid X-Admin-Key header.".to_string()))
  }
}

impl FromRequest for AdminAccess {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    ready(authorize(req))
  }
}

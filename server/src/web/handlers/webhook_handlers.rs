// server/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use tracing::{debug, instrument};

use crate::errors::Result;
use crate::state::AppState;

pub const TOPIC_HEADER: &str = "X-WC-Webhook-Topic";

/// Upstream order notification. Always acknowledged once the body is JSON,
/// so the upstream does not retry orders we cannot normalise.
#[instrument(
  name = "handler::order_webhook",
  skip(app_state, req, body),
  fields(payload_bytes = body.len())
)]
pub async fn order_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse> {
  let topic = req
    .headers()
    .get(TOPIC_HEADER)
    .and_then(|value| value.to_str().ok())
    .map(String::from);

  debug!(topic = ?topic, "Webhook received.");
  let outcome = app_state.webhooks.handle(topic, body.to_vec()).await?;
  Ok(HttpResponse::Ok().json(outcome))
}

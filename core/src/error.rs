// core/src/error.rs
use thiserror::Error;

/// Every failure the order desk can produce. Nothing here is fatal to the
/// process; each error is scoped to the request or background run that hit it.
#[derive(Debug, Error)]
pub enum RelayError {
  /// Network failure, timeout or non-success answer from a read against the
  /// order source. `status` is `None` when no HTTP answer was received.
  #[error("Order source unavailable (status {status:?}): {body}")]
  UpstreamUnavailable { status: Option<u16>, body: String },

  #[error("Order {order_id} has a malformed timestamp: '{value}'")]
  MalformedTimestamp { order_id: i64, value: String },

  #[error("Malformed order record {order_id:?}: {reason}")]
  MalformedRecord { order_id: Option<i64>, reason: String },

  #[error("Validation Error: {0}")]
  Validation(String),

  /// The order source refused a write. Status and body are kept verbatim.
  #[error("Order source rejected the update with status {status}: {body}")]
  UpstreamRejected { status: u16, body: String },

  #[error("Authentication Failed: {0}")]
  AuthenticationFailed(String),

  #[error("Order {0} not found at the order source")]
  OrderNotFound(i64),

  #[error("Order {order_id} carries no payment charge reference")]
  ChargeReferenceMissing { order_id: i64 },

  #[error("Payment Processing Error: {0}")]
  Payment(String),

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Internal relay error: {0}")]
  Internal(String),
}

impl RelayError {
  pub(crate) fn unavailable(status: Option<u16>, body: impl Into<String>) -> Self {
    RelayError::UpstreamUnavailable {
      status,
      body: body.into(),
    }
  }

  /// Record-level errors are skipped by aggregation instead of failing it.
  pub fn is_record_level(&self) -> bool {
    matches!(
      self,
      RelayError::MalformedTimestamp { .. } | RelayError::MalformedRecord { .. }
    )
  }
}

pub type RelayResult<T, E = RelayError> = std::result::Result<T, E>;

// core/src/payment.rs

//! Refunds against the payment processor that charged the order.

use crate::error::{RelayError, RelayResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundReceipt {
  pub id: String,
  pub status: String,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
  async fn refund(&self, charge_reference: &str) -> RelayResult<RefundReceipt>;
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
  /// API root ending in `/`, e.g. `https://api.stripe.com/v1/`.
  pub api_url: String,
  pub secret_key: String,
  pub timeout: Duration,
}

/// Stripe-compatible refunds endpoint: `POST {api_url}refunds` with form
/// field `charge`, bearer-authenticated.
pub struct StripeRefunds {
  client: Client,
  refunds_url: String,
  secret_key: String,
}

impl StripeRefunds {
  pub fn new(config: PaymentConfig) -> RelayResult<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(|e| RelayError::Internal(format!("Failed to build payment client: {}", e)))?;
    let mut api_url = config.api_url;
    if !api_url.ends_with('/') {
      api_url.push('/');
    }
    Ok(Self {
      client,
      refunds_url: format!("{}refunds", api_url),
      secret_key: config.secret_key,
    })
  }
}

#[async_trait]
impl PaymentProcessor for StripeRefunds {
  #[instrument(name = "payment::refund", skip(self, charge_reference), err(Display))]
  async fn refund(&self, charge_reference: &str) -> RelayResult<RefundReceipt> {
    let response = self
      .client
      .post(&self.refunds_url)
      .bearer_auth(&self.secret_key)
      .form(&[("charge", charge_reference)])
      .send()
      .await
      .map_err(|e| RelayError::Payment(format!("Refund request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      warn!(status = status.as_u16(), "Payment processor declined the refund.");
      return Err(RelayError::Payment(format!(
        "Refund declined with status {}: {}",
        status.as_u16(),
        body
      )));
    }

    let receipt: RefundReceipt = response
      .json()
      .await
      .map_err(|e| RelayError::Payment(format!("Unreadable refund response: {}", e)))?;
    info!(refund_id = %receipt.id, refund_status = %receipt.status, "Refund issued.");
    Ok(receipt)
  }
}

// server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use orderdesk::{CacheTtls, StoreAttributionTable, WarmerConfig};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which backend serves order reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
  Rest,
  Sql { database_url: String, table_prefix: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

impl LogFormat {
  pub fn parse(raw: &str) -> Self {
    if raw.trim().eq_ignore_ascii_case("json") {
      LogFormat::Json
    } else {
      LogFormat::Pretty
    }
  }

  /// Read before the subscriber exists, so before `AppConfig::from_env`.
  pub fn from_env() -> Self {
    env::var("LOG_FORMAT").map(|v| Self::parse(&v)).unwrap_or(LogFormat::Pretty)
  }
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,

  // Upstream order API. Key and secret are never logged.
  pub wc_api_url: String,
  pub wc_consumer_key: String,
  pub wc_consumer_secret: String,
  pub wc_accept_invalid_certs: bool,

  pub source: SourceKind,
  pub store_table: StoreAttributionTable,
  pub service_charge: Decimal,
  pub upstream_timeout: Duration,

  pub cache_ttls: CacheTtls,
  pub warm_enabled: bool,
  pub warmer: WarmerConfig,

  pub payment_api_url: String,
  pub payment_secret_key: Option<String>,

  /// Argon2 PHC string for `X-Admin-Key`.
  pub admin_key_hash: Option<String>,
}

// Hand-written so secrets stay out of debug output.
impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("wc_api_url", &self.wc_api_url)
      .field("source", &self.source_label())
      .field("stores", &self.store_table.store_names())
      .field("service_charge", &self.service_charge)
      .field("warm_enabled", &self.warm_enabled)
      .field("refunds_enabled", &self.payment_secret_key.is_some())
      .field("admin_key_configured", &self.admin_key_hash.is_some())
      .finish_non_exhaustive()
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable lookup; `from_env` passes the
  /// process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };
    let parse_env = |var_name: &str, default: &str| -> Result<String> {
      Ok(get_env(var_name).unwrap_or_else(|_| default.to_string()))
    };

    let server_host = parse_env("SERVER_HOST", "127.0.0.1")?;
    let server_port = parse_env("SERVER_PORT", "7000")?
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;

    let wc_api_url = get_env("WC_API_URL")?;
    let wc_consumer_key = get_env("WC_CONSUMER_KEY")?;
    let wc_consumer_secret = get_env("WC_CONSUMER_SECRET")?;
    let wc_accept_invalid_certs = parse_bool("WC_ACCEPT_INVALID_CERTS", &parse_env("WC_ACCEPT_INVALID_CERTS", "false")?)?;

    let source = match parse_env("ORDER_SOURCE", "rest")?.trim().to_ascii_lowercase().as_str() {
      "rest" => SourceKind::Rest,
      "sql" => SourceKind::Sql {
        database_url: get_env("DATABASE_URL")?,
        table_prefix: parse_env("WP_TABLE_PREFIX", "wp_")?,
      },
      other => {
        return Err(AppError::Config(format!(
          "Invalid ORDER_SOURCE '{}', expected 'rest' or 'sql'",
          other
        )))
      }
    };

    let store_table = match get_env("STORE_PREFIXES") {
      Ok(spec) => StoreAttributionTable::parse(&spec)
        .map_err(|e| AppError::Config(format!("Invalid STORE_PREFIXES: {}", e)))?,
      Err(_) => StoreAttributionTable::builtin(),
    };

    let service_charge = Decimal::from_str(parse_env("SERVICE_CHARGE", "1.0")?.trim())
      .map_err(|e| AppError::Config(format!("Invalid SERVICE_CHARGE: {}", e)))?;
    if service_charge.is_sign_negative() {
      return Err(AppError::Config("SERVICE_CHARGE must not be negative".to_string()));
    }

    let secs = |var_name: &str, default: &str| -> Result<Duration> {
      let raw = parse_env(var_name, default)?;
      let value = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e)))?;
      if value == 0 {
        return Err(AppError::Config(format!("{} must be greater than zero", var_name)));
      }
      Ok(Duration::from_secs(value))
    };

    let upstream_timeout = secs("UPSTREAM_TIMEOUT_SECS", "15")?;
    let cache_ttls = CacheTtls {
      listing: secs("CACHE_TTL_LISTING_SECS", "50")?,
      store_listing: secs("CACHE_TTL_STORE_SECS", "300")?,
      latest: secs("CACHE_TTL_LATEST_SECS", "50")?,
      report: secs("CACHE_TTL_REPORT_SECS", "300")?,
    };
    let warm_enabled = parse_bool("CACHE_WARM_ENABLED", &parse_env("CACHE_WARM_ENABLED", "true")?)?;
    let warmer = WarmerConfig {
      interval: secs("CACHE_WARM_INTERVAL_SECS", "300")?,
      views: WarmerConfig::default().views,
    };

    let payment_api_url = parse_env("PAYMENT_API_URL", "https://api.stripe.com/v1/")?;
    let payment_secret_key = get_env("PAYMENT_SECRET_KEY").ok();
    let admin_key_hash = get_env("ADMIN_KEY_HASH").ok();

    let config = Self {
      server_host,
      server_port,
      wc_api_url,
      wc_consumer_key,
      wc_consumer_secret,
      wc_accept_invalid_certs,
      source,
      store_table,
      service_charge,
      upstream_timeout,
      cache_ttls,
      warm_enabled,
      warmer,
      payment_api_url,
      payment_secret_key,
      admin_key_hash,
    };
    tracing::info!("Application configuration loaded successfully.");
    tracing::debug!(config = ?config, "Loaded config details");
    Ok(config)
  }

  pub fn source_label(&self) -> &'static str {
    match self.source {
      SourceKind::Rest => "rest",
      SourceKind::Sql { .. } => "sql",
    }
  }
}

fn parse_bool(var_name: &str, raw: &str) -> Result<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" => Ok(false),
    other => Err(AppError::Config(format!("Invalid {} value: '{}'", var_name, other))),
  }
}

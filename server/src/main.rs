// server/src/main.rs

mod config;
mod errors;
mod services;
mod state;
mod web;

use crate::config::{AppConfig, LogFormat};
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .from_env_lossy();
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

/// `orderdesk_server hash-key <key>` prints the value for `ADMIN_KEY_HASH`.
fn run_hash_key(args: &[String]) -> std::io::Result<()> {
  let Some(key) = args.get(2) else {
    eprintln!("usage: orderdesk_server hash-key <key>");
    return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "missing key"));
  };
  let hash = services::auth_service::hash_admin_key(key)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
  println!("{}", hash);
  Ok(())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  dotenvy::dotenv().ok();
  init_tracing(LogFormat::from_env());

  let args: Vec<String> = std::env::args().collect();
  if args.get(1).map(String::as_str) == Some("hash-key") {
    return run_hash_key(&args);
  }

  tracing::info!("Starting orderdesk relay...");

  let app_config = AppConfig::from_env().map(Arc::new).map_err(|e| {
    tracing::error!(error = %e, "Failed to load application configuration.");
    std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
  })?;

  let app_state = AppState::build(app_config.clone()).map_err(|e| {
    tracing::error!(error = %format!("{:#}", e), "Failed to wire application state.");
    std::io::Error::new(std::io::ErrorKind::Other, format!("{:#}", e))
  })?;
  tracing::info!(
    source = app_config.source_label(),
    stores = app_config.store_table.store_names().len(),
    "Order desk wired."
  );

  let warmer_handle = if app_config.warm_enabled {
    Some(app_state.warmer.spawn_periodic())
  } else {
    tracing::info!("Cache warming disabled.");
    None
  };

  // Stands in for the push transport: every live-update event is logged.
  let mut events = app_state.notifier.subscribe();
  let event_log = tokio::spawn(async move {
    loop {
      match events.recv().await {
        Ok(event) => tracing::info!(
          event = ?event.event_name,
          order_id = event.payload.order_id,
          status = %event.payload.new_status,
          "Live update published."
        ),
        Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "Live update log fell behind."),
        Err(RecvError::Closed) => break,
      }
    }
  });

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  let result = HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await;

  if let Some(handle) = warmer_handle {
    handle.abort();
  }
  event_log.abort();
  tracing::info!("Server stopped.");
  result
}

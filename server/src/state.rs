// server/src/state.rs
use crate::config::{AppConfig, SourceKind};
use anyhow::Context;
use orderdesk::{
  Aggregator, BroadcastNotifier, CacheWarmer, CommandRelay, Normalizer, NormalizerConfig, OrderQueries, OrderSource,
  PaymentConfig, PaymentProcessor, RelayDeps, RestSourceConfig, ResultCache, SqlOrderSource, StripeRefunds,
  WarmTrigger, WebhookDeps, WebhookIngest, WooRestClient,
};
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;

/// Live-update channel depth; slower subscribers lag and drop events.
const EVENT_BUFFER: usize = 256;

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub queries: OrderQueries,
  pub relay: CommandRelay,
  pub webhooks: WebhookIngest,
  pub warmer: CacheWarmer,
  pub notifier: Arc<BroadcastNotifier>,
}

impl AppState {
  /// Wires every collaborator from configuration.
  pub fn build(config: Arc<AppConfig>) -> anyhow::Result<Self> {
    let rest = Arc::new(
      WooRestClient::new(RestSourceConfig {
        base_url: config.wc_api_url.clone(),
        consumer_key: config.wc_consumer_key.clone(),
        consumer_secret: config.wc_consumer_secret.clone(),
        timeout: config.upstream_timeout,
        accept_invalid_certs: config.wc_accept_invalid_certs,
      })
      .context("Failed to build the order API client")?,
    );

    // Reads may come from SQL; writes always go through the REST API.
    let source: Arc<dyn OrderSource> = match &config.source {
      SourceKind::Rest => rest.clone(),
      SourceKind::Sql {
        database_url,
        table_prefix,
      } => {
        let pool = MySqlPoolOptions::new()
          .max_connections(5)
          .acquire_timeout(config.upstream_timeout)
          .connect_lazy(database_url)
          .context("Invalid DATABASE_URL")?;
        Arc::new(
          SqlOrderSource::new(pool, table_prefix.clone(), config.upstream_timeout)
            .context("Failed to set up the SQL order source")?,
        )
      }
    };

    let normalizer = Arc::new(Normalizer::new(
      Arc::new(config.store_table.clone()),
      NormalizerConfig {
        service_charge: config.service_charge,
      },
    ));
    let queries = OrderQueries::new(
      Aggregator::new(source.clone(), normalizer.clone()),
      Arc::new(ResultCache::new()),
      config.cache_ttls,
    );

    let payments: Option<Arc<dyn PaymentProcessor>> = match &config.payment_secret_key {
      Some(secret_key) => Some(Arc::new(
        StripeRefunds::new(PaymentConfig {
          api_url: config.payment_api_url.clone(),
          secret_key: secret_key.clone(),
          timeout: config.upstream_timeout,
        })
        .context("Failed to build the payment client")?,
      )),
      None => {
        tracing::warn!("PAYMENT_SECRET_KEY is not set; refunds will be refused.");
        None
      }
    };

    let notifier = Arc::new(BroadcastNotifier::new(EVENT_BUFFER));
    let stores = config
      .store_table
      .store_names()
      .into_iter()
      .map(str::to_string)
      .collect();
    let warmer = CacheWarmer::new(queries.clone(), stores, config.warmer.clone());

    let relay = CommandRelay::new(RelayDeps {
      source,
      writer: rest,
      payments,
      queries: queries.clone(),
      notifier: notifier.clone(),
      normalizer: normalizer.clone(),
    });
    let warm: Option<Arc<dyn WarmTrigger>> = if config.warm_enabled {
      Some(Arc::new(warmer.clone()))
    } else {
      None
    };
    let webhooks = WebhookIngest::new(WebhookDeps {
      normalizer,
      queries: queries.clone(),
      notifier: notifier.clone(),
      warm,
    });

    Ok(Self {
      config,
      queries,
      relay,
      webhooks,
      warmer,
      notifier,
    })
  }
}

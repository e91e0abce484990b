// core/src/warmer.rs

//! Background cache warming on a fixed interval, plus out-of-band triggers.
//! A run that finds another run in progress is skipped, never queued.

use crate::model::{OrderStatus, StatusView};
use crate::service::OrderQueries;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct WarmerConfig {
  pub interval: Duration,
  pub views: Vec<StatusView>,
}

impl Default for WarmerConfig {
  fn default() -> Self {
    Self {
      interval: Duration::from_secs(300),
      views: vec![
        StatusView::One(OrderStatus::Processing),
        StatusView::One(OrderStatus::Completed),
        StatusView::Open,
      ],
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmReport {
  pub views_warmed: usize,
  pub entries_written: usize,
  pub failures: usize,
}

/// Something that can ask for an out-of-band warm.
pub trait WarmTrigger: Send + Sync {
  fn trigger(&self);
}

struct WarmerInner {
  queries: OrderQueries,
  stores: Vec<String>,
  config: WarmerConfig,
  running: AtomicBool,
}

/// Cheap to clone; clones share the running flag.
#[derive(Clone)]
pub struct CacheWarmer {
  inner: Arc<WarmerInner>,
}

/// Clears the running flag when a run ends, including by panic.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

impl CacheWarmer {
  pub fn new(queries: OrderQueries, stores: Vec<String>, config: WarmerConfig) -> Self {
    Self {
      inner: Arc::new(WarmerInner {
        queries,
        stores,
        config,
        running: AtomicBool::new(false),
      }),
    }
  }

  pub fn is_running(&self) -> bool {
    self.inner.running.load(Ordering::Acquire)
  }

  /// One pass over every configured view. `None` when another pass was
  /// already running.
  #[instrument(name = "CacheWarmer::warm_once", skip(self))]
  pub async fn warm_once(&self) -> Option<WarmReport> {
    if self
      .inner
      .running
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      debug!("Cache warm already in progress; skipping.");
      return None;
    }
    let _guard = RunGuard(&self.inner.running);

    let mut report = WarmReport::default();
    for view in &self.inner.config.views {
      match self.inner.queries.prime(*view, &self.inner.stores).await {
        Ok(written) => {
          report.views_warmed += 1;
          report.entries_written += written;
        }
        Err(e) => {
          report.failures += 1;
          warn!(%view, error = %e, "Cache warm failed for view.");
        }
      }
    }
    let purged = self.inner.queries.cache().purge_expired();
    info!(
      views = report.views_warmed,
      entries = report.entries_written,
      failures = report.failures,
      purged,
      "Cache warm finished."
    );
    Some(report)
  }

  /// Runs now, then once per interval, until the handle is aborted.
  pub fn spawn_periodic(&self) -> JoinHandle<()> {
    let warmer = self.clone();
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(warmer.inner.config.interval);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
      loop {
        ticker.tick().await;
        warmer.warm_once().await;
      }
    })
  }
}

impl WarmTrigger for CacheWarmer {
  fn trigger(&self) {
    if self.is_running() {
      debug!("Warm trigger ignored; a run is in progress.");
      return;
    }
    let warmer = self.clone();
    tokio::spawn(async move {
      warmer.warm_once().await;
    });
  }
}

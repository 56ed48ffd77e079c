// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared detector lifecycle
//!
//! One expensive model serves every request. The handle owns a one-time
//! initialization slot: concurrent first requests race to `acquire()`,
//! exactly one of them runs the loader, and everyone observes the same
//! Ready or Failed outcome. A failed load is terminal for the process
//! lifetime; there is no reload path, every `acquire()` after a failure
//! reports the stored error.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::Detector;

type LoaderFn = Box<dyn Fn() -> anyhow::Result<Arc<dyn Detector>> + Send + Sync>;

/// The detector failed to load, or loading never succeeded
#[derive(Debug, Clone, Error)]
#[error("Detection model is not available: {0}")]
pub struct ModelUnavailable(pub String);

/// Process-wide handle to the lazily loaded detector
pub struct DetectorHandle {
    slot: OnceCell<Result<Arc<dyn Detector>, String>>,
    loader: LoaderFn,
    load_count: AtomicUsize,
}

impl std::fmt::Debug for DetectorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorHandle")
            .field("ready", &self.is_ready())
            .field("load_count", &self.load_count.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl DetectorHandle {
    /// Create a handle around a loader. Nothing is loaded until the
    /// first `acquire()` (or an explicit `warm_up()` at startup).
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn Detector>> + Send + Sync + 'static,
    {
        Self {
            slot: OnceCell::new(),
            loader: Box::new(loader),
            load_count: AtomicUsize::new(0),
        }
    }

    /// Get a reference to the loaded detector, loading it first if this
    /// is the first caller. Cheap and reentrant once the model is ready.
    pub async fn acquire(&self) -> Result<Arc<dyn Detector>, ModelUnavailable> {
        let slot = self
            .slot
            .get_or_init(|| async {
                self.load_count.fetch_add(1, Ordering::SeqCst);
                match (self.loader)() {
                    Ok(detector) => {
                        info!("Detector loaded and ready");
                        Ok(detector)
                    }
                    Err(e) => {
                        warn!("Detector load failed (terminal): {e:#}");
                        Err(format!("{e:#}"))
                    }
                }
            })
            .await;

        slot.clone().map_err(ModelUnavailable)
    }

    /// Trigger the load eagerly, e.g. during startup
    pub async fn warm_up(&self) -> Result<(), ModelUnavailable> {
        self.acquire().await.map(|_| ())
    }

    /// Whether the detector has loaded successfully
    pub fn is_ready(&self) -> bool {
        matches!(self.slot.get(), Some(Ok(_)))
    }

    /// How many times the loader has run. Stays at 1 for the process
    /// lifetime no matter how many requests race the first load.
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }
}

use std::time::Duration;

use rand::Rng;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{PROGRESS_MIN_SECS, PROGRESS_SLICE_SECS};
use crate::error::{AppError, Result};

/// Cancellable pacing timer shared by the retry loop, page waits and unit waits.
///
/// A wait is run as a ticker of [`PROGRESS_SLICE_SECS`] slices so long waits
/// report progress, and it ends early with [`AppError::Cancelled`] once the
/// token fires.
#[derive(Debug, Clone, Default)]
pub struct Pacer {
    cancel: CancellationToken,
}

impl Pacer {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Wait `base + U[0, jitter_max)`.
    pub async fn sleep(&self, base: Duration, jitter_max: Duration, label: &str) -> Result<()> {
        let jitter = if jitter_max.is_zero() {
            Duration::ZERO
        } else {
            jitter_max.mul_f64(rand::rng().random::<f64>())
        };
        let total = base + jitter;
        if total.is_zero() {
            return self.ensure_active();
        }
        info!("[PACE] {label}: sleep {:.1}s", total.as_secs_f64());
        self.wait(total, label).await
    }

    async fn wait(&self, total: Duration, label: &str) -> Result<()> {
        let deadline = Instant::now() + total;
        let show_ticks = total.as_secs_f64() >= PROGRESS_MIN_SECS;

        let mut ticker = interval(Duration::from_secs(PROGRESS_SLICE_SECS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // consume immediate first tick

        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Ok(());
            }
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("[PACE] {label}: cancelled with {:.1}s left", left.as_secs_f64());
                    return Err(AppError::Cancelled);
                }
                _ = tokio::time::sleep_until(deadline) => return Ok(()),
                _ = ticker.tick() => {
                    if show_ticks {
                        debug!(label, left_secs = left.as_secs_f64(), "[PACE] tick");
                    }
                }
            }
        }
    }

    /// `Err(Cancelled)` once the token has fired.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(AppError::Cancelled)
        } else {
            Ok(())
        }
    }
}

use std::time::Duration;

use anyhow::Result;
use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::{utils::clock::Clock, window_api::WindowManager};

use super::sample::WindowSample;

const MIN_COLLECTION_INTERVAL: Duration = Duration::from_millis(100);

/// Periodically samples the foreground window and forwards it to the processing module.
pub struct WindowSampler {
    next: mpsc::Sender<WindowSample>,
    producer: Box<dyn WindowManager>,
    shutdown: CancellationToken,
    collection_interval: Duration,
    time_provider: Box<dyn Clock>,
}

/// Returns the first collection point after `now`, together with how many points were passed
/// over. Missed ticks are dropped rather than run back to back.
fn next_collection_point(scheduled: Instant, now: Instant, interval: Duration) -> (Instant, u64) {
    if scheduled > now {
        return (scheduled, 0);
    }
    let elapsed = (now - scheduled).as_nanos();
    let interval_nanos = interval.as_nanos().max(1);
    let skipped = (elapsed / interval_nanos) as u64 + 1;
    // Always below `interval`, so it fits.
    let into_interval = Duration::from_nanos((elapsed % interval_nanos) as u64);
    (now + (interval - into_interval), skipped)
}

impl WindowSampler {
    pub fn new(
        next: mpsc::Sender<WindowSample>,
        producer: Box<dyn WindowManager>,
        shutdown: CancellationToken,
        collection_interval: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            producer,
            shutdown,
            collection_interval: collection_interval.max(MIN_COLLECTION_INTERVAL),
            time_provider,
        }
    }

    fn collect_data(&mut self) -> Result<Option<WindowSample>> {
        let Some(window) = self.producer.get_active_window_data()? else {
            return Ok(None);
        };
        if window.app_name.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(WindowSample {
            app: window.app_name,
            title: window.window_title,
            timestamp: self.time_provider.time(),
        }))
    }

    /// Executes the sampling loop until the shutdown token is cancelled.
    pub async fn run(mut self) -> Result<()> {
        let mut collection_point = self.time_provider.instant();
        loop {
            collection_point += self.collection_interval;

            match self.collect_data() {
                Ok(Some(sample)) => {
                    self.next
                        .send(sample)
                        .await
                        .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
                    trace!("Successfully sent sample")
                }
                Ok(None) => debug!("No foreground window"),
                Err(e) => warn!("Failed to sample the foreground window {e:?}"),
            }

            let (next_point, skipped) = next_collection_point(
                collection_point,
                self.time_provider.instant(),
                self.collection_interval,
            );
            if skipped > 0 {
                debug!("Skipped {skipped} collection points");
                collection_point = next_point;
            }

            tokio::select! {
                // Cancelation means we stop execution of the event loop. Which means we also drop
                // the sender channel and consequently stop processing module.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(collection_point) => ()
            }
        }
    }
}

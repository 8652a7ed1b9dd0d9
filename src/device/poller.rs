use crate::device::proxy::MiotDevice;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{Instrument, debug, info, info_span, warn};

/// Periodically polls devices, one task per device. A poll also runs right after a successful write.
#[derive(Debug)]
pub struct Poller {
    tasks: Vec<JoinHandle<()>>,
}

impl Poller {
    pub fn start(devices: impl IntoIterator<Item = (Arc<MiotDevice>, Duration)>) -> Self {
        let tasks: Vec<_> = devices
            .into_iter()
            .map(|(device, period)| {
                let span = info_span!("poller", host = %device.host());
                tokio::spawn(poll_loop(device, period).instrument(span))
            })
            .collect();
        info!("🕗 Started polling {} device(s)", tasks.len());

        Poller { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        info!("🕗 Stopped polling {} device(s)", self.tasks.len());
    }
}

async fn poll_loop(device: Arc<MiotDevice>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => debug!("🕗 Scheduled poll"),
            _ = device.refresh_requested() => {
                debug!("🕗 Refresh requested");
                ticker.reset();
            }
        }

        // Failures only flip availability, the loop keeps going
        if let Err(error) = device.poll_all().await {
            warn!("⚠️ Poll failed, retrying in {:?}: {}", period, error);
        }
    }
}

/// Polls all devices concurrently once. Returns the number of devices that answered.
pub async fn refresh_all(devices: &[Arc<MiotDevice>]) -> usize {
    let results = join_all(devices.iter().map(|device| device.poll_all())).await;
    let reachable = results.iter().filter(|result| result.is_ok()).count();
    info!("🔄 Refreshed {}/{} device(s)", reachable, devices.len());
    reachable
}

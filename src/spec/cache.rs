use crate::spec::{DeviceSpec, SpecError, SpecSource};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

type SpecCell = Arc<OnceCell<Arc<DeviceSpec>>>;

/// Process-wide cache of parsed capability descriptions, keyed by device type.
#[derive(Debug)]
pub struct SpecCache {
    source: Arc<dyn SpecSource>,
    specs: Mutex<HashMap<String, SpecCell>>,
}

impl SpecCache {
    pub fn new(source: Arc<dyn SpecSource>) -> Self {
        SpecCache {
            source,
            specs: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached spec for `miot_type`, fetching and parsing it on first use. Concurrent callers for
    /// the same type share one load; a failed load is retried by the next call.
    #[instrument(skip(self))]
    pub async fn get_or_load(&self, miot_type: &str) -> Result<Arc<DeviceSpec>, SpecError> {
        let cell = self.cell(miot_type);

        cell.get_or_try_init(|| async {
            let body = self.source.fetch(miot_type).await?;
            let spec = DeviceSpec::from_value(body)?;
            info!(services = spec.services().len(), "📦 Loaded spec '{}'", spec.description());
            Ok::<_, SpecError>(Arc::new(spec))
        })
        .await
        .cloned()
    }

    /// Drops the cached spec, e.g. after a device was re-paired with different firmware.
    pub fn invalidate(&self, miot_type: &str) -> bool {
        let removed = self.lock().remove(miot_type).is_some();
        debug!(removed, "Invalidated spec '{}'", miot_type);
        removed
    }

    pub fn contains(&self, miot_type: &str) -> bool {
        self.lock().get(miot_type).is_some_and(|cell| cell.initialized())
    }

    fn cell(&self, miot_type: &str) -> SpecCell {
        self.lock().entry(miot_type.to_string()).or_default().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SpecCell>> {
        // A poisoned map only ever holds fully inserted cells
        self.specs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

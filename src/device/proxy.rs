use crate::device::connection::Connection;
use crate::device::snapshot::{SnapshotValue, StateSnapshot};
use crate::device::transport::PropertyResult;
use crate::device::DeviceError;
use crate::mapping::{PropertyKey, WireMapping};
use crate::spec::{ActionId, PropertyId};
use crate::value::Value;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::futures::Notified;
use tokio::sync::{Notify, watch};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceState {
    pub snapshot: StateSnapshot,
    pub available: bool,
    pub last_error: Option<String>,
}

/// Mediates every read and write of one entity through its wire mapping and owns the entity's snapshot.
#[derive(Debug)]
pub struct MiotDevice {
    connection: Arc<Connection>,
    mapping: Arc<WireMapping>,
    state: watch::Sender<DeviceState>,
    refresh: Notify,
    max_age: Duration,
}

impl MiotDevice {
    pub fn new(connection: Arc<Connection>, mapping: WireMapping, max_age: Duration) -> Self {
        let (state, _) = watch::channel(DeviceState::default());
        MiotDevice {
            connection,
            mapping: Arc::new(mapping),
            state,
            refresh: Notify::new(),
            max_age,
        }
    }

    pub fn host(&self) -> &str {
        self.connection.host()
    }

    pub fn mapping(&self) -> &WireMapping {
        &self.mapping
    }

    pub fn available(&self) -> bool {
        self.state.borrow().available
    }

    pub fn state(&self) -> DeviceState {
        self.state.borrow().clone()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.borrow().snapshot.clone()
    }

    /// Last known value of `name`, without touching the device.
    pub fn value(&self, name: &str) -> Option<Value> {
        self.state.borrow().snapshot.get(name).cloned()
    }

    /// Receives every snapshot or availability change.
    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.state.subscribe()
    }

    pub(crate) fn refresh_requested(&self) -> Notified<'_> {
        self.refresh.notified()
    }

    /// Reads every readable mapped property in one batch. Properties the device fails to return are marked
    /// unavailable. When the device cannot be reached the previous snapshot is kept and the device is flagged
    /// unavailable.
    #[instrument(skip(self), fields(host = %self.host()))]
    pub async fn poll_all(&self) -> Result<StateSnapshot, DeviceError> {
        let (keys, ids): (Vec<_>, Vec<_>) = self.mapping.readable().map(|(key, entry)| (key.clone(), entry.id())).unzip();
        debug!("🔄 Polling {} propert(y/ies)...", ids.len());

        let failed = if ids.is_empty() {
            self.apply_poll(keys, &ids, Vec::new())
        } else {
            self.connection
                .get_properties_with(&ids, |results| match results {
                    Ok(results) => Ok(self.apply_poll(keys, &ids, results)),
                    Err(error) => {
                        warn!("⚠️ Polling {} propert(y/ies)... failed, {}", ids.len(), error);
                        self.mark_unreachable(&error);
                        Err(error)
                    }
                })
                .await?
        };

        if failed > 0 {
            warn!("⚠️ Polling {} propert(y/ies)... {} unavailable", ids.len(), failed);
        } else {
            debug!("🔄 Polling {} propert(y/ies)... OK", ids.len());
        }
        Ok(self.snapshot())
    }

    // Returns how many properties could not be read
    fn apply_poll(&self, keys: Vec<PropertyKey>, ids: &[PropertyId], results: Vec<PropertyResult>) -> usize {
        let now = Utc::now();
        let mut failed = 0;
        self.state.send_modify(|state| {
            for ((key, id), result) in keys.into_iter().zip(ids).zip(results) {
                match result {
                    PropertyResult::Value(value) => state.snapshot.set(key, value),
                    PropertyResult::Error { code } => {
                        debug!(property = %key, code, "Property {} could not be read", id);
                        failed += 1;
                        state.snapshot.mark_unavailable(key);
                    }
                }
            }
            state.snapshot.touch(now);
            state.available = true;
            state.last_error = None;
        });
        failed
    }

    // Transport failures only flip availability, the snapshot stays as it was
    fn mark_unreachable(&self, error: &DeviceError) {
        if matches!(error, DeviceError::Unreachable { .. }) {
            self.state.send_modify(|state| {
                state.available = false;
                state.last_error = Some(error.to_string());
            });
        }
    }

    /// Returns the cached value when the snapshot is fresh, otherwise polls first.
    pub async fn read_property(&self, name: &str) -> Result<Value, DeviceError> {
        let entry = self.mapping.get(name).ok_or_else(|| DeviceError::PropertyUnknown(name.to_string()))?;
        if !entry.access().readable {
            return Err(DeviceError::PropertyNotReadable(name.to_string()));
        }

        {
            let state = self.state.borrow();
            if state.snapshot.is_fresh(self.max_age, Utc::now()) {
                if let Some(SnapshotValue::Available(value)) = state.snapshot.entry(name) {
                    return Ok(value.clone());
                }
            }
        }

        self.poll_all()
            .await?
            .get(name)
            .cloned()
            .ok_or_else(|| DeviceError::PropertyUnavailable(name.to_string()))
    }

    /// Encodes `value` for the device and writes it. On success the snapshot holds the written value until the
    /// next poll overwrites it, and a refresh is requested.
    #[instrument(skip(self, value), fields(host = %self.host()))]
    pub async fn write_property(&self, name: &str, value: &Value) -> Result<(), DeviceError> {
        let Some(entry) = self.mapping.get(name) else {
            warn!("⚠️ Unknown property '{}'", name);
            return Err(DeviceError::PropertyUnknown(name.to_string()));
        };
        if !entry.access().writable {
            warn!("⚠️ Property '{}' is not writable", name);
            return Err(DeviceError::PropertyNotWritable(name.to_string()));
        }

        let encoded = entry.property().encode(value)?;
        info!("✏️ Setting '{}' to '{}'...", name, encoded);

        let accepted = self
            .connection
            .set_property(entry.id(), &encoded)
            .await
            .inspect_err(|error| self.mark_unreachable(error))?;
        if !accepted {
            warn!("✏️ Setting '{}' to '{}'... rejected", name, encoded);
            return Err(DeviceError::Rejected {
                host: self.host().to_string(),
                operation: format!("set_property {}", entry.id()),
            });
        }

        if let Some(key) = self.mapping.key(name) {
            self.state.send_modify(|state| state.snapshot.set(key, encoded.clone()));
        }
        self.refresh.notify_one();
        info!("✏️ Setting '{}' to '{}'... OK", name, encoded);
        Ok(())
    }

    /// Executes an action. The snapshot is left alone, callers that know the outcome use `update_snapshot`.
    #[instrument(skip(self, params), fields(host = %self.host()))]
    pub async fn invoke_action(&self, action: ActionId, params: &[Value]) -> Result<(), DeviceError> {
        info!("⚡ Calling action {}...", action);

        let accepted = self
            .connection
            .call_action(action, params)
            .await
            .inspect_err(|error| self.mark_unreachable(error))?;
        if !accepted {
            warn!("⚡ Calling action {}... rejected", action);
            return Err(DeviceError::Rejected {
                host: self.host().to_string(),
                operation: format!("action {}", action),
            });
        }

        info!("⚡ Calling action {}... OK", action);
        Ok(())
    }

    /// Optimistically sets snapshot values. Names outside the mapping are ignored.
    pub fn update_snapshot<'a>(&self, entries: impl IntoIterator<Item = (&'a str, Value)>) {
        let keyed: Vec<_> = entries
            .into_iter()
            .filter_map(|(name, value)| self.mapping.key(name).map(|key| (key, value)))
            .collect();
        if keyed.is_empty() {
            return;
        }

        self.state.send_modify(|state| {
            for (key, value) in keyed {
                state.snapshot.set(key, value);
            }
        });
    }
}

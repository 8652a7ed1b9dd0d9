use crate::device::{Connection, Endpoint, MiotTransport, PropertyResult, Token, TransportError};
use crate::entity::EntityContext;
use crate::spec::{ActionId, DeviceSpec, PropertyId, SpecError, SpecSource};
use crate::value::Value;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const LIGHT_TYPE: &str = "urn:miot-spec-v2:device:light:0000A001:yeelink-color1:1";
pub const SPEAKER_TYPE: &str = "urn:miot-spec-v2:device:speaker:0000A015:xiaomi-lx01:1";

pub fn light_spec() -> Arc<DeviceSpec> {
    Arc::new(DeviceSpec::from_json(include_str!("../tests/resources/yeelink_light_spec.json")).expect("valid light spec"))
}

pub fn speaker_spec() -> Arc<DeviceSpec> {
    Arc::new(DeviceSpec::from_json(include_str!("../tests/resources/xiaomi_speaker_spec.json")).expect("valid speaker spec"))
}

/// Context for a device at 192.168.1.21 talking to `transport`.
pub fn entity_context(spec: Arc<DeviceSpec>, transport: Arc<FakeTransport>, model: &str) -> EntityContext {
    let endpoint = Endpoint::new("192.168.1.21", Token::new("0123456789abcdef"));
    EntityContext {
        device_name: "Test".to_string(),
        model: model.to_string(),
        spec,
        connection: Arc::new(Connection::new(endpoint, transport, Duration::from_millis(100))),
        snapshot_max_age: Duration::from_secs(30),
    }
}

/// Serves the JSON fixtures under `tests/resources` and counts fetches.
#[derive(Debug, Default)]
pub struct StaticSpecSource {
    specs: HashMap<String, &'static str>,
    fetches: AtomicUsize,
}

impl StaticSpecSource {
    pub fn with_fixtures() -> Self {
        let mut specs = HashMap::new();
        specs.insert(LIGHT_TYPE.to_string(), include_str!("../tests/resources/yeelink_light_spec.json"));
        specs.insert(SPEAKER_TYPE.to_string(), include_str!("../tests/resources/xiaomi_speaker_spec.json"));
        StaticSpecSource {
            specs,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpecSource for StaticSpecSource {
    async fn fetch(&self, miot_type: &str) -> Result<serde_json::Value, SpecError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let json = self.specs.get(miot_type).ok_or_else(|| SpecError::NotFound {
            miot_type: miot_type.to_string(),
        })?;
        Ok(serde_json::from_str(json)?)
    }
}

/// In-memory device. Unknown properties answer with error code -4003.
#[derive(Debug, Default)]
pub struct FakeTransport {
    values: Mutex<HashMap<PropertyId, PropertyResult>>,
    writes: Mutex<Vec<(PropertyId, Value)>>,
    actions: Mutex<Vec<(ActionId, Vec<Value>)>>,
    delay: Mutex<Option<Duration>>,
    unreachable: AtomicBool,
    reject: AtomicBool,
    truncate: AtomicBool,
    reads: AtomicUsize,
    write_attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub fn set_value(&self, id: PropertyId, value: Value) {
        self.values.lock().unwrap().insert(id, PropertyResult::Value(value));
    }

    pub fn set_error(&self, id: PropertyId, code: i32) {
        self.values.lock().unwrap().insert(id, PropertyResult::Error { code });
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn truncate_reads(&self, truncate: bool) {
        self.truncate.store(truncate, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<(PropertyId, Value)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<(ActionId, Vec<Value>)> {
        self.actions.lock().unwrap().clone()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn round_trip(&self) -> Result<(), TransportError> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.unreachable.load(Ordering::SeqCst) {
            return Err(TransportError::Connection("no route to host".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MiotTransport for FakeTransport {
    async fn get_properties(&self, _endpoint: &Endpoint, properties: &[PropertyId]) -> Result<Vec<PropertyResult>, TransportError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await?;

        let values = self.values.lock().unwrap();
        let mut results: Vec<_> = properties
            .iter()
            .map(|id| values.get(id).cloned().unwrap_or(PropertyResult::Error { code: -4003 }))
            .collect();
        if self.truncate.load(Ordering::SeqCst) {
            results.truncate(1);
        }
        Ok(results)
    }

    async fn set_property(&self, _endpoint: &Endpoint, property: PropertyId, value: &Value) -> Result<bool, TransportError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await?;

        if self.reject.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.writes.lock().unwrap().push((property, value.clone()));
        self.set_value(property, value.clone());
        Ok(true)
    }

    async fn call_action(&self, _endpoint: &Endpoint, action: ActionId, params: &[Value]) -> Result<bool, TransportError> {
        self.round_trip().await?;

        if self.reject.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.actions.lock().unwrap().push((action, params.to_vec()));
        Ok(true)
    }
}

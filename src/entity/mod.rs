mod light;
mod media_player;
mod platform;
mod toggle;

pub use light::{LIGHT_EXTRA_SERVICES, LightEntity, LightFeatures, TurnOnParams};
pub use media_player::{DeviceClass, MEDIA_PLAYER_EXTRA_SERVICES, MediaPlayerEntity, MediaPlayerFeatures, PlaybackState};
pub use platform::{EntityKind, EntityPlan, MiotEntities, plan_entities, setup_entities};
pub use toggle::ToggleEntity;

use crate::device::{Connection, MiotDevice};
use crate::mapping::WireMapping;
use crate::spec::{ActionSpec, DeviceSpec, PropertySpec, ServiceSpec};
use crate::value::Value;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, PartialEq)]
pub enum EntityError {
    #[error("service '{service}' has no '{property}' property")]
    MissingProperty { service: String, property: String },
}

/// Framework-facing surface shared by every adapter.
#[async_trait]
pub trait Entity: Debug + Send + Sync {
    fn base(&self) -> &MiotEntity;

    fn entity_class(&self) -> &'static str;

    fn state(&self) -> String;

    fn unique_id(&self) -> &str {
        self.base().unique_id()
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    fn available(&self) -> bool {
        self.base().available()
    }

    /// Polls the device. Returns whether it answered.
    async fn update(&self) -> bool {
        self.base().device().poll_all().await.is_ok()
    }

    fn state_attributes(&self) -> BTreeMap<String, Value> {
        let mut attributes = self.base().attributes();
        attributes.insert("entity_class".to_string(), Value::from(self.entity_class()));
        attributes
    }

    /// Generic access to any mapped property by logical name.
    fn get_attribute(&self, name: &str) -> Option<Value> {
        self.base().device().value(name)
    }

    async fn set_attribute(&self, name: &str, value: Value) -> bool {
        match self.base().device().write_property(name, &value).await {
            Ok(()) => true,
            Err(error) => {
                warn!(entity = self.name(), "⚠️ Could not set attribute '{}': {}", name, error);
                false
            }
        }
    }
}

/// Everything entities of one configured device share.
#[derive(Debug, Clone)]
pub struct EntityContext {
    pub device_name: String,
    pub model: String,
    pub spec: Arc<DeviceSpec>,
    pub connection: Arc<Connection>,
    pub snapshot_max_age: Duration,
}

/// One service of a device bound to its own device proxy.
#[derive(Debug)]
pub struct MiotEntity {
    unique_id: String,
    name: String,
    model: String,
    spec: Arc<DeviceSpec>,
    service: Arc<ServiceSpec>,
    device: Arc<MiotDevice>,
}

impl MiotEntity {
    pub fn new(context: &EntityContext, service: Arc<ServiceSpec>, extra_services: &[&str]) -> Self {
        let name = format!("{} {}", context.device_name, service.description());
        let connection = &context.connection;
        info!(
            "Initializing {} with host {} (token {}...)",
            name,
            connection.host(),
            connection.endpoint().token.prefix()
        );

        let mapping = WireMapping::build(&context.spec, &service, extra_services);
        debug!(entity = %name, properties = mapping.len(), "Built wire mapping");

        MiotEntity {
            unique_id: format!("{}-{}", connection.host(), service.siid()),
            name,
            model: context.model.clone(),
            spec: context.spec.clone(),
            device: Arc::new(MiotDevice::new(connection.clone(), mapping, context.snapshot_max_age)),
            service,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn spec(&self) -> &Arc<DeviceSpec> {
        &self.spec
    }

    pub fn service(&self) -> &Arc<ServiceSpec> {
        &self.service
    }

    pub fn device(&self) -> &Arc<MiotDevice> {
        &self.device
    }

    pub fn available(&self) -> bool {
        self.device.available()
    }

    /// Raw device value of `property`, if the mapping routes its name to this very property.
    pub fn value(&self, property: &PropertySpec) -> Option<Value> {
        self.routes(property).then(|| self.device.value(property.name())).flatten()
    }

    pub fn decoded(&self, property: &PropertySpec) -> Option<Value> {
        let value = self.value(property)?;
        property
            .decode(&value)
            .inspect_err(|error| debug!(entity = %self.name, "Could not decode {}: {}", property.full_name(), error))
            .ok()
    }

    pub async fn set_property(&self, property: &PropertySpec, value: Value) -> bool {
        if !self.routes(property) {
            warn!(entity = %self.name, "⚠️ Property {} is not mapped", property.full_name());
            return false;
        }

        match self.device.write_property(property.name(), &value).await {
            Ok(()) => true,
            Err(error) => {
                warn!(entity = %self.name, "⚠️ Could not set {}: {}", property.full_name(), error);
                false
            }
        }
    }

    pub async fn call_action(&self, action: &ActionSpec, params: &[Value]) -> bool {
        match self.device.invoke_action(action.id(), params).await {
            Ok(()) => true,
            Err(error) => {
                warn!(entity = %self.name, "⚠️ Could not call action '{}': {}", action.name(), error);
                false
            }
        }
    }

    /// Optimistic local update for actions the device does not confirm.
    pub fn update_attrs(&self, entries: &[(&PropertySpec, Value)]) {
        self.device
            .update_snapshot(entries.iter().filter(|(property, _)| self.routes(property)).map(|(property, value)| (property.name(), value.clone())));
    }

    pub fn attributes(&self) -> BTreeMap<String, Value> {
        self.device
            .snapshot()
            .iter()
            .filter_map(|(key, _)| {
                let entry = self.device.mapping().get(key)?;
                let value = self.device.value(key)?;
                Some((entry.property().full_name(), value))
            })
            .collect()
    }

    fn routes(&self, property: &PropertySpec) -> bool {
        self.device.mapping().get(property.name()).is_some_and(|entry| entry.id() == property.id())
    }
}

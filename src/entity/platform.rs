use crate::app_config::{Core, DeviceConfig};
use crate::device::{Connection, Endpoint, MiotDevice, MiotTransport, Poller, refresh_all};
use crate::entity::{Entity, EntityContext, LIGHT_EXTRA_SERVICES, LightEntity, MEDIA_PLAYER_EXTRA_SERVICES, MediaPlayerEntity};
use crate::mapping::WireMapping;
use crate::spec::{DeviceSpec, ServiceSpec, SpecCache, SpecError};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

const MEDIA_PLAYER_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Light,
    MediaPlayer,
}

impl EntityKind {
    /// Services folded into the mapping of entities of this kind.
    pub fn extra_services(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Light => LIGHT_EXTRA_SERVICES,
            EntityKind::MediaPlayer => MEDIA_PLAYER_EXTRA_SERVICES,
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Light => write!(f, "light"),
            EntityKind::MediaPlayer => write!(f, "media_player"),
        }
    }
}

/// An entity that would be created for one service of a device.
#[derive(Debug, Clone)]
pub struct EntityPlan {
    pub kind: EntityKind,
    pub name: String,
    pub service: Arc<ServiceSpec>,
}

/// Selects the services that become entities.
pub fn plan_entities(spec: &DeviceSpec, device: &DeviceConfig) -> Vec<EntityPlan> {
    let plan = |kind: EntityKind, service: Arc<ServiceSpec>| EntityPlan {
        kind,
        name: format!("{} {}", device.name(), service.description()),
        service,
    };

    // Airers expose a light service that is driven by the airer itself
    let lights = if device.model().contains("mrbond.airer") {
        Vec::new()
    } else {
        spec.get_services(&["light"])
            .into_iter()
            .filter(|service| service.get_property("on").is_some())
            .map(|service| plan(EntityKind::Light, service))
            .collect()
    };

    let media_players = spec
        .get_services(&["play_control", "television"])
        .into_iter()
        .filter(|service| !WireMapping::for_service(service).is_empty())
        .map(|service| plan(EntityKind::MediaPlayer, service));

    lights.into_iter().chain(media_players).collect()
}

/// The entities of one configured device. They share a single connection.
#[derive(Debug, Default)]
pub struct MiotEntities {
    pub lights: Vec<Arc<LightEntity>>,
    pub media_players: Vec<Arc<MediaPlayerEntity>>,
    poll_interval: Option<Duration>,
}

impl MiotEntities {
    pub fn all(&self) -> Vec<Arc<dyn Entity>> {
        let lights = self.lights.iter().map(|light| light.clone() as Arc<dyn Entity>);
        let media_players = self.media_players.iter().map(|player| player.clone() as Arc<dyn Entity>);
        lights.chain(media_players).collect()
    }

    pub fn len(&self) -> usize {
        self.lights.len() + self.media_players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Polls every entity once. Returns how many answered.
    pub async fn update_all(&self) -> usize {
        refresh_all(&self.devices()).await
    }

    /// Polls lights every `default_interval` and media players every minute unless the device sets its own interval.
    pub fn start_polling(&self, default_interval: Duration) -> Poller {
        let light_interval = self.poll_interval.unwrap_or(default_interval);
        let media_interval = self.poll_interval.unwrap_or(MEDIA_PLAYER_POLL_INTERVAL);

        let lights = self.lights.iter().map(|light| (light.base().device().clone(), light_interval));
        let media_players = self
            .media_players
            .iter()
            .map(|player| (player.base().device().clone(), media_interval));
        Poller::start(lights.chain(media_players))
    }

    fn devices(&self) -> Vec<Arc<MiotDevice>> {
        self.all().iter().map(|entity| entity.base().device().clone()).collect()
    }
}

/// Loads the device's spec and builds its entities.
#[instrument(skip_all, fields(device = %device.name(), host = %device.host()))]
pub async fn setup_entities(
    core: &Core,
    device: &DeviceConfig,
    cache: &SpecCache,
    transport: Arc<dyn MiotTransport>,
) -> Result<MiotEntities, SpecError> {
    info!("Setting up entities...");

    let spec = cache.get_or_load(device.miot_type()).await.inspect_err(|error| {
        warn!("⚠️ Setting up entities... failed, {}", error);
    })?;

    let connection = Arc::new(Connection::new(
        Endpoint::new(device.host(), device.token().clone()),
        transport,
        core.rpc_timeout(),
    ));
    let context = EntityContext {
        device_name: device.name().to_string(),
        model: device.model().to_string(),
        spec: spec.clone(),
        connection,
        snapshot_max_age: core.snapshot_max_age(),
    };

    let mut entities = MiotEntities {
        poll_interval: device.poll_interval(),
        ..MiotEntities::default()
    };
    for plan in plan_entities(&spec, device) {
        match plan.kind {
            EntityKind::Light => match LightEntity::new(&context, plan.service) {
                Ok(light) => entities.lights.push(Arc::new(light)),
                Err(error) => warn!("⚠️ Skipping light '{}': {}", plan.name, error),
            },
            EntityKind::MediaPlayer => entities.media_players.push(Arc::new(MediaPlayerEntity::new(&context, plan.service))),
        }
    }

    info!("Setting up entities... OK, {} created", entities.len());
    Ok(entities)
}

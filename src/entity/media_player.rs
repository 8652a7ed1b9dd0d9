use crate::entity::{Entity, EntityContext, MiotEntity, ToggleEntity};
use crate::spec::PropertySpec;
use crate::spec::ServiceSpec;
use crate::value::Value;
use async_trait::async_trait;
use std::fmt::Display;
use std::sync::Arc;
use tracing::debug;

/// Cross-cutting services folded into every media player's mapping.
pub const MEDIA_PLAYER_EXTRA_SERVICES: &[&str] =
    &["play_control", "intelligent_speaker", "speaker", "microphone", "clock", "input_control"];

const DEFAULT_VOLUME_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Idle,
    Stopped,
    Unknown,
    Unavailable,
}

impl PlaybackState {
    fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "playing" => PlaybackState::Playing,
            "pause" | "paused" => PlaybackState::Paused,
            "idle" => PlaybackState::Idle,
            "stopped" | "stop" => PlaybackState::Stopped,
            _ => PlaybackState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Idle => "idle",
            PlaybackState::Stopped => "stopped",
            PlaybackState::Unknown => "unknown",
            PlaybackState::Unavailable => "unavailable",
        }
    }
}

impl Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Speaker,
    Receiver,
    Tv,
}

impl DeviceClass {
    /// Guesses the class from the configured model and the device type URN.
    pub fn detect(model: &str, miot_type: &str) -> Option<Self> {
        let kind = format!("{} {}", model, miot_type);
        if kind.contains("speaker") {
            Some(DeviceClass::Speaker)
        } else if kind.contains("receiver") {
            Some(DeviceClass::Receiver)
        } else if kind.contains("tv") || kind.contains("television") {
            Some(DeviceClass::Tv)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaPlayerFeatures {
    pub play: bool,
    pub pause: bool,
    pub previous_track: bool,
    pub next_track: bool,
    pub stop: bool,
    pub turn_on: bool,
    pub turn_off: bool,
    pub volume_set: bool,
    pub volume_mute: bool,
}

#[derive(Debug)]
pub struct MediaPlayerEntity {
    base: MiotEntity,
    playing_state: Option<Arc<PropertySpec>>,
    power: Option<Arc<PropertySpec>>,
    volume: Option<Arc<PropertySpec>>,
    mute: Option<Arc<PropertySpec>>,
    features: MediaPlayerFeatures,
}

impl MediaPlayerEntity {
    pub fn new(context: &EntityContext, service: Arc<ServiceSpec>) -> Self {
        let speaker = context.spec.get_service("speaker");
        let volume = speaker.as_ref().and_then(|speaker| speaker.get_property("volume"));
        let mute = speaker.as_ref().and_then(|speaker| speaker.get_property("mute"));
        let has_action = |name: &str| service.get_action(name).is_some();

        let features = MediaPlayerFeatures {
            play: has_action("play"),
            pause: has_action("pause"),
            previous_track: has_action("previous"),
            next_track: has_action("next"),
            stop: has_action("stop"),
            turn_on: has_action("turn_on"),
            turn_off: has_action("turn_off"),
            volume_set: volume.is_some(),
            volume_mute: mute.is_some(),
        };

        MediaPlayerEntity {
            playing_state: service.get_property("playing_state"),
            power: service.get_property("on"),
            base: MiotEntity::new(context, service, MEDIA_PLAYER_EXTRA_SERVICES),
            volume,
            mute,
            features,
        }
    }

    pub fn features(&self) -> MediaPlayerFeatures {
        self.features
    }

    pub fn device_class(&self) -> Option<DeviceClass> {
        DeviceClass::detect(self.base.model(), self.base.spec().r#type())
    }

    /// Decoded playing state. Unavailable whenever the device is, whatever the last value was.
    pub fn playback_state(&self) -> PlaybackState {
        if !self.available() {
            return PlaybackState::Unavailable;
        }
        self.playing_state
            .as_ref()
            .and_then(|property| self.base.decoded(property))
            .and_then(|value| value.as_str().map(PlaybackState::from_label))
            .unwrap_or(PlaybackState::Unknown)
    }

    /// Volume between 0.0 and 1.0.
    pub fn volume_level(&self) -> Option<f64> {
        let property = self.volume.as_ref()?;
        let volume = self.base.value(property).and_then(|value| value.as_f64()).unwrap_or_default();
        Some(volume.round_ties_even() / volume_max(property))
    }

    pub async fn set_volume_level(&self, volume: f64) -> bool {
        let Some(property) = &self.volume else {
            return false;
        };

        // Snapped on the same grid as the device range, `min + k * step`
        let mut level = (volume * volume_max(property)).round_ties_even();
        if let Some(step) = property.range_step().filter(|step| *step > 1.0) {
            let min = property.range_min().unwrap_or_default();
            level = min + ((level - min) / step).round_ties_even() * step;
        }
        debug!(entity = self.name(), "Setting volume: {} -> {}", volume, level);
        self.base.set_property(property, Value::Int(level as i64)).await
    }

    pub fn is_volume_muted(&self) -> Option<bool> {
        let property = self.mute.as_ref()?;
        Some(self.base.decoded(property).and_then(|value| value.as_bool()).unwrap_or_default())
    }

    pub async fn mute_volume(&self, mute: bool) -> bool {
        match &self.mute {
            Some(property) => self.base.set_property(property, Value::Bool(mute)).await,
            None => false,
        }
    }

    pub async fn media_play(&self) -> bool {
        self.run_action("play").await && self.assume_state(&["Playing"])
    }

    pub async fn media_pause(&self) -> bool {
        self.run_action("pause").await && self.assume_state(&["Pause", "Paused"])
    }

    /// Stops playback, or pauses it when the service has no stop action.
    pub async fn media_stop(&self) -> bool {
        if !self.features.stop {
            return self.media_pause().await;
        }
        self.run_action("stop").await && self.assume_state(&["Stopped", "Stop", "Idle"])
    }

    pub async fn media_previous_track(&self) -> bool {
        self.run_action("previous").await
    }

    pub async fn media_next_track(&self) -> bool {
        self.run_action("next").await
    }

    pub async fn media_seek(&self, _position: f64) -> bool {
        false
    }

    pub async fn play_media(&self, _media_type: &str, _media_id: &str) -> bool {
        false
    }

    pub async fn select_source(&self, _source: &str) -> bool {
        false
    }

    pub async fn select_sound_mode(&self, _sound_mode: &str) -> bool {
        false
    }

    pub async fn clear_playlist(&self) -> bool {
        false
    }

    pub async fn set_shuffle(&self, _shuffle: bool) -> bool {
        false
    }

    pub async fn set_repeat(&self, _repeat: &str) -> bool {
        false
    }

    async fn run_action(&self, name: &str) -> bool {
        match self.base.service().get_action(name) {
            Some(action) => self.base.call_action(&action, &[]).await,
            None => false,
        }
    }

    /// Records the state an unconfirmed action is expected to lead to. Always true, the action already succeeded.
    fn assume_state(&self, labels: &[&str]) -> bool {
        if let Some(property) = &self.playing_state {
            if let Some(value) = property.list_value(labels) {
                self.base.update_attrs(&[(property.as_ref(), value)]);
            }
        }
        true
    }
}

fn volume_max(property: &PropertySpec) -> f64 {
    property.range_max().filter(|max| *max > 0.0).unwrap_or(DEFAULT_VOLUME_MAX)
}

#[async_trait]
impl Entity for MediaPlayerEntity {
    fn base(&self) -> &MiotEntity {
        &self.base
    }

    fn entity_class(&self) -> &'static str {
        "MiotMediaPlayerEntity"
    }

    fn state(&self) -> String {
        self.playback_state().to_string()
    }
}

#[async_trait]
impl ToggleEntity for MediaPlayerEntity {
    fn power_property(&self) -> Option<&PropertySpec> {
        self.power.as_deref()
    }

    async fn turn_on(&self) -> bool {
        if self.features.turn_on {
            return self.run_action("turn_on").await;
        }
        match self.power_property() {
            Some(property) => self.base.set_property(property, Value::Bool(true)).await,
            None => false,
        }
    }

    async fn turn_off(&self) -> bool {
        if self.features.turn_off {
            return self.run_action("turn_off").await;
        }
        match self.power_property() {
            Some(property) => self.base.set_property(property, Value::Bool(false)).await,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ActionId, DeviceSpec, PropertyId, SpecError};
    use crate::test_support::{FakeTransport, entity_context, speaker_spec};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use test_log::test;

    const VOLUME: PropertyId = PropertyId { siid: 2, piid: 1 };
    const MUTE: PropertyId = PropertyId { siid: 2, piid: 2 };
    const PLAYING_STATE: PropertyId = PropertyId { siid: 3, piid: 1 };
    const PAUSE: ActionId = ActionId { siid: 3, aiid: 1 };
    const PLAY: ActionId = ActionId { siid: 3, aiid: 2 };
    const NEXT: ActionId = ActionId { siid: 3, aiid: 3 };

    fn transport() -> Arc<FakeTransport> {
        let transport = Arc::new(FakeTransport::default());
        transport.set_value(VOLUME, Value::Int(40));
        transport.set_value(MUTE, Value::Bool(false));
        transport.set_value(PLAYING_STATE, Value::Int(0));
        transport
    }

    fn player(transport: Arc<FakeTransport>) -> MediaPlayerEntity {
        let context = entity_context(speaker_spec(), transport, "xiaomi.wifispeaker.lx01");
        let service = context.spec.get_service("play_control").expect("play_control service");
        MediaPlayerEntity::new(&context, service)
    }

    #[test(tokio::test)]
    async fn play_optimistically_reports_playing() {
        let transport = transport();
        let player = player(transport.clone());
        player.update().await;
        assert_eq!(player.playback_state(), PlaybackState::Idle);

        assert!(player.media_play().await);

        assert_eq!(transport.actions(), vec![(PLAY, vec![])]);
        assert_eq!(player.playback_state(), PlaybackState::Playing);
        assert_eq!(player.state(), "playing");
    }

    #[test(tokio::test)]
    async fn the_next_poll_overrides_the_assumed_state() {
        let player = player(transport());
        player.update().await;
        player.media_play().await;

        player.update().await;

        assert_eq!(player.playback_state(), PlaybackState::Idle);
    }

    #[test(tokio::test)]
    async fn stop_without_a_stop_action_pauses() {
        let transport = transport();
        let player = player(transport.clone());
        player.update().await;

        assert!(player.media_stop().await);

        assert_eq!(transport.actions(), vec![(PAUSE, vec![])]);
        assert_eq!(player.playback_state(), PlaybackState::Paused);
    }

    #[test(tokio::test)]
    async fn a_rejected_action_keeps_the_state() {
        let transport = transport();
        let player = player(transport.clone());
        player.update().await;
        transport.set_reject(true);

        assert!(!player.media_play().await);

        assert_eq!(player.playback_state(), PlaybackState::Idle);
    }

    #[rstest]
    #[case(0.5, 50)]
    #[case(0.53, 55)]
    #[case(1.0, 100)]
    #[tokio::test]
    async fn volume_snaps_to_the_declared_step(#[case] volume: f64, #[case] expected: i64) {
        let transport = transport();
        let player = player(transport.clone());

        assert!(player.set_volume_level(volume).await);

        assert_eq!(transport.writes(), vec![(VOLUME, Value::Int(expected))]);
    }

    #[test(tokio::test)]
    async fn volume_snaps_to_the_grid_of_an_offset_range() -> Result<(), SpecError> {
        let spec = DeviceSpec::from_json(
            r#"{"type": "urn:miot-spec-v2:device:speaker:0000A015:test:1", "services": [
                {"iid": 2, "type": "urn:miot-spec-v2:service:speaker:00007816:test:1", "properties": [
                  {"iid": 1, "type": "urn:miot-spec-v2:property:volume:00000013:test:1", "format": "uint8",
                   "access": ["read", "write"], "value-range": [1, 100, 5]}
                ]},
                {"iid": 3, "type": "urn:miot-spec-v2:service:play-control:00007817:test:1", "properties": [
                  {"iid": 1, "type": "urn:miot-spec-v2:property:playing-state:00000029:test:1", "format": "uint8",
                   "access": ["read"], "value-list": [{"value": 0, "description": "Idle"}]}
                ]}
            ]}"#,
        )?;
        let transport = Arc::new(FakeTransport::default());
        let context = entity_context(Arc::new(spec), transport.clone(), "test.speaker.v1");
        let service = context.spec.get_service("play_control").expect("play_control service");
        let player = MediaPlayerEntity::new(&context, service);

        assert!(player.set_volume_level(0.5).await);
        assert!(player.set_volume_level(0.58).await);

        assert_eq!(transport.writes(), vec![(VOLUME, Value::Int(51)), (VOLUME, Value::Int(56))]);
        Ok(())
    }

    #[test(tokio::test)]
    async fn reads_volume_and_mute_from_the_speaker_service() {
        let transport = transport();
        let player = player(transport.clone());
        player.update().await;

        assert_eq!(player.volume_level(), Some(0.4));
        assert_eq!(player.is_volume_muted(), Some(false));

        assert!(player.mute_volume(true).await);
        assert_eq!(player.is_volume_muted(), Some(true));
        assert_eq!(transport.writes(), vec![(MUTE, Value::Bool(true))]);
    }

    #[test(tokio::test)]
    async fn track_controls_call_their_actions() {
        let transport = transport();
        let player = player(transport.clone());

        assert!(player.media_next_track().await);
        assert!(!player.turn_on().await);

        assert_eq!(transport.actions(), vec![(NEXT, vec![])]);
    }

    #[test(tokio::test)]
    async fn unsupported_operations_return_false() {
        let player = player(transport());

        assert!(!player.media_seek(12.0).await);
        assert!(!player.play_media("music", "song").await);
        assert!(!player.select_source("aux").await);
        assert!(!player.select_sound_mode("night").await);
        assert!(!player.clear_playlist().await);
        assert!(!player.set_shuffle(true).await);
        assert!(!player.set_repeat("all").await);
    }

    #[test(tokio::test)]
    async fn an_unreachable_player_is_unavailable_regardless_of_the_last_state() {
        let transport = transport();
        let player = player(transport.clone());
        player.update().await;
        player.media_play().await;

        transport.set_unreachable(true);
        player.update().await;

        assert_eq!(player.playback_state(), PlaybackState::Unavailable);
        assert_eq!(player.get_attribute("playing_state"), Some(Value::Int(1)));
    }

    #[test]
    fn features_follow_the_declared_actions_and_properties() {
        let player = player(transport());

        assert_eq!(
            player.features(),
            MediaPlayerFeatures {
                play: true,
                pause: true,
                previous_track: true,
                next_track: true,
                stop: false,
                turn_on: false,
                turn_off: false,
                volume_set: true,
                volume_mute: true,
            }
        );
        assert_eq!(player.device_class(), Some(DeviceClass::Speaker));
    }

    mod classification {
        use super::super::{DeviceClass, PlaybackState};
        use pretty_assertions::assert_eq;
        use rstest::rstest;

        #[rstest]
        #[case("xiaomi.wifispeaker.lx01", "urn:miot-spec-v2:device:speaker:0000A015:xiaomi-lx01:1", Some(DeviceClass::Speaker))]
        #[case("onkyo.receiver.tx8", "urn:miot-spec-v2:device:receiver:0000A0XX:onkyo-tx8:1", Some(DeviceClass::Receiver))]
        #[case("xiaomi.tv.v1", "urn:miot-spec-v2:device:television:0000A010:xiaomi-v1:1", Some(DeviceClass::Tv))]
        #[case("xiaomi.fan.v1", "urn:miot-spec-v2:device:fan:0000A005:xiaomi-v1:1", None)]
        fn detects_the_device_class(#[case] model: &str, #[case] miot_type: &str, #[case] expected: Option<DeviceClass>) {
            assert_eq!(DeviceClass::detect(model, miot_type), expected);
        }

        #[rstest]
        #[case("Playing", PlaybackState::Playing)]
        #[case("Pause", PlaybackState::Paused)]
        #[case("idle", PlaybackState::Idle)]
        #[case("Stop", PlaybackState::Stopped)]
        #[case("Buffering", PlaybackState::Unknown)]
        fn maps_device_labels_to_playback_states(#[case] label: &str, #[case] expected: PlaybackState) {
            assert_eq!(PlaybackState::from_label(label), expected);
        }
    }
}

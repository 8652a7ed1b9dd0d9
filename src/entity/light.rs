use crate::entity::{Entity, EntityContext, EntityError, MiotEntity, ToggleEntity};
use crate::extensions::unsigned_ints_ext::{BrightnessConversions, MiredConversions};
use crate::spec::{PropertySpec, ServiceSpec};
use crate::value::Value;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Cross-cutting services folded into every light's mapping.
pub const LIGHT_EXTRA_SERVICES: &[&str] = &["light", "yl_light", "light_extension", "battery", "night_light_times"];

const DEFAULT_KELVIN: u32 = 2700;
const DEFAULT_MIN_KELVIN: u32 = 2700;
const DEFAULT_MAX_KELVIN: u32 = 5700;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightFeatures {
    pub brightness: bool,
    pub color_temp: bool,
}

/// Optional parameters of `turn_on_with`. Brightness is 0-255, color temperature is in mireds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnOnParams {
    pub brightness: Option<u8>,
    pub color_temp: Option<u32>,
}

#[derive(Debug)]
pub struct LightEntity {
    base: MiotEntity,
    power: Arc<PropertySpec>,
    brightness: Option<Arc<PropertySpec>>,
    color_temperature: Option<Arc<PropertySpec>>,
}

impl LightEntity {
    pub fn new(context: &EntityContext, service: Arc<ServiceSpec>) -> Result<Self, EntityError> {
        let power = service.get_property("on").ok_or_else(|| EntityError::MissingProperty {
            service: service.name().to_string(),
            property: "on".to_string(),
        })?;
        let brightness = service.get_property("brightness");
        let color_temperature = service.get_property("color_temperature");

        Ok(LightEntity {
            base: MiotEntity::new(context, service, LIGHT_EXTRA_SERVICES),
            power,
            brightness,
            color_temperature,
        })
    }

    pub fn features(&self) -> LightFeatures {
        LightFeatures {
            brightness: self.brightness.is_some(),
            color_temp: self.color_temperature.is_some(),
        }
    }

    /// Brightness on the 0-255 scale.
    pub fn brightness(&self) -> Option<u8> {
        let property = self.brightness.as_ref()?;
        let percent = self.base.value(property).and_then(|value| value.as_f64()).unwrap_or_default();
        Some((percent.round_ties_even().clamp(0.0, 100.0) as u8).percent_to_brightness())
    }

    /// Current color temperature in mireds, assuming 2700 K when the device has not reported one.
    pub fn color_temp(&self) -> Option<u32> {
        let property = self.color_temperature.as_ref()?;
        let kelvin = self
            .base
            .value(property)
            .and_then(|value| value.as_i64())
            .and_then(|kelvin| u32::try_from(kelvin).ok())
            .filter(|kelvin| *kelvin > 0)
            .unwrap_or(DEFAULT_KELVIN);
        kelvin.kelvin_to_mired()
    }

    /// Coldest supported color temperature in mireds.
    pub fn min_mireds(&self) -> Option<u32> {
        let property = self.color_temperature.as_ref()?;
        bound_kelvin(property.range_max(), DEFAULT_MAX_KELVIN).kelvin_to_mired()
    }

    /// Warmest supported color temperature in mireds.
    pub fn max_mireds(&self) -> Option<u32> {
        let property = self.color_temperature.as_ref()?;
        bound_kelvin(property.range_min(), DEFAULT_MIN_KELVIN).kelvin_to_mired()
    }

    /// Powers the light on when it is off, then applies the requested brightness and color temperature.
    /// Returns whether every write succeeded.
    pub async fn turn_on_with(&self, params: TurnOnParams) -> bool {
        let mut succeeded = true;
        if self.is_on() != Some(true) {
            succeeded &= self.base.set_property(&self.power, Value::Bool(true)).await;
        }

        if let (Some(property), Some(brightness)) = (&self.brightness, params.brightness) {
            let percent = brightness.brightness_to_percent();
            debug!(entity = self.name(), "Setting brightness: {} {}%", brightness, percent);
            succeeded &= self.base.set_property(property, Value::from(percent)).await;
        }

        if let (Some(property), Some(mireds)) = (&self.color_temperature, params.color_temp) {
            match mireds.mired_to_kelvin() {
                Some(kelvin) => {
                    debug!(entity = self.name(), "Setting color temperature: {} mireds, {} K", mireds, kelvin);
                    succeeded &= self.base.set_property(property, Value::from(kelvin)).await;
                }
                None => succeeded = false,
            }
        }

        succeeded
    }
}

fn bound_kelvin(bound: Option<f64>, default: u32) -> u32 {
    bound.filter(|kelvin| *kelvin >= 1.0).map(|kelvin| kelvin.round_ties_even() as u32).unwrap_or(default)
}

#[async_trait]
impl Entity for LightEntity {
    fn base(&self) -> &MiotEntity {
        &self.base
    }

    fn entity_class(&self) -> &'static str {
        "MiotLightEntity"
    }

    fn state(&self) -> String {
        if !self.available() {
            return "unavailable".to_string();
        }
        match self.is_on() {
            Some(true) => "on",
            Some(false) => "off",
            None => "unknown",
        }
        .to_string()
    }
}

#[async_trait]
impl ToggleEntity for LightEntity {
    fn power_property(&self) -> Option<&PropertySpec> {
        Some(&self.power)
    }

    async fn turn_on(&self) -> bool {
        self.turn_on_with(TurnOnParams::default()).await
    }
}

use crate::spec::SpecError;
use crate::spec::raw::{RawDeviceSpec, name_from_urn};
use crate::spec::service_spec::ServiceSpec;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSpec {
    r#type: String,
    name: String,
    description: String,
    services: Vec<Arc<ServiceSpec>>,
}

impl DeviceSpec {
    pub fn new(r#type: impl Into<String>, services: Vec<ServiceSpec>) -> Result<Self, SpecError> {
        let r#type = r#type.into();
        let spec = DeviceSpec {
            name: name_from_urn(&r#type).unwrap_or_else(|| r#type.clone()),
            r#type,
            description: String::new(),
            services: services.into_iter().map(Arc::new).collect(),
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        let raw: RawDeviceSpec = serde_json::from_str(json)?;
        DeviceSpec::from_raw(raw)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, SpecError> {
        let raw: RawDeviceSpec = serde_json::from_value(value)?;
        DeviceSpec::from_raw(raw)
    }

    pub(crate) fn from_raw(raw: RawDeviceSpec) -> Result<Self, SpecError> {
        let services = raw
            .services
            .into_iter()
            .map(|service| ServiceSpec::from_raw(service).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        let spec = DeviceSpec {
            name: name_from_urn(&raw.r#type).unwrap_or_else(|| raw.r#type.clone()),
            r#type: raw.r#type,
            description: raw.description,
            services,
        };
        spec.validate()?;
        Ok(spec)
    }

    // Identifier pairs must be unique within a device
    fn validate(&self) -> Result<(), SpecError> {
        let mut properties = HashSet::new();
        let mut actions = HashSet::new();
        let mut services = HashSet::new();

        for service in &self.services {
            if !services.insert(service.siid()) {
                return Err(SpecError::Parse(format!("duplicate service iid {}", service.siid())));
            }
            for property in service.properties() {
                if !properties.insert((property.siid(), property.piid())) {
                    return Err(SpecError::Parse(format!("duplicate property {}.{}", property.siid(), property.piid())));
                }
            }
            for action in service.actions() {
                if !actions.insert((action.siid(), action.aiid())) {
                    return Err(SpecError::Parse(format!("duplicate action {}.{}", action.siid(), action.aiid())));
                }
            }
        }

        Ok(())
    }

    pub fn r#type(&self) -> &str {
        &self.r#type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn services(&self) -> &[Arc<ServiceSpec>] {
        &self.services
    }

    /// Returns the services whose name is one of `categories`, in spec order. Returns every service
    /// when `categories` is empty.
    pub fn get_services(&self, categories: &[&str]) -> Vec<Arc<ServiceSpec>> {
        self.services
            .iter()
            .filter(|service| categories.is_empty() || categories.contains(&service.name()))
            .cloned()
            .collect()
    }

    pub fn get_service(&self, category: &str) -> Option<Arc<ServiceSpec>> {
        self.services.iter().find(|service| service.name() == category).cloned()
    }
}

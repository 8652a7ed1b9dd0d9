use crate::spec::SpecError;
use crate::spec::action_spec::ActionSpec;
use crate::spec::property_spec::PropertySpec;
use crate::spec::raw::{RawService, name_from_urn};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSpec {
    siid: u32,
    name: String,
    r#type: String,
    description: String,
    properties: Vec<Arc<PropertySpec>>,
    actions: Vec<Arc<ActionSpec>>,
}

impl ServiceSpec {
    pub fn new(siid: u32, name: impl Into<String>, description: impl Into<String>) -> Self {
        ServiceSpec {
            siid,
            name: name.into(),
            r#type: String::new(),
            description: description.into(),
            properties: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: PropertySpec) -> Self {
        self.properties.push(Arc::new(property));
        self
    }

    pub fn with_action(mut self, action: ActionSpec) -> Self {
        self.actions.push(Arc::new(action));
        self
    }

    pub(crate) fn from_raw(raw: RawService) -> Result<Self, SpecError> {
        let name = name_from_urn(&raw.r#type).ok_or_else(|| SpecError::Parse(format!("invalid service type '{}'", raw.r#type)))?;

        let properties = raw
            .properties
            .into_iter()
            .map(|property| PropertySpec::from_raw(raw.iid, &name, property).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        let actions = raw
            .actions
            .into_iter()
            .map(|action| ActionSpec::from_raw(raw.iid, &properties, action).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ServiceSpec {
            siid: raw.iid,
            name,
            r#type: raw.r#type,
            description: raw.description,
            properties,
            actions,
        })
    }

    pub fn siid(&self) -> u32 {
        self.siid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn r#type(&self) -> &str {
        &self.r#type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn properties(&self) -> &[Arc<PropertySpec>] {
        &self.properties
    }

    pub fn actions(&self) -> &[Arc<ActionSpec>] {
        &self.actions
    }

    pub fn get_property(&self, name: &str) -> Option<Arc<PropertySpec>> {
        self.properties.iter().find(|property| property.name() == name).cloned()
    }

    pub fn get_action(&self, name: &str) -> Option<Arc<ActionSpec>> {
        self.actions.iter().find(|action| action.name() == name).cloned()
    }
}

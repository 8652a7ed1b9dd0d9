use crate::spec::{ActionId, SpecError};
use crate::spec::property_spec::PropertySpec;
use crate::spec::raw::{RawAction, name_from_urn};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpec {
    siid: u32,
    aiid: u32,
    name: String,
    description: String,
    inputs: Vec<Arc<PropertySpec>>,
}

impl ActionSpec {
    pub fn new(siid: u32, aiid: u32, name: impl Into<String>) -> Self {
        ActionSpec {
            siid,
            aiid,
            name: name.into(),
            description: String::new(),
            inputs: Vec::new(),
        }
    }

    // Input parameters reference properties of the same service by iid.
    pub(crate) fn from_raw(siid: u32, properties: &[Arc<PropertySpec>], raw: RawAction) -> Result<Self, SpecError> {
        let name = name_from_urn(&raw.r#type).ok_or_else(|| SpecError::Parse(format!("invalid action type '{}'", raw.r#type)))?;

        let inputs = raw
            .input
            .iter()
            .map(|piid| {
                properties
                    .iter()
                    .find(|property| property.piid() == *piid)
                    .cloned()
                    .ok_or_else(|| SpecError::Parse(format!("action '{}' references unknown property {}.{}", name, siid, piid)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ActionSpec {
            siid,
            aiid: raw.iid,
            name,
            description: raw.description,
            inputs,
        })
    }

    pub fn siid(&self) -> u32 {
        self.siid
    }

    pub fn aiid(&self) -> u32 {
        self.aiid
    }

    pub fn id(&self) -> ActionId {
        ActionId {
            siid: self.siid,
            aiid: self.aiid,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn inputs(&self) -> &[Arc<PropertySpec>] {
        &self.inputs
    }
}

mod action_spec;
mod cache;
mod device_spec;
mod property_spec;
mod raw;
mod service_spec;
mod source;

pub use action_spec::ActionSpec;
pub use cache::SpecCache;
pub use device_spec::DeviceSpec;
pub use property_spec::{Access, PropertyError, PropertySpec, ValueDomain, ValueListItem};
pub use service_spec::ServiceSpec;
pub use source::{HttpSpecSource, SpecSource};

use std::fmt::Display;
use thiserror::Error;

/// Wire address of a property, `siid.piid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId {
    pub siid: u32,
    pub piid: u32,
}

/// Wire address of an action, `siid.aiid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId {
    pub siid: u32,
    pub aiid: u32,
}

impl Display for PropertyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.siid, self.piid)
    }
}

impl Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.siid, self.aiid)
    }
}

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("no capability description found for '{miot_type}'")]
    NotFound { miot_type: String },
    #[error("malformed capability description: {0}")]
    Parse(String),
    #[error("malformed capability description: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
}

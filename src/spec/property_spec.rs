use crate::spec::{PropertyId, SpecError};
use crate::spec::raw::{RawProperty, name_from_urn};
use crate::value::Value;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Access {
    pub readable: bool,
    pub writable: bool,
    pub notifiable: bool,
}

impl Access {
    pub fn read_write() -> Self {
        Access {
            readable: true,
            writable: true,
            notifiable: false,
        }
    }

    pub fn read_only() -> Self {
        Access {
            readable: true,
            writable: false,
            notifiable: false,
        }
    }

    fn from_flags(flags: &[String]) -> Self {
        let has = |flag: &str| flags.iter().any(|f| f.eq_ignore_ascii_case(flag));
        Access {
            readable: has("read"),
            writable: has("write"),
            notifiable: has("notify"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueListItem {
    pub value: Value,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueDomain {
    Boolean,
    Range { min: f64, max: f64, step: f64 },
    Enumerated(Vec<ValueListItem>),
    /// Strings and numbers without a declared range, passed through unchanged.
    Unbounded,
}

#[derive(Error, Debug, PartialEq)]
pub enum PropertyError {
    #[error("value '{value}' is not valid for property '{property}'")]
    InvalidValue { property: String, value: String },
    #[error("device value '{value}' of property '{property}' is not in its value list")]
    UnknownDeviceValue { property: String, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    siid: u32,
    piid: u32,
    name: String,
    service_name: String,
    description: String,
    format: String,
    unit: Option<String>,
    access: Access,
    domain: ValueDomain,
}

impl PropertySpec {
    pub fn new(siid: u32, piid: u32, name: impl Into<String>, service_name: impl Into<String>, access: Access, domain: ValueDomain) -> Self {
        PropertySpec {
            siid,
            piid,
            name: name.into(),
            service_name: service_name.into(),
            description: String::new(),
            format: String::new(),
            unit: None,
            access,
            domain,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub(crate) fn from_raw(siid: u32, service_name: &str, raw: RawProperty) -> Result<Self, SpecError> {
        let name = name_from_urn(&raw.r#type).ok_or_else(|| SpecError::Parse(format!("invalid property type '{}'", raw.r#type)))?;

        let domain = match (&raw.value_list, raw.format.as_str(), &raw.value_range) {
            (Some(list), _, _) => ValueDomain::Enumerated(
                list.iter()
                    .map(|item| ValueListItem {
                        value: item.value.clone(),
                        label: item.description.clone(),
                    })
                    .collect(),
            ),
            (None, "bool", _) => ValueDomain::Boolean,
            (None, _, Some(range)) => {
                let (min, max, step) = match range.as_slice() {
                    [min, max] => (*min, *max, 0.0),
                    [min, max, step, ..] => (*min, *max, *step),
                    _ => return Err(SpecError::Parse(format!("invalid value-range for property '{}.{}'", service_name, name))),
                };
                let finite = min.is_finite() && max.is_finite() && step.is_finite();
                if !finite || min > max || step < 0.0 {
                    return Err(SpecError::Parse(format!(
                        "invalid value-range [{}, {}, {}] for property '{}.{}'",
                        min, max, step, service_name, name
                    )));
                }
                ValueDomain::Range { min, max, step }
            }
            _ => ValueDomain::Unbounded,
        };

        Ok(PropertySpec {
            siid,
            piid: raw.iid,
            name,
            service_name: service_name.to_string(),
            description: raw.description,
            format: raw.format,
            unit: raw.unit,
            access: Access::from_flags(&raw.access),
            domain,
        })
    }

    pub fn siid(&self) -> u32 {
        self.siid
    }

    pub fn piid(&self) -> u32 {
        self.piid
    }

    pub fn id(&self) -> PropertyId {
        PropertyId {
            siid: self.siid,
            piid: self.piid,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.service_name, self.name)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn domain(&self) -> &ValueDomain {
        &self.domain
    }

    pub fn is_integral(&self) -> bool {
        self.format.starts_with("int") || self.format.starts_with("uint")
    }

    pub fn range_min(&self) -> Option<f64> {
        match self.domain {
            ValueDomain::Range { min, .. } => Some(min),
            _ => None,
        }
    }

    pub fn range_max(&self) -> Option<f64> {
        match self.domain {
            ValueDomain::Range { max, .. } => Some(max),
            _ => None,
        }
    }

    pub fn range_step(&self) -> Option<f64> {
        match self.domain {
            ValueDomain::Range { step, .. } => Some(step),
            _ => None,
        }
    }

    /// Returns the device value of the first label present in the value list.
    pub fn list_value(&self, labels: &[&str]) -> Option<Value> {
        let ValueDomain::Enumerated(items) = &self.domain else {
            return None;
        };
        labels
            .iter()
            .find_map(|label| items.iter().find(|item| item.label.eq_ignore_ascii_case(label)))
            .map(|item| item.value.clone())
    }

    pub fn list_label(&self, value: &Value) -> Option<&str> {
        let ValueDomain::Enumerated(items) = &self.domain else {
            return None;
        };
        items.iter().find(|item| &item.value == value).map(|item| item.label.as_str())
    }

    /// Translates a semantic value into the value the device expects.
    pub fn encode(&self, value: &Value) -> Result<Value, PropertyError> {
        match &self.domain {
            ValueDomain::Boolean => value.as_bool().map(Value::Bool).ok_or_else(|| self.invalid(value)),
            ValueDomain::Range { min, max, step } => {
                let number = value.as_f64().ok_or_else(|| self.invalid(value))?;
                let snapped = if *step > 0.0 {
                    min + ((number - min) / step).round_ties_even() * step
                } else {
                    number
                };
                let clamped = snapped.clamp(*min, *max);
                if clamped != snapped {
                    warn!(property = %self.full_name(), "⚠️ Clamped value {} into [{}, {}]", number, min, max);
                }
                if self.is_integral() {
                    Ok(Value::Int(clamped.round_ties_even() as i64))
                } else {
                    Ok(Value::Float(clamped))
                }
            }
            ValueDomain::Enumerated(items) => {
                let item = match value {
                    Value::Text(label) => items.iter().find(|item| item.label.eq_ignore_ascii_case(label)),
                    other => items.iter().find(|item| &item.value == other),
                };
                item.map(|item| item.value.clone()).ok_or_else(|| self.invalid(value))
            }
            ValueDomain::Unbounded => Ok(value.clone()),
        }
    }

    /// Translates a device value into its semantic value. Enumerated values decode to their label.
    pub fn decode(&self, value: &Value) -> Result<Value, PropertyError> {
        match &self.domain {
            ValueDomain::Boolean => value.as_bool().map(Value::Bool).ok_or_else(|| self.invalid(value)),
            ValueDomain::Range { .. } if value.is_number() => Ok(value.clone()),
            ValueDomain::Range { .. } => Err(self.invalid(value)),
            ValueDomain::Enumerated(_) => self
                .list_label(value)
                .map(Value::from)
                .ok_or_else(|| PropertyError::UnknownDeviceValue {
                    property: self.full_name(),
                    value: value.to_string(),
                }),
            ValueDomain::Unbounded => Ok(value.clone()),
        }
    }

    fn invalid(&self, value: &Value) -> PropertyError {
        PropertyError::InvalidValue {
            property: self.full_name(),
            value: value.to_string(),
        }
    }
}

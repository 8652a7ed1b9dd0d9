use crate::value::Value;
use serde::Deserialize;

// Format: https://miot-spec.org/miot-spec-v2/instance?type=<urn>
#[derive(Debug, Deserialize)]
pub struct RawDeviceSpec {
    pub r#type: String,
    #[serde(default)]
    pub description: String,
    pub services: Vec<RawService>,
}

#[derive(Debug, Deserialize)]
pub struct RawService {
    pub iid: u32,
    pub r#type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: Vec<RawProperty>,
    #[serde(default)]
    pub actions: Vec<RawAction>,
}

#[derive(Debug, Deserialize)]
pub struct RawProperty {
    pub iid: u32,
    pub r#type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub access: Vec<String>,
    pub unit: Option<String>,
    #[serde(rename = "value-range")]
    pub value_range: Option<Vec<f64>>,
    #[serde(rename = "value-list")]
    pub value_list: Option<Vec<RawValueListItem>>,
}

#[derive(Debug, Deserialize)]
pub struct RawValueListItem {
    pub value: Value,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct RawAction {
    pub iid: u32,
    pub r#type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "in")]
    pub input: Vec<u32>,
    #[serde(default, rename = "out")]
    pub output: Vec<u32>,
}

/// Derives the logical name from a MIoT URN, `urn:miot-spec-v2:property:color-temperature:...` becomes
/// `color_temperature`.
pub fn name_from_urn(urn: &str) -> Option<String> {
    urn.split(':')
        .nth(3)
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_lowercase().replace('-', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("urn:miot-spec-v2:property:color-temperature:0000000F:yeelink-color1:1", Some("color_temperature"))]
    #[case("urn:miot-spec-v2:service:play-control:00007817:xiaomi-lx01:1", Some("play_control"))]
    #[case("urn:miot-spec-v2:action:play:00002807:xiaomi-lx01:1", Some("play"))]
    #[case("urn:yeelink-spec:service:YL-Light:00007802:yeelink-color1:1", Some("yl_light"))]
    #[case("urn:miot-spec-v2:property", None)]
    #[case("", None)]
    fn derives_names_from_urns(#[case] urn: &str, #[case] expected: Option<&str>) {
        assert_eq!(name_from_urn(urn).as_deref(), expected);
    }
}

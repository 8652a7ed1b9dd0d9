use crate::spec::{Access, DeviceSpec, PropertyId, PropertySpec, ServiceSpec};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// Interned logical property name, shared between the mapping and the snapshot.
pub type PropertyKey = Arc<str>;

#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    property: Arc<PropertySpec>,
}

impl MappingEntry {
    pub fn id(&self) -> PropertyId {
        self.property.id()
    }

    pub fn access(&self) -> Access {
        self.property.access()
    }

    pub fn property(&self) -> &Arc<PropertySpec> {
        &self.property
    }
}

/// Logical property name to wire address. Built once per entity and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireMapping {
    entries: BTreeMap<PropertyKey, MappingEntry>,
}

impl WireMapping {
    /// The service's own mapping, every property that can be read or written.
    pub fn for_service(service: &ServiceSpec) -> Self {
        let entries = service
            .properties()
            .iter()
            .filter(|property| property.access().readable || property.access().writable)
            .map(|property| (PropertyKey::from(property.name()), MappingEntry { property: property.clone() }))
            .collect();

        WireMapping { entries }
    }

    /// Folds the services of every extra category in order, then the primary service, so the primary
    /// service wins every name collision. Missing categories are skipped.
    pub fn build(spec: &DeviceSpec, primary: &ServiceSpec, extra_categories: &[&str]) -> Self {
        let mapping = extra_categories
            .iter()
            .flat_map(|category| spec.get_services(&[*category]))
            .fold(WireMapping::default(), |mapping, service| {
                trace!(service = service.name(), "Merging service mapping");
                mapping.merge(WireMapping::for_service(&service))
            });

        mapping.merge(WireMapping::for_service(primary))
    }

    /// Last writer wins, entries of `other` replace entries with the same name.
    pub fn merge(mut self, other: WireMapping) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn get(&self, name: &str) -> Option<&MappingEntry> {
        self.entries.get(name)
    }

    /// Returns the interned key for `name`.
    pub fn key(&self, name: &str) -> Option<PropertyKey> {
        self.entries.get_key_value(name).map(|(key, _)| key.clone())
    }

    pub fn readable(&self) -> impl Iterator<Item = (&PropertyKey, &MappingEntry)> {
        self.entries.iter().filter(|(_, entry)| entry.access().readable)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &MappingEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

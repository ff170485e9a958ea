//! Resource name matching between producers and consumers

use std::collections::HashMap;

use crate::models::Building;

/// Canonical form used for every producer/consumer match
pub fn normalize_resource_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Producer and consumer lookup tables for one registry snapshot.
///
/// Both maps hold building indices in registry order, each building at most
/// once per resource even if it lists the resource twice.
#[derive(Debug, Default)]
pub struct ResourceIndex {
    producers: HashMap<String, Vec<usize>>,
    consumers: HashMap<String, Vec<usize>>,
}

impl ResourceIndex {
    pub fn build(buildings: &[Building]) -> Self {
        let mut index = ResourceIndex::default();

        for (idx, building) in buildings.iter().enumerate() {
            for output in &building.outputs {
                push_once(&mut index.producers, &output.resource_name, idx);
            }
            for input in &building.inputs {
                push_once(&mut index.consumers, &input.resource_name, idx);
            }
        }

        index
    }

    /// Buildings producing a resource, in registry order
    pub fn producers_of(&self, resource_name: &str) -> &[usize] {
        self.producers
            .get(&normalize_resource_name(resource_name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Buildings consuming a resource, in registry order
    pub fn consumers_of(&self, resource_name: &str) -> &[usize] {
        self.consumers
            .get(&normalize_resource_name(resource_name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether any building other than `idx` consumes the resource
    pub fn is_consumed_by_other(&self, resource_name: &str, idx: usize) -> bool {
        self.consumers_of(resource_name).iter().any(|&c| c != idx)
    }
}

fn push_once(map: &mut HashMap<String, Vec<usize>>, resource_name: &str, idx: usize) {
    let entry = map.entry(normalize_resource_name(resource_name)).or_default();
    // Indices arrive in ascending order, so a repeat can only be the last one
    if entry.last() != Some(&idx) {
        entry.push(idx);
    }
}

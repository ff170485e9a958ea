//! Deterministic diagram coordinates for chain buildings

use std::collections::BTreeMap;

use crate::models::{ChainBuilding, Position};

/// Spacing between diagram nodes, in renderer units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub horizontal_spacing: f64,
    pub vertical_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_spacing: 150.0,
            vertical_spacing: 200.0,
        }
    }
}

/// Place each level on its own row, centred on x = 0, in discovery order
pub fn assign_positions(buildings: &mut [ChainBuilding], config: &LayoutConfig) {
    let mut rows: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (i, building) in buildings.iter().enumerate() {
        rows.entry(building.level).or_default().push(i);
    }

    for (level, members) in rows {
        let n = members.len() as f64;
        let start = -((n - 1.0) * config.horizontal_spacing) / 2.0;
        let y = level as f64 * config.vertical_spacing;

        for (slot, &i) in members.iter().enumerate() {
            buildings[i].position = Position {
                x: start + slot as f64 * config.horizontal_spacing,
                y,
            };
        }
    }
}

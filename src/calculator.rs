//! Production ratio calculation and chain reporting

use std::collections::HashMap;

use crate::index::normalize_resource_name;
use crate::models::{ChainBuilding, InputSource, ProductionChain, UNRESOLVED_RATIO};

/// Round to two decimals, halves away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Fill in `ratio` for every building of a leveled chain.
///
/// Level 0 runs exactly once. Each upstream level then runs as many cycles
/// as its most demanding in-chain consumer needs, never fewer than one.
/// Consumers on levels not yet processed still count with ratio 1.0.
pub fn resolve_ratios(buildings: &mut [ChainBuilding]) {
    for building in buildings.iter_mut() {
        building.ratio = UNRESOLVED_RATIO;
    }

    let max_level = buildings.iter().map(|b| b.level).max().unwrap_or(0);

    for level in 1..=max_level {
        for i in 0..buildings.len() {
            if buildings[i].level != level {
                continue;
            }
            let ratio = required_ratio(buildings, i);
            buildings[i].ratio = ratio;
        }
    }
}

fn required_ratio(buildings: &[ChainBuilding], producer: usize) -> f64 {
    let mut required: f64 = 1.0;

    for output in &buildings[producer].outputs {
        for (j, consumer) in buildings.iter().enumerate() {
            if j == producer {
                continue;
            }
            if let Some(needed) = consumer.input_quantity(&output.resource_name) {
                // Non-positive output quantities are a caller precondition violation
                required = required.max(needed * consumer.ratio / output.quantity);
            }
        }
    }

    round2(required)
}

/// Format a production chain as a readable, level-indented listing
pub fn format_production_chain(chain: &ProductionChain) -> String {
    let mut output = String::new();

    output.push_str(&format!("{} [{}]\n", chain.name, chain.id));

    for building in &chain.buildings {
        let prefix = "  ".repeat(building.level as usize + 1);
        output.push_str(&format!(
            "{}{:.2}x {} (level {}, at {:.0},{:.0})\n",
            prefix,
            building.ratio,
            building.name,
            building.level,
            building.position.x,
            building.position.y
        ));

        for input in &building.inputs {
            let source = match &input.source {
                InputSource::Market => "market".to_string(),
                InputSource::Building(name) => name.clone(),
            };
            output.push_str(&format!(
                "{}  needs {} x {} (from {})\n",
                prefix, input.resource_name, input.quantity, source
            ));
        }

        for out in &building.outputs {
            if out.consumers.is_empty() {
                output.push_str(&format!(
                    "{}  makes {} x {}\n",
                    prefix, out.resource_name, out.quantity
                ));
            } else {
                output.push_str(&format!(
                    "{}  makes {} x {} -> {}\n",
                    prefix,
                    out.resource_name,
                    out.quantity,
                    out.consumers.join(", ")
                ));
            }
        }
    }

    output
}

/// Summary of a resolved production chain
#[derive(Debug)]
pub struct ChainSummary {
    pub chain_name: String,
    pub building_count: usize,
    pub max_level: u32,
    pub total_cycles: f64,
    /// Market purchases per root cycle, summed per resource
    pub market_inputs: Vec<(String, f64)>,
}

/// Generate a summary of the production chain
pub fn summarize_chain(chain: &ProductionChain) -> ChainSummary {
    let mut market_inputs: Vec<(String, f64)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for building in &chain.buildings {
        for input in building.inputs.iter().filter(|i| i.source.is_market()) {
            let amount = input.quantity * building.ratio;
            let key = normalize_resource_name(&input.resource_name);
            match slots.get(&key) {
                Some(&slot) => market_inputs[slot].1 += amount,
                None => {
                    slots.insert(key, market_inputs.len());
                    market_inputs.push((input.resource_name.clone(), amount));
                }
            }
        }
    }

    ChainSummary {
        chain_name: chain.name.clone(),
        building_count: chain.buildings.len(),
        max_level: chain.max_level(),
        total_cycles: round2(chain.buildings.iter().map(|b| b.ratio).sum()),
        market_inputs,
    }
}

impl std::fmt::Display for ChainSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== {} ===", self.chain_name)?;
        writeln!(
            f,
            "Buildings: {} across {} level(s), {:.2} cycles in total",
            self.building_count,
            self.max_level + 1,
            self.total_cycles
        )?;

        if self.market_inputs.is_empty() {
            writeln!(f, "Market inputs: none")?;
        } else {
            writeln!(f, "Market inputs per cycle:")?;
            for (name, amount) in &self.market_inputs {
                writeln!(f, "  {} x {:.2}", name, amount)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChainInput, ChainOutput, Position};

    fn building(
        name: &str,
        level: u32,
        inputs: &[(&str, f64)],
        outputs: &[(&str, f64)],
    ) -> ChainBuilding {
        ChainBuilding {
            name: name.to_string(),
            level,
            ratio: UNRESOLVED_RATIO,
            inputs: inputs
                .iter()
                .map(|(r, q)| ChainInput {
                    resource_name: r.to_string(),
                    quantity: *q,
                    source: InputSource::Market,
                })
                .collect(),
            outputs: outputs
                .iter()
                .map(|(r, q)| ChainOutput {
                    resource_name: r.to_string(),
                    quantity: *q,
                    consumers: Vec::new(),
                })
                .collect(),
            position: Position::default(),
        }
    }

    #[test]
    fn round2_rounds_halves_up() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(2.5), 2.5);
        assert_eq!(round2(0.4), 0.4);
        assert_eq!(round2(3.0), 3.0);
        assert_eq!(round2(1.0 / 3.0), 0.33);
    }

    #[test]
    fn ratio_never_drops_below_one() {
        let mut chain = vec![
            building("Press", 0, &[("X", 2.0)], &[("Y", 1.0)]),
            building("Mine", 1, &[], &[("X", 5.0)]),
        ];
        resolve_ratios(&mut chain);
        assert_eq!(chain[0].ratio, 1.0);
        assert_eq!(chain[1].ratio, 1.0);
    }

    #[test]
    fn ratio_propagates_through_levels() {
        let mut chain = vec![
            building("Bolts", 0, &[("steel", 3.0)], &[("Bolt", 1.0)]),
            building("Mill", 1, &[("Ore", 4.0)], &[("Steel", 1.0)]),
            building("Mine", 2, &[], &[("ore", 5.0)]),
        ];
        resolve_ratios(&mut chain);
        assert_eq!(chain[1].ratio, 3.0);
        // 4 ore per mill cycle, 3 mill cycles, 5 ore per mine cycle
        assert_eq!(chain[2].ratio, 2.4);
    }

    #[test]
    fn ratio_takes_the_most_demanding_consumer() {
        let mut chain = vec![
            building("Root", 0, &[("A", 1.0), ("B", 7.0)], &[("Out", 1.0)]),
            building("Maker A", 1, &[("Base", 2.0)], &[("A", 1.0)]),
            building("Maker B", 1, &[("Base", 1.0)], &[("B", 2.0)]),
            building("Base Plant", 2, &[], &[("Base", 3.0)]),
        ];
        resolve_ratios(&mut chain);
        assert_eq!(chain[1].ratio, 1.0);
        assert_eq!(chain[2].ratio, 3.5);
        // max(2 * 1.0 / 3, 1 * 3.5 / 3) = 1.1666...
        assert_eq!(chain[3].ratio, 1.17);
    }

    #[test]
    fn resolving_twice_gives_the_same_ratios() {
        let mut chain = vec![
            building("Bolts", 0, &[("Steel", 3.0)], &[("Bolt", 1.0)]),
            building("Mill", 1, &[("Ore", 4.0)], &[("Steel", 1.0)]),
            building("Mine", 2, &[], &[("Ore", 5.0)]),
        ];
        resolve_ratios(&mut chain);
        let first: Vec<f64> = chain.iter().map(|b| b.ratio).collect();
        resolve_ratios(&mut chain);
        let second: Vec<f64> = chain.iter().map(|b| b.ratio).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn summary_aggregates_market_inputs() {
        let mut chain_buildings = vec![
            building("Bolts", 0, &[("Steel", 3.0), ("Oil", 1.0)], &[("Bolt", 1.0)]),
            building("Mill", 1, &[("oil ", 2.0)], &[("Steel", 1.0)]),
        ];
        chain_buildings[0].inputs[0].source = InputSource::Building("Mill".to_string());
        chain_buildings[1].ratio = 3.0;
        let chain = ProductionChain {
            id: "bolt".to_string(),
            name: "Bolt".to_string(),
            buildings: chain_buildings,
            final_products: vec!["Bolt".to_string()],
            root_inputs: vec!["Oil".to_string()],
        };

        let summary = summarize_chain(&chain);
        assert_eq!(summary.building_count, 2);
        assert_eq!(summary.max_level, 1);
        assert_eq!(summary.total_cycles, 4.0);
        assert_eq!(summary.market_inputs, vec![("Oil".to_string(), 7.0)]);

        let text = summary.to_string();
        assert!(text.contains("=== Bolt ==="));
        assert!(text.contains("Oil x 7.00"));
    }

    #[test]
    fn listing_shows_sources_and_consumers() {
        let mut root = building("Bolts", 0, &[("Steel", 3.0)], &[("Bolt", 1.0)]);
        root.inputs[0].source = InputSource::Building("Mill".to_string());
        let mut mill = building("Mill", 1, &[("Ore", 2.0)], &[("Steel", 1.0)]);
        mill.outputs[0].consumers = vec!["Bolts".to_string()];
        mill.ratio = 3.0;
        let chain = ProductionChain {
            id: "bolt".to_string(),
            name: "Bolt".to_string(),
            buildings: vec![root, mill],
            final_products: vec!["Bolt".to_string()],
            root_inputs: vec!["Ore".to_string()],
        };

        let text = format_production_chain(&chain);
        assert!(text.starts_with("Bolt [bolt]\n"));
        assert!(text.contains("needs Steel x 3 (from Mill)"));
        assert!(text.contains("    3.00x Mill"));
        assert!(text.contains("needs Ore x 2 (from market)"));
        assert!(text.contains("makes Steel x 1 -> Bolts"));
    }
}

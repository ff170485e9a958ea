//! Property-based tests for resolution invariants
//!
//! Random registries over a small resource pool, so producers, shared
//! inputs and cycles come up often.

use std::collections::HashMap;

use proptest::prelude::*;

use chain_calculator::{Building, ResourceTree, resolve};

const RESOURCES: &[&str] = &["Ore", "Coal", "Steel", "Gear", "Water", "Bread"];

fn amounts() -> impl Strategy<Value = Vec<(usize, f64)>> {
    prop::collection::vec((0..RESOURCES.len(), 0.5f64..10.0), 0..3)
}

fn registry_strategy() -> impl Strategy<Value = Vec<Building>> {
    prop::collection::vec((amounts(), amounts()), 0..8).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (inputs, outputs))| {
                let mut building = Building::new(format!("Building {}", i));
                for (r, q) in inputs {
                    building = building.with_input(RESOURCES[r], q);
                }
                for (r, q) in outputs {
                    building = building.with_output(RESOURCES[r], q);
                }
                building
            })
            .collect()
    })
}

fn placed_names(tree: &ResourceTree) -> Vec<String> {
    tree.chains
        .iter()
        .flat_map(|c| c.buildings.iter())
        .chain(tree.isolated_buildings.iter())
        .map(|b| b.name.clone())
        .collect()
}

fn recase(registry: &[Building]) -> Vec<Building> {
    registry
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let mut b = b.clone();
            for item in b.inputs.iter_mut().chain(b.outputs.iter_mut()) {
                item.resource_name = if i % 2 == 0 {
                    format!(" {} ", item.resource_name.to_uppercase())
                } else {
                    item.resource_name.to_lowercase()
                };
            }
            b
        })
        .collect()
}

/// (chain id, building name, level, ratio) for every chain building
fn shape(tree: &ResourceTree) -> Vec<(String, String, u32, f64)> {
    tree.chains
        .iter()
        .flat_map(|c| {
            c.buildings
                .iter()
                .map(move |b| (c.id.clone(), b.name.clone(), b.level, b.ratio))
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn every_building_is_placed_exactly_once(registry in registry_strategy()) {
        let tree = resolve(&registry);

        let mut counts: HashMap<String, usize> = HashMap::new();
        for name in placed_names(&tree) {
            *counts.entry(name).or_default() += 1;
        }

        prop_assert_eq!(counts.len(), registry.len());
        for building in &registry {
            prop_assert_eq!(counts.get(&building.name), Some(&1));
        }
        prop_assert_eq!(tree.total_chains, tree.chains.len());
    }

    #[test]
    fn each_chain_has_one_root_at_ratio_one(registry in registry_strategy()) {
        let tree = resolve(&registry);

        for chain in &tree.chains {
            prop_assert_eq!(chain.buildings[0].level, 0);
            let roots: Vec<_> = chain.buildings.iter().filter(|b| b.level == 0).collect();
            prop_assert_eq!(roots.len(), 1);
            prop_assert_eq!(roots[0].ratio, 1.0);
        }
    }

    #[test]
    fn ratios_never_drop_below_one(registry in registry_strategy()) {
        let tree = resolve(&registry);

        for building in tree.chains.iter().flat_map(|c| c.buildings.iter()) {
            prop_assert!(building.ratio >= 1.0, "{} has ratio {}", building.name, building.ratio);
            prop_assert_eq!(building.ratio, (building.ratio * 100.0).round() / 100.0);
        }
        for building in &tree.isolated_buildings {
            prop_assert_eq!(building.level, 0);
            prop_assert_eq!(building.ratio, 1.0);
        }
    }

    #[test]
    fn resolution_is_deterministic(registry in registry_strategy()) {
        let first = serde_json::to_string(&resolve(&registry)).unwrap();
        let second = serde_json::to_string(&resolve(&registry)).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn resource_casing_does_not_change_structure(registry in registry_strategy()) {
        let plain = resolve(&registry);
        let recased = resolve(&recase(&registry));

        prop_assert_eq!(shape(&plain), shape(&recased));
        let plain_isolated: Vec<_> = plain.isolated_buildings.iter().map(|b| &b.name).collect();
        let recased_isolated: Vec<_> = recased.isolated_buildings.iter().map(|b| &b.name).collect();
        prop_assert_eq!(plain_isolated, recased_isolated);
    }

    #[test]
    fn levels_grow_by_one_along_producer_links(registry in registry_strategy()) {
        let tree = resolve(&registry);

        for chain in &tree.chains {
            let levels: HashMap<&str, u32> =
                chain.buildings.iter().map(|b| (b.name.as_str(), b.level)).collect();
            for (i, building) in chain.buildings.iter().enumerate().skip(1) {
                // Every non-root was enqueued by a building discovered before it
                let enqueued_by = chain.buildings[..i].iter().any(|consumer| {
                    consumer.inputs.iter().any(|input| {
                        input.source == chain_calculator::InputSource::Building(building.name.clone())
                    }) && levels[consumer.name.as_str()] + 1 == building.level
                });
                prop_assert!(enqueued_by, "{} has no consumer one level below", building.name);
            }
        }
    }
}

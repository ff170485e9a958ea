//! Production chain resolution
//!
//! Turns a flat registry of buildings into supply chains: final product
//! buildings are found first, then each one is traced backwards through its
//! producers breadth-first. Every building ends up in exactly one chain or in
//! the isolated list.

use std::collections::{HashSet, VecDeque};

use log::{debug, info};

use crate::calculator::resolve_ratios;
use crate::index::{ResourceIndex, normalize_resource_name};
use crate::layout::{LayoutConfig, assign_positions};
use crate::models::{
    Building, ChainBuilding, ChainInput, ChainOutput, InputSource, Position, ProductionChain,
    ResourceTree, UNRESOLVED_RATIO,
};

/// State shared by every chain traced from one registry snapshot
pub struct ResolveContext<'a> {
    buildings: &'a [Building],
    index: ResourceIndex,
    /// Buildings already placed in some chain
    visited: HashSet<usize>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(buildings: &'a [Building]) -> Self {
        Self {
            buildings,
            index: ResourceIndex::build(buildings),
            visited: HashSet::new(),
        }
    }

    pub fn index(&self) -> &ResourceIndex {
        &self.index
    }

    pub fn is_claimed(&self, idx: usize) -> bool {
        self.visited.contains(&idx)
    }

    /// First producer of `resource` other than `consumer`, skipping
    /// buildings already claimed by an earlier chain
    fn chain_producer(
        &self,
        consumer: usize,
        resource: &str,
        chain_visited: &HashSet<usize>,
    ) -> Option<usize> {
        self.index
            .producers_of(resource)
            .iter()
            .copied()
            .find(|&p| p != consumer && (!self.visited.contains(&p) || chain_visited.contains(&p)))
    }

    /// First producer of `resource` other than `consumer`, claimed or not
    fn any_producer(&self, consumer: usize, resource: &str) -> Option<usize> {
        self.index
            .producers_of(resource)
            .iter()
            .copied()
            .find(|&p| p != consumer)
    }

    fn annotate_outputs(&self, idx: usize) -> Vec<ChainOutput> {
        self.buildings[idx]
            .outputs
            .iter()
            .map(|output| ChainOutput {
                resource_name: output.resource_name.clone(),
                quantity: output.quantity,
                consumers: self
                    .index
                    .consumers_of(&output.resource_name)
                    .iter()
                    .filter(|&&c| c != idx)
                    .map(|&c| self.buildings[c].name.clone())
                    .collect(),
            })
            .collect()
    }
}

/// Buildings none of whose outputs feed another building, in registry order
pub fn find_final_products(buildings: &[Building], index: &ResourceIndex) -> Vec<usize> {
    buildings
        .iter()
        .enumerate()
        .filter(|(idx, building)| {
            building
                .outputs
                .iter()
                .all(|output| !index.is_consumed_by_other(&output.resource_name, *idx))
        })
        .map(|(idx, _)| idx)
        .collect()
}

/// Trace one chain breadth-first from `root` towards raw material producers.
///
/// A building reached through several branches keeps the level of the branch
/// that enqueued it first. Buildings already claimed by an earlier chain are
/// neither revisited nor used as producers.
pub fn trace_chain(ctx: &mut ResolveContext<'_>, root: usize) -> ProductionChain {
    let mut chain_visited: HashSet<usize> = HashSet::new();
    let mut queue: VecDeque<(usize, u32)> = VecDeque::from([(root, 0)]);
    let mut buildings: Vec<ChainBuilding> = Vec::new();

    while let Some((idx, level)) = queue.pop_front() {
        if !ctx.visited.insert(idx) {
            continue;
        }
        chain_visited.insert(idx);

        let source = &ctx.buildings[idx];
        let mut inputs = Vec::with_capacity(source.inputs.len());

        for input in &source.inputs {
            let producer = ctx.chain_producer(idx, &input.resource_name, &chain_visited);
            let origin = match producer {
                Some(p) => {
                    if !chain_visited.contains(&p) {
                        queue.push_back((p, level + 1));
                    }
                    InputSource::Building(ctx.buildings[p].name.clone())
                }
                None => InputSource::Market,
            };
            inputs.push(ChainInput {
                resource_name: input.resource_name.clone(),
                quantity: input.quantity,
                source: origin,
            });
        }

        buildings.push(ChainBuilding {
            name: source.name.clone(),
            level,
            ratio: UNRESOLVED_RATIO,
            inputs,
            outputs: ctx.annotate_outputs(idx),
            position: Position::default(),
        });
    }

    let final_products = unique_names(
        buildings
            .iter()
            .filter(|b| b.level == 0)
            .flat_map(|b| b.outputs.iter().map(|o| o.resource_name.as_str())),
    );
    let root_inputs = unique_names(buildings.iter().flat_map(|b| {
        b.inputs
            .iter()
            .filter(|i| i.source.is_market())
            .map(|i| i.resource_name.as_str())
    }));

    let name = if final_products.is_empty() {
        ctx.buildings[root].name.clone()
    } else {
        final_products.join(" + ")
    };

    debug!(
        "Traced chain '{}' from {}: {} building(s), {} market input(s)",
        name,
        ctx.buildings[root].name,
        buildings.len(),
        root_inputs.len()
    );

    ProductionChain {
        id: slugify(&name),
        name,
        buildings,
        final_products,
        root_inputs,
    }
}

/// Buildings no chain reached, as unresolved level-0 entries
pub fn collect_isolated(ctx: &ResolveContext<'_>) -> Vec<ChainBuilding> {
    ctx.buildings
        .iter()
        .enumerate()
        .filter(|(idx, _)| !ctx.is_claimed(*idx))
        .map(|(idx, building)| ChainBuilding {
            name: building.name.clone(),
            level: 0,
            ratio: UNRESOLVED_RATIO,
            inputs: building
                .inputs
                .iter()
                .map(|input| ChainInput {
                    resource_name: input.resource_name.clone(),
                    quantity: input.quantity,
                    source: match ctx.any_producer(idx, &input.resource_name) {
                        Some(p) => InputSource::Building(ctx.buildings[p].name.clone()),
                        None => InputSource::Market,
                    },
                })
                .collect(),
            outputs: ctx.annotate_outputs(idx),
            position: Position::default(),
        })
        .collect()
}

/// Package chains and leftovers into the final tree
pub fn assemble(chains: Vec<ProductionChain>, isolated_buildings: Vec<ChainBuilding>) -> ResourceTree {
    ResourceTree {
        total_chains: chains.len(),
        chains,
        isolated_buildings,
    }
}

/// Resolve a registry with the default diagram spacing
pub fn resolve(buildings: &[Building]) -> ResourceTree {
    resolve_with(buildings, &LayoutConfig::default())
}

/// Resolve a registry into chains, ratios and diagram positions.
///
/// Pure and deterministic: the same registry always yields the same tree.
/// Quantities must be positive; this is not checked here (see
/// [`crate::error::validate_registry`]).
pub fn resolve_with(buildings: &[Building], layout: &LayoutConfig) -> ResourceTree {
    let mut ctx = ResolveContext::new(buildings);
    let roots = find_final_products(buildings, ctx.index());
    debug!("Found {} final product building(s)", roots.len());

    let mut chains = Vec::new();
    let mut used_ids: HashSet<String> = HashSet::new();

    for root in roots {
        // Nothing else consumes a root's outputs, so no earlier chain can claim it
        debug_assert!(!ctx.is_claimed(root));
        // A root consuming nothing heads no supply chain and stays standalone
        if buildings[root].inputs.is_empty() {
            continue;
        }

        let mut chain = trace_chain(&mut ctx, root);
        resolve_ratios(&mut chain.buildings);
        assign_positions(&mut chain.buildings, layout);
        chain.id = unique_id(&chain.id, &mut used_ids);
        chains.push(chain);
    }

    let isolated = collect_isolated(&ctx);
    info!(
        "Resolved {} building(s) into {} chain(s), {} isolated",
        buildings.len(),
        chains.len(),
        isolated.len()
    );

    assemble(chains, isolated)
}

/// Keep the first spelling of each name, compared case-insensitively
fn unique_names<'n>(names: impl Iterator<Item = &'n str>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .filter(|name| seen.insert(normalize_resource_name(name)))
        .map(str::to_string)
        .collect()
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("chain");
    }
    slug
}

fn unique_id(base: &str, used: &mut HashSet<String>) -> String {
    let mut id = base.to_string();
    let mut n = 2;
    while used.contains(&id) {
        id = format!("{}-{}", base, n);
        n += 1;
    }
    used.insert(id.clone());
    id
}

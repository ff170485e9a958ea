//! Data models for buildings, resolved chains and the resource tree

use serde::{Deserialize, Serialize};

/// A named quantity of a resource consumed or produced per cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAmount {
    pub resource_name: String,
    pub quantity: f64,
}

impl ResourceAmount {
    pub fn new(resource_name: impl Into<String>, quantity: f64) -> Self {
        Self {
            resource_name: resource_name.into(),
            quantity,
        }
    }
}

/// A production building as handed over by ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<ResourceAmount>,
    #[serde(default)]
    pub outputs: Vec<ResourceAmount>,
}

impl Building {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_input(mut self, resource_name: impl Into<String>, quantity: f64) -> Self {
        self.inputs.push(ResourceAmount::new(resource_name, quantity));
        self
    }

    pub fn with_output(mut self, resource_name: impl Into<String>, quantity: f64) -> Self {
        self.outputs.push(ResourceAmount::new(resource_name, quantity));
        self
    }
}

/// Where an input resource comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "sourceType", content = "sourceBuilding", rename_all = "lowercase")]
pub enum InputSource {
    /// No producer in the registry; bought externally
    Market,
    /// Produced by the named building
    Building(String),
}

impl InputSource {
    pub fn is_market(&self) -> bool {
        matches!(self, InputSource::Market)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInput {
    pub resource_name: String,
    pub quantity: f64,
    #[serde(flatten)]
    pub source: InputSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainOutput {
    pub resource_name: String,
    pub quantity: f64,
    /// Every other registry building consuming this resource, chain or not
    pub consumers: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Ratio of a building that has not been through ratio resolution
pub const UNRESOLVED_RATIO: f64 = 1.0;

/// A building placed in a chain (or standing alone)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainBuilding {
    pub name: String,
    /// 0 = final product tier, increasing upstream
    pub level: u32,
    /// Production cycles needed to meet downstream demand
    pub ratio: f64,
    pub inputs: Vec<ChainInput>,
    pub outputs: Vec<ChainOutput>,
    pub position: Position,
}

impl ChainBuilding {
    /// Input quantity for a resource, matched case-insensitively
    pub fn input_quantity(&self, resource_name: &str) -> Option<f64> {
        let key = crate::index::normalize_resource_name(resource_name);
        self.inputs
            .iter()
            .find(|i| crate::index::normalize_resource_name(&i.resource_name) == key)
            .map(|i| i.quantity)
    }
}

/// One supply chain traced back from a final product building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionChain {
    pub id: String,
    pub name: String,
    pub buildings: Vec<ChainBuilding>,
    pub final_products: Vec<String>,
    /// Resources bought from the market anywhere in the chain
    pub root_inputs: Vec<String>,
}

impl ProductionChain {
    pub fn max_level(&self) -> u32 {
        self.buildings.iter().map(|b| b.level).max().unwrap_or(0)
    }

    pub fn building(&self, name: &str) -> Option<&ChainBuilding> {
        self.buildings.iter().find(|b| b.name == name)
    }
}

/// Result of resolving a registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTree {
    pub chains: Vec<ProductionChain>,
    pub isolated_buildings: Vec<ChainBuilding>,
    pub total_chains: usize,
}

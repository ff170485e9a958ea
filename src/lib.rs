//! Production chain calculator
//!
//! Resolves a registry of production buildings into supply chains with
//! per-building production ratios and diagram positions, and reports chain
//! profitability against market prices.

pub mod calculator;
pub mod db;
pub mod error;
pub mod extract;
pub mod index;
pub mod layout;
pub mod models;
pub mod report;
pub mod resolver;

pub use error::{RegistryError, validate_registry};
pub use layout::LayoutConfig;
pub use models::{
    Building, ChainBuilding, ChainInput, ChainOutput, InputSource, Position, ProductionChain,
    ResourceAmount, ResourceTree,
};
pub use resolver::{resolve, resolve_with};

//! Registry validation errors

use std::collections::HashSet;

use thiserror::Error;

use crate::models::Building;

/// A registry entry violating the resolver's input preconditions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("building #{index} has an empty name")]
    EmptyBuildingName { index: usize },

    #[error("building '{0}' is listed more than once")]
    DuplicateBuildingName(String),

    #[error("building '{building}' lists a resource with an empty name")]
    EmptyResourceName { building: String },

    #[error("building '{building}' has non-positive quantity {quantity} of '{resource}'")]
    NonPositiveQuantity {
        building: String,
        resource: String,
        quantity: f64,
    },
}

/// Check every precondition the resolver assumes, reporting all violations
pub fn validate_registry(buildings: &[Building]) -> Result<(), Vec<RegistryError>> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for (index, building) in buildings.iter().enumerate() {
        if building.name.trim().is_empty() {
            errors.push(RegistryError::EmptyBuildingName { index });
        } else if !names.insert(building.name.as_str()) {
            errors.push(RegistryError::DuplicateBuildingName(building.name.clone()));
        }

        for item in building.inputs.iter().chain(building.outputs.iter()) {
            if item.resource_name.trim().is_empty() {
                errors.push(RegistryError::EmptyResourceName {
                    building: building.name.clone(),
                });
            }
            // NaN fails this comparison too
            if !(item.quantity > 0.0) {
                errors.push(RegistryError::NonPositiveQuantity {
                    building: building.name.clone(),
                    resource: item.resource_name.clone(),
                    quantity: item.quantity,
                });
            }
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

//! # Circuit Catalog
//!
//! Read-only set of circuits a championship can race on. Loaded once at
//! startup from `circuits.json` and shared without locking afterwards.
//!
//! ```json
//! { "circuits": [ { "id": "spa", "name": "Spa-Francorchamps", "country": "Belgium",
//!                   "length": "7.004 km", "turns": 19, "description": "..." } ] }
//! ```
use std::{collections::HashSet, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Circuit {
    pub id: String,
    pub name: String,
    pub country: String,
    pub length: String,
    pub turns: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub circuits: Vec<Circuit>,
}

impl Catalog {
    /// Builds a catalog, rejecting duplicate circuit ids.
    pub fn new(circuits: Vec<Circuit>) -> Result<Self, StoreError> {
        let mut seen = HashSet::new();

        for circuit in &circuits {
            if !seen.insert(circuit.id.as_str()) {
                return Err(StoreError::Corrupt(format!(
                    "duplicate circuit id '{}' in catalog",
                    circuit.id
                )));
            }
        }

        Ok(Self { circuits })
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let data = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        let catalog: Catalog = serde_json::from_str(&data).map_err(|e| StoreError::json(path, e))?;

        Self::new(catalog.circuits)
    }

    pub fn get(&self, id: &str) -> Option<&Circuit> {
        self.circuits.iter().find(|circuit| circuit.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.circuits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn circuit(id: &str) -> Circuit {
    Circuit {
        id: id.to_string(),
        name: format!("Circuit {id}"),
        country: "Nowhere".to_string(),
        length: "4.000 km".to_string(),
        turns: 12,
        description: None,
    }
}

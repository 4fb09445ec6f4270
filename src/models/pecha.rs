//! A pecha: metadata plus the bases and layers produced for it.

use std::collections::BTreeMap;

use serde::Serialize;

use super::layer::LayerSet;
use super::metadata::PechaMetadata;
use super::unit::BaseUnit;

#[derive(Debug, Clone, Serialize)]
pub struct Pecha {
    pub metadata: PechaMetadata,
    bases: BTreeMap<String, String>,
    layers: BTreeMap<String, LayerSet>,
}

impl Pecha {
    pub fn new(metadata: PechaMetadata) -> Self {
        Self {
            metadata,
            bases: BTreeMap::new(),
            layers: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.metadata.id()
    }

    /// Add a finished unit. A unit with an existing base name replaces it.
    pub fn add_unit(&mut self, unit: BaseUnit) {
        self.add_unit_with_source(unit, None);
    }

    /// Add a finished unit and record source metadata for its base.
    pub fn add_unit_with_source(&mut self, unit: BaseUnit, source_metadata: Option<serde_json::Value>) {
        let BaseUnit {
            base_name,
            base_text,
            layers,
        } = unit;
        self.metadata.register_base(&base_name, source_metadata);
        self.bases.insert(base_name.clone(), base_text);
        self.layers.insert(base_name, layers);
    }

    pub fn base_names(&self) -> impl Iterator<Item = &str> {
        self.bases.keys().map(|k| k.as_str())
    }

    pub fn base(&self, base_name: &str) -> Option<&str> {
        self.bases.get(base_name).map(|s| s.as_str())
    }

    pub fn layers(&self, base_name: &str) -> Option<&LayerSet> {
        self.layers.get(base_name)
    }
}

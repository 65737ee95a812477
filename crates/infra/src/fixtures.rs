//! JSON snapshots of unit registry data for seeding the in-memory store.

use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use tallyforge_uom::{ConversionEdge, Unit, UnitGroup, UomService};

use crate::uom_store::InMemoryUomStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UomSnapshot {
    #[serde(default)]
    pub groups: Vec<UnitGroup>,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub edges: Vec<ConversionEdge>,
}

impl UomSnapshot {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid unit registry snapshot")
    }

    /// Load into the service's store. Edges go through the registration guard.
    ///
    /// Groups are first stored without base units so members can reference
    /// them, then stored again with their base units.
    pub fn load(&self, service: &UomService<Arc<InMemoryUomStore>>) -> anyhow::Result<()> {
        let store = service.registry();

        for group in &self.groups {
            store
                .upsert_group(group.without_base_unit())
                .with_context(|| format!("group {}", group.code()))?;
        }
        for unit in &self.units {
            store
                .upsert_unit(unit.clone())
                .with_context(|| format!("unit {}", unit.code()))?;
        }
        for group in &self.groups {
            store
                .upsert_group(group.clone())
                .with_context(|| format!("base unit of group {}", group.code()))?;
        }
        for edge in &self.edges {
            service
                .register_edge(edge.clone())
                .with_context(|| format!("conversion edge {}", edge.id))?;
        }

        tracing::info!(
            groups = self.groups.len(),
            units = self.units.len(),
            edges = self.edges.len(),
            "unit registry snapshot loaded"
        );
        Ok(())
    }
}

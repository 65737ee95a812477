//! In-memory, tenant-isolated unit registry for tests/dev.
//!
//! All tables sit behind one `RwLock` so a reader always sees units, groups and
//! edges from the same point in time.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tallyforge_core::{ConversionEdgeId, DomainError, TenantId, UnitGroupId, UnitId};
use tallyforge_uom::{ConversionEdge, EdgeStore, RegistryError, Unit, UnitGroup, UomRegistry};

#[derive(Debug, Default)]
struct Tables {
    units: HashMap<(TenantId, UnitId), Unit>,
    groups: HashMap<(TenantId, UnitGroupId), UnitGroup>,
    /// Creation order; the graph builder relies on it for tie-breaking.
    edges: Vec<ConversionEdge>,
}

#[derive(Debug, Default)]
pub struct InMemoryUomStore {
    inner: RwLock<Tables>,
}

impl InMemoryUomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, RegistryError> {
        self.inner
            .read()
            .map_err(|_| RegistryError::Storage("uom store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, RegistryError> {
        self.inner
            .write()
            .map_err(|_| RegistryError::Storage("uom store lock poisoned".to_string()))
    }

    /// Insert or replace a unit group.
    ///
    /// Group codes are unique per tenant. A designated base unit must already be
    /// stored as a member of this group.
    pub fn upsert_group(&self, group: UnitGroup) -> Result<(), RegistryError> {
        let mut tables = self.write()?;

        let clash = tables.groups.values().any(|g| {
            g.tenant_id == group.tenant_id && g.id != group.id && g.code() == group.code()
        });
        if clash {
            return Err(DomainError::conflict(format!(
                "unit group code {} already exists",
                group.code()
            ))
            .into());
        }

        if let Some(base) = group.base_unit() {
            let member = tables
                .units
                .get(&(group.tenant_id, base))
                .is_some_and(|u| u.group_id == Some(group.id));
            if !member {
                return Err(DomainError::invariant(format!(
                    "base unit {base} does not belong to unit group {}",
                    group.code()
                ))
                .into());
            }
        }

        tables.groups.insert((group.tenant_id, group.id), group);
        Ok(())
    }

    /// Insert or replace a unit.
    ///
    /// Unit codes are unique per tenant. The unit's group must exist, and a unit
    /// serving as some group's base unit cannot move to another group.
    pub fn upsert_unit(&self, unit: Unit) -> Result<(), RegistryError> {
        let mut tables = self.write()?;

        let clash = tables
            .units
            .values()
            .any(|u| u.tenant_id == unit.tenant_id && u.id != unit.id && u.code() == unit.code());
        if clash {
            return Err(
                DomainError::conflict(format!("unit code {} already exists", unit.code())).into(),
            );
        }

        if let Some(group_id) = unit.group_id {
            if !tables.groups.contains_key(&(unit.tenant_id, group_id)) {
                return Err(
                    DomainError::validation(format!("unit group {group_id} does not exist")).into(),
                );
            }
        }

        let anchors_other_group = tables.groups.values().any(|g| {
            g.tenant_id == unit.tenant_id
                && g.base_unit() == Some(unit.id)
                && Some(g.id) != unit.group_id
        });
        if anchors_other_group {
            return Err(DomainError::invariant(format!(
                "unit {} is a base unit and cannot leave its group",
                unit.code()
            ))
            .into());
        }

        tables.units.insert((unit.tenant_id, unit.id), unit);
        Ok(())
    }

    pub fn unit_by_code(
        &self,
        tenant_id: TenantId,
        code: &str,
    ) -> Result<Option<Unit>, RegistryError> {
        let code = code.trim().to_uppercase();
        let tables = self.read()?;
        Ok(tables
            .units
            .values()
            .find(|u| u.tenant_id == tenant_id && u.code() == code)
            .cloned())
    }

    pub fn group_by_code(
        &self,
        tenant_id: TenantId,
        code: &str,
    ) -> Result<Option<UnitGroup>, RegistryError> {
        let code = code.trim().to_uppercase();
        let tables = self.read()?;
        Ok(tables
            .groups
            .values()
            .find(|g| g.tenant_id == tenant_id && g.code() == code)
            .cloned())
    }

    /// Clear all records for a tenant.
    pub fn clear_tenant(&self, tenant_id: TenantId) -> Result<(), RegistryError> {
        let mut tables = self.write()?;
        tables.units.retain(|(t, _), _| *t != tenant_id);
        tables.groups.retain(|(t, _), _| *t != tenant_id);
        tables.edges.retain(|e| e.tenant_id != tenant_id);
        Ok(())
    }
}

impl UomRegistry for InMemoryUomStore {
    fn unit(&self, tenant_id: TenantId, unit_id: UnitId) -> Result<Option<Unit>, RegistryError> {
        Ok(self.read()?.units.get(&(tenant_id, unit_id)).cloned())
    }

    fn group(
        &self,
        tenant_id: TenantId,
        group_id: UnitGroupId,
    ) -> Result<Option<UnitGroup>, RegistryError> {
        Ok(self.read()?.groups.get(&(tenant_id, group_id)).cloned())
    }

    fn general_edges(
        &self,
        tenant_id: TenantId,
        group_id: UnitGroupId,
    ) -> Result<Vec<ConversionEdge>, RegistryError> {
        let tables = self.read()?;
        Ok(tables
            .edges
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.active && e.is_general())
            .filter(|e| {
                tables
                    .units
                    .get(&(tenant_id, e.from_unit))
                    .is_some_and(|u| u.group_id == Some(group_id))
            })
            .cloned()
            .collect())
    }
}

impl EdgeStore for InMemoryUomStore {
    fn edge(
        &self,
        tenant_id: TenantId,
        edge_id: ConversionEdgeId,
    ) -> Result<Option<ConversionEdge>, RegistryError> {
        Ok(self
            .read()?
            .edges
            .iter()
            .find(|e| e.tenant_id == tenant_id && e.id == edge_id)
            .cloned())
    }

    fn save_edge(&self, edge: ConversionEdge) -> Result<(), RegistryError> {
        let mut tables = self.write()?;
        if !tables.units.contains_key(&(edge.tenant_id, edge.from_unit)) {
            return Err(
                DomainError::validation(format!("unit {} does not exist", edge.from_unit)).into(),
            );
        }
        if edge.active && edge.is_general() {
            let duplicate = tables.edges.iter().any(|e| {
                e.tenant_id == edge.tenant_id
                    && e.from_unit == edge.from_unit
                    && e.id != edge.id
                    && e.active
                    && e.is_general()
            });
            if duplicate {
                return Err(RegistryError::DuplicateEdge(edge.from_unit));
            }
        }

        let existing = tables.edges.iter().position(|e| e.id == edge.id);
        match existing {
            Some(ix) => tables.edges[ix] = edge,
            None => tables.edges.push(edge),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tallyforge_uom::{Factor, Precision};

    fn group(tenant_id: TenantId, code: &str) -> UnitGroup {
        UnitGroup::new(UnitGroupId::new(), tenant_id, code).unwrap()
    }

    fn unit(tenant_id: TenantId, code: &str, group: &UnitGroup) -> Unit {
        Unit::new(UnitId::new(), tenant_id, code, Precision::NONE)
            .unwrap()
            .in_group(group.id)
    }

    #[test]
    fn codes_are_unique_per_tenant() {
        let store = InMemoryUomStore::new();
        let tenant_id = TenantId::new();
        let weight = group(tenant_id, "weight");
        store.upsert_group(weight.clone()).unwrap();
        store.upsert_unit(unit(tenant_id, "kg", &weight)).unwrap();

        let err = store.upsert_unit(unit(tenant_id, "KG", &weight)).unwrap_err();
        assert!(matches!(err, RegistryError::Rejected(DomainError::Conflict(_))));
        assert!(store.upsert_group(group(tenant_id, " Weight")).is_err());

        let other = TenantId::new();
        let other_weight = group(other, "weight");
        store.upsert_group(other_weight.clone()).unwrap();
        store.upsert_unit(unit(other, "kg", &other_weight)).unwrap();
    }

    #[test]
    fn base_unit_must_be_a_stored_member() {
        let store = InMemoryUomStore::new();
        let tenant_id = TenantId::new();
        let mut weight = group(tenant_id, "weight");
        store.upsert_group(weight.clone()).unwrap();

        let gram = unit(tenant_id, "g", &weight);
        weight.assign_base_unit(&gram).unwrap();
        assert!(store.upsert_group(weight.clone()).is_err());

        store.upsert_unit(gram.clone()).unwrap();
        store.upsert_group(weight.clone()).unwrap();

        let length = group(tenant_id, "length");
        store.upsert_group(length.clone()).unwrap();
        let moved = gram.in_group(length.id);
        assert!(store.upsert_unit(moved).is_err());
    }

    #[test]
    fn units_require_an_existing_group() {
        let store = InMemoryUomStore::new();
        let tenant_id = TenantId::new();
        let ghost = group(tenant_id, "ghost");
        assert!(store.upsert_unit(unit(tenant_id, "x", &ghost)).is_err());
    }

    #[test]
    fn general_edges_are_scoped_to_group_and_tenant() {
        let store = InMemoryUomStore::new();
        let tenant_id = TenantId::new();
        let weight = group(tenant_id, "weight");
        let length = group(tenant_id, "length");
        store.upsert_group(weight.clone()).unwrap();
        store.upsert_group(length.clone()).unwrap();
        let kg = unit(tenant_id, "kg", &weight);
        let km = unit(tenant_id, "km", &length);
        store.upsert_unit(kg.clone()).unwrap();
        store.upsert_unit(km.clone()).unwrap();

        let thousand = Factor::new(Decimal::from(1000)).unwrap();
        store
            .save_edge(ConversionEdge::general(ConversionEdgeId::new(), tenant_id, kg.id, thousand))
            .unwrap();
        store
            .save_edge(ConversionEdge::general(ConversionEdgeId::new(), tenant_id, km.id, thousand))
            .unwrap();

        let edges = store.general_edges(tenant_id, weight.id).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from_unit, kg.id);
        assert!(store.general_edges(TenantId::new(), weight.id).unwrap().is_empty());
    }

    #[test]
    fn save_edge_replaces_by_id_in_place() {
        let store = InMemoryUomStore::new();
        let tenant_id = TenantId::new();
        let weight = group(tenant_id, "weight");
        store.upsert_group(weight.clone()).unwrap();
        let kg = unit(tenant_id, "kg", &weight);
        store.upsert_unit(kg.clone()).unwrap();

        let id = ConversionEdgeId::new();
        let mut edge =
            ConversionEdge::general(id, tenant_id, kg.id, Factor::new(Decimal::from(999)).unwrap());
        store.save_edge(edge.clone()).unwrap();
        edge.factor = Factor::new(Decimal::from(1000)).unwrap();
        store.save_edge(edge).unwrap();

        let stored = store.edge(tenant_id, id).unwrap().unwrap();
        assert_eq!(stored.factor.value(), Decimal::from(1000));
        assert_eq!(store.general_edges(tenant_id, weight.id).unwrap().len(), 1);
    }

    #[test]
    fn lookup_by_code_normalizes() {
        let store = InMemoryUomStore::new();
        let tenant_id = TenantId::new();
        let weight = group(tenant_id, "weight");
        store.upsert_group(weight.clone()).unwrap();
        store.upsert_unit(unit(tenant_id, "kg", &weight)).unwrap();

        assert!(store.unit_by_code(tenant_id, " kg").unwrap().is_some());
        assert!(store.group_by_code(tenant_id, "WEIGHT").unwrap().is_some());

        store.clear_tenant(tenant_id).unwrap();
        assert!(store.unit_by_code(tenant_id, "kg").unwrap().is_none());
    }

    #[test]
    fn save_edge_allows_one_active_general_edge_per_unit() {
        let store = InMemoryUomStore::new();
        let tenant_id = TenantId::new();
        let weight = group(tenant_id, "weight");
        store.upsert_group(weight.clone()).unwrap();
        let kg = unit(tenant_id, "kg", &weight);
        store.upsert_unit(kg.clone()).unwrap();
        let thousand = Factor::new(Decimal::from(1000)).unwrap();

        let first = ConversionEdge::general(ConversionEdgeId::new(), tenant_id, kg.id, thousand);
        store.save_edge(first.clone()).unwrap();

        let second = ConversionEdge::general(ConversionEdgeId::new(), tenant_id, kg.id, thousand);
        assert_eq!(
            store.save_edge(second.clone()).unwrap_err(),
            RegistryError::DuplicateEdge(kg.id)
        );

        // item overrides and inactive rows do not count
        let per_item = ConversionEdge::general(ConversionEdgeId::new(), tenant_id, kg.id, thousand)
            .for_item(tallyforge_core::ItemId::new(), None);
        store.save_edge(per_item).unwrap();
        let mut retired = second.clone();
        retired.deactivate();
        store.save_edge(retired).unwrap();

        // once the first edge is retired the unit takes a new active edge
        let mut first = first;
        first.deactivate();
        store.save_edge(first).unwrap();
        store.save_edge(second).unwrap();
        assert_eq!(store.general_edges(tenant_id, weight.id).unwrap().len(), 1);
    }
}

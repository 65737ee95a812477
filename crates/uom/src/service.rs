//! `UomService`: the conversion entry points exposed to collaborators.
//!
//! Loads records from a [`UomRegistry`], builds (or reuses) the group's graph and
//! delegates to the pure components. Edge writes go through
//! [`UomService::register_edge`] / [`UomService::deactivate_edge`] so the graph
//! cache is invalidated in the same call that persists the change.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use tallyforge_core::{ConversionEdgeId, DomainError, TenantId, UnitGroupId, UnitId};

use crate::cache::GraphCache;
use crate::convert::QuantityConverter;
use crate::cycle::CycleDetector;
use crate::error::{RegistryError, UomError, UomResult};
use crate::graph::ConversionGraph;
use crate::model::{ConversionEdge, Precision, Unit, UnitGroup};
use crate::path::ConversionPath;
use crate::registry::{EdgeStore, UomRegistry};
use crate::validate::{ChainCheck, ChainValidator};

#[derive(Debug)]
pub struct UomService<R> {
    registry: R,
    cache: Option<GraphCache>,
}

impl<R> UomService<R>
where
    R: UomRegistry,
{
    /// Service with the graph cache enabled.
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            cache: Some(GraphCache::new()),
        }
    }

    /// Service that rebuilds the graph on every call.
    pub fn uncached(registry: R) -> Self {
        Self {
            registry,
            cache: None,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn cache(&self) -> Option<&GraphCache> {
        self.cache.as_ref()
    }

    /// Convert `quantity` from `from_unit` to `to_unit` within `group_id`.
    #[instrument(level = "debug", skip(self), err)]
    pub fn calculate(
        &self,
        tenant_id: TenantId,
        group_id: UnitGroupId,
        from_unit: UnitId,
        to_unit: UnitId,
        quantity: Decimal,
    ) -> UomResult<Decimal> {
        let from = self.load_unit(tenant_id, from_unit)?;
        if from_unit == to_unit {
            return from.precision.round(quantity).ok_or(UomError::Overflow {
                from: from_unit,
                to: to_unit,
            });
        }

        let to = self.load_unit(tenant_id, to_unit)?;
        ChainCheck::of_groups(&from, &to).into_result(&from, &to)?;
        if from.group_id != Some(group_id) {
            return Err(DomainError::validation(format!(
                "units {} and {} do not belong to unit group {group_id}",
                from.code(),
                to.code()
            ))
            .into());
        }

        let group = self.load_group(tenant_id, group_id)?;
        group.check_quantity(quantity)?;
        group.require_base_unit()?;

        let graph = self.graph_for(tenant_id, &group)?;
        let converted = QuantityConverter::new(&graph).calculate(&from, &to, quantity)?;

        debug!(from = from.code(), to = to.code(), %quantity, %converted, "quantity converted");
        Ok(converted)
    }

    /// Price per `from_unit` re-expressed per `to_unit`, rounded to `precision`.
    #[instrument(level = "debug", skip(self), err)]
    pub fn convert_unit_price(
        &self,
        tenant_id: TenantId,
        from_unit: UnitId,
        to_unit: UnitId,
        price: Decimal,
        precision: Precision,
    ) -> UomResult<Decimal> {
        let from = self.load_unit(tenant_id, from_unit)?;
        let to = self.load_unit(tenant_id, to_unit)?;
        if from_unit == to_unit {
            return precision.round(price).ok_or(UomError::Overflow {
                from: from_unit,
                to: to_unit,
            });
        }

        ChainCheck::of_groups(&from, &to).into_result(&from, &to)?;
        let group = self.load_group(tenant_id, from.require_group()?)?;
        group.require_base_unit()?;

        let graph = self.graph_for(tenant_id, &group)?;
        QuantityConverter::new(&graph).convert_unit_price(&from, &to, price, precision)
    }

    /// Pre-flight check: group membership, then path existence.
    #[instrument(level = "debug", skip(self), err)]
    pub fn validate_conversion(
        &self,
        tenant_id: TenantId,
        from_unit: UnitId,
        to_unit: UnitId,
    ) -> UomResult<ChainCheck> {
        let from = self.load_unit(tenant_id, from_unit)?;
        let to = self.load_unit(tenant_id, to_unit)?;

        let groups = ChainCheck::of_groups(&from, &to);
        if !groups.is_valid() {
            return Ok(groups);
        }

        let group = self.load_group(tenant_id, from.require_group()?)?;
        let graph = self.graph_for(tenant_id, &group)?;
        Ok(ChainValidator::new(&graph).validate_conversion(&from, &to))
    }

    pub fn find_path(
        &self,
        tenant_id: TenantId,
        group_id: UnitGroupId,
        from_unit: UnitId,
        to_unit: UnitId,
    ) -> UomResult<Option<ConversionPath>> {
        let graph = self.graph(tenant_id, group_id)?;
        Ok(graph.find_path(from_unit, to_unit))
    }

    pub fn has_cycle(&self, tenant_id: TenantId, group_id: UnitGroupId) -> UomResult<bool> {
        let graph = self.graph(tenant_id, group_id)?;
        Ok(CycleDetector::new(&graph).has_cycle())
    }

    /// The group's conversion graph, from cache when enabled.
    pub fn graph(
        &self,
        tenant_id: TenantId,
        group_id: UnitGroupId,
    ) -> UomResult<Arc<ConversionGraph>> {
        let group = self.load_group(tenant_id, group_id)?;
        self.graph_for(tenant_id, &group)
    }

    /// Drop the cached graph of one group.
    pub fn invalidate(&self, tenant_id: TenantId, group_id: UnitGroupId) {
        if let Some(cache) = &self.cache {
            if cache.invalidate(tenant_id, group_id) {
                debug!(
                    tenant_id = %tenant_id,
                    group_id = %group_id,
                    "conversion graph invalidated"
                );
            }
        }
    }

    fn graph_for(&self, tenant_id: TenantId, group: &UnitGroup) -> UomResult<Arc<ConversionGraph>> {
        if let Some(cache) = &self.cache {
            if let Some(graph) = cache.get(tenant_id, group.id) {
                // A base-unit change re-anchors every arc.
                if graph.base_unit() == group.base_unit() {
                    return Ok(graph);
                }
            }
        }

        // Stamp first: an edge write landing while the edges are read must not
        // leave the stale graph in the cache.
        let generation = self.cache.as_ref().map(|c| c.generation(tenant_id, group.id));
        let edges = self.registry.general_edges(tenant_id, group.id)?;
        let graph = ConversionGraph::build(tenant_id, group, &edges);

        Ok(match (&self.cache, generation) {
            (Some(cache), Some(generation)) => cache.insert_if_current(generation, graph),
            _ => Arc::new(graph),
        })
    }

    fn load_unit(&self, tenant_id: TenantId, unit_id: UnitId) -> UomResult<Unit> {
        self.registry
            .unit(tenant_id, unit_id)?
            .ok_or(UomError::UnitNotFound(unit_id))
    }

    fn load_group(&self, tenant_id: TenantId, group_id: UnitGroupId) -> UomResult<UnitGroup> {
        self.registry
            .group(tenant_id, group_id)?
            .ok_or(UomError::GroupNotFound(group_id))
    }
}

impl<R> UomService<R>
where
    R: EdgeStore,
{
    /// Validate and persist a conversion edge, then invalidate the affected graphs.
    ///
    /// Rejects edges whose unit has no group, whose group has no base unit, that
    /// map the base unit onto itself, that would link units of different groups,
    /// or that duplicate another active general edge of the same unit. The
    /// duplicate check runs inside the store write, so concurrent registrations
    /// for one unit cannot both succeed.
    #[instrument(
        level = "debug",
        skip(self, edge),
        fields(edge_id = %edge.id, from_unit = %edge.from_unit),
        err
    )]
    pub fn register_edge(&self, edge: ConversionEdge) -> UomResult<()> {
        let tenant_id = edge.tenant_id;
        let from = self.load_unit(tenant_id, edge.from_unit)?;
        let group_id = from.require_group()?;
        let group = self.load_group(tenant_id, group_id)?;
        let base_id = group.require_base_unit()?;

        if base_id == edge.from_unit {
            return Err(DomainError::invariant(format!(
                "unit {} is the base unit of its group and cannot have a conversion edge",
                from.code()
            ))
            .into());
        }

        let base = self.load_unit(tenant_id, base_id)?;
        ChainCheck::of_groups(&from, &base).into_result(&from, &base)?;

        let previous = self.registry.edge(tenant_id, edge.id)?;
        self.registry.save_edge(edge.clone()).map_err(|err| match err {
            RegistryError::DuplicateEdge(unit) => UomError::DuplicateEdge(unit),
            other => other.into(),
        })?;

        self.invalidate(tenant_id, group_id);
        if let Some(previous) = previous {
            if previous.from_unit != edge.from_unit {
                self.invalidate_for_unit(tenant_id, previous.from_unit)?;
            }
        }

        info!(
            tenant_id = %tenant_id,
            group_id = %group_id,
            from_unit = from.code(),
            factor = %edge.factor.value(),
            "conversion edge registered"
        );
        Ok(())
    }

    /// Deactivate a stored edge and invalidate its group's graph.
    #[instrument(level = "debug", skip(self), err)]
    pub fn deactivate_edge(
        &self,
        tenant_id: TenantId,
        edge_id: ConversionEdgeId,
    ) -> UomResult<ConversionEdge> {
        let mut edge = self
            .registry
            .edge(tenant_id, edge_id)?
            .ok_or(UomError::EdgeNotFound(edge_id))?;

        edge.deactivate();
        self.registry.save_edge(edge.clone())?;
        self.invalidate_for_unit(tenant_id, edge.from_unit)?;

        info!(tenant_id = %tenant_id, edge_id = %edge_id, "conversion edge deactivated");
        Ok(edge)
    }

    fn invalidate_for_unit(&self, tenant_id: TenantId, unit_id: UnitId) -> UomResult<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };
        match self.registry.unit(tenant_id, unit_id)?.and_then(|u| u.group_id) {
            Some(group_id) => {
                cache.invalidate(tenant_id, group_id);
            }
            None => cache.invalidate_tenant(tenant_id),
        }
        Ok(())
    }
}

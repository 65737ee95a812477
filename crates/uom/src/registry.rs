//! Read (and edge-write) seams onto the external unit registry.

use std::sync::Arc;

use tallyforge_core::{ConversionEdgeId, TenantId, UnitGroupId, UnitId};

use crate::error::RegistryError;
use crate::model::{ConversionEdge, Unit, UnitGroup};

/// Data access the conversion engine consumes. Implementations must be pure reads.
pub trait UomRegistry: Send + Sync {
    fn unit(&self, tenant_id: TenantId, unit_id: UnitId) -> Result<Option<Unit>, RegistryError>;

    fn group(
        &self,
        tenant_id: TenantId,
        group_id: UnitGroupId,
    ) -> Result<Option<UnitGroup>, RegistryError>;

    /// Active general edges whose `from_unit` belongs to `group_id`, in creation order.
    fn general_edges(
        &self,
        tenant_id: TenantId,
        group_id: UnitGroupId,
    ) -> Result<Vec<ConversionEdge>, RegistryError>;
}

/// Edge persistence used by the edge registration guard.
pub trait EdgeStore: UomRegistry {
    fn edge(
        &self,
        tenant_id: TenantId,
        edge_id: ConversionEdgeId,
    ) -> Result<Option<ConversionEdge>, RegistryError>;

    /// Insert or replace an edge by id.
    ///
    /// An active general edge must be rejected with [`RegistryError::DuplicateEdge`]
    /// when another active general edge exists for the same (tenant, from_unit).
    /// The check and the write are one atomic step.
    fn save_edge(&self, edge: ConversionEdge) -> Result<(), RegistryError>;
}

impl<R> UomRegistry for Arc<R>
where
    R: UomRegistry + ?Sized,
{
    fn unit(&self, tenant_id: TenantId, unit_id: UnitId) -> Result<Option<Unit>, RegistryError> {
        (**self).unit(tenant_id, unit_id)
    }

    fn group(
        &self,
        tenant_id: TenantId,
        group_id: UnitGroupId,
    ) -> Result<Option<UnitGroup>, RegistryError> {
        (**self).group(tenant_id, group_id)
    }

    fn general_edges(
        &self,
        tenant_id: TenantId,
        group_id: UnitGroupId,
    ) -> Result<Vec<ConversionEdge>, RegistryError> {
        (**self).general_edges(tenant_id, group_id)
    }
}

impl<R> EdgeStore for Arc<R>
where
    R: EdgeStore + ?Sized,
{
    fn edge(
        &self,
        tenant_id: TenantId,
        edge_id: ConversionEdgeId,
    ) -> Result<Option<ConversionEdge>, RegistryError> {
        (**self).edge(tenant_id, edge_id)
    }

    fn save_edge(&self, edge: ConversionEdge) -> Result<(), RegistryError> {
        (**self).save_edge(edge)
    }
}

//! Error taxonomy of the conversion engine.
//!
//! Every variant is a deterministic function of the input data. Nothing here is
//! transient, so callers must not retry.

use thiserror::Error;

use tallyforge_core::{ConversionEdgeId, DomainError, UnitGroupId, UnitId};

pub type UomResult<T> = Result<T, UomError>;

/// Failure reported by a [`crate::registry::UomRegistry`] implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("storage error: {0}")]
    Storage(String),

    /// Another active general edge already exists for this unit.
    #[error("an active general conversion already exists for unit {0}")]
    DuplicateEdge(UnitId),

    /// The store refused a write (duplicate code, broken invariant).
    #[error(transparent)]
    Rejected(#[from] DomainError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UomError {
    /// Both units are in the same group but the graph does not connect them.
    #[error("no conversion path from unit {from} to unit {to}")]
    NoConversionPath { from: UnitId, to: UnitId },

    /// The units belong to different unit groups.
    #[error("units {from} and {to} belong to different unit groups")]
    IncompatibleGroup { from: UnitId, to: UnitId },

    /// Conversion or edge registration attempted on a group without a base unit.
    #[error("unit group {0} has no base unit")]
    MissingBaseUnit(UnitGroupId),

    #[error("unit {0} does not belong to a unit group")]
    UngroupedUnit(UnitId),

    #[error("unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("unit group not found: {0}")]
    GroupNotFound(UnitGroupId),

    #[error("conversion edge not found: {0}")]
    EdgeNotFound(ConversionEdgeId),

    /// An active general edge for this unit already exists in the tenant.
    #[error("an active general conversion already exists for unit {0}")]
    DuplicateEdge(UnitId),

    #[error("decimal overflow converting from unit {from} to unit {to}")]
    Overflow { from: UnitId, to: UnitId },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

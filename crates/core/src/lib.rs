//! `tallyforge-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no storage concerns):
//! identifiers, the domain error model and the entity/value-object traits the
//! unit-of-measure and numbering crates build on.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ConversionEdgeId, ItemId, TenantId, UnitGroupId, UnitId, VariantId};
pub use value_object::ValueObject;

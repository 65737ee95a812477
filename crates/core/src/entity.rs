//! Identity of registry records.
//!
//! Units, unit groups and conversion edges keep their id while codes, names,
//! factors and precisions change underneath them.

/// A record that is looked up and replaced by id.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}

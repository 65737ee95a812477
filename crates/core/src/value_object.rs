//! Value object trait: equality by value, not identity.
//!
//! Conversion factors and rounding precisions are value objects: two factors
//! holding the same decimal are interchangeable wherever they appear.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To
/// "modify" one, construct a new value.
///
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// struct Factor(Decimal);
///
/// impl ValueObject for Factor {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

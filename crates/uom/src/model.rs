//! Unit-of-measure data model: units, unit groups and stored conversion edges.
//!
//! Records are owned by an external registry; this module only carries their
//! shape and the invariants that can be checked on a single record.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};

use tallyforge_core::{
    ConversionEdgeId, DomainError, DomainResult, Entity, ItemId, TenantId, UnitGroupId, UnitId,
    ValueObject, VariantId,
};

use crate::error::{UomError, UomResult};

/// Multiplicative conversion factor: how many base units make one `from_unit`.
///
/// Always strictly positive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Factor(Decimal);

impl Factor {
    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "conversion factor must be positive (got {value})"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    /// Factor of the reverse arc (`base -> from`). `None` only if `1 / f` overflows.
    pub fn reciprocal(self) -> Option<Decimal> {
        Decimal::ONE.checked_div(self.0)
    }
}

impl ValueObject for Factor {}

impl TryFrom<Decimal> for Factor {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Factor> for Decimal {
    fn from(value: Factor) -> Self {
        value.0
    }
}

/// Rounding quantum of a unit. Converted quantities are snapped to a multiple of it.
///
/// `0` disables rounding.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Precision(Decimal);

impl Precision {
    pub const NONE: Self = Self(Decimal::ZERO);

    pub fn new(quantum: Decimal) -> DomainResult<Self> {
        if quantum.is_sign_negative() && !quantum.is_zero() {
            return Err(DomainError::validation(format!(
                "rounding precision cannot be negative (got {quantum})"
            )));
        }
        Ok(Self(quantum))
    }

    pub fn quantum(self) -> Decimal {
        self.0
    }

    /// Round half-up (away from zero) to the nearest multiple of the quantum.
    ///
    /// Power-of-ten quanta (`1`, `0.1`, `0.001`, ...) round by decimal places and
    /// keep the quantum's scale, so `5` at `0.000001` renders as `5.000000`.
    /// Returns `None` if an intermediate step overflows.
    pub fn round(self, value: Decimal) -> Option<Decimal> {
        if self.0.is_zero() {
            return Some(value);
        }

        let quantum = self.0.normalize();
        if quantum.mantissa() == 1 {
            let scale = quantum.scale();
            let mut rounded =
                value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(scale);
            return Some(rounded);
        }

        value
            .checked_div(quantum)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(quantum)
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::NONE
    }
}

impl ValueObject for Precision {}

impl TryFrom<Decimal> for Precision {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Precision> for Decimal {
    fn from(value: Precision) -> Self {
        value.0
    }
}

/// Normalize a unit or group code: trimmed, upper-cased, non-empty.
pub fn normalize_code(raw: &str) -> DomainResult<String> {
    let code = raw.trim().to_uppercase();
    if code.is_empty() {
        return Err(DomainError::validation("code cannot be empty"));
    }
    Ok(code)
}

fn deserialize_code<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    normalize_code(&raw).map_err(serde::de::Error::custom)
}

/// A unit of measure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub tenant_id: TenantId,
    #[serde(deserialize_with = "deserialize_code")]
    code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub precision: Precision,
    #[serde(default)]
    pub group_id: Option<UnitGroupId>,
}

impl Unit {
    pub fn new(
        id: UnitId,
        tenant_id: TenantId,
        code: &str,
        precision: Precision,
    ) -> DomainResult<Self> {
        let code = normalize_code(code)?;
        Ok(Self {
            id,
            tenant_id,
            name: code.clone(),
            code,
            precision,
            group_id: None,
        })
    }

    pub fn in_group(mut self, group_id: UnitGroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Group of the unit, or `UngroupedUnit` if it has none.
    pub fn require_group(&self) -> UomResult<UnitGroupId> {
        self.group_id.ok_or(UomError::UngroupedUnit(self.id))
    }
}

impl Entity for Unit {
    type Id = UnitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A family of mutually convertible units anchored on one base unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitGroup {
    pub id: UnitGroupId,
    pub tenant_id: TenantId,
    #[serde(deserialize_with = "deserialize_code")]
    code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    base_unit: Option<UnitId>,
    #[serde(default = "default_true")]
    pub allow_decimal: bool,
}

fn default_true() -> bool {
    true
}

impl UnitGroup {
    pub fn new(id: UnitGroupId, tenant_id: TenantId, code: &str) -> DomainResult<Self> {
        let code = normalize_code(code)?;
        Ok(Self {
            id,
            tenant_id,
            name: code.clone(),
            code,
            base_unit: None,
            allow_decimal: true,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn whole_numbers_only(mut self) -> Self {
        self.allow_decimal = false;
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn base_unit(&self) -> Option<UnitId> {
        self.base_unit
    }

    /// Designate `unit` as the base unit. The unit must already belong to this group.
    pub fn assign_base_unit(&mut self, unit: &Unit) -> DomainResult<()> {
        if unit.group_id != Some(self.id) {
            return Err(DomainError::invariant(format!(
                "base unit {} does not belong to unit group {}",
                unit.code(),
                self.code
            )));
        }
        if unit.tenant_id != self.tenant_id {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        self.base_unit = Some(unit.id);
        Ok(())
    }

    /// Copy of the group with no base unit designated.
    pub fn without_base_unit(&self) -> Self {
        Self {
            base_unit: None,
            ..self.clone()
        }
    }

    pub fn require_base_unit(&self) -> UomResult<UnitId> {
        self.base_unit.ok_or(UomError::MissingBaseUnit(self.id))
    }

    /// Reject fractional quantities for whole-number groups (pieces, boxes, ...).
    pub fn check_quantity(&self, quantity: Decimal) -> DomainResult<()> {
        if !self.allow_decimal && !quantity.fract().is_zero() {
            return Err(DomainError::validation(format!(
                "unit group {} only accepts whole quantities (got {quantity})",
                self.code
            )));
        }
        Ok(())
    }
}

impl Entity for UnitGroup {
    type Id = UnitGroupId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Stored conversion fact: `1 from_unit = factor × base unit` of the unit's group.
///
/// Edges scoped to an item or variant are overrides applied by the item layer and
/// never take part in the general graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionEdge {
    pub id: ConversionEdgeId,
    pub tenant_id: TenantId,
    pub from_unit: UnitId,
    pub factor: Factor,
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl ConversionEdge {
    pub fn general(
        id: ConversionEdgeId,
        tenant_id: TenantId,
        from_unit: UnitId,
        factor: Factor,
    ) -> Self {
        Self {
            id,
            tenant_id,
            from_unit,
            factor,
            item_id: None,
            variant_id: None,
            active: true,
        }
    }

    pub fn for_item(mut self, item_id: ItemId, variant_id: Option<VariantId>) -> Self {
        self.item_id = Some(item_id);
        self.variant_id = variant_id;
        self
    }

    /// Not scoped to any item or variant.
    pub fn is_general(&self) -> bool {
        self.item_id.is_none() && self.variant_id.is_none()
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

impl Entity for ConversionEdge {
    type Id = ConversionEdgeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

//! Quantity and unit-price conversion over a built graph.

use rust_decimal::Decimal;

use crate::error::{UomError, UomResult};
use crate::graph::ConversionGraph;
use crate::model::{Precision, Unit};

/// Applies conversion paths to quantities and rounds to the target unit.
#[derive(Debug, Clone, Copy)]
pub struct QuantityConverter<'g> {
    graph: &'g ConversionGraph,
}

impl<'g> QuantityConverter<'g> {
    pub fn new(graph: &'g ConversionGraph) -> Self {
        Self { graph }
    }

    /// Convert `quantity` expressed in `from` into `to`.
    ///
    /// The same unit on both sides only rounds to that unit's precision. Otherwise
    /// the hop factors are applied in path order and the result is rounded
    /// half-up to `to`'s precision.
    pub fn calculate(&self, from: &Unit, to: &Unit, quantity: Decimal) -> UomResult<Decimal> {
        if from.id == to.id {
            return from.precision.round(quantity).ok_or(UomError::Overflow {
                from: from.id,
                to: to.id,
            });
        }

        ensure_same_group(from, to)?;

        let path = self
            .graph
            .find_path(from.id, to.id)
            .ok_or(UomError::NoConversionPath {
                from: from.id,
                to: to.id,
            })?;

        path.apply(quantity)
            .and_then(|raw| to.precision.round(raw))
            .ok_or(UomError::Overflow {
                from: from.id,
                to: to.id,
            })
    }

    /// Re-express a price per `from` unit as a price per `to` unit.
    ///
    /// One `to` unit holds `factor(to -> from)` `from` units, so the price scales
    /// by that factor. The result is rounded to the currency `precision`.
    pub fn convert_unit_price(
        &self,
        from: &Unit,
        to: &Unit,
        price: Decimal,
        precision: Precision,
    ) -> UomResult<Decimal> {
        let overflow = UomError::Overflow {
            from: from.id,
            to: to.id,
        };

        if from.id == to.id {
            return precision.round(price).ok_or(overflow);
        }

        ensure_same_group(from, to)?;

        let path = self
            .graph
            .find_path(to.id, from.id)
            .ok_or(UomError::NoConversionPath {
                from: from.id,
                to: to.id,
            })?;

        path.apply(price)
            .and_then(|raw| precision.round(raw))
            .ok_or(overflow)
    }
}

fn ensure_same_group(from: &Unit, to: &Unit) -> UomResult<()> {
    match (from.group_id, to.group_id) {
        (Some(a), Some(b)) if a == b => Ok(()),
        (None, _) => Err(UomError::UngroupedUnit(from.id)),
        (_, None) => Err(UomError::UngroupedUnit(to.id)),
        _ => Err(UomError::IncompatibleGroup {
            from: from.id,
            to: to.id,
        }),
    }
}

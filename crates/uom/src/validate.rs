//! Pre-flight conversion checks: group membership, then path existence.

use serde::Serialize;

use crate::error::{UomError, UomResult};
use crate::graph::ConversionGraph;
use crate::model::Unit;

/// Outcome of a chain validation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainCheck {
    Valid,
    DifferentGroups,
    Ungrouped,
    NoPath,
}

impl ChainCheck {
    pub fn is_valid(self) -> bool {
        self == ChainCheck::Valid
    }

    /// Human-readable failure reason; empty when valid.
    pub fn reason(self) -> &'static str {
        match self {
            ChainCheck::Valid => "",
            ChainCheck::DifferentGroups => "different groups",
            ChainCheck::Ungrouped => "unit has no group",
            ChainCheck::NoPath => "no path",
        }
    }

    /// `(is_valid, reason)` pair for callers that render validation messages.
    pub fn as_tuple(self) -> (bool, &'static str) {
        (self.is_valid(), self.reason())
    }

    /// Group-membership half of the check; needs no graph.
    pub fn of_groups(from: &Unit, to: &Unit) -> Self {
        if from.group_id != to.group_id {
            ChainCheck::DifferentGroups
        } else if from.group_id.is_none() {
            ChainCheck::Ungrouped
        } else {
            ChainCheck::Valid
        }
    }

    /// Turn a failed check into the matching typed error.
    pub fn into_result(self, from: &Unit, to: &Unit) -> UomResult<()> {
        match self {
            ChainCheck::Valid => Ok(()),
            ChainCheck::DifferentGroups => Err(UomError::IncompatibleGroup {
                from: from.id,
                to: to.id,
            }),
            ChainCheck::Ungrouped => Err(UomError::UngroupedUnit(if from.group_id.is_none() {
                from.id
            } else {
                to.id
            })),
            ChainCheck::NoPath => Err(UomError::NoConversionPath {
                from: from.id,
                to: to.id,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChainValidator<'g> {
    graph: &'g ConversionGraph,
}

impl<'g> ChainValidator<'g> {
    pub fn new(graph: &'g ConversionGraph) -> Self {
        Self { graph }
    }

    pub fn validate_conversion(&self, from: &Unit, to: &Unit) -> ChainCheck {
        let groups = ChainCheck::of_groups(from, to);
        if !groups.is_valid() {
            return groups;
        }
        if self.graph.find_path(from.id, to.id).is_none() {
            return ChainCheck::NoPath;
        }
        ChainCheck::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConversionEdge, Factor, Precision, UnitGroup};
    use rust_decimal::Decimal;
    use tallyforge_core::{ConversionEdgeId, TenantId, UnitGroupId, UnitId};

    fn setup() -> (ConversionGraph, Unit, Unit, Unit) {
        let tenant_id = TenantId::new();
        let mut group = UnitGroup::new(UnitGroupId::new(), tenant_id, "volume").unwrap();
        let litre = Unit::new(UnitId::new(), tenant_id, "l", Precision::NONE)
            .unwrap()
            .in_group(group.id);
        let ml = Unit::new(UnitId::new(), tenant_id, "ml", Precision::NONE)
            .unwrap()
            .in_group(group.id);
        let barrel = Unit::new(UnitId::new(), tenant_id, "bbl", Precision::NONE)
            .unwrap()
            .in_group(group.id);
        group.assign_base_unit(&litre).unwrap();

        let edges = [ConversionEdge::general(
            ConversionEdgeId::new(),
            tenant_id,
            ml.id,
            Factor::new(Decimal::new(1, 3)).unwrap(),
        )];
        (ConversionGraph::build(tenant_id, &group, &edges), litre, ml, barrel)
    }

    #[test]
    fn connected_units_are_valid() {
        let (graph, litre, ml, _) = setup();
        assert_eq!(
            ChainValidator::new(&graph)
                .validate_conversion(&ml, &litre)
                .as_tuple(),
            (true, "")
        );
    }

    #[test]
    fn different_groups_fail_before_path_search() {
        let (graph, litre, _, _) = setup();
        let metre = Unit::new(UnitId::new(), litre.tenant_id, "m", Precision::NONE)
            .unwrap()
            .in_group(UnitGroupId::new());

        let check = ChainValidator::new(&graph).validate_conversion(&litre, &metre);
        assert_eq!(check.as_tuple(), (false, "different groups"));
        assert_eq!(
            check.into_result(&litre, &metre),
            Err(UomError::IncompatibleGroup { from: litre.id, to: metre.id })
        );
    }

    #[test]
    fn same_group_without_edge_has_no_path() {
        let (graph, litre, _, barrel) = setup();
        let check = ChainValidator::new(&graph).validate_conversion(&barrel, &litre);
        assert_eq!(check.as_tuple(), (false, "no path"));
    }

    #[test]
    fn ungrouped_units_are_reported() {
        let (graph, litre, _, _) = setup();
        let a = Unit::new(UnitId::new(), litre.tenant_id, "a", Precision::NONE).unwrap();
        let b = Unit::new(UnitId::new(), litre.tenant_id, "b", Precision::NONE).unwrap();

        let check = ChainValidator::new(&graph).validate_conversion(&a, &b);
        assert_eq!(check, ChainCheck::Ungrouped);
        assert_eq!(check.into_result(&a, &b), Err(UomError::UngroupedUnit(a.id)));
    }
}

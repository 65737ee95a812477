//! Breadth-first path finding over a [`ConversionGraph`].

use std::collections::VecDeque;

use rust_decimal::Decimal;

use tallyforge_core::UnitId;

use crate::graph::{ConversionGraph, NodeIx};

/// One unit on a conversion path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub unit: UnitId,
    /// Factor of the hop that reached this unit (`1` for the starting unit).
    pub factor: Decimal,
    /// Product of all hop factors up to and including this step.
    pub cumulative: Decimal,
}

/// Ordered list of units from the source to the target unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPath {
    steps: Vec<PathStep>,
}

impl ConversionPath {
    pub fn identity(unit: UnitId) -> Self {
        Self {
            steps: vec![PathStep {
                unit,
                factor: Decimal::ONE,
                cumulative: Decimal::ONE,
            }],
        }
    }

    fn from_hops(source: UnitId, hops: impl IntoIterator<Item = (UnitId, Decimal)>) -> Self {
        let mut path = Self::identity(source);
        for (unit, factor) in hops {
            let cumulative = path.cumulative_factor().saturating_mul(factor);
            path.steps.push(PathStep {
                unit,
                factor,
                cumulative,
            });
        }
        path
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn units(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.steps.iter().map(|s| s.unit)
    }

    /// Number of arcs traversed.
    pub fn hops(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn source(&self) -> UnitId {
        self.steps[0].unit
    }

    pub fn target(&self) -> UnitId {
        self.steps[self.steps.len() - 1].unit
    }

    /// Informational only; conversions apply hop factors one by one.
    pub fn cumulative_factor(&self) -> Decimal {
        self.steps[self.steps.len() - 1].cumulative
    }

    /// Multiply `quantity` through every hop in order, at full precision.
    ///
    /// Returns `None` on decimal overflow.
    pub fn apply(&self, quantity: Decimal) -> Option<Decimal> {
        self.steps
            .iter()
            .skip(1)
            .try_fold(quantity, |acc, step| acc.checked_mul(step.factor))
    }
}

/// Shortest (fewest hops) path search.
///
/// Neighbours are explored in arc insertion order and a node's predecessor is
/// the first node that discovered it, so ties between equal-length paths always
/// resolve the same way for the same edge order.
#[derive(Debug, Clone, Copy)]
pub struct PathFinder<'g> {
    graph: &'g ConversionGraph,
}

impl<'g> PathFinder<'g> {
    pub fn new(graph: &'g ConversionGraph) -> Self {
        Self { graph }
    }

    /// `None` when either unit is absent from the graph or the units are not connected.
    pub fn find_path(&self, from: UnitId, to: UnitId) -> Option<ConversionPath> {
        if from == to {
            return Some(ConversionPath::identity(from));
        }

        let source = self.graph.node(from)?;
        let target = self.graph.node(to)?;

        let n = self.graph.node_count();
        let mut visited = vec![false; n];
        let mut predecessor: Vec<Option<(NodeIx, Decimal)>> = vec![None; n];
        let mut queue = VecDeque::new();

        visited[source.index()] = true;
        queue.push_back(source);

        while let Some(node) = queue.pop_front() {
            for arc in self.graph.arcs(node) {
                let next = arc.to;
                if visited[next.index()] {
                    continue;
                }
                visited[next.index()] = true;
                predecessor[next.index()] = Some((node, arc.factor));

                if next == target {
                    return Some(self.reconstruct(source, target, &predecessor));
                }
                queue.push_back(next);
            }
        }

        None
    }

    fn reconstruct(
        &self,
        source: NodeIx,
        target: NodeIx,
        predecessor: &[Option<(NodeIx, Decimal)>],
    ) -> ConversionPath {
        let mut hops = Vec::new();
        let mut current = target;
        while current != source {
            let Some((prev, factor)) = predecessor[current.index()] else {
                break;
            };
            hops.push((self.graph.unit(current), factor));
            current = prev;
        }
        hops.reverse();
        ConversionPath::from_hops(self.graph.unit(source), hops)
    }
}

impl ConversionGraph {
    pub fn find_path(&self, from: UnitId, to: UnitId) -> Option<ConversionPath> {
        PathFinder::new(self).find_path(from, to)
    }
}

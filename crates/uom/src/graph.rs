//! Conversion graph: an arena of unit nodes with decimal-weighted arcs.
//!
//! Built wholesale from the stored edges of one unit group in one tenant and
//! never mutated afterwards. Every stored edge `from -> base` (factor `f`)
//! materialises two arcs: `from -> base` with `f` and `base -> from` with `1 / f`.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use tallyforge_core::{TenantId, UnitGroupId, UnitId};

use crate::model::{ConversionEdge, UnitGroup};

/// Dense node index into a [`ConversionGraph`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIx(u32);

impl NodeIx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Directed, weighted arc: `1 source unit = factor × target unit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionArc {
    pub to: NodeIx,
    pub factor: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionGraph {
    tenant_id: TenantId,
    group_id: UnitGroupId,
    base_unit: Option<UnitId>,
    index: HashMap<UnitId, NodeIx>,
    units: Vec<UnitId>,
    adjacency: Vec<Vec<ConversionArc>>,
}

impl ConversionGraph {
    /// A graph with no nodes: only identity conversions are possible.
    pub fn empty(tenant_id: TenantId, group_id: UnitGroupId) -> Self {
        Self {
            tenant_id,
            group_id,
            base_unit: None,
            index: HashMap::new(),
            units: Vec::new(),
            adjacency: Vec::new(),
        }
    }

    /// Build the general conversion graph of `group` for `tenant_id`.
    ///
    /// Only active, general (not item/variant scoped) edges of the tenant are
    /// used. Arcs are inserted in edge order, which fixes the breadth-first
    /// tie-breaking of the path finder. A group without a base unit yields an
    /// empty graph.
    pub fn build(tenant_id: TenantId, group: &UnitGroup, edges: &[ConversionEdge]) -> Self {
        let mut graph = Self::empty(tenant_id, group.id);

        let Some(base) = group.base_unit() else {
            if !edges.is_empty() {
                warn!(
                    tenant_id = %tenant_id,
                    group_id = %group.id,
                    edges = edges.len(),
                    "unit group has no base unit; conversion edges ignored"
                );
            }
            return graph;
        };

        graph.base_unit = Some(base);
        let base_ix = graph.intern(base);

        for edge in edges {
            if edge.tenant_id != tenant_id || !edge.active || !edge.is_general() {
                continue;
            }
            if edge.from_unit == base {
                warn!(edge_id = %edge.id, "skipping self-loop conversion edge on base unit");
                continue;
            }
            if graph.index.contains_key(&edge.from_unit) {
                warn!(
                    edge_id = %edge.id,
                    from_unit = %edge.from_unit,
                    "skipping duplicate general conversion edge"
                );
                continue;
            }
            let Some(inverse) = edge.factor.reciprocal() else {
                warn!(edge_id = %edge.id, "conversion factor has no representable reciprocal");
                continue;
            };

            let from_ix = graph.intern(edge.from_unit);
            graph.add_arc(from_ix, base_ix, edge.factor.value());
            graph.add_arc(base_ix, from_ix, inverse);
        }

        debug!(
            tenant_id = %tenant_id,
            group_id = %group.id,
            nodes = graph.node_count(),
            arcs = graph.arc_count(),
            "conversion graph built"
        );

        graph
    }

    fn intern(&mut self, unit: UnitId) -> NodeIx {
        if let Some(ix) = self.index.get(&unit) {
            return *ix;
        }
        let ix = NodeIx(self.units.len() as u32);
        self.units.push(unit);
        self.adjacency.push(Vec::new());
        self.index.insert(unit, ix);
        ix
    }

    fn add_arc(&mut self, from: NodeIx, to: NodeIx, factor: Decimal) {
        self.adjacency[from.index()].push(ConversionArc { to, factor });
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn group_id(&self) -> UnitGroupId {
        self.group_id
    }

    pub fn base_unit(&self) -> Option<UnitId> {
        self.base_unit
    }

    pub fn node(&self, unit: UnitId) -> Option<NodeIx> {
        self.index.get(&unit).copied()
    }

    pub fn contains(&self, unit: UnitId) -> bool {
        self.index.contains_key(&unit)
    }

    pub fn unit(&self, node: NodeIx) -> UnitId {
        self.units[node.index()]
    }

    /// Outgoing arcs of `node` in insertion order.
    pub fn arcs(&self, node: NodeIx) -> &[ConversionArc] {
        &self.adjacency[node.index()]
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeIx> + '_ {
        (0..self.units.len()).map(|i| NodeIx(i as u32))
    }

    pub fn units(&self) -> &[UnitId] {
        &self.units
    }

    pub fn node_count(&self) -> usize {
        self.units.len()
    }

    pub fn arc_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    /// True when the graph has no arcs.
    pub fn is_empty(&self) -> bool {
        self.arc_count() == 0
    }
}

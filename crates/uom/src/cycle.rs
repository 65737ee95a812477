//! Depth-first cycle detection over a [`ConversionGraph`].
//!
//! Graphs built from stored edges are bidirectional, so any graph with at least
//! one edge contains the two-node cycle `from -> base -> from` and reports
//! `true`. That is the expected shape of a populated graph. The detector exists
//! to check construction invariants and to catch longer cycles should the graph
//! ever be built one-directionally.

use tallyforge_core::UnitId;

use crate::graph::{ConversionGraph, NodeIx};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

#[derive(Debug, Clone, Copy)]
pub struct CycleDetector<'g> {
    graph: &'g ConversionGraph,
}

impl<'g> CycleDetector<'g> {
    pub fn new(graph: &'g ConversionGraph) -> Self {
        Self { graph }
    }

    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// First cycle found, as the units on the recursion stack from the back-edge
    /// target to the node that closed it.
    pub fn find_cycle(&self) -> Option<Vec<UnitId>> {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];

        for start in self.graph.nodes() {
            if marks[start.index()] != Mark::Unvisited {
                continue;
            }

            // (node, index of the next arc to explore)
            let mut stack: Vec<(NodeIx, usize)> = vec![(start, 0)];
            marks[start.index()] = Mark::OnStack;

            while let Some(&(node, cursor)) = stack.last() {
                let arcs = self.graph.arcs(node);
                if cursor == arcs.len() {
                    marks[node.index()] = Mark::Done;
                    stack.pop();
                    continue;
                }

                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }

                let next = arcs[cursor].to;
                match marks[next.index()] {
                    Mark::OnStack => {
                        let from = stack.iter().position(|(n, _)| *n == next).unwrap_or(0);
                        return Some(
                            stack[from..]
                                .iter()
                                .map(|(n, _)| self.graph.unit(*n))
                                .collect(),
                        );
                    }
                    Mark::Unvisited => {
                        marks[next.index()] = Mark::OnStack;
                        stack.push((next, 0));
                    }
                    Mark::Done => {}
                }
            }
        }

        None
    }
}

impl ConversionGraph {
    pub fn has_cycle(&self) -> bool {
        CycleDetector::new(self).has_cycle()
    }
}

//! The pipeline dependency graph as data.

use thiserror::Error;

use crate::stage::StageId;

/// One node and its predecessors.
#[derive(Debug, Clone)]
pub struct StageNode {
    pub id: StageId,
    pub depends_on: Vec<StageId>,
}

impl StageNode {
    fn new(id: StageId, depends_on: &[StageId]) -> Self {
        Self {
            id,
            depends_on: depends_on.to_vec(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("stage '{0}' is declared more than once")]
    DuplicateStage(StageId),
    #[error("stage '{stage}' depends on '{dependency}', which is not in the graph")]
    UnknownDependency {
        stage: StageId,
        dependency: StageId,
    },
    #[error("dependency cycle involving stage '{0}'")]
    Cycle(StageId),
}

/// A validated DAG of stages. Construction checks for duplicate nodes,
/// unknown dependencies, and cycles; the topological execution order is
/// fixed at that point.
#[derive(Debug, Clone)]
pub struct StageGraph {
    nodes: Vec<StageNode>,
    order: Vec<StageId>,
}

impl StageGraph {
    /// Builds a graph from explicit nodes.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if a node is declared twice, a dependency
    /// names a node outside the graph, or the edges form a cycle.
    pub fn new(nodes: Vec<StageNode>) -> Result<Self, GraphError> {
        let mut ids = std::collections::HashSet::new();
        for node in &nodes {
            if !ids.insert(node.id) {
                return Err(GraphError::DuplicateStage(node.id));
            }
        }
        for node in &nodes {
            for dep in &node.depends_on {
                if !ids.contains(dep) {
                    return Err(GraphError::UnknownDependency {
                        stage: node.id,
                        dependency: *dep,
                    });
                }
            }
        }

        let order = topological_order(&nodes)?;
        Ok(Self { nodes, order })
    }

    /// The fixed ingestion pipeline:
    ///
    /// ```text
    /// harvest ─┬─► load-messages ──┬─► transform ─► validate
    ///          └─► detect ─► load-detections ─┘
    /// ```
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            StageNode::new(StageId::Harvest, &[]),
            StageNode::new(StageId::LoadMessages, &[StageId::Harvest]),
            StageNode::new(StageId::Detect, &[StageId::Harvest]),
            StageNode::new(StageId::LoadDetections, &[StageId::Detect]),
            StageNode::new(
                StageId::Transform,
                &[StageId::LoadMessages, StageId::LoadDetections],
            ),
            StageNode::new(StageId::Validate, &[StageId::Transform]),
        ])
        .expect("standard pipeline graph is acyclic")
    }

    /// Stage ids in dependency-respecting execution order.
    #[must_use]
    pub fn execution_order(&self) -> &[StageId] {
        &self.order
    }

    /// Direct predecessors of a stage; empty for roots and unknown ids.
    #[must_use]
    pub fn dependencies_of(&self, id: StageId) -> &[StageId] {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .map_or(&[], |n| n.depends_on.as_slice())
    }
}

/// Kahn-style ordering that keeps declaration order among ready nodes,
/// so the same graph always executes the same way.
fn topological_order(nodes: &[StageNode]) -> Result<Vec<StageId>, GraphError> {
    let mut order = Vec::with_capacity(nodes.len());
    let mut placed = std::collections::HashSet::new();

    while order.len() < nodes.len() {
        let mut advanced = false;
        for node in nodes {
            if placed.contains(&node.id) {
                continue;
            }
            if node.depends_on.iter().all(|d| placed.contains(d)) {
                placed.insert(node.id);
                order.push(node.id);
                advanced = true;
            }
        }
        if !advanced {
            let stuck = nodes
                .iter()
                .find(|n| !placed.contains(&n.id))
                .map_or(StageId::Harvest, |n| n.id);
            return Err(GraphError::Cycle(stuck));
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_graph_has_all_six_stages_in_dependency_order() {
        let graph = StageGraph::standard();
        let order = graph.execution_order();

        assert_eq!(order.len(), 6);
        for id in StageId::ALL {
            assert!(order.contains(&id), "missing {id}");
        }

        let position = |id: StageId| order.iter().position(|&s| s == id).unwrap();
        assert_eq!(position(StageId::Harvest), 0);
        assert!(position(StageId::LoadMessages) > position(StageId::Harvest));
        assert!(position(StageId::Detect) > position(StageId::Harvest));
        assert!(position(StageId::LoadDetections) > position(StageId::Detect));
        assert!(position(StageId::Transform) > position(StageId::LoadMessages));
        assert!(position(StageId::Transform) > position(StageId::LoadDetections));
        assert!(position(StageId::Validate) > position(StageId::Transform));
    }

    #[test]
    fn standard_graph_edges_match_the_pipeline_shape() {
        let graph = StageGraph::standard();

        assert!(graph.dependencies_of(StageId::Harvest).is_empty());
        assert_eq!(graph.dependencies_of(StageId::LoadMessages), [StageId::Harvest]);
        assert_eq!(graph.dependencies_of(StageId::Detect), [StageId::Harvest]);
        assert_eq!(
            graph.dependencies_of(StageId::LoadDetections),
            [StageId::Detect]
        );
        assert_eq!(
            graph.dependencies_of(StageId::Transform),
            [StageId::LoadMessages, StageId::LoadDetections]
        );
        assert_eq!(graph.dependencies_of(StageId::Validate), [StageId::Transform]);
    }

    #[test]
    fn rejects_duplicate_nodes() {
        let err = StageGraph::new(vec![
            StageNode::new(StageId::Harvest, &[]),
            StageNode::new(StageId::Harvest, &[]),
        ])
        .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateStage(StageId::Harvest)));
    }

    #[test]
    fn rejects_dependency_on_missing_node() {
        let err = StageGraph::new(vec![StageNode::new(
            StageId::Transform,
            &[StageId::LoadMessages],
        )])
        .unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnknownDependency {
                stage: StageId::Transform,
                dependency: StageId::LoadMessages,
            }
        ));
    }

    #[test]
    fn rejects_cycles() {
        let err = StageGraph::new(vec![
            StageNode::new(StageId::Transform, &[StageId::Validate]),
            StageNode::new(StageId::Validate, &[StageId::Transform]),
        ])
        .unwrap_err();
        assert!(matches!(err, GraphError::Cycle(_)));
    }
}

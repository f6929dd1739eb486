//! Plan Tree Model - canonical plan nodes and the query plan envelope
//!
//! A canonical plan is a tree of [`PlanNode`]s. Leaves and inner nodes are
//! distinct variants: a node is a leaf exactly when its raw source node had
//! no extractable children. Every [`QueryPlan`] is rooted at a synthetic
//! `Result` operator with id `-1` whose single child is the top-level
//! operator reported by the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::operator::{OperatorType, QueryOperator};

/// Estimated (planner guess) and exact (observed) row counts of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cardinality {
    pub estimated: Option<u64>,
    pub exact: Option<u64>,
}

impl Cardinality {
    /// Builds a cardinality, filling a missing side from the other one
    pub fn new(estimated: Option<u64>, exact: Option<u64>) -> Self {
        Self {
            estimated: estimated.or(exact),
            exact: exact.or(estimated),
        }
    }
}

/// A plan node without children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafNode {
    pub operator: QueryOperator,
    pub estimated_cardinality: Option<u64>,
    pub exact_cardinality: Option<u64>,
    /// Opaque engine-native snapshot of the raw node, for debugging only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_representation: Option<Value>,
}

impl LeafNode {
    pub fn new(
        operator: QueryOperator,
        cardinality: Cardinality,
        system_representation: Option<Value>,
    ) -> Self {
        Self {
            operator,
            estimated_cardinality: cardinality.estimated,
            exact_cardinality: cardinality.exact,
            system_representation,
        }
    }
}

/// A plan node with an ordered, non-empty list of children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnerNode {
    pub operator: QueryOperator,
    pub estimated_cardinality: Option<u64>,
    pub exact_cardinality: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_representation: Option<Value>,
    pub children: Vec<PlanNode>,
}

impl InnerNode {
    pub fn new(
        operator: QueryOperator,
        cardinality: Cardinality,
        children: Vec<PlanNode>,
        system_representation: Option<Value>,
    ) -> Self {
        Self {
            operator,
            estimated_cardinality: cardinality.estimated,
            exact_cardinality: cardinality.exact,
            system_representation,
            children,
        }
    }
}

/// A node of the canonical plan tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum PlanNode {
    Leaf(LeafNode),
    Inner(InnerNode),
}

impl PlanNode {
    /// Builds a leaf when `children` is empty, an inner node otherwise
    pub fn from_parts(
        operator: QueryOperator,
        cardinality: Cardinality,
        children: Vec<PlanNode>,
        system_representation: Option<Value>,
    ) -> Self {
        if children.is_empty() {
            Self::Leaf(LeafNode::new(operator, cardinality, system_representation))
        } else {
            Self::Inner(InnerNode::new(
                operator,
                cardinality,
                children,
                system_representation,
            ))
        }
    }

    pub fn operator(&self) -> &QueryOperator {
        match self {
            Self::Leaf(node) => &node.operator,
            Self::Inner(node) => &node.operator,
        }
    }

    pub(crate) fn operator_mut(&mut self) -> &mut QueryOperator {
        match self {
            Self::Leaf(node) => &mut node.operator,
            Self::Inner(node) => &mut node.operator,
        }
    }

    /// Returns the canonical kind of this node's operator
    pub fn operator_type(&self) -> OperatorType {
        self.operator().operator_type()
    }

    pub fn estimated_cardinality(&self) -> Option<u64> {
        match self {
            Self::Leaf(node) => node.estimated_cardinality,
            Self::Inner(node) => node.estimated_cardinality,
        }
    }

    pub fn exact_cardinality(&self) -> Option<u64> {
        match self {
            Self::Leaf(node) => node.exact_cardinality,
            Self::Inner(node) => node.exact_cardinality,
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        Cardinality {
            estimated: self.estimated_cardinality(),
            exact: self.exact_cardinality(),
        }
    }

    pub fn system_representation(&self) -> Option<&Value> {
        match self {
            Self::Leaf(node) => node.system_representation.as_ref(),
            Self::Inner(node) => node.system_representation.as_ref(),
        }
    }

    /// Returns the children (empty for leaves)
    pub fn children(&self) -> &[PlanNode] {
        match self {
            Self::Leaf(_) => &[],
            Self::Inner(node) => &node.children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Returns the total number of nodes in this subtree (including self)
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Returns the maximum depth of this subtree
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            stack.extend(node.children().iter().map(|child| (child, depth + 1)));
        }
        max_depth
    }

    /// Returns a pre-order iterator over this subtree
    pub fn iter(&self) -> PlanNodeIterator<'_> {
        PlanNodeIterator::new(self)
    }
}

/// A canonical plan: the query text and the synthetic `Result` root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub text: String,
    pub plan: PlanNode,
}

impl QueryPlan {
    /// Wraps the engine's top-level node into the sentinel `Result` root.
    ///
    /// The root reports the same cardinalities as its child.
    pub fn new(
        text: impl Into<String>,
        top: PlanNode,
        system_representation: Option<Value>,
    ) -> Self {
        let cardinality = top.cardinality();
        let root = InnerNode::new(
            QueryOperator::result(),
            cardinality,
            vec![top],
            system_representation,
        );
        Self {
            text: text.into(),
            plan: PlanNode::Inner(root),
        }
    }

    /// Returns the real top-level operator below the `Result` root
    pub fn top(&self) -> Option<&PlanNode> {
        self.plan.children().first()
    }

    /// Returns an iterator over all nodes in the plan (pre-order, root first)
    pub fn iter_nodes(&self) -> PlanNodeIterator<'_> {
        self.plan.iter()
    }

    /// Finds all nodes of a given operator kind
    pub fn find_operators(&self, operator_type: OperatorType) -> Vec<&PlanNode> {
        self.iter_nodes()
            .filter(|node| node.operator_type() == operator_type)
            .collect()
    }

    /// Encodes the plan as a JSON value
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Iterator for traversing plan nodes depth-first
pub struct PlanNodeIterator<'a> {
    stack: Vec<&'a PlanNode>,
}

impl<'a> PlanNodeIterator<'a> {
    fn new(root: &'a PlanNode) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'a> Iterator for PlanNodeIterator<'a> {
    type Item = &'a PlanNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Push children in reverse order so we visit them in order
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests;

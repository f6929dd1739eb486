//! Parsing Contract - the per-engine driver interface and the shared tree builder
//!
//! An engine parser only answers questions about a single raw node: what are
//! its children, what is it called, which statistics does it carry. The
//! recursive construction of the canonical tree is shared by every engine and
//! lives in [`build_plan_node`]:
//!
//! 1. an operator id is assigned (embedded id when usable, counter otherwise)
//! 2. transparent wrappers with a single child are skipped, childless ones
//!    become a no-op `Map`
//! 3. the operator is created from its name and filled from the raw fields
//! 4. children are built in order
//! 5. a `Limit`/`Top` directly above a `Sort` is folded into the sort
//!
//! Ids are tracked in a per-parse [`BuildContext`], so parser values carry no
//! mutable state and can be shared between threads.

use std::borrow::Cow;
use std::collections::HashSet;

use serde_json::Value;

use crate::config::ParserOptions;
use crate::error::{PlanError, Result};
use crate::operator::{DbmsType, OperatorId, OperatorType, QueryOperator, RESULT_OPERATOR_ID};
use crate::plan::{Cardinality, PlanNode, QueryPlan};

/// System representation attached to the synthetic root when snapshots are requested
pub const RESULT_ROOT_MARKER: &str = "// synthetic result root";

/// Engine-specific view of a raw plan tree
pub trait PlanParser {
    /// One node of the raw plan
    type Node;

    /// Engine whose field maps are used when filling operators
    fn dbms(&self) -> DbmsType;

    fn options(&self) -> &ParserOptions;

    /// Ordered raw children; an empty list makes the node a leaf
    fn extract_children<'a>(&self, node: &'a Self::Node) -> Vec<&'a Self::Node>;

    /// Canonical operator name, `"Unknown"` when the node carries none
    fn extract_operator_name(&self, node: &Self::Node) -> String;

    /// Stable id embedded in the raw node, if the engine provides one
    fn embedded_operator_id(&self, node: &Self::Node) -> Option<OperatorId>;

    fn extract_cardinalities(&self, node: &Self::Node) -> Cardinality;

    /// Selects the operator kind from its name (ordered, first match wins)
    fn create_empty_operator(&self, name: &str, operator_id: OperatorId) -> QueryOperator;

    /// Raw fields handed to [`QueryOperator::fill`]
    fn operator_fields<'a>(&self, node: &'a Self::Node) -> Cow<'a, Value>;

    /// Engine-native debug snapshot of the node, without its children
    fn system_representation(&self, node: &Self::Node) -> Value;

    /// Whether a node with this name only forwards its single input
    fn is_transparent(&self, name: &str) -> bool;

    fn is_leaf(&self, node: &Self::Node) -> bool {
        self.extract_children(node).is_empty()
    }

    /// Builds the canonical plan below the synthetic `Result` root
    fn build_plan(&self, query: &str, root: &Self::Node) -> Result<QueryPlan> {
        let options = self.options();
        let mut context = BuildContext::new(options);
        let top = build_plan_node(self, root, &mut context, 1)?;
        let marker = options
            .include_system_representation
            .then(|| Value::String(RESULT_ROOT_MARKER.to_string()));
        Ok(QueryPlan::new(query, top, marker))
    }
}

/// Mutable state of a single parse
pub(crate) struct BuildContext {
    next_id: OperatorId,
    used_ids: HashSet<OperatorId>,
    include_system_representation: bool,
    max_depth: usize,
}

impl BuildContext {
    pub(crate) fn new(options: &ParserOptions) -> Self {
        Self {
            next_id: 0,
            used_ids: HashSet::new(),
            include_system_representation: options.include_system_representation,
            max_depth: options.max_depth,
        }
    }

    /// Returns the embedded id when it is free, otherwise the next unused counter value
    pub(crate) fn assign_id(&mut self, embedded: Option<OperatorId>) -> OperatorId {
        if let Some(id) = embedded {
            if id != RESULT_OPERATOR_ID && self.used_ids.insert(id) {
                return id;
            }
            tracing::warn!(
                operator_id = id,
                "duplicate or reserved operator id, assigning a new one"
            );
        }

        while self.used_ids.contains(&self.next_id) {
            self.next_id += 1;
        }
        let id = self.next_id;
        self.used_ids.insert(id);
        self.next_id += 1;
        id
    }
}

/// Recursively converts a raw node into a canonical plan node
pub(crate) fn build_plan_node<P: PlanParser + ?Sized>(
    parser: &P,
    node: &P::Node,
    context: &mut BuildContext,
    depth: usize,
) -> Result<PlanNode> {
    if depth > context.max_depth {
        return Err(PlanError::DepthLimitExceeded(context.max_depth));
    }

    let operator_id = context.assign_id(parser.embedded_operator_id(node));
    let name = parser.extract_operator_name(node);
    let children = parser.extract_children(node);

    if parser.is_transparent(&name) {
        match children.as_slice() {
            [child] => {
                tracing::debug!(operator = %name, operator_id, "eliding transparent wrapper");
                return build_plan_node(parser, child, context, depth + 1);
            }
            [] => {
                let system_representation = context
                    .include_system_representation
                    .then(|| parser.system_representation(node));
                return Ok(PlanNode::from_parts(
                    QueryOperator::empty(OperatorType::Map, operator_id),
                    parser.extract_cardinalities(node),
                    Vec::new(),
                    system_representation,
                ));
            }
            _ => {}
        }
    }

    let mut operator = parser.create_empty_operator(&name, operator_id);
    operator.fill(&parser.operator_fields(node), parser.dbms());
    let cardinality = parser.extract_cardinalities(node);
    let system_representation = context
        .include_system_representation
        .then(|| parser.system_representation(node));

    let mut built = children
        .into_iter()
        .map(|child| build_plan_node(parser, child, context, depth + 1))
        .collect::<Result<Vec<_>>>()?;

    if operator.is_limit()
        && built.len() == 1
        && built[0].operator_type() == OperatorType::Sort
        && let Some(mut child) = built.pop()
    {
        if let Some(limit) = operator.limit()
            && let Some(sort) = child.operator_mut().sort_mut()
        {
            sort.limit = Some(limit);
        }
        tracing::debug!(operator_id, limit = ?operator.limit(), "merged limit into sort");
        return Ok(child);
    }

    Ok(PlanNode::from_parts(
        operator,
        cardinality,
        built,
        system_representation,
    ))
}

//! ClickHouse EXPLAIN Parser
//!
//! Parses the output of `EXPLAIN json = 1, actions = 1` (optionally with
//! runtime statistics). The payload may be a bare plan object, wrapped in a
//! `Plan`/`plan` key, or wrapped in a one-element array.
//!
//! # Examples
//!
//! ```
//! use benchy_queryplan::{OperatorType, ParserOptions};
//! use benchy_queryplan::parsers::clickhouse::ClickHouseParser;
//!
//! let json = r#"{"Plan": {"Node Type": "Expression", "Plans": [
//!     {"Node Type": "Aggregating", "Statistics": {"rows": 10}, "Plans": []}
//! ]}}"#;
//!
//! let plan = ClickHouseParser::new(ParserOptions::default())
//!     .parse_str("SELECT count() FROM t", json)
//!     .unwrap();
//! let top = plan.top().unwrap();
//! assert_eq!(top.operator_type(), OperatorType::GroupBy);
//! assert_eq!(top.exact_cardinality(), Some(10));
//! ```

use std::borrow::Cow;

use serde_json::Value;

use crate::config::ParserOptions;
use crate::error::{PlanError, Result};
use crate::fields::{
    coerce_i64, first_array, first_present, first_str, first_u64, without_keys,
};
use crate::operator::{DbmsType, OperatorId, OperatorType, QueryOperator};
use crate::parser::PlanParser;
use crate::plan::{Cardinality, QueryPlan};

const CHILD_KEYS: &[&str] = &["Plans", "plans", "Children", "children", "sources"];
const NAME_KEYS: &[&str] = &[
    "Node Type",
    "NodeType",
    "PlanStep",
    "Plan Node Type",
    "Name",
    "type",
    "Step",
    "plan_node_name",
];
const ID_KEYS: &[&str] = &["PlanNodeId", "Plan Node Id", "PlanNodeID", "NodeId", "Node ID"];
const STATISTICS_KEYS: &[&str] = &["Statistics", "statistics"];
const ESTIMATED_KEYS: &[&str] = &[
    "row_count",
    "estimated_rows",
    "rowCount",
    "rows_before_limit_at_least",
];
const EXACT_KEYS: &[&str] = &["rows", "rows_before_limit", "output_rows"];

/// Parser for ClickHouse JSON plans
#[derive(Debug, Clone, Default)]
pub struct ClickHouseParser {
    options: ParserOptions,
}

impl ClickHouseParser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Parses EXPLAIN JSON text
    pub fn parse_str(&self, query: &str, json: &str) -> Result<QueryPlan> {
        let value: Value = serde_json::from_str(json)?;
        self.parse_json_plan(query, &value)
    }

    /// Parses an already decoded EXPLAIN JSON payload
    #[tracing::instrument(skip_all, fields(dbms = %DbmsType::ClickHouse))]
    pub fn parse_json_plan(&self, query: &str, payload: &Value) -> Result<QueryPlan> {
        let root = unwrap_payload(payload)?;
        self.build_plan(query, root)
    }
}

/// Strips the array and `Plan` envelopes around the root node
fn unwrap_payload(payload: &Value) -> Result<&Value> {
    let unwrapped = unwrap_array(payload)?;
    let root = match first_present(unwrapped, &["Plan", "plan"]) {
        Some(plan) => unwrap_array(plan)?,
        None => unwrapped,
    };
    if root.is_object() {
        Ok(root)
    } else {
        Err(PlanError::MalformedPlan(
            "ClickHouse plan root is not an object".to_string(),
        ))
    }
}

fn unwrap_array(value: &Value) -> Result<&Value> {
    match value {
        Value::Array(items) => items
            .first()
            .ok_or_else(|| PlanError::MalformedPlan("empty ClickHouse plan array".to_string())),
        other => Ok(other),
    }
}

impl PlanParser for ClickHouseParser {
    type Node = Value;

    fn dbms(&self) -> DbmsType {
        DbmsType::ClickHouse
    }

    fn options(&self) -> &ParserOptions {
        &self.options
    }

    fn extract_children<'a>(&self, node: &'a Value) -> Vec<&'a Value> {
        first_array(node, CHILD_KEYS)
            .map(|children| children.iter().filter(|child| child.is_object()).collect())
            .unwrap_or_default()
    }

    fn extract_operator_name(&self, node: &Value) -> String {
        first_str(node, NAME_KEYS).unwrap_or("Unknown").to_string()
    }

    fn embedded_operator_id(&self, node: &Value) -> Option<OperatorId> {
        first_present(node, ID_KEYS).and_then(coerce_i64)
    }

    fn extract_cardinalities(&self, node: &Value) -> Cardinality {
        let Some(statistics) = first_present(node, STATISTICS_KEYS) else {
            return Cardinality::default();
        };
        Cardinality::new(
            first_u64(statistics, ESTIMATED_KEYS),
            first_u64(statistics, EXACT_KEYS),
        )
    }

    fn create_empty_operator(&self, name: &str, operator_id: OperatorId) -> QueryOperator {
        let lower = name.to_lowercase();

        if lower.starts_with("read") {
            QueryOperator::empty(OperatorType::TableScan, operator_id)
        } else if lower.starts_with("aggregating") || lower.starts_with("group") {
            QueryOperator::empty(OperatorType::GroupBy, operator_id)
        } else if lower.starts_with("sorting")
            || lower.contains(" sort")
            || lower.starts_with("order by")
        {
            QueryOperator::empty(OperatorType::Sort, operator_id)
        } else if lower.starts_with("arrayjoin") || lower.starts_with("array join") {
            // must precede the generic join rule
            QueryOperator::empty(OperatorType::ArrayUnnest, operator_id)
        } else if lower.contains("join") {
            QueryOperator::empty(OperatorType::Join, operator_id)
        } else if lower.starts_with("filter") {
            QueryOperator::empty(OperatorType::Select, operator_id)
        } else if lower.starts_with("union")
            || lower.starts_with("intersect")
            || lower.starts_with("except")
        {
            QueryOperator::set_operation(lower, operator_id)
        } else if lower.starts_with("limit") {
            QueryOperator::custom("Limit", operator_id)
        } else if lower.starts_with("window") {
            QueryOperator::empty(OperatorType::Window, operator_id)
        } else if lower.starts_with("projection") || lower.starts_with("expression") {
            QueryOperator::empty(OperatorType::Map, operator_id)
        } else {
            QueryOperator::unsupported(DbmsType::ClickHouse, name, operator_id)
        }
    }

    fn operator_fields<'a>(&self, node: &'a Value) -> Cow<'a, Value> {
        Cow::Borrowed(node)
    }

    fn system_representation(&self, node: &Value) -> Value {
        without_keys(node, CHILD_KEYS)
    }

    fn is_transparent(&self, name: &str) -> bool {
        name.to_lowercase().starts_with("expression")
    }
}

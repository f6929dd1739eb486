//! DuckDB Profile Parser
//!
//! Parses the JSON profiling output (`PRAGMA enable_profiling = 'json'`) and
//! `EXPLAIN (FORMAT JSON)` trees. The profiler wraps the operator tree in a
//! query-level node without an operator name; that node is skipped.

use std::borrow::Cow;

use serde_json::Value;

use crate::config::ParserOptions;
use crate::error::{PlanError, Result};
use crate::fields::{coerce_u64, first_array, first_str, first_u64, without_keys};
use crate::operator::{DbmsType, OperatorId, OperatorType, QueryOperator};
use crate::parser::PlanParser;
use crate::plan::{Cardinality, QueryPlan};

const CHILD_KEY: &str = "children";
pub(crate) const NAME_KEYS: &[&str] = &["operator_type", "operator_name", "name"];

/// Parser for DuckDB JSON plans
#[derive(Debug, Clone, Default)]
pub struct DuckDbParser {
    options: ParserOptions,
}

impl DuckDbParser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    pub fn parse_str(&self, query: &str, json: &str) -> Result<QueryPlan> {
        let value: Value = serde_json::from_str(json)?;
        self.parse_json_plan(query, &value)
    }

    #[tracing::instrument(skip_all, fields(dbms = %DbmsType::DuckDB))]
    pub fn parse_json_plan(&self, query: &str, payload: &Value) -> Result<QueryPlan> {
        let mut root = match payload {
            Value::Array(items) => items.first(),
            other => Some(other),
        }
        .filter(|root| root.is_object())
        .ok_or_else(|| PlanError::MalformedPlan("DuckDB plan root is not an object".to_string()))?;

        if first_str(root, NAME_KEYS).is_none()
            && let [only_child] = self.extract_children(root).as_slice()
        {
            root = *only_child;
        }
        self.build_plan(query, root)
    }
}

impl PlanParser for DuckDbParser {
    type Node = Value;

    fn dbms(&self) -> DbmsType {
        DbmsType::DuckDB
    }

    fn options(&self) -> &ParserOptions {
        &self.options
    }

    fn extract_children<'a>(&self, node: &'a Value) -> Vec<&'a Value> {
        first_array(node, &[CHILD_KEY])
            .map(|children| children.iter().collect())
            .unwrap_or_default()
    }

    fn extract_operator_name(&self, node: &Value) -> String {
        first_str(node, NAME_KEYS)
            .unwrap_or("Unknown")
            .to_string()
    }

    fn embedded_operator_id(&self, _node: &Value) -> Option<OperatorId> {
        None
    }

    fn extract_cardinalities(&self, node: &Value) -> Cardinality {
        let estimated = node
            .pointer("/extra_info/Estimated Cardinality")
            .and_then(coerce_u64);
        Cardinality::new(estimated, first_u64(node, &["operator_cardinality"]))
    }

    fn create_empty_operator(&self, name: &str, operator_id: OperatorId) -> QueryOperator {
        let upper = name.trim().to_uppercase();
        match upper.as_str() {
            "HASH_GROUP_BY" | "PERFECT_HASH_GROUP_BY" | "UNGROUPED_AGGREGATE" => {
                QueryOperator::empty(OperatorType::GroupBy, operator_id)
            }
            "ORDER_BY" | "TOP_N" => QueryOperator::empty(OperatorType::Sort, operator_id),
            "LIMIT" | "STREAMING_LIMIT" => QueryOperator::custom("Limit", operator_id),
            "FILTER" => QueryOperator::empty(OperatorType::Select, operator_id),
            "UNION" => QueryOperator::empty(OperatorType::SetOperation, operator_id),
            "WINDOW" | "STREAMING_WINDOW" => {
                QueryOperator::empty(OperatorType::Window, operator_id)
            }
            "UNNEST" => QueryOperator::empty(OperatorType::ArrayUnnest, operator_id),
            "COLUMN_DATA_SCAN" => QueryOperator::inline_table("column_data", operator_id),
            "CTE_SCAN" | "DELIM_SCAN" => {
                QueryOperator::empty(OperatorType::PipelineBreakerScan, operator_id)
            }
            "RECURSIVE_CTE" => QueryOperator::empty(OperatorType::Iteration, operator_id),
            "RECURSIVE_CTE_SCAN" => QueryOperator::empty(OperatorType::IterationScan, operator_id),
            "CTE" => QueryOperator::empty(OperatorType::Temp, operator_id),
            "CROSS_PRODUCT" => QueryOperator::empty(OperatorType::Join, operator_id),
            other if other.ends_with("_JOIN") => {
                QueryOperator::empty(OperatorType::Join, operator_id)
            }
            other if other.ends_with("_SCAN") => {
                QueryOperator::empty(OperatorType::TableScan, operator_id)
            }
            _ => QueryOperator::unsupported(DbmsType::DuckDB, name, operator_id),
        }
    }

    fn operator_fields<'a>(&self, node: &'a Value) -> Cow<'a, Value> {
        Cow::Borrowed(node)
    }

    fn system_representation(&self, node: &Value) -> Value {
        without_keys(node, &[CHILD_KEY])
    }

    fn is_transparent(&self, name: &str) -> bool {
        name.trim().eq_ignore_ascii_case("PROJECTION")
    }
}

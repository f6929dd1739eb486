//! PostgreSQL EXPLAIN Parser
//!
//! Parses `EXPLAIN (FORMAT JSON)` and `EXPLAIN (ANALYZE, FORMAT JSON)`
//! output. Exact cardinalities are the per-loop actual rows multiplied by
//! the number of loops.
//!
//! # Examples
//!
//! ```
//! use benchy_queryplan::{OperatorType, ParserOptions};
//! use benchy_queryplan::parsers::postgres::PostgresParser;
//!
//! let json = r#"[{"Plan": {"Node Type": "Seq Scan", "Relation Name": "users"}}]"#;
//!
//! let plan = PostgresParser::new(ParserOptions::default())
//!     .parse_str("SELECT * FROM users", json)
//!     .unwrap();
//! assert_eq!(plan.top().unwrap().operator_type(), OperatorType::TableScan);
//! ```

use std::borrow::Cow;

use serde_json::Value;

use crate::config::ParserOptions;
use crate::error::{PlanError, Result};
use crate::fields::{first_array, first_str, first_u64, without_keys};
use crate::operator::{DbmsType, OperatorId, OperatorType, QueryOperator};
use crate::parser::PlanParser;
use crate::plan::{Cardinality, QueryPlan};

const CHILD_KEY: &str = "Plans";

/// Parser for PostgreSQL JSON plans
#[derive(Debug, Clone, Default)]
pub struct PostgresParser {
    options: ParserOptions,
}

impl PostgresParser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    pub fn parse_str(&self, query: &str, json: &str) -> Result<QueryPlan> {
        let value: Value = serde_json::from_str(json)?;
        self.parse_json_plan(query, &value)
    }

    #[tracing::instrument(skip_all, fields(dbms = %DbmsType::Postgres))]
    pub fn parse_json_plan(&self, query: &str, payload: &Value) -> Result<QueryPlan> {
        // EXPLAIN wraps the plan in a one-element array
        let envelope = match payload {
            Value::Array(items) => items.first(),
            other => Some(other),
        };
        let root = envelope
            .and_then(|envelope| envelope.get("Plan"))
            .filter(|plan| plan.is_object())
            .ok_or_else(|| {
                PlanError::MalformedPlan("missing Plan object in EXPLAIN output".to_string())
            })?;
        self.build_plan(query, root)
    }
}

impl PlanParser for PostgresParser {
    type Node = Value;

    fn dbms(&self) -> DbmsType {
        DbmsType::Postgres
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
        first_str(node, &["Node Type"]).unwrap_or("Unknown").to_string()
    }

    fn embedded_operator_id(&self, _node: &Value) -> Option<OperatorId> {
        None
    }

    fn extract_cardinalities(&self, node: &Value) -> Cardinality {
        let estimated = first_u64(node, &["Plan Rows"]);
        let exact = first_u64(node, &["Actual Rows"]).map(|rows| {
            let loops = first_u64(node, &["Actual Loops"]).unwrap_or(1);
            rows.saturating_mul(loops)
        });
        Cardinality::new(estimated, exact)
    }

    fn create_empty_operator(&self, name: &str, operator_id: OperatorId) -> QueryOperator {
        match name {
            "Seq Scan" | "Index Scan" | "Index Only Scan" | "Bitmap Heap Scan" => {
                QueryOperator::empty(OperatorType::TableScan, operator_id)
            }
            "Hash Join" | "Merge Join" | "Nested Loop" => {
                QueryOperator::empty(OperatorType::Join, operator_id)
            }
            "Aggregate" | "HashAggregate" | "GroupAggregate" | "Group" | "Unique" => {
                QueryOperator::empty(OperatorType::GroupBy, operator_id)
            }
            "Sort" | "Incremental Sort" => QueryOperator::empty(OperatorType::Sort, operator_id),
            "Limit" => QueryOperator::custom("Limit", operator_id),
            "Append" | "Merge Append" => QueryOperator::set_operation("unionall", operator_id),
            "SetOp" => QueryOperator::empty(OperatorType::SetOperation, operator_id),
            "Recursive Union" => QueryOperator::empty(OperatorType::Iteration, operator_id),
            "WindowAgg" => QueryOperator::empty(OperatorType::Window, operator_id),
            "CTE Scan" => QueryOperator::empty(OperatorType::PipelineBreakerScan, operator_id),
            "WorkTable Scan" => QueryOperator::empty(OperatorType::IterationScan, operator_id),
            "Values Scan" => QueryOperator::inline_table("values", operator_id),
            "Subquery Scan" | "Result" => QueryOperator::empty(OperatorType::Map, operator_id),
            other => QueryOperator::unsupported(DbmsType::Postgres, other, operator_id),
        }
    }

    fn operator_fields<'a>(&self, node: &'a Value) -> Cow<'a, Value> {
        Cow::Borrowed(node)
    }

    fn system_representation(&self, node: &Value) -> Value {
        without_keys(node, &[CHILD_KEY])
    }

    fn is_transparent(&self, name: &str) -> bool {
        matches!(name, "Hash" | "Gather" | "Gather Merge" | "Materialize" | "Memoize")
    }
}

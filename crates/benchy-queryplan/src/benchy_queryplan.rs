//! Benchy Query Plan - cross-engine query plan normalization
//!
//! This crate turns the native plan output of a database engine into a
//! canonical plan tree built from one engine-independent operator taxonomy:
//! - ClickHouse, PostgreSQL and DuckDB JSON plans
//! - SQL Server XML showplans and SHOWPLAN_ALL rows
//!
//! # Example
//!
//! ```
//! use benchy_queryplan::{DbmsType, OperatorType, ParserOptions, RawPlan, parse_plan};
//!
//! let raw = RawPlan::Json(serde_json::json!({
//!     "Plan": {"Node Type": "Limit", "Plans": [
//!         {"Node Type": "Sort", "Plans": [{"Node Type": "Seq Scan", "Relation Name": "users"}]}
//!     ]}
//! }));
//! let options = ParserOptions::default();
//! let plan = parse_plan(DbmsType::Postgres, "SELECT ...", &raw, &options).unwrap();
//!
//! assert_eq!(plan.plan.operator_type(), OperatorType::Result);
//! assert_eq!(plan.top().unwrap().operator_type(), OperatorType::Sort);
//! assert_eq!(plan.find_operators(OperatorType::TableScan).len(), 1);
//! ```

pub mod config;
pub mod error;
mod fields;
pub mod operator;
pub mod parser;
pub mod parsers;
pub mod plan;

pub use config::ParserOptions;
pub use error::{PlanError, Result};
pub use operator::{
    CustomOperator, DbmsType, GroupBy, GroupByMethod, Join, JoinMethod, JoinType, OperatorData,
    OperatorId, OperatorType, QueryOperator, RESULT_OPERATOR_ID, ScanType, Sort, TableScan,
};
pub use parser::PlanParser;
pub use parsers::{
    ClickHouseParser, DuckDbParser, PostgresParser, RawPlan, ShowplanRow, SqlServerParser,
    parse_plan,
};
pub use plan::{Cardinality, InnerNode, LeafNode, PlanNode, PlanNodeIterator, QueryPlan};

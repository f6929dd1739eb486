//! Engine Parsers
//!
//! One parser per engine, plus [`parse_plan`] which picks the parser for an
//! engine tag and checks that the payload shape is one the engine emits.

pub mod clickhouse;
pub mod duckdb;
pub mod postgres;
pub mod sqlserver;

use serde_json::Value;

use crate::config::ParserOptions;
use crate::error::{PlanError, Result};
use crate::operator::DbmsType;
use crate::plan::QueryPlan;

pub use clickhouse::ClickHouseParser;
pub use duckdb::DuckDbParser;
pub use postgres::PostgresParser;
pub use sqlserver::{ShowplanRow, SqlServerParser};

/// A raw plan payload as handed over by the driving service
#[derive(Debug, Clone, PartialEq)]
pub enum RawPlan {
    /// A JSON plan tree, or SQL Server result rows encoded as JSON
    Json(Value),
    /// A SQL Server XML showplan
    Xml(String),
    /// SQL Server SHOWPLAN_ALL result rows
    Rows(Vec<ShowplanRow>),
}

impl RawPlan {
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Xml(_) => "xml",
            Self::Rows(_) => "rows",
        }
    }
}

/// Parses a raw plan of the given engine into a canonical plan
pub fn parse_plan(
    dbms: DbmsType,
    query: &str,
    raw: &RawPlan,
    options: &ParserOptions,
) -> Result<QueryPlan> {
    let options = *options;
    match (dbms, raw) {
        (DbmsType::ClickHouse, RawPlan::Json(value)) => {
            ClickHouseParser::new(options).parse_json_plan(query, value)
        }
        (DbmsType::Postgres, RawPlan::Json(value)) => {
            PostgresParser::new(options).parse_json_plan(query, value)
        }
        (DbmsType::DuckDB, RawPlan::Json(value)) => {
            DuckDbParser::new(options).parse_json_plan(query, value)
        }
        (DbmsType::SqlServer, RawPlan::Xml(xml)) => {
            SqlServerParser::new(options).parse_xml(query, xml)
        }
        (DbmsType::SqlServer, RawPlan::Rows(rows)) => {
            SqlServerParser::new(options).parse_rows(query, rows)
        }
        (DbmsType::SqlServer, RawPlan::Json(value)) => {
            SqlServerParser::new(options).parse_json_rows(query, value)
        }
        (DbmsType::Umbra | DbmsType::Hyper, _) => Err(PlanError::UnsupportedEngine(dbms)),
        (
            DbmsType::ClickHouse | DbmsType::Postgres | DbmsType::DuckDB,
            RawPlan::Xml(_) | RawPlan::Rows(_),
        ) => Err(PlanError::UnsupportedPayload {
            dbms,
            shape: raw.shape(),
        }),
    }
}

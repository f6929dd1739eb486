//! Operator Taxonomy - the closed set of canonical plan operators
//!
//! Every engine-specific operator is mapped onto one of the kinds in
//! [`OperatorType`]. Each kind owns only the semantic fields that make sense
//! for it ([`Join`] owns a join type and method, [`Sort`] owns a limit, ...).
//! Population from the raw engine payload happens in [`QueryOperator::fill`],
//! which dispatches to a per-kind, per-engine mapping. Missing or malformed
//! engine fields always degrade to `None`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::fields::{coerce_i64, coerce_u64, first_present, first_str, first_u64};
use crate::parsers::duckdb::NAME_KEYS as DUCKDB_NAME_KEYS;

/// Engine-scoped operator identifier
pub type OperatorId = i64;

/// Reserved id of the synthetic `Result` root
pub const RESULT_OPERATOR_ID: OperatorId = -1;

/// Source database engine of a raw plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbmsType {
    Umbra,
    Postgres,
    Hyper,
    DuckDB,
    ClickHouse,
    SqlServer,
}

impl DbmsType {
    pub const ALL: [DbmsType; 6] = [
        Self::Umbra,
        Self::Postgres,
        Self::Hyper,
        Self::DuckDB,
        Self::ClickHouse,
        Self::SqlServer,
    ];

    /// Returns the lowercase engine name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Umbra => "umbra",
            Self::Postgres => "postgres",
            Self::Hyper => "hyper",
            Self::DuckDB => "duckdb",
            Self::ClickHouse => "clickhouse",
            Self::SqlServer => "sqlserver",
        }
    }

    /// Parses an engine name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|dbms| dbms.as_str() == lower)
    }
}

impl fmt::Display for DbmsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical operator kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorType {
    // Top level operator, added by the parser driver
    Result,
    // Scans
    TableScan,
    InlineTable,
    Temp,
    PipelineBreakerScan,
    // Basic operators
    Select,
    Map,
    Sort,
    GroupBy,
    Join,
    // Advanced operators
    GroupJoin,
    EarlyProbe,
    SetOperation,
    Window,
    // Recursion
    Iteration,
    IterationScan,
    // Table functions
    ArrayUnnest,
    RegexSplit,
    // Correlation
    Subquery,
    CustomOperator,
}

/// Join semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    LeftSemi,
    RightSemi,
    LeftAnti,
    RightAnti,
    Cross,
    Semi,
    Anti,
}

impl JoinType {
    /// Parses canonical and common engine spellings of a join type
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        let normalized = normalized.strip_suffix(" join").unwrap_or(&normalized);
        match normalized {
            "inner" => Some(Self::Inner),
            "left" | "left outer" | "leftouter" => Some(Self::LeftOuter),
            "right" | "right outer" | "rightouter" => Some(Self::RightOuter),
            "full" | "full outer" | "fullouter" => Some(Self::FullOuter),
            "left semi" | "leftsemi" => Some(Self::LeftSemi),
            "right semi" | "rightsemi" => Some(Self::RightSemi),
            "left anti" | "leftanti" | "left anti semi" => Some(Self::LeftAnti),
            "right anti" | "rightanti" | "right anti semi" => Some(Self::RightAnti),
            "cross" => Some(Self::Cross),
            "semi" => Some(Self::Semi),
            "anti" => Some(Self::Anti),
            _ => None,
        }
    }
}

/// Physical join algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinMethod {
    Hash,
    Merge,
    Nl,
    Index,
    TernaryHash,
    Adaptive,
}

impl JoinMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hash" => Some(Self::Hash),
            "merge" => Some(Self::Merge),
            "nl" | "bnl" | "nested loop" | "nested loops" | "nestedloop" => Some(Self::Nl),
            "index" | "indexnl" => Some(Self::Index),
            "ternaryhash" => Some(Self::TernaryHash),
            "adaptive" => Some(Self::Adaptive),
            _ => None,
        }
    }
}

/// Aggregation algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupByMethod {
    Hash,
    Stream,
}

impl GroupByMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hash" | "hashed" => Some(Self::Hash),
            "stream" | "sorted" | "sort" => Some(Self::Stream),
            _ => None,
        }
    }
}

/// Table access path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    Sequential,
    Index,
    Bitmap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableScan {
    pub table_name: Option<String>,
    pub table_size: Option<u64>,
    #[serde(rename = "type")]
    pub scan_type: Option<ScanType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineTable {
    #[serde(rename = "type")]
    pub table_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineBreakerScan {
    pub scanned_id: Option<OperatorId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupBy {
    /// `None` means the engine did not say, not "hash"
    pub method: Option<GroupByMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Join {
    #[serde(rename = "type")]
    pub join_type: Option<JoinType>,
    pub method: Option<JoinMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupJoin {
    #[serde(rename = "type")]
    pub join_type: Option<String>,
    pub method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EarlyProbe {
    pub source: Option<OperatorId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetOperation {
    #[serde(rename = "type")]
    pub operation: Option<String>,
    pub active: bool,
}

impl Default for SetOperation {
    fn default() -> Self {
        Self {
            operation: None,
            active: true,
        }
    }
}

/// Escape hatch for operators outside the taxonomy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomOperator {
    /// Raw engine operator name, verbatim
    pub name: String,
    pub limit: Option<u64>,
}

/// Per-kind semantic payload of an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator_type")]
pub enum OperatorData {
    Result,
    TableScan(TableScan),
    InlineTable(InlineTable),
    Temp,
    PipelineBreakerScan(PipelineBreakerScan),
    Select,
    Map,
    Sort(Sort),
    GroupBy(GroupBy),
    Join(Join),
    GroupJoin(GroupJoin),
    EarlyProbe(EarlyProbe),
    SetOperation(SetOperation),
    Window,
    Iteration,
    IterationScan,
    ArrayUnnest,
    RegexSplit,
    Subquery,
    CustomOperator(CustomOperator),
}

/// A canonical operator: engine-scoped id plus its kind-specific record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOperator {
    pub operator_id: OperatorId,
    #[serde(flatten)]
    pub data: OperatorData,
}

impl QueryOperator {
    /// Creates an unfilled operator of the given kind
    ///
    /// `CustomOperator` gets an empty name; use [`QueryOperator::custom`] to
    /// preserve the engine's name.
    pub fn empty(operator_type: OperatorType, operator_id: OperatorId) -> Self {
        let data = match operator_type {
            OperatorType::Result => OperatorData::Result,
            OperatorType::TableScan => OperatorData::TableScan(TableScan::default()),
            OperatorType::InlineTable => OperatorData::InlineTable(InlineTable::default()),
            OperatorType::Temp => OperatorData::Temp,
            OperatorType::PipelineBreakerScan => {
                OperatorData::PipelineBreakerScan(PipelineBreakerScan::default())
            }
            OperatorType::Select => OperatorData::Select,
            OperatorType::Map => OperatorData::Map,
            OperatorType::Sort => OperatorData::Sort(Sort::default()),
            OperatorType::GroupBy => OperatorData::GroupBy(GroupBy::default()),
            OperatorType::Join => OperatorData::Join(Join::default()),
            OperatorType::GroupJoin => OperatorData::GroupJoin(GroupJoin::default()),
            OperatorType::EarlyProbe => OperatorData::EarlyProbe(EarlyProbe::default()),
            OperatorType::SetOperation => OperatorData::SetOperation(SetOperation::default()),
            OperatorType::Window => OperatorData::Window,
            OperatorType::Iteration => OperatorData::Iteration,
            OperatorType::IterationScan => OperatorData::IterationScan,
            OperatorType::ArrayUnnest => OperatorData::ArrayUnnest,
            OperatorType::RegexSplit => OperatorData::RegexSplit,
            OperatorType::Subquery => OperatorData::Subquery,
            OperatorType::CustomOperator => OperatorData::CustomOperator(CustomOperator::default()),
        };
        Self { operator_id, data }
    }

    /// The synthetic root operator
    pub fn result() -> Self {
        Self::empty(OperatorType::Result, RESULT_OPERATOR_ID)
    }

    /// A custom operator carrying a deliberately chosen name (e.g. "Limit")
    pub fn custom(name: impl Into<String>, operator_id: OperatorId) -> Self {
        Self {
            operator_id,
            data: OperatorData::CustomOperator(CustomOperator {
                name: name.into(),
                limit: None,
            }),
        }
    }

    /// Fallback for names no taxonomy rule matched; keeps the raw name verbatim
    pub fn unsupported(dbms: DbmsType, name: &str, operator_id: OperatorId) -> Self {
        tracing::warn!(
            %dbms,
            operator = name,
            operator_id,
            "unsupported operator, keeping as custom operator"
        );
        Self::custom(name, operator_id)
    }

    /// A set operation whose flavour is known from the operator name
    pub fn set_operation(operation: impl Into<String>, operator_id: OperatorId) -> Self {
        Self {
            operator_id,
            data: OperatorData::SetOperation(SetOperation {
                operation: Some(operation.into()),
                active: true,
            }),
        }
    }

    /// An inline table whose source kind is known from the operator name
    pub fn inline_table(table_type: impl Into<String>, operator_id: OperatorId) -> Self {
        Self {
            operator_id,
            data: OperatorData::InlineTable(InlineTable {
                table_type: Some(table_type.into()),
            }),
        }
    }

    /// Returns the canonical kind of this operator
    pub fn operator_type(&self) -> OperatorType {
        match &self.data {
            OperatorData::Result => OperatorType::Result,
            OperatorData::TableScan(_) => OperatorType::TableScan,
            OperatorData::InlineTable(_) => OperatorType::InlineTable,
            OperatorData::Temp => OperatorType::Temp,
            OperatorData::PipelineBreakerScan(_) => OperatorType::PipelineBreakerScan,
            OperatorData::Select => OperatorType::Select,
            OperatorData::Map => OperatorType::Map,
            OperatorData::Sort(_) => OperatorType::Sort,
            OperatorData::GroupBy(_) => OperatorType::GroupBy,
            OperatorData::Join(_) => OperatorType::Join,
            OperatorData::GroupJoin(_) => OperatorType::GroupJoin,
            OperatorData::EarlyProbe(_) => OperatorType::EarlyProbe,
            OperatorData::SetOperation(_) => OperatorType::SetOperation,
            OperatorData::Window => OperatorType::Window,
            OperatorData::Iteration => OperatorType::Iteration,
            OperatorData::IterationScan => OperatorType::IterationScan,
            OperatorData::ArrayUnnest => OperatorType::ArrayUnnest,
            OperatorData::RegexSplit => OperatorType::RegexSplit,
            OperatorData::Subquery => OperatorType::Subquery,
            OperatorData::CustomOperator(_) => OperatorType::CustomOperator,
        }
    }

    /// Returns true for a custom `Limit`/`Top` operator
    pub fn is_limit(&self) -> bool {
        matches!(
            &self.data,
            OperatorData::CustomOperator(op)
                if op.name.eq_ignore_ascii_case("limit") || op.name.eq_ignore_ascii_case("top")
        )
    }

    /// Returns the row limit carried by a Sort or a limit-flavoured custom operator
    pub fn limit(&self) -> Option<u64> {
        match &self.data {
            OperatorData::Sort(sort) => sort.limit,
            OperatorData::CustomOperator(op) => op.limit,
            _ => None,
        }
    }

    /// Returns the custom operator name, if this is one
    pub fn custom_name(&self) -> Option<&str> {
        match &self.data {
            OperatorData::CustomOperator(op) => Some(&op.name),
            _ => None,
        }
    }

    pub(crate) fn sort_mut(&mut self) -> Option<&mut Sort> {
        match &mut self.data {
            OperatorData::Sort(sort) => Some(sort),
            _ => None,
        }
    }

    /// Populates the semantic fields from a raw node of the given engine
    pub fn fill(&mut self, plan: &Value, dbms: DbmsType) {
        match &mut self.data {
            OperatorData::TableScan(op) => op.fill(plan, dbms),
            OperatorData::PipelineBreakerScan(op) => op.fill(plan, dbms),
            OperatorData::Sort(op) => op.fill(plan, dbms),
            OperatorData::GroupBy(op) => op.fill(plan, dbms),
            OperatorData::Join(op) => op.fill(plan, dbms),
            OperatorData::GroupJoin(op) => op.fill(plan, dbms),
            OperatorData::EarlyProbe(op) => op.fill(plan, dbms),
            OperatorData::SetOperation(op) => op.fill(plan, dbms),
            OperatorData::CustomOperator(op) => op.fill(plan, dbms),
            OperatorData::Result
            | OperatorData::InlineTable(_)
            | OperatorData::Temp
            | OperatorData::Select
            | OperatorData::Map
            | OperatorData::Window
            | OperatorData::Iteration
            | OperatorData::IterationScan
            | OperatorData::ArrayUnnest
            | OperatorData::RegexSplit
            | OperatorData::Subquery => {}
        }
    }
}

/// Engine-aware population of a kind-specific record
trait FillFromPlan {
    fn fill(&mut self, plan: &Value, dbms: DbmsType);
}

fn owned(s: Option<&str>) -> Option<String> {
    s.map(str::to_string)
}

impl FillFromPlan for TableScan {
    fn fill(&mut self, plan: &Value, dbms: DbmsType) {
        match dbms {
            DbmsType::Umbra => {
                self.table_name = owned(first_str(plan, &["tablename"]));
                self.table_size = first_u64(plan, &["tableSize"]);
            }
            DbmsType::Hyper => {
                self.table_name = owned(plan.pointer("/debugName/value").and_then(Value::as_str));
            }
            DbmsType::Postgres => {
                self.table_name = owned(first_str(plan, &["Relation Name"]));
                let node_type = first_str(plan, &["Node Type"]).unwrap_or_default();
                self.scan_type = match node_type {
                    "Seq Scan" => Some(ScanType::Sequential),
                    "Index Scan" | "Index Only Scan" => Some(ScanType::Index),
                    "Bitmap Heap Scan" => Some(ScanType::Bitmap),
                    other => {
                        tracing::warn!(node_type = other, "unknown table scan type");
                        None
                    }
                };
            }
            DbmsType::DuckDB => {
                self.table_name = owned(plan.pointer("/extra_info/Table").and_then(Value::as_str));
            }
            DbmsType::ClickHouse => self.table_name = clickhouse_table_name(plan),
            DbmsType::SqlServer => self.table_name = sqlserver_table_name(plan),
        }
    }
}

/// Storage descriptor, then flat field (at most `db.table.index`), then description
fn clickhouse_table_name(plan: &Value) -> Option<String> {
    let from_storage = first_present(plan, &["Storage", "storage"])
        .filter(|storage| storage.is_object())
        .and_then(|storage| first_str(storage, &["Table"]));
    let table = from_storage.or_else(|| first_str(plan, &["Table"]));

    if let Some(table) = table {
        let parts: Vec<&str> = table.split('.').collect();
        return Some(parts[..parts.len().min(3)].join("."));
    }

    first_str(plan, &["Description", "description"])
        .map(str::trim)
        .filter(|description| !description.is_empty())
        .map(|description| {
            description
                .strip_prefix("clickhouse.")
                .unwrap_or(description)
                .to_string()
        })
}

/// Keeps only the base table name of an object reference
fn sqlserver_table_name(plan: &Value) -> Option<String> {
    let qualified = match plan.get("object") {
        Some(Value::Object(_)) => {
            let object = &plan["object"];
            let parts: Vec<&str> = [
                ["Database", "database"],
                ["Schema", "schema"],
                ["Table", "table"],
            ]
            .iter()
            .filter_map(|keys| first_str(object, keys))
            .collect();
            Some(parts.join("."))
        }
        Some(Value::String(object)) => Some(object.clone()),
        _ => None,
    };

    qualified
        .filter(|name| !name.is_empty())
        .or_else(|| owned(first_str(plan, &["Table"])))
        .map(|name| {
            let base = name.rsplit('.').next().unwrap_or(&name);
            base.trim_matches(|c: char| matches!(c, '[' | ']' | '(' | ')') || c.is_whitespace())
                .to_string()
        })
        .filter(|name| !name.is_empty())
}

impl FillFromPlan for PipelineBreakerScan {
    fn fill(&mut self, plan: &Value, dbms: DbmsType) {
        self.scanned_id = match dbms {
            DbmsType::Umbra => plan.get("scannedOperator").and_then(coerce_i64),
            DbmsType::Hyper => match plan.get("input") {
                Some(input) if input.is_object() => input.get("operatorId").and_then(coerce_i64),
                Some(input) => coerce_i64(input),
                None => None,
            },
            DbmsType::Postgres | DbmsType::DuckDB | DbmsType::ClickHouse | DbmsType::SqlServer => {
                None
            }
        };
    }
}

impl FillFromPlan for Sort {
    fn fill(&mut self, plan: &Value, dbms: DbmsType) {
        self.limit = match dbms {
            DbmsType::Umbra | DbmsType::Hyper | DbmsType::SqlServer => first_u64(plan, &["limit"]),
            DbmsType::DuckDB => plan.pointer("/extra_info/Top").and_then(coerce_u64),
            DbmsType::ClickHouse => clickhouse_limit(plan),
            DbmsType::Postgres => None,
        };
    }
}

/// DuckDB operator name as read when the operator kind was chosen
fn duckdb_operator_name(plan: &Value) -> String {
    first_str(plan, DUCKDB_NAME_KEYS)
        .unwrap_or_default()
        .trim()
        .to_uppercase()
}

fn clickhouse_limit(plan: &Value) -> Option<u64> {
    first_u64(plan, &["Limit", "limit", "rows_limit", "RowsRead"])
}

impl FillFromPlan for GroupBy {
    fn fill(&mut self, plan: &Value, dbms: DbmsType) {
        self.method = match dbms {
            DbmsType::Umbra | DbmsType::Hyper => Some(GroupByMethod::Hash),
            DbmsType::DuckDB => match duckdb_operator_name(plan).as_str() {
                "HASH_GROUP_BY" | "PERFECT_HASH_GROUP_BY" => Some(GroupByMethod::Hash),
                _ => None,
            },
            DbmsType::Postgres => match first_str(plan, &["Node Type"]) {
                Some("Unique" | "Group") => Some(GroupByMethod::Stream),
                _ => match first_str(plan, &["Strategy"]) {
                    Some("Hashed" | "Mixed") => Some(GroupByMethod::Hash),
                    Some("Sorted") => Some(GroupByMethod::Stream),
                    _ => None,
                },
            },
            DbmsType::ClickHouse => {
                first_str(plan, &["method", "Method"]).and_then(GroupByMethod::parse)
            }
            DbmsType::SqlServer => first_str(plan, &["agg_method"]).and_then(GroupByMethod::parse),
        };
    }
}

impl FillFromPlan for Join {
    fn fill(&mut self, plan: &Value, dbms: DbmsType) {
        match dbms {
            DbmsType::Umbra => {
                self.join_type = match first_str(plan, &["type"]) {
                    Some(join_type) => JoinType::parse(join_type),
                    None => Some(JoinType::Inner),
                };
                self.method = first_str(plan, &["physicalOperator"]).and_then(|op| match op {
                    "hashjoin" => Some(JoinMethod::Hash),
                    "indexnljoin" => Some(JoinMethod::Index),
                    "bnljoin" => Some(JoinMethod::Nl),
                    "ternaryhashjoin" => Some(JoinMethod::TernaryHash),
                    other => JoinMethod::parse(&other.replace("join", "")),
                });
            }
            DbmsType::Hyper => {
                self.method = first_str(plan, &["method"]).and_then(JoinMethod::parse);
                self.join_type = first_str(plan, &["operator"]).and_then(|op| {
                    // inner join is just called "join"
                    match op.replace("join", "").as_str() {
                        "" => Some(JoinType::Inner),
                        other => JoinType::parse(other),
                    }
                });
            }
            DbmsType::DuckDB => self.fill_duckdb(plan),
            DbmsType::Postgres => {
                self.join_type = first_str(plan, &["Join Type"]).and_then(JoinType::parse);
                self.method = match first_str(plan, &["Node Type"]) {
                    Some("Merge Join") => Some(JoinMethod::Merge),
                    Some("Hash Join") => Some(JoinMethod::Hash),
                    Some("Nested Loop") => Some(JoinMethod::Nl),
                    _ => None,
                };
            }
            DbmsType::ClickHouse => self.fill_clickhouse(plan),
            DbmsType::SqlServer => {
                self.join_type = first_str(plan, &["join_type"]).and_then(JoinType::parse);
                self.method = first_str(plan, &["join_method"]).and_then(JoinMethod::parse);
            }
        }
    }
}

impl Join {
    /// DuckDB swaps join inputs, so its sides are mirrored here
    fn fill_duckdb(&mut self, plan: &Value) {
        let raw_type = plan
            .pointer("/extra_info/Join Type")
            .and_then(Value::as_str)
            .map(str::to_lowercase);
        self.join_type = raw_type.as_deref().and_then(|join_type| match join_type {
            "inner" => Some(JoinType::Inner),
            "right" => Some(JoinType::LeftOuter),
            "left" => Some(JoinType::RightOuter),
            "full" | "outer" => Some(JoinType::FullOuter),
            "right_semi" => Some(JoinType::LeftSemi),
            "left_semi" => Some(JoinType::RightSemi),
            "right_anti" => Some(JoinType::LeftAnti),
            "left_anti" => Some(JoinType::RightAnti),
            // no side given, the probe input ends up on the right
            "semi" | "mark" => Some(JoinType::RightSemi),
            "anti" => Some(JoinType::RightAnti),
            other => {
                tracing::debug!(join_type = other, "unmapped DuckDB join type");
                None
            }
        });

        let operator_type = duckdb_operator_name(plan);
        if self.join_type.is_none() && operator_type == "CROSS_PRODUCT" {
            self.join_type = Some(JoinType::Cross);
        }
        self.method = match operator_type.replace("_JOIN", "").to_lowercase().as_str() {
            "piecewise_merge" => Some(JoinMethod::Merge),
            "nested_loop" | "blockwise_nl" => Some(JoinMethod::Nl),
            "index" => Some(JoinMethod::Index),
            "hash" => Some(JoinMethod::Hash),
            _ => None,
        };
    }

    /// Structured join kind when present, otherwise ordered description checks
    fn fill_clickhouse(&mut self, plan: &Value) {
        self.join_type = first_str(plan, &["Join", "join_type", "Type"]).and_then(JoinType::parse);

        if self.join_type.is_none() {
            let description = first_str(plan, &["Description"])
                .unwrap_or_default()
                .to_lowercase();
            self.join_type = if description.contains("left") {
                Some(JoinType::LeftOuter)
            } else if description.contains("right") {
                Some(JoinType::RightOuter)
            } else if description.contains("full") {
                Some(JoinType::FullOuter)
            } else if description.contains("semi") {
                Some(JoinType::Semi)
            } else if description.contains("anti") {
                Some(JoinType::Anti)
            } else if description.contains("cross") {
                Some(JoinType::Cross)
            } else if !description.is_empty() {
                Some(JoinType::Inner)
            } else {
                None
            };
        }

        if let Some(algorithm) = first_str(plan, &["Algorithm", "algorithm"]) {
            let algorithm = algorithm.to_lowercase();
            self.method = if algorithm.contains("hash") {
                Some(JoinMethod::Hash)
            } else if algorithm.contains("merge") {
                Some(JoinMethod::Merge)
            } else if algorithm.contains("nested") || algorithm.contains("loop") {
                Some(JoinMethod::Nl)
            } else {
                None
            };
        }
    }
}

impl FillFromPlan for GroupJoin {
    fn fill(&mut self, plan: &Value, dbms: DbmsType) {
        match dbms {
            DbmsType::Umbra => {
                self.join_type = owned(first_str(plan, &["behavior"]));
                self.method =
                    first_str(plan, &["physicalOperator"]).map(|op| op.replace("groupjoin", ""));
            }
            DbmsType::Hyper => self.join_type = owned(first_str(plan, &["semantic"])),
            DbmsType::Postgres | DbmsType::DuckDB | DbmsType::ClickHouse | DbmsType::SqlServer => {}
        }
    }
}

impl FillFromPlan for EarlyProbe {
    fn fill(&mut self, plan: &Value, dbms: DbmsType) {
        self.source = match dbms {
            DbmsType::Umbra => plan.get("source").and_then(coerce_i64),
            DbmsType::Hyper => plan.get("builder").and_then(coerce_i64),
            DbmsType::Postgres | DbmsType::DuckDB | DbmsType::ClickHouse | DbmsType::SqlServer => {
                None
            }
        };
    }
}

impl FillFromPlan for SetOperation {
    fn fill(&mut self, plan: &Value, dbms: DbmsType) {
        let filled = match dbms {
            DbmsType::Umbra => owned(first_str(plan, &["operation"])),
            DbmsType::Hyper => owned(first_str(plan, &["operator"])),
            DbmsType::DuckDB => match duckdb_operator_name(plan).as_str() {
                "UNION" => Some("unionall".to_string()),
                _ => None,
            },
            DbmsType::Postgres => first_str(plan, &["Command"])
                .map(|command| command.to_lowercase().replace(' ', "")),
            // set from the operator name at creation
            DbmsType::ClickHouse | DbmsType::SqlServer => None,
        };
        if filled.is_some() {
            self.operation = filled;
        }
    }
}

impl FillFromPlan for CustomOperator {
    fn fill(&mut self, plan: &Value, dbms: DbmsType) {
        match dbms {
            DbmsType::ClickHouse if self.name == "Limit" => self.limit = clickhouse_limit(plan),
            DbmsType::SqlServer if self.name.eq_ignore_ascii_case("top") => {
                self.limit = first_u64(plan, &["limit"]);
            }
            DbmsType::DuckDB if self.name == "Limit" => {
                self.limit = plan.pointer("/extra_info/Limit").and_then(coerce_u64);
            }
            DbmsType::Umbra
            | DbmsType::Postgres
            | DbmsType::Hyper
            | DbmsType::DuckDB
            | DbmsType::ClickHouse
            | DbmsType::SqlServer => {}
        }
    }
}

#[cfg(test)]
mod tests;

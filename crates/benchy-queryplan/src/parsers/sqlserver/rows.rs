//! SHOWPLAN_ALL result rows

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Column order of a `SET SHOWPLAN_ALL ON` result set
pub const SHOWPLAN_COLUMNS: [&str; 20] = [
    "Rows",
    "Executes",
    "StmtText",
    "StmtId",
    "NodeId",
    "Parent",
    "PhysicalOp",
    "LogicalOp",
    "Argument",
    "DefinedValues",
    "EstimateRows",
    "EstimateIO",
    "EstimateCPU",
    "AvgRowSize",
    "TotalSubtreeCost",
    "OutputList",
    "Warnings",
    "Type",
    "Parallel",
    "EstimateExecutions",
];

/// One textual row of a SHOWPLAN_ALL / STATISTICS PROFILE result.
///
/// All cells are kept as text. When deserialized from a JSON object keyed by
/// column name, numeric and boolean cells are converted to their textual form
/// and missing columns become `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShowplanRow {
    pub rows: Option<String>,
    pub executes: Option<String>,
    pub stmt_text: Option<String>,
    pub stmt_id: Option<String>,
    pub node_id: Option<String>,
    pub parent: Option<String>,
    pub physical_op: Option<String>,
    pub logical_op: Option<String>,
    pub argument: Option<String>,
    pub defined_values: Option<String>,
    pub estimate_rows: Option<String>,
    #[serde(rename = "EstimateIO")]
    pub estimate_io: Option<String>,
    #[serde(rename = "EstimateCPU")]
    pub estimate_cpu: Option<String>,
    pub avg_row_size: Option<String>,
    pub total_subtree_cost: Option<String>,
    pub output_list: Option<String>,
    pub warnings: Option<String>,
    #[serde(rename = "Type")]
    pub row_type: Option<String>,
    pub parallel: Option<String>,
    pub estimate_executions: Option<String>,
}

impl ShowplanRow {
    /// Builds a row from positional cells in [`SHOWPLAN_COLUMNS`] order.
    ///
    /// Returns `None` for rows with fewer than 20 cells.
    pub fn from_columns(columns: &[Value]) -> Option<Self> {
        if columns.len() < SHOWPLAN_COLUMNS.len() {
            return None;
        }
        Some(Self::from_cells(|column| {
            SHOWPLAN_COLUMNS
                .iter()
                .position(|name| *name == column)
                .and_then(|index| columns.get(index))
        }))
    }

    fn from_cells<'a>(cell: impl Fn(&str) -> Option<&'a Value>) -> Self {
        let text = |column: &str| cell(column).and_then(cell_text);
        Self {
            rows: text("Rows"),
            executes: text("Executes"),
            stmt_text: text("StmtText"),
            stmt_id: text("StmtId"),
            node_id: text("NodeId"),
            parent: text("Parent"),
            physical_op: text("PhysicalOp"),
            logical_op: text("LogicalOp"),
            argument: text("Argument"),
            defined_values: text("DefinedValues"),
            estimate_rows: text("EstimateRows"),
            estimate_io: text("EstimateIO"),
            estimate_cpu: text("EstimateCPU"),
            avg_row_size: text("AvgRowSize"),
            total_subtree_cost: text("TotalSubtreeCost"),
            output_list: text("OutputList"),
            warnings: text("Warnings"),
            row_type: text("Type"),
            parallel: text("Parallel"),
            estimate_executions: text("EstimateExecutions"),
        }
    }

    /// Node id of the row, if it is an integer
    pub fn node_id(&self) -> Option<i64> {
        self.node_id.as_deref().and_then(parse_id)
    }

    /// Parent node id; `None` when absent, `0` or not an integer
    pub fn parent_id(&self) -> Option<i64> {
        self.parent
            .as_deref()
            .and_then(parse_id)
            .filter(|parent| *parent != 0)
    }

    /// Whether the row describes a plan operator (rather than a statement)
    pub fn is_plan_row(&self) -> bool {
        self.row_type
            .as_deref()
            .map(str::trim)
            .filter(|row_type| !row_type.is_empty())
            .is_none_or(|row_type| row_type.eq_ignore_ascii_case("PLAN_ROW"))
    }
}

impl<'de> Deserialize<'de> for ShowplanRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cells = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self::from_cells(|column| cells.get(column)))
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn parse_id(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|id| id.is_finite() && id.fract() == 0.0)
            .map(|id| id as i64)
    })
}

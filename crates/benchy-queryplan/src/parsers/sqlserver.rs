//! SQL Server Showplan Parser
//!
//! Parses the two plan shapes SQL Server can produce:
//! - XML showplans (`SET SHOWPLAN_XML ON`, `SET STATISTICS XML ON`)
//! - flat result rows (`SET SHOWPLAN_ALL ON`, `SET STATISTICS PROFILE ON`)
//!
//! Both shapes are first reshaped into a tree of [`ShowplanNode`]s carrying
//! the operator names, statistics and the fields used by
//! [`QueryOperator::fill`]. The canonical plan is then built from that tree.
//!
//! # Examples
//!
//! ```
//! use benchy_queryplan::{OperatorType, ParserOptions};
//! use benchy_queryplan::parsers::sqlserver::SqlServerParser;
//!
//! let xml = r#"<ShowPlanXML><BatchSequence><Batch><Statements><StmtSimple>
//!   <QueryPlan>
//!     <RelOp NodeId="0" PhysicalOp="Sort" LogicalOp="Sort" EstimateRows="10">
//!       <Sort>
//!         <RelOp NodeId="1" PhysicalOp="Table Scan" LogicalOp="Table Scan" EstimateRows="10"/>
//!       </Sort>
//!     </RelOp>
//!   </QueryPlan>
//! </StmtSimple></Statements></Batch></BatchSequence></ShowPlanXML>"#;
//!
//! let plan = SqlServerParser::new(ParserOptions::default())
//!     .parse_xml("SELECT * FROM t ORDER BY a", xml)
//!     .unwrap();
//! let sort = plan.top().unwrap();
//! assert_eq!(sort.operator_type(), OperatorType::Sort);
//! assert_eq!(sort.children()[0].operator_type(), OperatorType::TableScan);
//! ```

mod rows;

pub use rows::{SHOWPLAN_COLUMNS, ShowplanRow};

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::config::ParserOptions;
use crate::error::{PlanError, Result};
use crate::fields::parse_u64;
use crate::operator::{DbmsType, OperatorId, OperatorType, QueryOperator};
use crate::parser::PlanParser;
use crate::plan::{Cardinality, QueryPlan};

/// `OBJECT:([db].[schema].[table]...)` in a SHOWPLAN_ALL argument
static QUALIFIED_OBJECT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"OBJECT:\(\[([^\]]+)\]\.\[([^\]]+)\]\.\[([^\]]+)\]").expect("valid regex")
});

static OBJECT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"OBJECT:([^,]+)").expect("valid regex"));

/// `TOP 10` or `TOP EXPRESSION:((10))`
static TOP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bTOP\s+(?:EXPRESSION:\s*\(+)?(\d+)").expect("valid regex")
});

/// Elements below a `RelOp` that name the accessed object
const OBJECT_ELEMENTS: &[&str] = &[
    "IndexScan",
    "IndexSeek",
    "TableScan",
    "ClusteredIndexScan",
    "ClusteredIndexSeek",
];

/// A SQL Server plan operator, reshaped from XML or from result rows
#[derive(Debug, Clone, PartialEq)]
pub struct ShowplanNode {
    node_id: Option<OperatorId>,
    physical_op: String,
    logical_op: String,
    estimate_rows: Option<u64>,
    actual_rows: Option<u64>,
    fields: Value,
    raw: Option<Value>,
    children: Vec<ShowplanNode>,
}

impl ShowplanNode {
    pub fn physical_op(&self) -> &str {
        &self.physical_op
    }

    pub fn logical_op(&self) -> &str {
        &self.logical_op
    }

    pub fn children(&self) -> &[ShowplanNode] {
        &self.children
    }
}

/// Parser for SQL Server showplans
#[derive(Debug, Clone, Default)]
pub struct SqlServerParser {
    options: ParserOptions,
}

impl SqlServerParser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Parses a showplan given as text: XML, or a JSON array of result rows
    pub fn parse_str(&self, query: &str, text: &str) -> Result<QueryPlan> {
        let trimmed = text.trim_start();
        if trimmed.starts_with('<') {
            return self.parse_xml(query, trimmed);
        }
        let value: Value = serde_json::from_str(text)?;
        self.parse_json_rows(query, &value)
    }

    /// Parses an XML showplan; the first `RelOp` in document order is the root
    #[tracing::instrument(skip_all, fields(dbms = %DbmsType::SqlServer))]
    pub fn parse_xml(&self, query: &str, xml: &str) -> Result<QueryPlan> {
        let document = roxmltree::Document::parse(xml)?;
        let root = document
            .descendants()
            .find(|node| is_element(*node, "RelOp"))
            .ok_or_else(|| {
                PlanError::MalformedPlan("no RelOp node found in showplan XML".to_string())
            })?;
        let tree = xml_node(root, 1, &self.options)?;
        self.build_plan(query, &tree)
    }

    /// Parses SHOWPLAN_ALL rows
    #[tracing::instrument(skip_all, fields(dbms = %DbmsType::SqlServer, rows = rows.len()))]
    pub fn parse_rows(&self, query: &str, rows: &[ShowplanRow]) -> Result<QueryPlan> {
        let tree = RowTree::new(rows).materialize(&self.options)?;
        self.build_plan(query, &tree)
    }

    /// Parses rows given as JSON: an array of positional arrays or of objects
    /// keyed by column name
    pub fn parse_json_rows(&self, query: &str, payload: &Value) -> Result<QueryPlan> {
        let rows = rows_from_json(payload)?;
        self.parse_rows(query, &rows)
    }
}

impl PlanParser for SqlServerParser {
    type Node = ShowplanNode;

    fn dbms(&self) -> DbmsType {
        DbmsType::SqlServer
    }

    fn options(&self) -> &ParserOptions {
        &self.options
    }

    fn extract_children<'a>(&self, node: &'a ShowplanNode) -> Vec<&'a ShowplanNode> {
        node.children.iter().collect()
    }

    fn extract_operator_name(&self, node: &ShowplanNode) -> String {
        decide_operator_name(&node.physical_op, &node.logical_op)
    }

    fn embedded_operator_id(&self, node: &ShowplanNode) -> Option<OperatorId> {
        node.node_id
    }

    fn extract_cardinalities(&self, node: &ShowplanNode) -> Cardinality {
        Cardinality::new(node.estimate_rows, node.actual_rows)
    }

    fn create_empty_operator(&self, name: &str, operator_id: OperatorId) -> QueryOperator {
        let lower = name.trim().to_lowercase();

        if ["table scan", "index scan", "index seek", "clustered index"]
            .iter()
            .any(|prefix| lower.starts_with(prefix))
        {
            QueryOperator::empty(OperatorType::TableScan, operator_id)
        } else if lower.starts_with("sort") {
            QueryOperator::empty(OperatorType::Sort, operator_id)
        } else if lower.starts_with("filter") {
            QueryOperator::empty(OperatorType::Select, operator_id)
        } else if lower.starts_with("compute") {
            QueryOperator::empty(OperatorType::Map, operator_id)
        } else if lower.starts_with("hash match")
            || lower.starts_with("merge join")
            || lower.starts_with("nested loops")
            || lower.contains("join")
        {
            if lower.contains("aggregate") {
                QueryOperator::empty(OperatorType::GroupBy, operator_id)
            } else {
                QueryOperator::empty(OperatorType::Join, operator_id)
            }
        } else if lower.contains("aggregate") {
            QueryOperator::empty(OperatorType::GroupBy, operator_id)
        } else if lower.starts_with("top") {
            QueryOperator::custom("Top", operator_id)
        } else if lower.starts_with("concat") {
            QueryOperator::set_operation("unionall", operator_id)
        } else if lower.starts_with("constant scan") {
            QueryOperator::inline_table("constant", operator_id)
        } else if lower.starts_with("table spool") || lower.starts_with("index spool") {
            QueryOperator::empty(OperatorType::Temp, operator_id)
        } else if lower.starts_with("sequence project") {
            QueryOperator::empty(OperatorType::Window, operator_id)
        } else {
            QueryOperator::unsupported(DbmsType::SqlServer, name, operator_id)
        }
    }

    fn operator_fields<'a>(&self, node: &'a ShowplanNode) -> Cow<'a, Value> {
        Cow::Borrowed(&node.fields)
    }

    fn system_representation(&self, node: &ShowplanNode) -> Value {
        node.raw.clone().unwrap_or(Value::Null)
    }

    fn is_transparent(&self, name: &str) -> bool {
        name.trim().to_lowercase().starts_with("parallelism")
    }
}

/// Canonical operator name from the physical and logical operator.
///
/// The checks are ordered: `Hash Match` resolves to an aggregate before the
/// generic join handling sees it, and `Top N Sort` to a sort before `Top`.
/// A name matching no rule is returned as given.
pub fn decide_operator_name(physical: &str, logical: &str) -> String {
    let phys = physical.trim().to_lowercase();
    let logical_lower = logical.trim().to_lowercase();

    let name = if phys.starts_with("hash match") {
        if logical_lower.contains("aggregate") || logical_lower.contains("distinct") {
            "Hash Aggregate"
        } else {
            "Hash Match"
        }
    } else if phys.starts_with("stream aggregate") {
        "Stream Aggregate"
    } else if phys.starts_with("merge join") {
        "Merge Join"
    } else if phys.starts_with("nested loops") {
        "Nested Loops"
    } else if phys.starts_with("top n sort") {
        "Sort"
    } else if phys.starts_with("top") {
        "Top"
    } else if phys.starts_with("concat") {
        "Concatenation"
    } else if phys.starts_with("filter") {
        "Filter"
    } else if phys.starts_with("sort") {
        "Sort"
    } else if phys.starts_with("compute") {
        "Compute Scalar"
    } else if !phys.is_empty() {
        physical
    } else if !logical_lower.is_empty() {
        logical
    } else {
        "Unknown"
    };
    name.to_string()
}

/// Adds `join_type`/`join_method`/`agg_method` derived from the operator names
fn annotate_join_or_aggregate(physical: &str, logical: &str, fields: &mut Map<String, Value>) {
    let phys = physical.to_lowercase();
    let logical = logical.to_lowercase();

    if phys.contains("join") || logical.contains("join") {
        let join_type = [
            ("left anti", "leftanti"),
            ("right anti", "rightanti"),
            ("left semi", "leftsemi"),
            ("right semi", "rightsemi"),
            ("inner", "inner"),
            ("left outer", "leftouter"),
            ("right outer", "rightouter"),
            ("full outer", "fullouter"),
            ("cross", "cross"),
            ("semi", "semi"),
            ("anti", "anti"),
        ]
        .iter()
        .find(|(needle, _)| logical.contains(needle))
        .map(|(_, join_type)| *join_type);
        fields.insert("join_type".to_string(), json!(join_type));

        let join_method = if phys.contains("hash") {
            Some("hash")
        } else if phys.contains("merge") {
            Some("merge")
        } else if phys.contains("loop") {
            Some("nl")
        } else if phys.contains("adaptive") {
            Some("adaptive")
        } else {
            None
        };
        if let Some(method) = join_method {
            fields.insert("join_method".to_string(), json!(method));
        }
    }

    if phys.contains("aggregate") || logical.contains("aggregate") || logical.contains("distinct") {
        let agg_method = if phys.contains("hash") {
            Some("hash")
        } else if phys.contains("stream") {
            Some("stream")
        } else {
            None
        };
        if let Some(method) = agg_method {
            fields.insert("agg_method".to_string(), json!(method));
        }
    }
}

fn is_element(node: roxmltree::Node<'_, '_>, tag: &str) -> bool {
    node.is_element() && node.tag_name().name() == tag
}

fn child_element<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    tag: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children().find(|child| is_element(*child, tag))
}

fn descendant_element<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    tag: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.descendants().skip(1).find(|child| is_element(*child, tag))
}

/// Nearest `RelOp` descendants of a `RelOp`, in document order
fn child_relops<'a, 'input>(
    relop: roxmltree::Node<'a, 'input>,
) -> Vec<roxmltree::Node<'a, 'input>> {
    let mut found = Vec::new();
    let mut stack: Vec<_> = relop.children().filter(|node| node.is_element()).collect();
    stack.reverse();
    while let Some(node) = stack.pop() {
        if is_element(node, "RelOp") {
            found.push(node);
        } else {
            let start = stack.len();
            stack.extend(node.children().filter(|child| child.is_element()));
            stack[start..].reverse();
        }
    }
    found
}

fn xml_node(
    relop: roxmltree::Node<'_, '_>,
    depth: usize,
    options: &ParserOptions,
) -> Result<ShowplanNode> {
    if depth > options.max_depth {
        return Err(PlanError::DepthLimitExceeded(options.max_depth));
    }

    let physical = relop.attribute("PhysicalOp").unwrap_or("Unknown").to_string();
    let logical = relop
        .attribute("LogicalOp")
        .map_or_else(|| physical.clone(), str::to_string);

    let mut fields = Map::new();
    fields.insert("PhysicalOp".to_string(), json!(physical));
    fields.insert("LogicalOp".to_string(), json!(logical));
    annotate_join_or_aggregate(&physical, &logical, &mut fields);
    if let Some(limit) = xml_limit(relop) {
        fields.insert("limit".to_string(), json!(limit));
    }
    if let Some(object) = xml_object(relop) {
        fields.insert("object".to_string(), object);
    }

    let children = child_relops(relop)
        .into_iter()
        .map(|child| xml_node(child, depth + 1, options))
        .collect::<Result<Vec<_>>>()?;

    Ok(ShowplanNode {
        node_id: relop
            .attribute("NodeId")
            .and_then(|id| id.trim().parse().ok()),
        estimate_rows: relop.attribute("EstimateRows").and_then(parse_u64),
        actual_rows: xml_actual_rows(relop),
        raw: options
            .include_system_representation
            .then(|| xml_representation(relop)),
        physical_op: physical,
        logical_op: logical,
        fields: Value::Object(fields),
        children,
    })
}

/// `Top@RowCount`, else the constant of the TOP expression, else `TopSort@Rows`
fn xml_limit(relop: roxmltree::Node<'_, '_>) -> Option<u64> {
    if let Some(top) = child_element(relop, "Top") {
        return top.attribute("RowCount").and_then(parse_u64).or_else(|| {
            descendant_element(top, "TopExpression")
                .and_then(|expression| descendant_element(expression, "Const"))
                .and_then(|constant| constant.attribute("ConstValue"))
                .and_then(|value| parse_u64(value.trim_matches(|c| c == '(' || c == ')')))
        });
    }
    child_element(relop, "TopSort")
        .and_then(|top_sort| top_sort.attribute("Rows"))
        .and_then(parse_u64)
}

fn xml_actual_rows(relop: roxmltree::Node<'_, '_>) -> Option<u64> {
    if let Some(rows) = relop.attribute("ActualRows").and_then(parse_u64) {
        return Some(rows);
    }
    let counters: Vec<u64> = child_element(relop, "RunTimeInformation")?
        .children()
        .filter(|child| is_element(*child, "RunTimeCountersPerThread"))
        .filter_map(|thread| thread.attribute("ActualRows").and_then(parse_u64))
        .collect();
    if counters.is_empty() {
        None
    } else {
        Some(counters.iter().sum())
    }
}

fn xml_object(relop: roxmltree::Node<'_, '_>) -> Option<Value> {
    let access = relop.children().find(|child| {
        OBJECT_ELEMENTS
            .iter()
            .any(|tag| is_element(*child, tag))
    })?;
    let object = child_element(access, "Object")?;
    Some(Value::Object(attributes(object)))
}

fn attributes(node: roxmltree::Node<'_, '_>) -> Map<String, Value> {
    node.attributes()
        .map(|attribute| (attribute.name().to_string(), json!(attribute.value())))
        .collect()
}

fn xml_representation(relop: roxmltree::Node<'_, '_>) -> Value {
    json!({
        "element": relop.tag_name().name(),
        "attributes": attributes(relop),
    })
}

fn rows_from_json(payload: &Value) -> Result<Vec<ShowplanRow>> {
    let Value::Array(items) = payload else {
        return Err(PlanError::MalformedPlan(
            "showplan rows must be a JSON array".to_string(),
        ));
    };

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Array(columns) => match ShowplanRow::from_columns(columns) {
                Some(row) => rows.push(row),
                None => tracing::debug!(columns = columns.len(), "skipping short showplan row"),
            },
            Value::Object(_) => rows.push(ShowplanRow::deserialize(item)?),
            other => tracing::debug!(%other, "skipping non-row showplan entry"),
        }
    }
    Ok(rows)
}

/// Parent/child index over SHOWPLAN_ALL rows
struct RowTree<'a> {
    rows: HashMap<i64, &'a ShowplanRow>,
    children: HashMap<i64, Vec<i64>>,
    root: Option<i64>,
}

impl<'a> RowTree<'a> {
    fn new(rows: &'a [ShowplanRow]) -> Self {
        let mut by_id = HashMap::new();
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut root = None;

        for row in rows.iter().filter(|row| row.is_plan_row()) {
            let Some(node_id) = row.node_id() else {
                tracing::debug!(node_id = ?row.node_id, "skipping showplan row without node id");
                continue;
            };
            if by_id.contains_key(&node_id) {
                tracing::warn!(node_id, "duplicate showplan node id, keeping the first row");
                continue;
            }
            by_id.insert(node_id, row);

            match row.parent_id() {
                Some(parent) => children.entry(parent).or_default().push(node_id),
                None => {
                    root.get_or_insert(node_id);
                }
            }
        }

        let root = root.or_else(|| by_id.keys().min().copied());
        Self {
            rows: by_id,
            children,
            root,
        }
    }

    fn materialize(&self, options: &ParserOptions) -> Result<ShowplanNode> {
        let root = self.root.ok_or_else(|| {
            PlanError::MalformedPlan("no root node identified in showplan rows".to_string())
        })?;
        let mut visited = HashSet::new();
        self.node(root, 1, options, &mut visited)
    }

    fn node(
        &self,
        node_id: i64,
        depth: usize,
        options: &ParserOptions,
        visited: &mut HashSet<i64>,
    ) -> Result<ShowplanNode> {
        if depth > options.max_depth {
            return Err(PlanError::DepthLimitExceeded(options.max_depth));
        }
        visited.insert(node_id);

        let row = self.rows.get(&node_id).ok_or_else(|| {
            PlanError::MalformedPlan(format!("showplan node {node_id} has no row"))
        })?;

        let mut children = Vec::new();
        for child_id in self.children.get(&node_id).into_iter().flatten() {
            // rows referencing an ancestor would otherwise recurse forever
            if visited.contains(child_id) {
                tracing::warn!(node_id = child_id, "showplan rows contain a cycle, dropping edge");
                continue;
            }
            children.push(self.node(*child_id, depth + 1, options, visited)?);
        }

        let raw = if options.include_system_representation {
            Some(serde_json::to_value(row)?)
        } else {
            None
        };
        Ok(row_node(node_id, row, raw, children))
    }
}

fn row_node(
    node_id: i64,
    row: &ShowplanRow,
    raw: Option<Value>,
    children: Vec<ShowplanNode>,
) -> ShowplanNode {
    let physical = row.physical_op.clone().unwrap_or_default();
    let logical = row.logical_op.clone().unwrap_or_default();

    let mut fields = Map::new();
    fields.insert("PhysicalOp".to_string(), json!(physical));
    fields.insert("LogicalOp".to_string(), json!(logical));
    fields.insert("Argument".to_string(), json!(row.argument));
    fields.insert("DefinedValues".to_string(), json!(row.defined_values));
    fields.insert("EstimateRows".to_string(), json!(row.estimate_rows));
    fields.insert("Rows".to_string(), json!(row.rows));
    if let Some(argument) = row.argument.as_deref() {
        if let Some(limit) = TOP_REGEX
            .captures(argument)
            .and_then(|captures| parse_u64(&captures[1]))
        {
            fields.insert("limit".to_string(), json!(limit));
        }
        if let Some(object) = argument_object(argument) {
            fields.insert("object".to_string(), object);
        }
    }
    annotate_join_or_aggregate(&physical, &logical, &mut fields);

    ShowplanNode {
        node_id: Some(node_id),
        estimate_rows: row.estimate_rows.as_deref().and_then(parse_u64),
        actual_rows: row.rows.as_deref().and_then(parse_u64),
        raw,
        physical_op: physical,
        logical_op: logical,
        fields: Value::Object(fields),
        children,
    }
}

/// Object reference of a SHOWPLAN_ALL argument
fn argument_object(argument: &str) -> Option<Value> {
    if let Some(captures) = QUALIFIED_OBJECT_REGEX.captures(argument) {
        return Some(json!({
            "Database": &captures[1],
            "Schema": &captures[2],
            "Table": &captures[3],
        }));
    }
    OBJECT_REGEX
        .captures(argument)
        .map(|captures| json!(captures[1].trim()))
}

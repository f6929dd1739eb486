//! Tests for the Plan Tree Model

use super::*;
use crate::operator::{OperatorData, RESULT_OPERATOR_ID};
use pretty_assertions::assert_eq;
use serde_json::json;

fn leaf(operator_type: OperatorType, id: i64, rows: Option<u64>) -> PlanNode {
    PlanNode::from_parts(
        QueryOperator::empty(operator_type, id),
        Cardinality::new(rows, None),
        Vec::new(),
        None,
    )
}

fn inner(operator_type: OperatorType, id: i64, children: Vec<PlanNode>) -> PlanNode {
    PlanNode::from_parts(
        QueryOperator::empty(operator_type, id),
        Cardinality::default(),
        children,
        None,
    )
}

#[test]
fn test_cardinality_fallbacks() {
    assert_eq!(
        Cardinality::new(Some(10), None),
        Cardinality {
            estimated: Some(10),
            exact: Some(10)
        }
    );
    assert_eq!(
        Cardinality::new(None, Some(4)),
        Cardinality {
            estimated: Some(4),
            exact: Some(4)
        }
    );
    assert_eq!(
        Cardinality::new(Some(10), Some(4)),
        Cardinality {
            estimated: Some(10),
            exact: Some(4)
        }
    );
    assert_eq!(Cardinality::new(None, None), Cardinality::default());
}

#[test]
fn test_from_parts_picks_variant_by_children() {
    let scan = leaf(OperatorType::TableScan, 1, Some(5));
    assert!(scan.is_leaf());
    assert!(scan.children().is_empty());

    let sort = inner(OperatorType::Sort, 0, vec![scan]);
    assert!(!sort.is_leaf());
    assert_eq!(sort.children().len(), 1);
}

#[test]
fn test_query_plan_wraps_result_root() {
    let top = leaf(OperatorType::GroupBy, 0, Some(10));
    let plan = QueryPlan::new("select 1", top, None);

    assert_eq!(plan.text, "select 1");
    assert!(matches!(plan.plan, PlanNode::Inner(_)));
    assert_eq!(plan.plan.operator().operator_id, RESULT_OPERATOR_ID);
    assert_eq!(plan.plan.operator_type(), OperatorType::Result);
    assert_eq!(plan.plan.children().len(), 1);
    assert_eq!(plan.plan.estimated_cardinality(), Some(10));
    assert_eq!(plan.plan.exact_cardinality(), Some(10));
    assert_eq!(
        plan.top().map(PlanNode::operator_type),
        Some(OperatorType::GroupBy)
    );
}

#[test]
fn test_plan_traversal_is_pre_order() {
    // Join
    //  ├─ TableScan(2)
    //  └─ Select(3)
    //      └─ TableScan(4)
    let tree = inner(
        OperatorType::Join,
        1,
        vec![
            leaf(OperatorType::TableScan, 2, None),
            inner(
                OperatorType::Select,
                3,
                vec![leaf(OperatorType::TableScan, 4, None)],
            ),
        ],
    );
    let plan = QueryPlan::new("q", tree, None);

    let ids: Vec<i64> = plan
        .iter_nodes()
        .map(|node| node.operator().operator_id)
        .collect();
    assert_eq!(ids, vec![-1, 1, 2, 3, 4]);
    assert_eq!(plan.plan.node_count(), 5);
    assert_eq!(plan.plan.depth(), 4);
    assert_eq!(plan.find_operators(OperatorType::TableScan).len(), 2);
    assert_eq!(plan.find_operators(OperatorType::Window).len(), 0);
}

#[test]
fn test_system_representation_is_optional_in_json() {
    let with_repr = PlanNode::from_parts(
        QueryOperator::empty(OperatorType::Map, 0),
        Cardinality::default(),
        Vec::new(),
        Some(json!({"Node Type": "Expression"})),
    );
    assert_eq!(
        with_repr.system_representation(),
        Some(&json!({"Node Type": "Expression"}))
    );

    let plan = QueryPlan::new("q", leaf(OperatorType::TableScan, 0, Some(3)), None);
    let encoded = plan.to_json().expect("serialize");
    assert_eq!(
        encoded,
        json!({
            "text": "q",
            "plan": {
                "node_type": "inner",
                "operator": {"operator_id": -1, "operator_type": "Result"},
                "estimated_cardinality": 3,
                "exact_cardinality": 3,
                "children": [{
                    "node_type": "leaf",
                    "operator": {
                        "operator_id": 0,
                        "operator_type": "TableScan",
                        "table_name": null,
                        "table_size": null,
                        "type": null
                    },
                    "estimated_cardinality": 3,
                    "exact_cardinality": 3
                }]
            }
        })
    );
}

#[test]
fn test_query_plan_deserializes_from_encoding() {
    let plan = QueryPlan::new(
        "q",
        inner(
            OperatorType::Sort,
            0,
            vec![leaf(OperatorType::TableScan, 1, Some(2))],
        ),
        None,
    );
    let encoded = serde_json::to_string(&plan).expect("serialize");
    let decoded: QueryPlan = serde_json::from_str(&encoded).expect("deserialize");
    assert_eq!(decoded, plan);
    assert!(matches!(
        decoded.top().map(|node| &node.operator().data),
        Some(OperatorData::Sort(_))
    ));
}

//! Tests for the operator taxonomy

use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;

fn filled(operator_type: OperatorType, plan: Value, dbms: DbmsType) -> QueryOperator {
    let mut operator = QueryOperator::empty(operator_type, 1);
    operator.fill(&plan, dbms);
    operator
}

fn join_of(operator: &QueryOperator) -> &Join {
    match &operator.data {
        OperatorData::Join(join) => join,
        other => panic!("expected join, got {other:?}"),
    }
}

fn scan_of(operator: &QueryOperator) -> &TableScan {
    match &operator.data {
        OperatorData::TableScan(scan) => scan,
        other => panic!("expected table scan, got {other:?}"),
    }
}

fn group_by_method(operator: &QueryOperator) -> Option<GroupByMethod> {
    match &operator.data {
        OperatorData::GroupBy(group_by) => group_by.method,
        other => panic!("expected group by, got {other:?}"),
    }
}

#[test]
fn test_dbms_type_names() {
    for dbms in DbmsType::ALL {
        assert_eq!(DbmsType::parse(dbms.as_str()), Some(dbms));
    }
    assert_eq!(DbmsType::parse("ClickHouse"), Some(DbmsType::ClickHouse));
    assert_eq!(DbmsType::parse("oracle"), None);
    assert_eq!(DbmsType::SqlServer.to_string(), "sqlserver");
    assert_eq!(
        serde_json::to_value(DbmsType::DuckDB).expect("serialize"),
        json!("duckdb")
    );
}

#[test]
fn test_empty_operator_kinds_round_trip() {
    let kinds = [
        OperatorType::Result,
        OperatorType::TableScan,
        OperatorType::InlineTable,
        OperatorType::Temp,
        OperatorType::PipelineBreakerScan,
        OperatorType::Select,
        OperatorType::Map,
        OperatorType::Sort,
        OperatorType::GroupBy,
        OperatorType::Join,
        OperatorType::GroupJoin,
        OperatorType::EarlyProbe,
        OperatorType::SetOperation,
        OperatorType::Window,
        OperatorType::Iteration,
        OperatorType::IterationScan,
        OperatorType::ArrayUnnest,
        OperatorType::RegexSplit,
        OperatorType::Subquery,
        OperatorType::CustomOperator,
    ];
    for kind in kinds {
        assert_eq!(QueryOperator::empty(kind, 3).operator_type(), kind);
    }
}

#[test]
fn test_result_operator_uses_sentinel_id() {
    let result = QueryOperator::result();
    assert_eq!(result.operator_id, RESULT_OPERATOR_ID);
    assert_eq!(result.operator_type(), OperatorType::Result);
}

#[test]
fn test_unsupported_keeps_raw_name() {
    let operator = QueryOperator::unsupported(DbmsType::ClickHouse, "CreatingSets (x)", 4);
    assert_eq!(operator.operator_type(), OperatorType::CustomOperator);
    assert_eq!(operator.custom_name(), Some("CreatingSets (x)"));
    assert!(!operator.is_limit());
}

#[test]
fn test_is_limit() {
    assert!(QueryOperator::custom("Limit", 1).is_limit());
    assert!(QueryOperator::custom("Top", 1).is_limit());
    assert!(QueryOperator::custom("TOP", 1).is_limit());
    assert!(!QueryOperator::custom("LimitBy", 1).is_limit());
    assert!(!QueryOperator::empty(OperatorType::Sort, 1).is_limit());
}

#[test]
fn test_join_type_parse() {
    assert_eq!(JoinType::parse("Inner"), Some(JoinType::Inner));
    assert_eq!(JoinType::parse("LEFT"), Some(JoinType::LeftOuter));
    assert_eq!(JoinType::parse("Left Outer Join"), Some(JoinType::LeftOuter));
    assert_eq!(JoinType::parse("right_semi"), Some(JoinType::RightSemi));
    assert_eq!(JoinType::parse("leftanti"), Some(JoinType::LeftAnti));
    assert_eq!(JoinType::parse("Left Anti Semi Join"), Some(JoinType::LeftAnti));
    assert_eq!(JoinType::parse("Full"), Some(JoinType::FullOuter));
    assert_eq!(JoinType::parse("sideways"), None);
}

#[test]
fn test_method_parse() {
    assert_eq!(JoinMethod::parse("Nested Loops"), Some(JoinMethod::Nl));
    assert_eq!(JoinMethod::parse("ternaryhash"), Some(JoinMethod::TernaryHash));
    assert_eq!(JoinMethod::parse("zigzag"), None);
    assert_eq!(GroupByMethod::parse("Hashed"), Some(GroupByMethod::Hash));
    assert_eq!(GroupByMethod::parse("stream"), Some(GroupByMethod::Stream));
    assert_eq!(GroupByMethod::parse("plain"), None);
}

#[test]
fn test_fill_table_scan_per_engine() {
    let umbra = filled(
        OperatorType::TableScan,
        json!({"tablename": "lineitem", "tableSize": 6001215}),
        DbmsType::Umbra,
    );
    assert_eq!(scan_of(&umbra).table_name.as_deref(), Some("lineitem"));
    assert_eq!(scan_of(&umbra).table_size, Some(6001215));

    let hyper = filled(
        OperatorType::TableScan,
        json!({"debugName": {"value": "orders"}}),
        DbmsType::Hyper,
    );
    assert_eq!(scan_of(&hyper).table_name.as_deref(), Some("orders"));

    let postgres = filled(
        OperatorType::TableScan,
        json!({"Node Type": "Index Only Scan", "Relation Name": "part"}),
        DbmsType::Postgres,
    );
    assert_eq!(scan_of(&postgres).table_name.as_deref(), Some("part"));
    assert_eq!(scan_of(&postgres).scan_type, Some(ScanType::Index));

    let duckdb = filled(
        OperatorType::TableScan,
        json!({"extra_info": {"Table": "nation"}}),
        DbmsType::DuckDB,
    );
    assert_eq!(scan_of(&duckdb).table_name.as_deref(), Some("nation"));
}

#[test]
fn test_fill_missing_fields_degrade_to_none() {
    for dbms in DbmsType::ALL {
        for kind in [
            OperatorType::TableScan,
            OperatorType::Sort,
            OperatorType::Join,
            OperatorType::GroupJoin,
            OperatorType::EarlyProbe,
            OperatorType::PipelineBreakerScan,
        ] {
            let operator = filled(kind, json!({}), dbms);
            assert_eq!(operator.limit(), None);
            if let OperatorData::TableScan(scan) = &operator.data {
                assert_eq!(scan.table_name, None);
            }
        }
    }
}

#[test]
fn test_fill_clickhouse_table_name_sources() {
    let storage = filled(
        OperatorType::TableScan,
        json!({"Storage": {"Table": "db.hits.idx.extra"}}),
        DbmsType::ClickHouse,
    );
    assert_eq!(scan_of(&storage).table_name.as_deref(), Some("db.hits.idx"));

    let flat = filled(
        OperatorType::TableScan,
        json!({"Table": "visits"}),
        DbmsType::ClickHouse,
    );
    assert_eq!(scan_of(&flat).table_name.as_deref(), Some("visits"));

    let description = filled(
        OperatorType::TableScan,
        json!({"Description": "  clickhouse.events "}),
        DbmsType::ClickHouse,
    );
    assert_eq!(scan_of(&description).table_name.as_deref(), Some("events"));
}

#[test]
fn test_fill_sqlserver_table_name_keeps_base_segment() {
    let object = filled(
        OperatorType::TableScan,
        json!({"object": {"Database": "[tpch]", "Schema": "[dbo]", "Table": "[lineitem]"}}),
        DbmsType::SqlServer,
    );
    assert_eq!(scan_of(&object).table_name.as_deref(), Some("lineitem"));

    let bare = filled(
        OperatorType::TableScan,
        json!({"object": "([orders])"}),
        DbmsType::SqlServer,
    );
    assert_eq!(scan_of(&bare).table_name.as_deref(), Some("orders"));
}

#[test]
fn test_fill_group_by_methods() {
    assert_eq!(
        group_by_method(&filled(OperatorType::GroupBy, json!({}), DbmsType::Umbra)),
        Some(GroupByMethod::Hash)
    );
    assert_eq!(
        group_by_method(&filled(
            OperatorType::GroupBy,
            json!({"Node Type": "Aggregate", "Strategy": "Sorted"}),
            DbmsType::Postgres
        )),
        Some(GroupByMethod::Stream)
    );
    assert_eq!(
        group_by_method(&filled(
            OperatorType::GroupBy,
            json!({"Node Type": "Aggregate", "Strategy": "Plain"}),
            DbmsType::Postgres
        )),
        None
    );
    assert_eq!(
        group_by_method(&filled(
            OperatorType::GroupBy,
            json!({"operator_type": "PERFECT_HASH_GROUP_BY"}),
            DbmsType::DuckDB
        )),
        Some(GroupByMethod::Hash)
    );
    // no explicit method stays unknown
    assert_eq!(
        group_by_method(&filled(
            OperatorType::GroupBy,
            json!({"Node Type": "Aggregating"}),
            DbmsType::ClickHouse
        )),
        None
    );
}

#[test]
fn test_fill_join_umbra_and_hyper() {
    let umbra = filled(
        OperatorType::Join,
        json!({"physicalOperator": "indexnljoin"}),
        DbmsType::Umbra,
    );
    assert_eq!(join_of(&umbra).join_type, Some(JoinType::Inner));
    assert_eq!(join_of(&umbra).method, Some(JoinMethod::Index));

    let hyper = filled(
        OperatorType::Join,
        json!({"operator": "leftsemijoin", "method": "hash"}),
        DbmsType::Hyper,
    );
    assert_eq!(join_of(&hyper).join_type, Some(JoinType::LeftSemi));
    assert_eq!(join_of(&hyper).method, Some(JoinMethod::Hash));

    let hyper_inner = filled(OperatorType::Join, json!({"operator": "join"}), DbmsType::Hyper);
    assert_eq!(join_of(&hyper_inner).join_type, Some(JoinType::Inner));
}

#[test]
fn test_fill_join_duckdb_swaps_sides() {
    let left = filled(
        OperatorType::Join,
        json!({"operator_type": "HASH_JOIN", "extra_info": {"Join Type": "LEFT"}}),
        DbmsType::DuckDB,
    );
    assert_eq!(join_of(&left).join_type, Some(JoinType::RightOuter));
    assert_eq!(join_of(&left).method, Some(JoinMethod::Hash));

    let merge = filled(
        OperatorType::Join,
        json!({"operator_type": "PIECEWISE_MERGE_JOIN", "extra_info": {"Join Type": "RIGHT_SEMI"}}),
        DbmsType::DuckDB,
    );
    assert_eq!(join_of(&merge).join_type, Some(JoinType::LeftSemi));
    assert_eq!(join_of(&merge).method, Some(JoinMethod::Merge));

    let cross = filled(
        OperatorType::Join,
        json!({"operator_type": "CROSS_PRODUCT"}),
        DbmsType::DuckDB,
    );
    assert_eq!(join_of(&cross).join_type, Some(JoinType::Cross));
}

#[test]
fn test_fill_join_clickhouse_description_order() {
    // "left" is checked before "semi"
    let left_semi = filled(
        OperatorType::Join,
        json!({"Description": "LEFT SEMI JOIN", "Algorithm": "HashJoin"}),
        DbmsType::ClickHouse,
    );
    assert_eq!(join_of(&left_semi).join_type, Some(JoinType::LeftOuter));
    assert_eq!(join_of(&left_semi).method, Some(JoinMethod::Hash));

    let structured = filled(
        OperatorType::Join,
        json!({"Join": "FULL", "Description": "left"}),
        DbmsType::ClickHouse,
    );
    assert_eq!(join_of(&structured).join_type, Some(JoinType::FullOuter));

    let anonymous = filled(
        OperatorType::Join,
        json!({"Description": "JOIN", "algorithm": "full_sorting_merge"}),
        DbmsType::ClickHouse,
    );
    assert_eq!(join_of(&anonymous).join_type, Some(JoinType::Inner));
    assert_eq!(join_of(&anonymous).method, Some(JoinMethod::Merge));

    let bare = filled(OperatorType::Join, json!({}), DbmsType::ClickHouse);
    assert_eq!(join_of(&bare).join_type, None);
    assert_eq!(join_of(&bare).method, None);
}

#[test]
fn test_fill_sort_limits() {
    let clickhouse = filled(OperatorType::Sort, json!({"Limit": "25"}), DbmsType::ClickHouse);
    assert_eq!(clickhouse.limit(), Some(25));

    let duckdb = filled(
        OperatorType::Sort,
        json!({"extra_info": {"Top": "10"}}),
        DbmsType::DuckDB,
    );
    assert_eq!(duckdb.limit(), Some(10));

    let garbage = filled(OperatorType::Sort, json!({"limit": "lots"}), DbmsType::Hyper);
    assert_eq!(garbage.limit(), None);
}

#[test]
fn test_fill_custom_limit_only_for_limit_names() {
    let mut limit = QueryOperator::custom("Limit", 2);
    limit.fill(&json!({"Limit": 5}), DbmsType::ClickHouse);
    assert_eq!(limit.limit(), Some(5));

    let mut top = QueryOperator::custom("Top", 2);
    top.fill(&json!({"limit": 3}), DbmsType::SqlServer);
    assert_eq!(top.limit(), Some(3));

    let mut other = QueryOperator::custom("Exchange", 2);
    other.fill(&json!({"Limit": 5}), DbmsType::ClickHouse);
    assert_eq!(other.limit(), None);
}

#[test]
fn test_fill_set_operation_keeps_creation_type() {
    let mut union = QueryOperator::set_operation("union", 1);
    union.fill(&json!({}), DbmsType::ClickHouse);
    assert_eq!(
        union.data,
        OperatorData::SetOperation(SetOperation {
            operation: Some("union".to_string()),
            active: true,
        })
    );

    let postgres = filled(
        OperatorType::SetOperation,
        json!({"Node Type": "SetOp", "Command": "Except All"}),
        DbmsType::Postgres,
    );
    assert_eq!(
        postgres.data,
        OperatorData::SetOperation(SetOperation {
            operation: Some("exceptall".to_string()),
            active: true,
        })
    );
}

#[test]
fn test_fill_pipeline_breaker_and_probe() {
    let hyper = filled(
        OperatorType::PipelineBreakerScan,
        json!({"input": {"operatorId": 9}}),
        DbmsType::Hyper,
    );
    assert_eq!(
        hyper.data,
        OperatorData::PipelineBreakerScan(PipelineBreakerScan {
            scanned_id: Some(9)
        })
    );

    let probe = filled(OperatorType::EarlyProbe, json!({"builder": 4}), DbmsType::Hyper);
    assert_eq!(
        probe.data,
        OperatorData::EarlyProbe(EarlyProbe { source: Some(4) })
    );

    let group_join = filled(
        OperatorType::GroupJoin,
        json!({"behavior": "inner", "physicalOperator": "hashgroupjoin"}),
        DbmsType::Umbra,
    );
    assert_eq!(
        group_join.data,
        OperatorData::GroupJoin(GroupJoin {
            join_type: Some("inner".to_string()),
            method: Some("hash".to_string()),
        })
    );
}

#[test]
fn test_operator_serialization_shape() {
    let mut join = QueryOperator::empty(OperatorType::Join, 7);
    join.fill(
        &json!({"join_type": "inner", "join_method": "hash"}),
        DbmsType::SqlServer,
    );
    assert_eq!(
        serde_json::to_value(&join).expect("serialize"),
        json!({
            "operator_id": 7,
            "operator_type": "Join",
            "type": "inner",
            "method": "hash"
        })
    );

    assert_eq!(
        serde_json::to_value(QueryOperator::result()).expect("serialize"),
        json!({"operator_id": -1, "operator_type": "Result"})
    );
}

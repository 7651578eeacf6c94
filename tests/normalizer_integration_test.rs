// ==========================================
// 电力结算报表归一化系统 - 归一化引擎集成测试
// ==========================================
// 覆盖: JSON 覆盖配置贯通归一化器、多表并集合并
// ==========================================

use std::fs;
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use dsm_consolidator::config::{ColumnRoleLexicon, StationRegistry};
use dsm_consolidator::domain::{CellValue, DocumentRef, PeriodKey, RawTable};
use dsm_consolidator::engine::{PartitionedConsolidator, TableNormalizer};

fn doc_ref(file_name: &str) -> DocumentRef {
    DocumentRef {
        source_id: "SRPC".to_string(),
        file_name: file_name.to_string(),
        locator: format!("/tmp/{}", file_name),
    }
}

fn raw_table(file_name: &str, declared_name: &str, rows: Vec<Vec<&str>>) -> RawTable {
    RawTable {
        doc_ref: doc_ref(file_name),
        declared_name: declared_name.to_string(),
        rows: rows
            .into_iter()
            .map(|r| r.into_iter().map(|c| c.to_string()).collect())
            .collect(),
    }
}

fn week_period() -> PeriodKey {
    PeriodKey {
        source_id: "SRPC".to_string(),
        period_start: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        period_end: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        sequence_no: 10,
    }
}

// ==========================================
// 测试1: 注册表 JSON 覆盖贯通实体解析与区域标注
// ==========================================
#[test]
fn test_registry_override_flows_through_normalizer() {
    let dir = TempDir::new().unwrap();
    let registry_path = dir.path().join("stations.json");
    fs::write(
        &registry_path,
        r#"{
            "aliases": {"XYZ Thermal Plant": "XYZ_TPS"},
            "regions": {"XYZ_TPS": {"state": "Telangana", "regional_group": "SR"}}
        }"#,
    )
    .unwrap();

    let registry = Arc::new(StationRegistry::from_json_file(&registry_path).unwrap());
    let lexicon = Arc::new(ColumnRoleLexicon::builtin());
    let normalizer = TableNormalizer::new(lexicon, registry, 10, 100.0).unwrap();

    let table = raw_table(
        "dsm_040324-100324.csv",
        "dsm_payable",
        vec![
            vec!["Date", "Entity", "DSM Payable"],
            vec!["2024-03-04", "XYZ Thermal Plant", "100.5"],
            vec!["2024-03-05", "XYZ Thermal Plant", "98.0"],
        ],
    );

    let outcome = normalizer.normalize_table(&table);
    assert_eq!(outcome.tables.len(), 1, "别名折叠后应只有一个实体组");
    assert_eq!(outcome.dropped_rows, 0);

    let normalized = &outcome.tables[0];
    assert_eq!(normalized.entity_id, "XYZ_TPS", "覆盖别名应折叠到规范 ID");
    assert_eq!(
        normalized.columns,
        vec!["Date", "Entity", "DSM Payable", "state", "regional_group"]
    );
    let last = normalized.columns.len() - 1;
    assert_eq!(
        normalized.rows[0].cells[last - 1],
        CellValue::Text("Telangana".to_string()),
        "覆盖区域表应给出州名"
    );
    assert_eq!(
        normalized.rows[0].cells[last],
        CellValue::Text("SR".to_string())
    );
}

// ==========================================
// 测试2: 词典 JSON 覆盖扩展电量列识别与单位归一
// ==========================================
#[test]
fn test_lexicon_override_rescales_custom_energy_column() {
    let dir = TempDir::new().unwrap();
    let lexicon_path = dir.path().join("roles.json");
    fs::write(
        &lexicon_path,
        r#"{"roles": {"ENERGY": ["export", "kwh", "mwh"]}}"#,
    )
    .unwrap();

    let registry = Arc::new(StationRegistry::builtin());
    let lexicon = Arc::new(ColumnRoleLexicon::from_json_file(&lexicon_path).unwrap());
    let normalizer = TableNormalizer::new(lexicon, registry, 10, 100.0).unwrap();

    let table = raw_table(
        "injection_040324-100324.csv",
        "injection_actuals",
        vec![
            vec!["Station : XYZ TPS"],
            vec!["Date", "Export (KWH)"],
            vec!["2024-03-04", "150000"],
            vec!["2024-03-05", "250000"],
            vec!["2024-03-06", "50000"],
        ],
    );

    let outcome = normalizer.normalize_table(&table);
    assert_eq!(outcome.tables.len(), 1);

    let normalized = &outcome.tables[0];
    assert_eq!(normalized.entity_id, "XYZ_TPS", "行内标记应给出实体");
    assert_eq!(
        normalized.columns[1], "Export (MWH)",
        "覆盖词典命中的电量列应换算并改写标签"
    );
    assert_eq!(normalized.rows[0].cells[1], CellValue::Number(150.0));
    assert_eq!(normalized.rows[2].cells[1], CellValue::Number(50.0));
}

// ==========================================
// 测试3: 同实体多表合并为并集列分区
// ==========================================
#[test]
fn test_multi_sheet_document_consolidates_union_schema() {
    let registry = Arc::new(StationRegistry::builtin());
    let lexicon = Arc::new(ColumnRoleLexicon::builtin());
    let normalizer = TableNormalizer::new(lexicon, registry, 10, 100.0).unwrap();

    let payable = raw_table(
        "dsm_040324-100324.xlsx",
        "dsm_payable",
        vec![
            vec!["Date", "Entity", "DSM Payable"],
            vec!["2024-03-04", "xyz tps", "100.5"],
        ],
    );
    let actuals = raw_table(
        "dsm_040324-100324.xlsx",
        "injection_actuals",
        vec![
            vec!["Date", "Entity", "Actual (MWH)"],
            vec!["2024-03-05", "xyz tps", "48.0"],
        ],
    );

    let period = week_period();
    let run_clock = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
    let mut consolidator = PartitionedConsolidator::new(run_clock);
    for table in normalizer
        .normalize_table(&payable)
        .tables
        .iter()
        .chain(normalizer.normalize_table(&actuals).tables.iter())
    {
        consolidator.merge_table(table, &period);
    }

    let partitions = consolidator.finish();
    assert_eq!(partitions.len(), 1, "同实体同月应落入同一分区");

    let partition = &partitions[0].partition;
    assert_eq!(partition.key.entity_id, "XYZ_TPS");
    assert_eq!(partition.key.year, 2024);
    assert_eq!(partition.key.month, 3);
    assert_eq!(
        partition.columns,
        vec![
            "Date",
            "Entity",
            "DSM Payable",
            "state",
            "regional_group",
            "dq_inferred_period",
            "Actual (MWH)"
        ],
        "后到表的新列应追加到并集末尾"
    );
    assert_eq!(partition.rows.len(), 2);

    // 先到行在后补列处补空,后到行在先有列处补空
    let actual_idx = partition.columns.len() - 1;
    let payable_idx = 2;
    assert_eq!(partition.rows[0][payable_idx], CellValue::Number(100.5));
    assert_eq!(partition.rows[0][actual_idx], CellValue::Empty);
    assert_eq!(partition.rows[1][payable_idx], CellValue::Empty);
    assert_eq!(partition.rows[1][actual_idx], CellValue::Number(48.0));
}

// ==========================================
// 电力结算报表归一化系统 - 表格归一化器
// ==========================================
// 职责: 串联分类/表头定位/实体解析/单位换算,产出 NormalizedTable
// 红线: 单表失败不影响同文档其余表;丢弃行必须计数
// ==========================================

use crate::config::column_roles::ColumnRoleLexicon;
use crate::config::station_registry::StationRegistry;
use crate::domain::document::RawTable;
use crate::domain::table::{CellValue, NormalizedRow, NormalizedTable};
use crate::domain::types::{ColumnRole, SheetType};
use crate::engine::classifier::SheetClassifier;
use crate::engine::entity_splitter::EntitySplitter;
use crate::engine::header_detector::HeaderDetector;
use crate::engine::station_resolver::StationResolver;
use crate::engine::unit_normalizer::UnitNormalizer;
use chrono::{NaiveDate, Utc};
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// 行级日期的候选格式,按常见度排列
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%Y%m%d",
    "%d-%b-%Y",
    "%d-%b-%y",
];

/// 归属邦列名
pub const STATE_COLUMN: &str = "state";
/// 区域分组列名
pub const REGION_COLUMN: &str = "regional_group";

/// 单表归一化结果
#[derive(Debug, Default)]
pub struct NormalizeOutcome {
    pub tables: Vec<NormalizedTable>,
    /// 实体过滤丢弃的行数
    pub dropped_rows: usize,
}

// ==========================================
// TableNormalizer - 表格归一化器
// ==========================================
pub struct TableNormalizer {
    classifier: SheetClassifier,
    header_detector: HeaderDetector,
    resolver: Arc<StationResolver>,
    splitter: EntitySplitter,
    unit_normalizer: UnitNormalizer,
    lexicon: Arc<ColumnRoleLexicon>,
}

impl TableNormalizer {
    pub fn new(
        lexicon: Arc<ColumnRoleLexicon>,
        registry: Arc<StationRegistry>,
        scan_depth: usize,
        unit_threshold: f64,
    ) -> Result<Self, Box<dyn Error>> {
        let resolver = Arc::new(StationResolver::new(registry, Arc::clone(&lexicon))?);
        Ok(Self {
            classifier: SheetClassifier,
            header_detector: HeaderDetector::new(Arc::clone(&lexicon), scan_depth),
            splitter: EntitySplitter::new(Arc::clone(&resolver)),
            unit_normalizer: UnitNormalizer::new(Arc::clone(&lexicon), unit_threshold),
            resolver,
            lexicon,
        })
    }

    /// 归一化一张原始表,可能拆出多张单实体表
    #[instrument(skip(self, table), fields(declared_name = %table.declared_name))]
    pub fn normalize_table(&self, table: &RawTable) -> NormalizeOutcome {
        // === 步骤 1: 分类,非实体级表直接排除 ===
        let sheet_type = self.classifier.classify(table);
        if !sheet_type.entity_scoped() {
            debug!(sheet_type = %sheet_type, "非实体级表,跳过归一化");
            return NormalizeOutcome::default();
        }

        // === 步骤 2: 表头定位与列名整理 ===
        let resolution = self.header_detector.detect(table);
        let columns = ensure_unique_columns(&resolution.columns);
        if columns.is_empty() {
            warn!(declared_name = %table.declared_name, "表头为空,跳过");
            return NormalizeOutcome::default();
        }

        // === 步骤 3: 数据行解析为类型化单元格 ===
        let mut grid: Vec<Vec<CellValue>> = Vec::with_capacity(resolution.data_rows.len());
        for raw_row in &resolution.data_rows {
            let mut cells: Vec<CellValue> =
                raw_row.iter().map(|c| CellValue::parse(c)).collect();
            if cells.iter().all(CellValue::is_empty) {
                continue;
            }
            cells.resize_with(columns.len(), || CellValue::Empty);
            grid.push(cells);
        }

        // === 步骤 4: 实体解析,优先实体列拆分 ===
        let mut dropped_rows = 0usize;
        let groups: Vec<(String, Vec<Vec<CellValue>>)> =
            if self.resolver.entity_column(&columns).is_some() {
                match self.splitter.split(&columns, grid) {
                    Some(outcome) => {
                        dropped_rows += outcome.dropped_rows;
                        outcome.groups
                    }
                    None => Vec::new(),
                }
            } else {
                // 无实体列,整表归属一个电站
                let row_count = grid.len();
                match self
                    .resolver
                    .resolve_table_entity(&resolution.preamble, &table.doc_ref.file_name)
                {
                    Some(entity_id) => vec![(entity_id, grid)],
                    None => {
                        warn!(
                            declared_name = %table.declared_name,
                            file_name = %table.doc_ref.file_name,
                            "实体解析链全部失败,整表丢弃"
                        );
                        return NormalizeOutcome {
                            tables: Vec::new(),
                            dropped_rows: row_count,
                        };
                    }
                }
            };

        // === 步骤 5: 组装单实体表,换算单位,补齐归属列 ===
        let date_col = self.date_column(&columns);
        let processed_at = Utc::now();
        let mut tables_out = Vec::with_capacity(groups.len());

        for (entity_id, rows) in groups {
            let normalized_rows: Vec<NormalizedRow> = rows
                .into_iter()
                .map(|cells| NormalizedRow {
                    date: row_date(&cells, date_col),
                    cells,
                    dq_inferred_period: false,
                })
                .collect();

            let mut normalized = NormalizedTable {
                source_id: table.doc_ref.source_id.clone(),
                source_file: table.doc_ref.file_name.clone(),
                declared_name: table.declared_name.clone(),
                sheet_type,
                entity_id: entity_id.clone(),
                columns: columns.clone(),
                rows: normalized_rows,
                processed_at,
            };

            self.unit_normalizer.normalize(&mut normalized);
            self.attach_region_columns(&mut normalized);
            tables_out.push(normalized);
        }

        debug!(
            sheet_type = %sheet_type,
            table_count = tables_out.len(),
            dropped_rows,
            "表格归一化完成"
        );

        NormalizeOutcome {
            tables: tables_out,
            dropped_rows,
        }
    }

    /// 追加电站归属的邦与区域分组列
    fn attach_region_columns(&self, table: &mut NormalizedTable) {
        let (state, regional_group) = self.resolver.region_of(&table.entity_id);
        table.columns.push(STATE_COLUMN.to_string());
        table.columns.push(REGION_COLUMN.to_string());
        for row in &mut table.rows {
            row.cells.push(CellValue::Text(state.clone()));
            row.cells.push(CellValue::Text(regional_group.clone()));
        }
    }

    /// 首个日期角色列的下标
    fn date_column(&self, columns: &[String]) -> Option<usize> {
        columns
            .iter()
            .position(|c| self.lexicon.role_of(c) == Some(ColumnRole::Date))
    }
}

/// 重名列按出现次序追加 .1/.2 后缀,空名列按下标命名
fn ensure_unique_columns(columns: &[String]) -> Vec<String> {
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut out = Vec::with_capacity(columns.len());
    for (idx, raw) in columns.iter().enumerate() {
        let base = if raw.trim().is_empty() {
            format!("column_{}", idx)
        } else {
            raw.trim().to_string()
        };
        let n = seen.entry(base.clone()).or_insert(0);
        if *n == 0 {
            out.push(base);
        } else {
            out.push(format!("{}.{}", base, n));
        }
        *n += 1;
    }
    out
}

/// 从日期列单元格解析行级日期
fn row_date(cells: &[CellValue], date_col: Option<usize>) -> Option<NaiveDate> {
    let cell = cells.get(date_col?)?;
    let text = match cell {
        CellValue::Text(s) => s.clone(),
        CellValue::Number(_) => cell.render(),
        CellValue::Empty => return None,
    };
    parse_row_date(&text)
}

/// 多格式日期解析,带时间部分时只取日期段
pub fn parse_row_date(text: &str) -> Option<NaiveDate> {
    let token = text.trim().split_whitespace().next()?;
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(token, format) {
            return Some(date);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::DocumentRef;

    fn raw_table(file_name: &str, declared_name: &str, rows: Vec<Vec<&str>>) -> RawTable {
        RawTable {
            doc_ref: DocumentRef {
                source_id: "SRPC".to_string(),
                file_name: file_name.to_string(),
                locator: format!("/tmp/{}", file_name),
            },
            declared_name: declared_name.to_string(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    fn normalizer() -> TableNormalizer {
        TableNormalizer::new(
            Arc::new(ColumnRoleLexicon::builtin()),
            Arc::new(StationRegistry::builtin()),
            10,
            100.0,
        )
        .unwrap()
    }

    #[test]
    fn test_normalize_banner_header_kwh_table() {
        let table = raw_table(
            "dsm_040324-100324.csv",
            "dsm_040324-100324",
            vec![
                vec!["Southern Regional Power Committee"],
                vec!["DSM Statement for week 04.03.2024 to 10.03.2024"],
                vec!["Date", "Time", "Block", "Stn_Name", "Actual (KWH)"],
                vec!["2024-03-04", "00:15", "1", "xyz tps", "50000"],
                vec!["2024-03-04", "00:30", "2", "xyz tps", "51000"],
                vec!["2024-03-04", "00:45", "3", "xyz tps", "52000"],
            ],
        );
        let outcome = normalizer().normalize_table(&table);

        assert_eq!(outcome.tables.len(), 1);
        assert_eq!(outcome.dropped_rows, 0);
        let t = &outcome.tables[0];
        assert_eq!(t.entity_id, "XYZ_TPS");
        assert_eq!(t.sheet_type, SheetType::EntityData);
        assert_eq!(
            t.columns,
            vec!["Date", "Time", "Block", "Stn_Name", "Actual (MWH)", "state", "regional_group"]
        );
        assert_eq!(t.rows.len(), 3);
        assert_eq!(t.rows[0].cells[4], CellValue::Number(50.0));
        assert_eq!(
            t.rows[0].date,
            Some(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap())
        );
    }

    #[test]
    fn test_normalize_splits_multi_entity() {
        let table = raw_table(
            "dsm_040324-100324.csv",
            "dsm_040324-100324",
            vec![
                vec!["Date", "Stn_Name", "Schedule (MWH)"],
                vec!["2024-03-04", "xyz tps", "12.0"],
                vec!["2024-03-04", "abc gas", "8.0"],
                vec!["2024-03-05", "xyz tps", "13.0"],
            ],
        );
        let outcome = normalizer().normalize_table(&table);

        assert_eq!(outcome.tables.len(), 2);
        let ids: Vec<&str> = outcome.tables.iter().map(|t| t.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["ABC_GAS", "XYZ_TPS"]);
        assert_eq!(outcome.tables[1].rows.len(), 2);
    }

    #[test]
    fn test_normalize_attaches_region_columns() {
        let table = raw_table(
            "sipat_040324.csv",
            "sipat_040324",
            vec![
                vec!["Date", "Block", "Actual (MWH)"],
                vec!["04-03-2024", "1", "25.0"],
            ],
        );
        let outcome = normalizer().normalize_table(&table);

        let t = &outcome.tables[0];
        assert_eq!(t.entity_id, "SIPAT");
        let state_idx = t.columns.iter().position(|c| c == STATE_COLUMN).unwrap();
        assert_eq!(t.rows[0].cells[state_idx], CellValue::Text("CHHATTISGARH".into()));
    }

    #[test]
    fn test_normalize_excludes_aggregate_tables() {
        let table = raw_table(
            "weekly.xlsx",
            "Entitywise Summary",
            vec![
                vec!["Entity", "Net (MWH)"],
                vec!["Kerala", "1000.0"],
            ],
        );
        let outcome = normalizer().normalize_table(&table);
        assert!(outcome.tables.is_empty());
        assert_eq!(outcome.dropped_rows, 0);
    }

    #[test]
    fn test_normalize_unresolvable_counts_dropped() {
        let table = raw_table(
            "total_040324.csv",
            "total_040324",
            vec![
                vec!["Date", "Block", "Actual (MWH)"],
                vec!["2024-03-04", "1", "10.0"],
                vec!["2024-03-04", "2", "11.0"],
            ],
        );
        let outcome = normalizer().normalize_table(&table);
        assert!(outcome.tables.is_empty());
        assert_eq!(outcome.dropped_rows, 2);
    }

    #[test]
    fn test_ensure_unique_columns() {
        let columns: Vec<String> = ["Date", "Date", "", "Date"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            ensure_unique_columns(&columns),
            vec!["Date", "Date.1", "column_2", "Date.2"]
        );
    }

    #[test]
    fn test_parse_row_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        for text in [
            "2024-03-04",
            "04-03-2024",
            "04.03.2024",
            "04/03/2024",
            "20240304",
            "04-Mar-2024",
            "04-Mar-24",
            "2024-03-04 00:15:00",
        ] {
            assert_eq!(parse_row_date(text), Some(expected), "格式: {}", text);
        }
        assert_eq!(parse_row_date("not a date"), None);
        assert_eq!(parse_row_date(""), None);
    }
}

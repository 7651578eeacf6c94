// ==========================================
// 电力结算报表归一化系统 - 多实体拆分器
// ==========================================
// 职责: 将含实体列的表按电站拆成单实体行组
// 红线: 无法解析的实体行只计数丢弃,不得混入任何行组
// ==========================================

use crate::domain::table::CellValue;
use crate::engine::station_resolver::StationResolver;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// 拆分结果: 按电站标识分组的行,组间按标识字典序
#[derive(Debug)]
pub struct SplitOutcome {
    pub groups: Vec<(String, Vec<Vec<CellValue>>)>,
    /// 实体解析失败而被丢弃的行数
    pub dropped_rows: usize,
}

// ==========================================
// EntitySplitter - 多实体拆分器
// ==========================================
pub struct EntitySplitter {
    resolver: Arc<StationResolver>,
}

impl EntitySplitter {
    pub fn new(resolver: Arc<StationResolver>) -> Self {
        Self { resolver }
    }

    /// 按实体列拆分行集;无实体列时返回 None,由调用方走表级解析
    ///
    /// 重复表头行/汇总行的实体单元格会被注册表拒绝,随丢弃计数一并
    /// 滤除
    pub fn split(
        &self,
        columns: &[String],
        rows: Vec<Vec<CellValue>>,
    ) -> Option<SplitOutcome> {
        let entity_col = self.resolver.entity_column(columns)?;

        let mut groups: BTreeMap<String, Vec<Vec<CellValue>>> = BTreeMap::new();
        let mut dropped_rows = 0usize;

        for row in rows {
            let raw_entity = match row.get(entity_col) {
                Some(CellValue::Text(s)) => s.clone(),
                Some(cell) => cell.render(),
                None => String::new(),
            };
            match self.resolver.resolve_cell(&raw_entity) {
                Some(entity_id) => groups.entry(entity_id).or_default().push(row),
                None => dropped_rows += 1,
            }
        }

        debug!(
            entity_col,
            group_count = groups.len(),
            dropped_rows,
            "按实体列拆分完成"
        );

        Some(SplitOutcome {
            groups: groups.into_iter().collect(),
            dropped_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::column_roles::ColumnRoleLexicon;
    use crate::config::station_registry::StationRegistry;

    fn splitter() -> EntitySplitter {
        let resolver = StationResolver::new(
            Arc::new(StationRegistry::builtin()),
            Arc::new(ColumnRoleLexicon::builtin()),
        )
        .unwrap();
        EntitySplitter::new(Arc::new(resolver))
    }

    fn text_row(cells: Vec<&str>) -> Vec<CellValue> {
        cells.into_iter().map(CellValue::parse).collect()
    }

    #[test]
    fn test_split_groups_by_station() {
        let columns = vec![
            "Date".to_string(),
            "Stn_Name".to_string(),
            "Actual (MWH)".to_string(),
        ];
        let rows = vec![
            text_row(vec!["2024-03-04", "xyz tps", "50.0"]),
            text_row(vec!["2024-03-04", "abc gas", "10.0"]),
            text_row(vec!["2024-03-04", "xyz tps", "51.0"]),
        ];
        let outcome = splitter().split(&columns, rows).unwrap();

        assert_eq!(outcome.groups.len(), 2);
        assert_eq!(outcome.dropped_rows, 0);
        // 组间按标识字典序
        assert_eq!(outcome.groups[0].0, "ABC_GAS");
        assert_eq!(outcome.groups[1].0, "XYZ_TPS");
        assert_eq!(outcome.groups[1].1.len(), 2);
    }

    #[test]
    fn test_split_drops_denied_entities() {
        let columns = vec!["Entity".to_string(), "DSM Payable".to_string()];
        let rows = vec![
            text_row(vec!["Kerala", "100.0"]),
            text_row(vec!["TOTAL", "900.0"]),
            text_row(vec!["Simhadri", "55.0"]),
        ];
        let outcome = splitter().split(&columns, rows).unwrap();

        assert_eq!(outcome.groups.len(), 1);
        assert_eq!(outcome.groups[0].0, "SIMHADRI");
        assert_eq!(outcome.dropped_rows, 2);
    }

    #[test]
    fn test_split_drops_repeated_header_rows() {
        // 纵向拼接的报表常夹带重复表头行与池汇总行
        let columns = vec!["Entity".to_string(), "Amount".to_string()];
        let rows = vec![
            text_row(vec!["Entity", "Amount"]),
            text_row(vec!["Total Amount to the Pool", "1234.5"]),
            text_row(vec!["Talcher", "77.0"]),
        ];
        let outcome = splitter().split(&columns, rows).unwrap();

        assert_eq!(outcome.groups.len(), 1);
        assert_eq!(outcome.groups[0].0, "TALCHER");
        assert_eq!(outcome.dropped_rows, 2);
    }

    #[test]
    fn test_no_entity_column_returns_none() {
        let columns = vec!["Date".to_string(), "Block".to_string()];
        let rows = vec![text_row(vec!["2024-03-04", "1"])];
        assert!(splitter().split(&columns, rows).is_none());
    }

    #[test]
    fn test_empty_entity_cells_dropped() {
        let columns = vec!["Station".to_string(), "Drawal (MWH)".to_string()];
        let rows = vec![
            text_row(vec!["", "10.0"]),
            text_row(vec!["Sipat STPS", "20.0"]),
        ];
        let outcome = splitter().split(&columns, rows).unwrap();

        assert_eq!(outcome.groups.len(), 1);
        assert_eq!(outcome.groups[0].0, "SIPAT_STPS");
        assert_eq!(outcome.dropped_rows, 1);
    }
}

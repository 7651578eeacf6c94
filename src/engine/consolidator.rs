// ==========================================
// 电力结算报表归一化系统 - 分区合并器
// ==========================================
// 职责: 把单实体表按 (实体, 年, 月) 归并进分区,列集取并
// 红线: 无日期行回退运行时钟并打数据质量标记,不得静默丢行
// ==========================================

use crate::domain::document::PeriodKey;
use crate::domain::table::{CellValue, NormalizedTable, Partition, PartitionKey};
use chrono::{Datelike, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// 周期回退标记列,1 表示该行年月来自运行时钟推断
pub const DQ_COLUMN: &str = "dq_inferred_period";

/// 单次归并的统计
#[derive(Debug, Default, Clone, Copy)]
pub struct MergeStats {
    /// 日期缺失而按运行时钟归位的行数
    pub inferred_rows: usize,
    /// 本次触达的分区数
    pub partitions_touched: usize,
}

/// 归并完成后待发布的分区及其贡献周期
#[derive(Debug)]
pub struct ConsolidatedPartition {
    pub partition: Partition,
    /// 向该分区贡献过行的结算周期
    pub contributing_periods: BTreeSet<PeriodKey>,
}

struct PartitionAccumulator {
    partition: Partition,
    /// 与 partition.rows 一一对应的行来源周期
    origins: Vec<PeriodKey>,
}

impl PartitionAccumulator {
    fn new(key: PartitionKey) -> Self {
        Self {
            partition: Partition::new(key),
            origins: Vec::new(),
        }
    }
}

// ==========================================
// PartitionedConsolidator - 分区合并器
// ==========================================
pub struct PartitionedConsolidator {
    accumulators: BTreeMap<PartitionKey, PartitionAccumulator>,
    /// 行级日期缺失时的归位依据
    run_clock: NaiveDate,
}

impl PartitionedConsolidator {
    pub fn new(run_clock: NaiveDate) -> Self {
        Self {
            accumulators: BTreeMap::new(),
            run_clock,
        }
    }

    /// 把一张单实体表的行归并进对应分区
    ///
    /// 列集按"保留首见顺序"的并集扩宽,已有行在新列上补空;行按
    /// 行级日期落入 (实体, 年, 月) 分区,缺失日期回退运行时钟并在
    /// 标记列记 1
    pub fn merge_table(&mut self, table: &NormalizedTable, period: &PeriodKey) -> MergeStats {
        let mut stats = MergeStats::default();

        // 行先按目标分区分桶,再逐分区做一次列并与追加
        let mut buckets: BTreeMap<PartitionKey, Vec<(usize, bool)>> = BTreeMap::new();
        for (row_idx, row) in table.rows.iter().enumerate() {
            let (year, month, inferred) = match row.date {
                Some(date) => (date.year(), date.month(), false),
                None => (self.run_clock.year(), self.run_clock.month(), true),
            };
            if inferred || row.dq_inferred_period {
                stats.inferred_rows += 1;
            }
            let key = PartitionKey {
                entity_id: table.entity_id.clone(),
                year,
                month,
            };
            buckets.entry(key).or_default().push((row_idx, inferred));
        }

        stats.partitions_touched = buckets.len();

        for (key, row_refs) in buckets {
            let acc = self
                .accumulators
                .entry(key.clone())
                .or_insert_with(|| PartitionAccumulator::new(key));

            // === 列并集: 新列追加尾部,已有行补空 ===
            let mut incoming: Vec<&str> = table.columns.iter().map(String::as_str).collect();
            incoming.push(DQ_COLUMN);
            for column in &incoming {
                if !acc.partition.columns.iter().any(|c| c == column) {
                    acc.partition.columns.push((*column).to_string());
                }
            }
            let width = acc.partition.columns.len();
            for existing in &mut acc.partition.rows {
                existing.resize_with(width, || CellValue::Empty);
            }

            let index_of: HashMap<&str, usize> = acc
                .partition
                .columns
                .iter()
                .enumerate()
                .map(|(i, c)| (c.as_str(), i))
                .collect();

            // === 行重排进分区列序 ===
            for (row_idx, inferred) in row_refs {
                let row = &table.rows[row_idx];
                let mut out = vec![CellValue::Empty; width];
                for (i, cell) in row.cells.iter().enumerate() {
                    if let Some(name) = table.columns.get(i) {
                        if let Some(&target) = index_of.get(name.as_str()) {
                            out[target] = cell.clone();
                        }
                    }
                }
                if let Some(&dq_target) = index_of.get(DQ_COLUMN) {
                    let flagged = inferred || row.dq_inferred_period;
                    out[dq_target] = CellValue::Number(if flagged { 1.0 } else { 0.0 });
                }
                acc.partition.rows.push(out);
                acc.origins.push(period.clone());
            }
            acc.partition.updated_at = Utc::now();
        }

        debug!(
            entity_id = %table.entity_id,
            partitions_touched = stats.partitions_touched,
            inferred_rows = stats.inferred_rows,
            "表格归并入分区"
        );
        stats
    }

    /// 撤下某周期贡献的全部行,被顶替版本的残留由此清除
    pub fn evict_period(&mut self, period: &PeriodKey) -> usize {
        let mut removed = 0usize;
        self.accumulators.retain(|_, acc| {
            let before = acc.partition.rows.len();
            let rows = std::mem::take(&mut acc.partition.rows);
            let origins = std::mem::take(&mut acc.origins);
            for (row, origin) in rows.into_iter().zip(origins.into_iter()) {
                if &origin != period {
                    acc.partition.rows.push(row);
                    acc.origins.push(origin);
                }
            }
            removed += before - acc.partition.rows.len();
            !acc.partition.rows.is_empty()
        });
        if removed > 0 {
            debug!(period = %period, removed, "撤下被顶替周期的行");
        }
        removed
    }

    /// 结束归并,产出分区及其贡献周期
    pub fn finish(self) -> Vec<ConsolidatedPartition> {
        self.accumulators
            .into_values()
            .map(|acc| ConsolidatedPartition {
                contributing_periods: acc.origins.iter().cloned().collect(),
                partition: acc.partition,
            })
            .collect()
    }

    pub fn partition_count(&self) -> usize {
        self.accumulators.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::NormalizedRow;
    use crate::domain::types::SheetType;

    fn clock() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
    }

    fn period(seq: u32) -> PeriodKey {
        let start = NaiveDate::from_isoywd_opt(2024, seq, chrono::Weekday::Mon).unwrap();
        PeriodKey {
            source_id: "SRPC".to_string(),
            period_start: start,
            period_end: start + chrono::Days::new(6),
            sequence_no: seq,
        }
    }

    fn table_of(
        entity_id: &str,
        columns: Vec<&str>,
        rows: Vec<(Option<NaiveDate>, Vec<CellValue>)>,
    ) -> NormalizedTable {
        NormalizedTable {
            source_id: "SRPC".to_string(),
            source_file: "dsm.csv".to_string(),
            declared_name: "dsm".to_string(),
            sheet_type: SheetType::EntityData,
            entity_id: entity_id.to_string(),
            columns: columns.into_iter().map(|c| c.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|(date, cells)| NormalizedRow {
                    date,
                    cells,
                    dq_inferred_period: false,
                })
                .collect(),
            processed_at: Utc::now(),
        }
    }

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 3, d)
    }

    /// 行内容按 列名→渲染值 提取,便于与列序无关地比较
    fn row_maps(partition: &Partition) -> BTreeSet<BTreeMap<String, String>> {
        partition
            .rows
            .iter()
            .map(|row| {
                partition
                    .columns
                    .iter()
                    .zip(row.iter())
                    .map(|(c, v)| (c.clone(), v.render()))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_merge_unions_columns() {
        let mut consolidator = PartitionedConsolidator::new(clock());
        let a = table_of(
            "XYZ_TPS",
            vec!["Date", "Actual (MWH)"],
            vec![(day(4), vec![CellValue::Text("2024-03-04".into()), CellValue::Number(50.0)])],
        );
        let b = table_of(
            "XYZ_TPS",
            vec!["Date", "Schedule (MWH)"],
            vec![(day(5), vec![CellValue::Text("2024-03-05".into()), CellValue::Number(48.0)])],
        );
        consolidator.merge_table(&a, &period(10));
        consolidator.merge_table(&b, &period(10));

        let out = consolidator.finish();
        assert_eq!(out.len(), 1);
        let partition = &out[0].partition;
        assert_eq!(partition.key.entity_id, "XYZ_TPS");
        assert_eq!(partition.key.year, 2024);
        assert_eq!(partition.key.month, 3);
        assert_eq!(
            partition.columns,
            vec!["Date", "Actual (MWH)", DQ_COLUMN, "Schedule (MWH)"]
        );
        assert_eq!(partition.rows.len(), 2);
        // 先到的行在后并入的列上补空
        assert_eq!(partition.rows[0][3], CellValue::Empty);
        assert_eq!(partition.rows[1][1], CellValue::Empty);
    }

    #[test]
    fn test_merge_is_order_independent_up_to_row_order() {
        let a = table_of(
            "XYZ_TPS",
            vec!["Date", "Actual (MWH)"],
            vec![(day(4), vec![CellValue::Text("2024-03-04".into()), CellValue::Number(50.0)])],
        );
        let b = table_of(
            "XYZ_TPS",
            vec!["Date", "Schedule (MWH)"],
            vec![(day(5), vec![CellValue::Text("2024-03-05".into()), CellValue::Number(48.0)])],
        );

        let mut ab = PartitionedConsolidator::new(clock());
        ab.merge_table(&a, &period(10));
        ab.merge_table(&b, &period(10));
        let mut ba = PartitionedConsolidator::new(clock());
        ba.merge_table(&b, &period(10));
        ba.merge_table(&a, &period(10));

        let ab = ab.finish();
        let ba = ba.finish();
        assert_eq!(ab.len(), 1);
        assert_eq!(ba.len(), 1);

        let mut ab_cols = ab[0].partition.columns.clone();
        let mut ba_cols = ba[0].partition.columns.clone();
        ab_cols.sort();
        ba_cols.sort();
        assert_eq!(ab_cols, ba_cols);
        assert_eq!(row_maps(&ab[0].partition), row_maps(&ba[0].partition));
    }

    #[test]
    fn test_merge_splits_across_months() {
        let mut consolidator = PartitionedConsolidator::new(clock());
        let table = table_of(
            "XYZ_TPS",
            vec!["Date", "Actual (MWH)"],
            vec![
                (NaiveDate::from_ymd_opt(2024, 3, 31), vec![CellValue::Text("2024-03-31".into()), CellValue::Number(10.0)]),
                (NaiveDate::from_ymd_opt(2024, 4, 1), vec![CellValue::Text("2024-04-01".into()), CellValue::Number(11.0)]),
            ],
        );
        let stats = consolidator.merge_table(&table, &period(13));

        assert_eq!(stats.partitions_touched, 2);
        let out = consolidator.finish();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].partition.key.month, 3);
        assert_eq!(out[1].partition.key.month, 4);
    }

    #[test]
    fn test_merge_flags_inferred_period() {
        let mut consolidator = PartitionedConsolidator::new(clock());
        let table = table_of(
            "XYZ_TPS",
            vec!["Block", "Actual (MWH)"],
            vec![(None, vec![CellValue::Number(1.0), CellValue::Number(10.0)])],
        );
        let stats = consolidator.merge_table(&table, &period(12));

        assert_eq!(stats.inferred_rows, 1);
        let out = consolidator.finish();
        assert_eq!(out.len(), 1);
        let partition = &out[0].partition;
        // 运行时钟 2024-03-20 → 归入 2024/03
        assert_eq!(partition.key.year, 2024);
        assert_eq!(partition.key.month, 3);
        let dq_idx = partition.columns.iter().position(|c| c == DQ_COLUMN).unwrap();
        assert_eq!(partition.rows[0][dq_idx], CellValue::Number(1.0));
    }

    #[test]
    fn test_evict_period_removes_only_that_period() {
        let mut consolidator = PartitionedConsolidator::new(clock());
        let first = table_of(
            "XYZ_TPS",
            vec!["Date", "Actual (MWH)"],
            vec![(day(4), vec![CellValue::Text("2024-03-04".into()), CellValue::Number(50.0)])],
        );
        let second = table_of(
            "XYZ_TPS",
            vec!["Date", "Actual (MWH)"],
            vec![(day(11), vec![CellValue::Text("2024-03-11".into()), CellValue::Number(60.0)])],
        );
        consolidator.merge_table(&first, &period(10));
        consolidator.merge_table(&second, &period(11));

        let removed = consolidator.evict_period(&period(10));
        assert_eq!(removed, 1);

        let out = consolidator.finish();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].partition.rows.len(), 1);
        assert_eq!(out[0].partition.rows[0][1], CellValue::Number(60.0));
        assert_eq!(out[0].contributing_periods.len(), 1);
        assert!(out[0].contributing_periods.contains(&period(11)));
    }

    #[test]
    fn test_evict_drops_emptied_partition() {
        let mut consolidator = PartitionedConsolidator::new(clock());
        let table = table_of(
            "XYZ_TPS",
            vec!["Date", "Actual (MWH)"],
            vec![(day(4), vec![CellValue::Text("2024-03-04".into()), CellValue::Number(50.0)])],
        );
        consolidator.merge_table(&table, &period(10));
        assert_eq!(consolidator.partition_count(), 1);

        consolidator.evict_period(&period(10));
        assert_eq!(consolidator.partition_count(), 0);
    }
}

// ==========================================
// 电力结算报表归一化系统 - 电量单位归一化器
// ==========================================
// 职责: 识别以 KWh 申报的电量列,按中位数阈值换算为 MWh
// 红线: 只触碰电量角色列,费率列/非数值列一律不动
// ==========================================

use crate::config::column_roles::ColumnRoleLexicon;
use crate::domain::table::{CellValue, NormalizedTable};
use std::sync::Arc;
use tracing::debug;

/// KWh 标签变体与对应的 MWh 写法
const KWH_VARIANTS: &[(&str, &str)] = &[
    ("KWH", "MWH"),
    ("KWh", "MWh"),
    ("kWh", "MWh"),
    ("Kwh", "Mwh"),
    ("kwh", "mwh"),
];

// ==========================================
// UnitNormalizer - 电量单位归一化器
// ==========================================
pub struct UnitNormalizer {
    lexicon: Arc<ColumnRoleLexicon>,
    /// 中位数阈值,超过则判定数值以 KWh 计
    threshold: f64,
}

impl UnitNormalizer {
    pub fn new(lexicon: Arc<ColumnRoleLexicon>, threshold: f64) -> Self {
        Self { lexicon, threshold }
    }

    /// 就地归一化一张表的电量列,返回被换算列的新标签
    ///
    /// 判定规则: 电量角色列的非空数值中位数 > 阈值 ⇒ 全列除以 1000,
    /// 标签中的 KWh 记号改写为 MWh (无记号则追加 _MWH 后缀)
    pub fn normalize(&self, table: &mut NormalizedTable) -> Vec<String> {
        let mut rescaled = Vec::new();

        for col in 0..table.columns.len() {
            if !self.lexicon.is_energy_label(&table.columns[col]) {
                continue;
            }

            let values: Vec<f64> = table
                .rows
                .iter()
                .filter_map(|row| row.cells.get(col).and_then(CellValue::as_number))
                .collect();
            let Some(median) = median_of(&values) else {
                continue;
            };
            if median <= self.threshold {
                continue;
            }

            for row in &mut table.rows {
                if let Some(cell) = row.cells.get_mut(col) {
                    if let CellValue::Number(v) = cell {
                        *v /= 1000.0;
                    }
                }
            }

            let old_label = table.columns[col].clone();
            let new_label = relabel_mwh(&old_label);
            debug!(
                source_file = %table.source_file,
                old_label = %old_label,
                new_label = %new_label,
                median,
                "电量列按 KWh 判定,换算为 MWh"
            );
            table.columns[col] = new_label.clone();
            rescaled.push(new_label);
        }

        rescaled
    }
}

/// 非空数值的中位数,偶数个取中间两数均值
fn median_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// 改写标签中的 KWh 记号;无记号且未提及 MWh 时追加后缀
fn relabel_mwh(label: &str) -> String {
    for (kwh, mwh) in KWH_VARIANTS {
        if label.contains(kwh) {
            return label.replace(kwh, mwh);
        }
    }
    if label.to_lowercase().contains("mwh") {
        label.to_string()
    } else {
        format!("{}_MWH", label)
    }
}

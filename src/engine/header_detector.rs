// ==========================================
// 电力结算报表归一化系统 - 表头探测器
// ==========================================
// 职责: 在横幅行/表头行/数据行混排的原始表格中定位真实表头
// 红线: 永不报错,找不到正表头时回退首行
// ==========================================

use crate::config::column_roles::ColumnRoleLexicon;
use crate::domain::document::RawTable;
use crate::domain::table::CellValue;
use std::sync::Arc;
use tracing::debug;

/// 机构横幅行的特征词 (仅用于表头之前的行)
const BANNER_TOKENS: &[&str] = &["power committee", "regional", "week", "statement"];

/// 表头定位结果
#[derive(Debug, Clone)]
pub struct HeaderResolution {
    /// 原始行序列中的表头下标
    pub header_index: usize,
    /// 表头行单元格 (已去首尾空白)
    pub columns: Vec<String>,
    /// 表头之前被保留的非横幅行 (如内联电站标记)
    pub preamble: Vec<Vec<String>>,
    /// 表头之后的数据行
    pub data_rows: Vec<Vec<String>>,
    /// 是否为回退结果 (无任何正分行)
    pub fallback: bool,
}

// ==========================================
// HeaderDetector - 表头探测器
// ==========================================
pub struct HeaderDetector {
    lexicon: Arc<ColumnRoleLexicon>,
    scan_depth: usize,
}

impl HeaderDetector {
    pub fn new(lexicon: Arc<ColumnRoleLexicon>, scan_depth: usize) -> Self {
        Self { lexicon, scan_depth }
    }

    /// 定位表头并切分行序列
    ///
    /// 对前 scan_depth 行逐行打分: 命中列名关键词 +1,可解析为数值的
    /// 单元格 -1。取得分最高的正分行,平分取先出现者;全部非正时回退
    /// 下标 0。
    pub fn detect(&self, table: &RawTable) -> HeaderResolution {
        let depth = self.scan_depth.min(table.rows.len());
        let mut best: Option<(usize, i64)> = None;

        for (idx, row) in table.rows.iter().take(depth).enumerate() {
            let score = self.score_row(row);
            if score > 0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((idx, score));
            }
        }

        let (header_index, fallback) = match best {
            Some((idx, score)) => {
                debug!(
                    declared_name = %table.declared_name,
                    header_index = idx,
                    score,
                    "表头定位命中"
                );
                (idx, false)
            }
            None => {
                debug!(declared_name = %table.declared_name, "表头定位回退首行");
                (0, true)
            }
        };

        let columns = table
            .rows
            .get(header_index)
            .map(|row| row.iter().map(|c| c.trim().to_string()).collect())
            .unwrap_or_default();

        let preamble = table.rows[..header_index]
            .iter()
            .filter(|row| !is_banner_row(row))
            .cloned()
            .collect();

        let data_rows = table
            .rows
            .get(header_index + 1..)
            .map(|rows| rows.to_vec())
            .unwrap_or_default();

        HeaderResolution {
            header_index,
            columns,
            preamble,
            data_rows,
            fallback,
        }
    }

    /// 行打分: 关键词命中数减去数值单元格数
    fn score_row(&self, row: &[String]) -> i64 {
        let mut score: i64 = 0;
        for cell in row {
            let trimmed = cell.trim();
            if trimmed.is_empty() {
                continue;
            }
            if self.lexicon.is_header_keyword(trimmed) {
                score += 1;
            }
            if matches!(CellValue::parse(trimmed), CellValue::Number(_)) {
                score -= 1;
            }
        }
        score
    }
}

/// 判定横幅行: 机构套话,或整行均为空白/重复标点
fn is_banner_row(row: &[String]) -> bool {
    let joined = row.join(" ").trim().to_lowercase();
    if joined.is_empty() {
        return true;
    }
    if BANNER_TOKENS.iter().any(|t| joined.contains(t)) {
        return true;
    }
    joined
        .chars()
        .all(|c| matches!(c, '-' | '=' | '*' | '_' | '~' | '.' | ' '))
}

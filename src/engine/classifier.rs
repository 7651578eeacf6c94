// ==========================================
// 电力结算报表归一化系统 - 表格分类器
// ==========================================
// 职责: 判定 RawTable 的用途类型 (SheetType)
// 红线: 永不报错,最坏情况返回 Unknown
// ==========================================

use crate::domain::document::RawTable;
use crate::domain::types::SheetType;
use tracing::debug;

/// 内容采样深度 (行)
const SAMPLE_ROWS: usize = 15;

/// 关键词族,按优先序排列: 同时命中多族时取先出现者
/// 单词按整词匹配,含空格的短语按包含匹配
const KEYWORD_FAMILIES: &[(SheetType, &[&str])] = &[
    (
        SheetType::EntityData,
        &[
            "injection",
            "drawal",
            "actual",
            "schedule",
            "net",
            "sras",
            "scuc",
            "station",
            "generation",
        ],
    ),
    (
        SheetType::RateData,
        &["rate", "price", "charge", "tariff"],
    ),
    (
        SheetType::DeviationData,
        &["deviation", "dsm", "ui", "settlement"],
    ),
    (
        SheetType::FrequencyData,
        &["freq", "frequency", "hz"],
    ),
    (
        SheetType::AggregateData,
        &[
            "state",
            "summary",
            "total",
            "region",
            "pool",
            "entitywise summary",
            "states ut",
        ],
    ),
];

// ==========================================
// SheetClassifier - 表格分类器
// ==========================================
pub struct SheetClassifier;

impl SheetClassifier {
    /// 分类一张 RawTable
    ///
    /// 先匹配声明名称,其次匹配内容采样中的列名词汇,默认 Unknown
    pub fn classify(&self, table: &RawTable) -> SheetType {
        if let Some(by_name) = Self::match_families(&table.declared_name) {
            return by_name;
        }

        for row in table.sample(SAMPLE_ROWS) {
            for cell in row {
                if let Some(by_vocab) = Self::match_families(cell) {
                    debug!(
                        declared_name = %table.declared_name,
                        sheet_type = %by_vocab,
                        "按内容词汇分类"
                    );
                    return by_vocab;
                }
            }
        }

        SheetType::Unknown
    }

    /// 按关键词族匹配一段文本
    fn match_families(text: &str) -> Option<SheetType> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return None;
        }
        let tokens: Vec<&str> = normalized.split(' ').collect();

        for (sheet_type, keywords) in KEYWORD_FAMILIES {
            for keyword in *keywords {
                let hit = if keyword.contains(' ') {
                    normalized.contains(keyword)
                } else {
                    tokens.iter().any(|t| t == keyword)
                };
                if hit {
                    return Some(*sheet_type);
                }
            }
        }
        None
    }
}

/// 小写化并将非字母数字折叠为单个空格
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::DocumentRef;

    fn table_of(declared_name: &str, rows: Vec<Vec<&str>>) -> RawTable {
        RawTable {
            doc_ref: DocumentRef {
                source_id: "SRPC".to_string(),
                file_name: "week.xlsx".to_string(),
                locator: "/tmp/week.xlsx".to_string(),
            },
            declared_name: declared_name.to_string(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_classify_by_declared_name() {
        let classifier = SheetClassifier;
        assert_eq!(
            classifier.classify(&table_of("Station_Drawal", vec![])),
            SheetType::EntityData
        );
        assert_eq!(
            classifier.classify(&table_of("DSM Rate", vec![])),
            SheetType::RateData
        );
        assert_eq!(
            classifier.classify(&table_of("UI Account", vec![])),
            SheetType::DeviationData
        );
        assert_eq!(
            classifier.classify(&table_of("Freq Profile", vec![])),
            SheetType::FrequencyData
        );
        assert_eq!(
            classifier.classify(&table_of("Entitywise Summary", vec![])),
            SheetType::AggregateData
        );
    }

    #[test]
    fn test_classify_by_content_vocabulary() {
        let classifier = SheetClassifier;
        let table = table_of(
            "Sheet1",
            vec![
                vec!["Weekly Report"],
                vec!["Date", "Block", "Actual (KWH)"],
                vec!["2024-03-04", "1", "50000"],
            ],
        );
        assert_eq!(classifier.classify(&table), SheetType::EntityData);
    }

    #[test]
    fn test_classify_name_wins_over_content() {
        let classifier = SheetClassifier;
        // 声明名指向频率,内容里出现电量词汇,声明名优先
        let table = table_of(
            "Frequency",
            vec![vec!["Date", "Actual (KWH)", "Freq (Hz)"]],
        );
        assert_eq!(classifier.classify(&table), SheetType::FrequencyData);
    }

    #[test]
    fn test_token_matching_avoids_substrings() {
        let classifier = SheetClassifier;
        // "Statement" 不得按 "state" 误判为汇总表,
        // "Unit" 不得按 "ui" 误判为偏差表
        assert_eq!(
            classifier.classify(&table_of("Weekly Statement", vec![])),
            SheetType::Unknown
        );
        assert_eq!(
            classifier.classify(&table_of("Unit Details", vec![])),
            SheetType::Unknown
        );
    }

    #[test]
    fn test_classify_defaults_to_unknown() {
        let classifier = SheetClassifier;
        let table = table_of("Sheet1", vec![vec!["随便", "什么"]]);
        assert_eq!(classifier.classify(&table), SheetType::Unknown);
    }

    #[test]
    fn test_tie_resolution_order() {
        let classifier = SheetClassifier;
        // 同时命中实体族与偏差族时,取优先序在前的实体族
        assert_eq!(
            classifier.classify(&table_of("station_dsm", vec![])),
            SheetType::EntityData
        );
    }
}

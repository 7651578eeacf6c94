// ==========================================
// 电力结算报表归一化系统 - 列角色词典
// ==========================================
// 职责: 表头关键词 → 列角色的统一映射表
// 说明: 表头识别/实体解析/单位归一共用同一份词典,
//       新增发布方只需扩充词典,不新增控制流
// ==========================================

use crate::domain::types::ColumnRole;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

// ==========================================
// ColumnRoleLexicon - 列角色词典
// ==========================================
// 关键词按优先序排列,先命中者定角色
// (费率族先于电量族,避免 "dsm rate (paisa/kwh)" 误判电量列)
#[derive(Debug, Clone)]
pub struct ColumnRoleLexicon {
    keywords: Vec<(String, ColumnRole)>,
    entity_columns: Vec<String>,
}

// JSON 覆盖文件结构
#[derive(Debug, Deserialize)]
struct LexiconFile {
    #[serde(default)]
    roles: HashMap<String, Vec<String>>,
    #[serde(default)]
    entity_columns: Option<Vec<String>>,
}

impl ColumnRoleLexicon {
    /// 内置词典
    pub fn builtin() -> Self {
        let keywords = vec![
            // ===== 实体列 =====
            ("station", ColumnRole::Entity),
            ("stn", ColumnRole::Entity),
            ("entity", ColumnRole::Entity),
            ("utility", ColumnRole::Entity),
            ("member", ColumnRole::Entity),
            ("buyer", ColumnRole::Entity),
            ("seller", ColumnRole::Entity),
            ("generator", ColumnRole::Entity),
            ("provider", ColumnRole::Entity),
            // ===== 日期/时间/时段 =====
            ("date", ColumnRole::Date),
            ("day", ColumnRole::Date),
            ("time", ColumnRole::Time),
            ("hrs", ColumnRole::Time),
            ("block", ColumnRole::Block),
            ("blk", ColumnRole::Block),
            ("slot", ColumnRole::Block),
            ("interval", ColumnRole::Block),
            // ===== 频率 =====
            ("frequency", ColumnRole::Frequency),
            ("freq", ColumnRole::Frequency),
            ("hz", ColumnRole::Frequency),
            // ===== 费率 (先于电量) =====
            ("rate", ColumnRole::Rate),
            ("price", ColumnRole::Rate),
            ("tariff", ColumnRole::Rate),
            ("charge", ColumnRole::Rate),
            ("paise", ColumnRole::Rate),
            ("paisa", ColumnRole::Rate),
            // ===== 电量 =====
            ("actual", ColumnRole::Energy),
            ("schedule", ColumnRole::Energy),
            ("deviation", ColumnRole::Energy),
            ("drawal", ColumnRole::Energy),
            ("injection", ColumnRole::Energy),
            ("generation", ColumnRole::Energy),
            ("net energy", ColumnRole::Energy),
            ("energy", ColumnRole::Energy),
            ("kwh", ColumnRole::Energy),
            ("mwh", ColumnRole::Energy),
            ("sras", ColumnRole::Energy),
            ("tras", ColumnRole::Energy),
            ("scuc", ColumnRole::Energy),
        ];

        let entity_columns = vec![
            "station_name",
            "station",
            "stn_name",
            "stn",
            "entity_name",
            "entity",
            "utility",
            "member",
            "buyer",
            "seller",
            "sras provider",
            "tras provider",
            "scuc generator",
        ];

        ColumnRoleLexicon {
            keywords: keywords
                .into_iter()
                .map(|(k, r)| (k.to_string(), r))
                .collect(),
            entity_columns: entity_columns.into_iter().map(|s| s.to_string()).collect(),
        }
    }

    /// 从 JSON 覆盖文件加载
    ///
    /// 文件中出现的角色族整体替换内置同族关键词,未出现的保留内置;
    /// entity_columns 出现时整体替换优先表
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let raw = fs::read_to_string(path.as_ref())?;
        let file: LexiconFile = serde_json::from_str(&raw)?;
        let mut lexicon = Self::builtin();

        for (role_name, words) in file.roles.iter() {
            let role = ColumnRole::from_str(role_name)
                .ok_or_else(|| format!("未知列角色: {}", role_name))?;
            lexicon.keywords.retain(|(_, r)| *r != role);
            for word in words {
                lexicon
                    .keywords
                    .push((word.trim().to_lowercase(), role));
            }
        }

        if let Some(columns) = file.entity_columns {
            lexicon.entity_columns = columns
                .into_iter()
                .map(|c| c.trim().to_lowercase())
                .collect();
        }

        Ok(lexicon)
    }

    /// 判定列标签的角色 (先命中者胜)
    pub fn role_of(&self, label: &str) -> Option<ColumnRole> {
        let normalized = normalize_label(label);
        if normalized.is_empty() {
            return None;
        }
        for (keyword, role) in &self.keywords {
            if normalized.contains(keyword.as_str()) {
                return Some(*role);
            }
        }
        None
    }

    /// 单元格文本是否命中任一表头关键词 (表头打分用)
    pub fn is_header_keyword(&self, cell: &str) -> bool {
        self.role_of(cell).is_some()
    }

    /// 列标签是否为电量列 (单位归一的作用对象)
    pub fn is_energy_label(&self, label: &str) -> bool {
        matches!(self.role_of(label), Some(ColumnRole::Energy))
    }

    /// 按优先表定位实体列
    ///
    /// 先做精确匹配,再做包含匹配;优先表顺序高于列顺序
    pub fn entity_column_index(&self, columns: &[String]) -> Option<usize> {
        let normalized: Vec<String> = columns.iter().map(|c| normalize_label(c)).collect();

        for spelling in &self.entity_columns {
            let wanted = normalize_label(spelling);
            if let Some(idx) = normalized.iter().position(|c| *c == wanted) {
                return Some(idx);
            }
        }
        for spelling in &self.entity_columns {
            let wanted = normalize_label(spelling);
            if let Some(idx) = normalized.iter().position(|c| c.contains(&wanted)) {
                return Some(idx);
            }
        }
        None
    }
}

/// 标签归一: 小写、下划线转空格、空白折叠
fn normalize_label(label: &str) -> String {
    label
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_of_basic() {
        let lexicon = ColumnRoleLexicon::builtin();
        assert_eq!(lexicon.role_of("Date"), Some(ColumnRole::Date));
        assert_eq!(lexicon.role_of("Stn_Name"), Some(ColumnRole::Entity));
        assert_eq!(lexicon.role_of("Actual (KWH)"), Some(ColumnRole::Energy));
        assert_eq!(lexicon.role_of("Freq (Hz)"), Some(ColumnRole::Frequency));
        assert_eq!(lexicon.role_of("随机文本"), None);
    }

    #[test]
    fn test_rate_wins_over_energy() {
        // 费率列带 kwh 单位时不得判为电量列
        let lexicon = ColumnRoleLexicon::builtin();
        assert_eq!(
            lexicon.role_of("DSM Rate (Paisa/KWH)"),
            Some(ColumnRole::Rate)
        );
        assert!(!lexicon.is_energy_label("DSM Rate (Paisa/KWH)"));
        assert!(lexicon.is_energy_label("Actual (KWH)"));
    }

    #[test]
    fn test_entity_column_priority() {
        let lexicon = ColumnRoleLexicon::builtin();
        let columns = vec![
            "Date".to_string(),
            "Utility".to_string(),
            "Station_Name".to_string(),
        ];
        // station_name 在优先表中先于 utility
        assert_eq!(lexicon.entity_column_index(&columns), Some(2));

        let columns = vec!["Date".to_string(), "Actual".to_string()];
        assert_eq!(lexicon.entity_column_index(&columns), None);
    }

    #[test]
    fn test_json_override_replaces_family() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexicon.json");
        std::fs::write(
            &path,
            r#"{"roles": {"ENERGY": ["mu"]}, "entity_columns": ["beneficiary"]}"#,
        )
        .unwrap();

        let lexicon = ColumnRoleLexicon::from_json_file(&path).unwrap();
        // 覆盖后原电量关键词失效,新关键词生效
        assert_eq!(lexicon.role_of("Actual"), None);
        assert_eq!(lexicon.role_of("MU"), Some(ColumnRole::Energy));
        // 未覆盖的角色族保留
        assert_eq!(lexicon.role_of("Date"), Some(ColumnRole::Date));

        let columns = vec!["Beneficiary".to_string()];
        assert_eq!(lexicon.entity_column_index(&columns), Some(0));
    }
}

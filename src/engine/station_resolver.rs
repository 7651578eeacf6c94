// ==========================================
// 电力结算报表归一化系统 - 电站标识解析器
// ==========================================
// 职责: 按 实体列 → 内联标记 → 文件名 的优先链解析电站标识
// 红线: 解析产物必须通过注册表的规范化与拒绝清单
// ==========================================

use crate::config::column_roles::ColumnRoleLexicon;
use crate::config::station_registry::StationRegistry;
use regex::Regex;
use std::error::Error;
use std::sync::Arc;
use tracing::debug;

// ==========================================
// StationResolver - 电站标识解析器
// ==========================================
pub struct StationResolver {
    registry: Arc<StationRegistry>,
    lexicon: Arc<ColumnRoleLexicon>,
    /// 内联标记行,如 "Station : XYZ TPS" / "Sheet: ABC SEB"
    marker_pattern: Regex,
    /// 导出残留的 HTML 标签,如 "</center>"
    tag_pattern: Regex,
}

impl StationResolver {
    pub fn new(
        registry: Arc<StationRegistry>,
        lexicon: Arc<ColumnRoleLexicon>,
    ) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            registry,
            lexicon,
            marker_pattern: Regex::new(r"(?i)^\s*(?:station|sheet)\s*:\s*(.+)$")?,
            tag_pattern: Regex::new(r"<[^>]*>")?,
        })
    }

    /// 在列名中定位实体列
    pub fn entity_column(&self, columns: &[String]) -> Option<usize> {
        self.lexicon.entity_column_index(columns)
    }

    /// 解析单元格里的电站原文
    ///
    /// 先剥离 HTML 残留与换行,再交注册表做规范化/别名折叠/拒绝过滤
    pub fn resolve_cell(&self, raw: &str) -> Option<String> {
        let cleaned = self.clean_raw(raw);
        self.registry.resolve(&cleaned)
    }

    /// 表级回退链: 先扫内联标记行,再取文件名词干首段
    pub fn resolve_table_entity(
        &self,
        preamble: &[Vec<String>],
        file_name: &str,
    ) -> Option<String> {
        if let Some(entity_id) = self.inline_marker(preamble) {
            debug!(entity_id = %entity_id, "内联标记解析电站");
            return Some(entity_id);
        }
        if let Some(entity_id) = self.filename_candidate(file_name) {
            debug!(entity_id = %entity_id, file_name, "文件名回退解析电站");
            return Some(entity_id);
        }
        None
    }

    /// 查询电站归属的邦与区域分组
    pub fn region_of(&self, entity_id: &str) -> (String, String) {
        self.registry.region_of(entity_id)
    }

    fn clean_raw(&self, raw: &str) -> String {
        let without_tags = self.tag_pattern.replace_all(raw, " ");
        without_tags.replace(['\n', '\r'], " ")
    }

    fn inline_marker(&self, preamble: &[Vec<String>]) -> Option<String> {
        for row in preamble {
            for cell in row {
                let cleaned = self.clean_raw(cell);
                if let Some(caps) = self.marker_pattern.captures(cleaned.trim()) {
                    if let Some(resolved) = self.registry.resolve(&caps[1]) {
                        return Some(resolved);
                    }
                }
            }
        }
        None
    }

    fn filename_candidate(&self, file_name: &str) -> Option<String> {
        let stem = file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(file_name);
        let first_token = stem.split('_').next().unwrap_or(stem);
        self.registry.resolve(first_token)
    }
}

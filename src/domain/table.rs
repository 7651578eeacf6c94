// ==========================================
// 电力结算报表归一化系统 - 表格领域模型
// ==========================================
// 职责: 归一化行/表/分区/产物引用/运行报告的领域定义
// 红线: 分区只增列不减列,行一经归一化不可变
// ==========================================

use crate::domain::types::{ArtifactFormat, SheetType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

// ==========================================
// CellValue - 单元格值
// ==========================================
// 解码层输出字符串,归一化时解析为此三态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String), // 文本
    Number(f64),  // 数值
    Empty,        // 空值 (null/na/空串)
}

impl CellValue {
    /// 从原始字符串解析单元格
    ///
    /// 空串与 na/nan/null/none/- 视为空值;可解析为数值的
    /// (允许千分位逗号) 取数值,其余保留文本
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        match trimmed.to_lowercase().as_str() {
            "na" | "nan" | "null" | "none" | "-" | "--" => return CellValue::Empty,
            _ => {}
        }
        let no_commas: String = trimmed.chars().filter(|c| *c != ',').collect();
        if let Ok(n) = no_commas.parse::<f64>() {
            return CellValue::Number(n);
        }
        CellValue::Text(trimmed.to_string())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// 渲染为 CSV 字段 (空值写空串)
    pub fn render(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format!("{}", n),
            CellValue::Empty => String::new(),
        }
    }
}

// ==========================================
// NormalizedRow - 归一化观测行
// ==========================================
// 单元格顺序与所属 NormalizedTable 的列顺序对齐
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub date: Option<NaiveDate>,  // 行日期 (分区键来源,解析失败为 None)
    pub cells: Vec<CellValue>,    // 按列对齐的单元格
    pub dq_inferred_period: bool, // 日期不可解析、分区按运行时钟推断时置位
}

// ==========================================
// NormalizedTable - 归一化表
// ==========================================
// 红线: 实体范围唯一,多实体表须先拆分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTable {
    pub source_id: String,          // 发布方标识
    pub source_file: String,        // 来源文件名 (溯源)
    pub declared_name: String,      // 来源表格声明名称
    pub sheet_type: SheetType,      // 分类结果
    pub entity_id: String,          // 规范实体 ID (唯一实体范围)
    pub columns: Vec<String>,       // 列名 (单位已归一)
    pub rows: Vec<NormalizedRow>,   // 行
    pub processed_at: DateTime<Utc>, // 处理时间 (溯源)
}

// ==========================================
// PartitionKey - 分区键
// ==========================================
// (规范实体 ID, 年, 月),由行日期派生
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionKey {
    pub entity_id: String,
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{:02}", self.entity_id, self.year, self.month)
    }
}

// ==========================================
// Partition - 分区累积表
// ==========================================
// 红线: 列集合只做并集扩展,已见过的列不允许消失
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub key: PartitionKey,           // 分区键
    pub columns: Vec<String>,        // 并集列 (按首次出现顺序)
    pub rows: Vec<Vec<CellValue>>,   // 累积行,与 columns 对齐
    pub updated_at: DateTime<Utc>,   // 最后合并时间
}

impl Partition {
    pub fn new(key: PartitionKey) -> Self {
        Partition {
            key,
            columns: Vec::new(),
            rows: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

// ==========================================
// ArtifactRef - 已发布产物引用
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub partition_key: PartitionKey, // 所属分区
    pub format: ArtifactFormat,      // 产物格式
    pub remote_key: String,          // 对象存储键 (确定性命名)
}

// ==========================================
// RunReport - 运行报告
// ==========================================
// 一次运行的可观测结果,由管道编排器维护并在结束时输出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,                    // 运行 ID (UUID)
    pub source_id: String,                 // 本次运行的发布方
    pub started_at: DateTime<Utc>,         // 开始时间
    pub finished_at: Option<DateTime<Utc>>, // 结束时间
    pub accepted: usize,                   // 接受的文档数 (新周期或新修订)
    pub superseded: usize,                 // 触发替换的文档数
    pub skipped_stale: usize,              // 非更新修订跳过数
    pub dropped_rows: usize,               // 实体过滤丢弃行数
    pub decode_failures: usize,            // 解码失败数
    pub published: usize,                  // 实际写出产物数
    pub publish_skipped: usize,            // 已存在跳过产物数
    pub entities: BTreeSet<String>,        // 本次触达的实体集合
}

impl RunReport {
    pub fn new(source_id: &str) -> Self {
        RunReport {
            run_id: Uuid::new_v4().to_string(),
            source_id: source_id.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            accepted: 0,
            superseded: 0,
            skipped_stale: 0,
            dropped_rows: 0,
            decode_failures: 0,
            published: 0,
            publish_skipped: 0,
            entities: BTreeSet::new(),
        }
    }

    /// 标记运行结束
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// 运行耗时 (毫秒),未结束时按当前时刻计算
    pub fn elapsed_ms(&self) -> i64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds()
    }
}

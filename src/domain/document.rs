// ==========================================
// 电力结算报表归一化系统 - 文档领域模型
// ==========================================
// 职责: 源文档/原始表格/周期键的领域定义
// 红线: 不含解码逻辑,不含数据访问逻辑
// ==========================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// DocumentRef - 候选文档引用
// ==========================================
// 用途: 源连接器列举候选时产生,取回后随 RawDocument 流转
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub source_id: String, // 发布方标识 (如 SRPC/NRLDC/WRPC)
    pub file_name: String, // 文件名 (含扩展名)
    pub locator: String,   // 取回位置 (本地路径或 URL)
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source_id, self.file_name)
    }
}

// ==========================================
// RawDocument - 已取回的原始文档
// ==========================================
// 用途: 解码层输入,字节原样保留
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub doc_ref: DocumentRef,           // 候选引用
    pub bytes: Vec<u8>,                 // 原始字节
    pub retrieved_at: DateTime<Utc>,    // 取回时间
    pub period_hint: Option<PeriodKey>, // 连接器给出的周期提示 (尽力而为)
}

impl RawDocument {
    /// 内容大小 (字节),用于修订比较
    pub fn content_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

// ==========================================
// RawTable - 文档内一个表格块
// ==========================================
// 一个 RawDocument 可解出多个 RawTable (多 sheet / 压缩包多成员)
// 此时尚无表头概念,全部行按字符串保留
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub doc_ref: DocumentRef,       // 所属文档引用
    pub declared_name: String,      // 声明名称 (sheet 名或压缩包成员名)
    pub rows: Vec<Vec<String>>,     // 原始行 (未识别表头)
}

impl RawTable {
    /// 内容采样 (前 n 行),供分类与表头识别使用
    pub fn sample(&self, n: usize) -> &[Vec<String>] {
        let end = self.rows.len().min(n);
        &self.rows[..end]
    }
}

// ==========================================
// PeriodKey - 报告周期键
// ==========================================
// 一个发布方的一个报告区间 (通常为周),版本追踪的主键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    pub source_id: String,       // 发布方标识
    pub period_start: NaiveDate, // 区间起始日
    pub period_end: NaiveDate,   // 区间结束日
    pub sequence_no: u32,        // 序号 (周次,无则为 0)
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}..{} WK{}",
            self.source_id, self.period_start, self.period_end, self.sequence_no
        )
    }
}

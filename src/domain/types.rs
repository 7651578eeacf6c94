// ==========================================
// 电力结算报表归一化系统 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 表格类型 (Sheet Type)
// ==========================================
// 每张 RawTable 分类一次,结果不可变
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SheetType {
    EntityData,    // 电站级明细数据
    RateData,      // 费率/电价数据
    DeviationData, // 偏差/DSM 结算数据
    FrequencyData, // 频率数据
    AggregateData, // 州级/区域级汇总数据
    Unknown,       // 无法识别
}

impl fmt::Display for SheetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetType::EntityData => write!(f, "ENTITY_DATA"),
            SheetType::RateData => write!(f, "RATE_DATA"),
            SheetType::DeviationData => write!(f, "DEVIATION_DATA"),
            SheetType::FrequencyData => write!(f, "FREQUENCY_DATA"),
            SheetType::AggregateData => write!(f, "AGGREGATE_DATA"),
            SheetType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl SheetType {
    /// 是否参与电站级归集
    ///
    /// 汇总表与无法识别的表不进入电站级输出
    pub fn entity_scoped(&self) -> bool {
        !matches!(self, SheetType::AggregateData | SheetType::Unknown)
    }
}

// ==========================================
// 列角色 (Column Role)
// ==========================================
// 表头关键词词典的映射目标,供表头识别/实体解析/单位归一共用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnRole {
    Date,      // 日期列
    Time,      // 时间列
    Block,     // 时段/区块列
    Entity,    // 实体/电站名称列
    Energy,    // 电量列 (单位归一的作用对象)
    Frequency, // 频率列
    Rate,      // 费率列
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRole::Date => write!(f, "DATE"),
            ColumnRole::Time => write!(f, "TIME"),
            ColumnRole::Block => write!(f, "BLOCK"),
            ColumnRole::Entity => write!(f, "ENTITY"),
            ColumnRole::Energy => write!(f, "ENERGY"),
            ColumnRole::Frequency => write!(f, "FREQUENCY"),
            ColumnRole::Rate => write!(f, "RATE"),
        }
    }
}

impl ColumnRole {
    /// 从字符串解析列角色 (词典 JSON 覆盖文件的键)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DATE" => Some(ColumnRole::Date),
            "TIME" => Some(ColumnRole::Time),
            "BLOCK" => Some(ColumnRole::Block),
            "ENTITY" => Some(ColumnRole::Entity),
            "ENERGY" => Some(ColumnRole::Energy),
            "FREQUENCY" => Some(ColumnRole::Frequency),
            "RATE" => Some(ColumnRole::Rate),
            _ => None,
        }
    }
}

// ==========================================
// 产物格式 (Artifact Format)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactFormat {
    RawCsv,   // 行式 CSV 产物
    Columnar, // 列式 Parquet 产物
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactFormat::RawCsv => write!(f, "RAW_CSV"),
            ArtifactFormat::Columnar => write!(f, "COLUMNAR"),
        }
    }
}

impl ArtifactFormat {
    /// 产物文件扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::RawCsv => "csv",
            ArtifactFormat::Columnar => "parquet",
        }
    }

    /// 制品键中的格式段
    pub fn key_segment(&self) -> &'static str {
        match self {
            ArtifactFormat::RawCsv => "raw",
            ArtifactFormat::Columnar => "columnar",
        }
    }
}

// ==========================================
// 电力结算报表归一化系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod document;
pub mod table;
pub mod types;
pub mod version;

// 重导出核心类型
pub use document::{DocumentRef, PeriodKey, RawDocument, RawTable};
pub use table::{
    ArtifactRef, CellValue, NormalizedRow, NormalizedTable, Partition, PartitionKey, RunReport,
};
pub use types::{ArtifactFormat, ColumnRole, SheetType};
pub use version::VersionRecord;

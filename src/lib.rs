// ==========================================
// 电力结算报表归一化系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + Parquet
// 系统定位: 多发布方结算报表 -> 规范分区数据集
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 版本台账
pub mod repository;

// 引擎层 - 归一化与归集规则
pub mod engine;

// 解码层 - 外部文件解析
pub mod decoder;

// 配置层 - 系统配置
pub mod config;

// 外部接口 - 文档来源
pub mod connector;

// 外部接口 - 产物存储
pub mod store;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ArtifactFormat, ColumnRole, SheetType};

// 领域实体
pub use domain::{
    ArtifactRef, CellValue, DocumentRef, NormalizedRow, NormalizedTable, Partition, PartitionKey,
    PeriodKey, RawDocument, RawTable, RunReport, VersionRecord,
};

// 引擎
pub use engine::{
    ArtifactPublisher, EntitySplitter, HeaderDetector, PartitionedConsolidator, Pipeline,
    SheetClassifier, StationResolver, TableNormalizer, UnitNormalizer, VersionGate,
};

// 仓储
pub use repository::{MemoryVersionStore, SqliteVersionStore, VersionStore};

// 外部接口
pub use connector::{LocalDirConnector, SourceConnector};
pub use store::{FsObjectStore, MemoryObjectStore, ObjectStore};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "电力结算报表归一化系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

// ==========================================
// 预编译检查
// ==========================================

// 确保编译时所有模块可见
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

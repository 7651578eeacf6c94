// ==========================================
// 电力结算报表归一化系统 - 配置层
// ==========================================
// 职责: 系统配置管理 + 词典/注册表等静态映射表加载
// 存储: config_kv 表 + JSON 覆盖文件
// ==========================================

pub mod column_roles;
pub mod config_manager;
pub mod pipeline_config_trait;
pub mod station_registry;

// 重导出核心配置类型
pub use column_roles::ColumnRoleLexicon;
pub use config_manager::{config_keys, ConfigManager};
pub use pipeline_config_trait::PipelineConfigReader;
pub use station_registry::{RegionEntry, StationRegistry};

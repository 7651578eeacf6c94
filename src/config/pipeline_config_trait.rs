// ==========================================
// 电力结算报表归一化系统 - 管道配置读取 Trait
// ==========================================
// 职责: 定义归一化管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// PipelineConfigReader Trait
// ==========================================
// 用途: 管道编排器与各引擎组件所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait PipelineConfigReader: Send + Sync {
    // ===== 表头识别配置 =====

    /// 获取表头扫描深度（从表格首行起扫描多少行）
    ///
    /// # 默认值
    /// - 10
    async fn get_header_scan_depth(&self) -> Result<usize, Box<dyn Error>>;

    // ===== 单位归一配置 =====

    /// 获取 KWh 判定阈值
    ///
    /// 电量列非空值中位数超过该阈值时视为 KWh,整列除以 1000
    ///
    /// # 默认值
    /// - 100.0
    async fn get_unit_median_threshold(&self) -> Result<f64, Box<dyn Error>>;

    // ===== 运行预算配置 =====

    /// 获取单次运行接受文档数上限
    ///
    /// 达到上限后剩余候选留待下次运行,控制单次运行成本
    ///
    /// # 默认值
    /// - 10
    async fn get_run_budget_docs(&self) -> Result<usize, Box<dyn Error>>;

    // ===== 产物命名配置 =====

    /// 获取产物键前缀
    ///
    /// # 默认值
    /// - "dsm_data"
    async fn get_artifact_prefix(&self) -> Result<String, Box<dyn Error>>;

    // ===== 外部映射表配置 =====

    /// 获取电站注册表覆盖文件路径（别名/排除/区域映射 JSON）
    ///
    /// # 返回
    /// - None: 使用内置注册表
    async fn get_station_registry_path(&self) -> Result<Option<String>, Box<dyn Error>>;

    /// 获取列角色词典覆盖文件路径（关键词 → 角色 JSON）
    ///
    /// # 返回
    /// - None: 使用内置词典
    async fn get_column_lexicon_path(&self) -> Result<Option<String>, Box<dyn Error>>;
}

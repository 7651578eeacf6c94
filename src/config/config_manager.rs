// ==========================================
// 电力结算报表归一化系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::config::pipeline_config_trait::PipelineConfigReader;
use crate::db::open_and_init;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_and_init(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT config_value FROM config_kv WHERE config_key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置值（UPSERT,已存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (config_key, config_value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(config_key) DO UPDATE SET
                 config_value = ?2,
                 updated_at = datetime('now')",
            params![key, value],
        )?;

        Ok(())
    }
}

// ==========================================
// PipelineConfigReader Trait 实现
// ==========================================
#[async_trait]
impl PipelineConfigReader for ConfigManager {
    // ===== 表头识别配置 =====

    async fn get_header_scan_depth(&self) -> Result<usize, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::HEADER_SCAN_DEPTH, "10")?;
        Ok(value.parse::<usize>().unwrap_or(10))
    }

    // ===== 单位归一配置 =====

    async fn get_unit_median_threshold(&self) -> Result<f64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::UNIT_MEDIAN_THRESHOLD, "100.0")?;
        Ok(value.parse::<f64>().unwrap_or(100.0))
    }

    // ===== 运行预算配置 =====

    async fn get_run_budget_docs(&self) -> Result<usize, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::RUN_BUDGET_DOCS, "10")?;
        Ok(value.parse::<usize>().unwrap_or(10))
    }

    // ===== 产物命名配置 =====

    async fn get_artifact_prefix(&self) -> Result<String, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::ARTIFACT_PREFIX, "dsm_data")?;
        let trimmed = value.trim().trim_matches('/').to_string();
        if trimmed.is_empty() {
            Ok("dsm_data".to_string())
        } else {
            Ok(trimmed)
        }
    }

    // ===== 外部映射表配置 =====

    async fn get_station_registry_path(&self) -> Result<Option<String>, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::STATION_REGISTRY_PATH, "")?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }

    async fn get_column_lexicon_path(&self) -> Result<Option<String>, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::COLUMN_LEXICON_PATH, "")?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 表头识别
    pub const HEADER_SCAN_DEPTH: &str = "header_scan_depth";

    // 单位归一
    pub const UNIT_MEDIAN_THRESHOLD: &str = "unit_median_threshold";

    // 运行预算
    pub const RUN_BUDGET_DOCS: &str = "run_budget_docs";

    // 产物命名
    pub const ARTIFACT_PREFIX: &str = "artifact_prefix";

    // 外部映射表
    pub const STATION_REGISTRY_PATH: &str = "station_registry_path"; // 电站注册表 JSON 路径
    pub const COLUMN_LEXICON_PATH: &str = "column_lexicon_path"; // 列角色词典 JSON 路径
}

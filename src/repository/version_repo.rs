// ==========================================
// 电力结算报表归一化系统 - 版本台账 Repository Trait
// ==========================================
// 职责: 定义周期版本与产物登记的数据访问接口（不包含业务逻辑）
// 红线: Repository 不含修订比较规则,只做数据 CRUD
// ==========================================

use crate::domain::document::PeriodKey;
use crate::domain::version::VersionRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Mutex;

// ==========================================
// VersionStore Trait
// ==========================================
// 用途: 版本门控读写周期版本记录,发布器登记产物键
// 实现者: SqliteVersionStore（period_version/period_artifact 表）,
//         MemoryVersionStore（测试替身）
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// 查询周期的当前版本记录
    ///
    /// # 返回
    /// - Some(record): 该周期已被接受过
    /// - None: 周期未见过
    async fn get_current(
        &self,
        period: &PeriodKey,
    ) -> Result<Option<VersionRecord>, Box<dyn Error>>;

    /// 写入或覆盖周期版本记录（每周期至多一条）
    async fn upsert_record(&self, record: &VersionRecord) -> Result<(), Box<dyn Error>>;

    /// 登记该周期已发布的产物键（重复登记幂等）
    async fn register_artifact(
        &self,
        period: &PeriodKey,
        artifact_key: &str,
    ) -> Result<(), Box<dyn Error>>;

    /// 查询该周期已登记的产物键（有序）
    async fn artifacts_for(&self, period: &PeriodKey) -> Result<Vec<String>, Box<dyn Error>>;

    /// 清除该周期的产物登记（修订替换先删远端产物,再调用此方法）
    async fn clear_artifacts(&self, period: &PeriodKey) -> Result<(), Box<dyn Error>>;
}

// ==========================================
// MemoryVersionStore - 内存版本台账
// ==========================================
// 用途: 测试替身,行为与 SqliteVersionStore 对齐
#[derive(Default)]
pub struct MemoryVersionStore {
    records: Mutex<HashMap<PeriodKey, VersionRecord>>,
    artifacts: Mutex<HashMap<PeriodKey, Vec<String>>>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前记录条数
    pub fn record_count(&self) -> usize {
        self.records.lock().map(|m| m.len()).unwrap_or(0)
    }
}

#[async_trait]
impl VersionStore for MemoryVersionStore {
    async fn get_current(
        &self,
        period: &PeriodKey,
    ) -> Result<Option<VersionRecord>, Box<dyn Error>> {
        let records = self
            .records
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?;
        Ok(records.get(period).cloned())
    }

    async fn upsert_record(&self, record: &VersionRecord) -> Result<(), Box<dyn Error>> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?;
        records.insert(record.period.clone(), record.clone());
        Ok(())
    }

    async fn register_artifact(
        &self,
        period: &PeriodKey,
        artifact_key: &str,
    ) -> Result<(), Box<dyn Error>> {
        let mut artifacts = self
            .artifacts
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?;
        let keys = artifacts.entry(period.clone()).or_default();
        if !keys.iter().any(|k| k == artifact_key) {
            keys.push(artifact_key.to_string());
            keys.sort();
        }
        Ok(())
    }

    async fn artifacts_for(&self, period: &PeriodKey) -> Result<Vec<String>, Box<dyn Error>> {
        let artifacts = self
            .artifacts
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?;
        Ok(artifacts.get(period).cloned().unwrap_or_default())
    }

    async fn clear_artifacts(&self, period: &PeriodKey) -> Result<(), Box<dyn Error>> {
        let mut artifacts = self
            .artifacts
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?;
        artifacts.remove(period);
        Ok(())
    }
}

// ==========================================
// 电力结算报表归一化系统 - 对象存储
// ==========================================
// 职责: 产物写入/存在性检查/删除的最小接口
// 红线: 除 last-write-wins 外不假设任何事务保证
// ==========================================

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

// ==========================================
// ObjectStore Trait
// ==========================================
// 用途: 产物发布器写出产物、版本替换时清理旧产物
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 目标键是否已存在
    async fn exists(&self, key: &str) -> Result<bool, Box<dyn Error>>;

    /// 写入对象 (覆盖同键旧值)
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), Box<dyn Error>>;

    /// 删除对象 (键不存在视为成功,幂等)
    async fn delete(&self, key: &str) -> Result<(), Box<dyn Error>>;
}

// ==========================================
// FsObjectStore - 文件系统对象存储
// ==========================================
// 键按相对路径映射到根目录下
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        FsObjectStore { root: root.into() }
    }

    fn path_of(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn exists(&self, key: &str) -> Result<bool, Box<dyn Error>> {
        Ok(self.path_of(key).is_file())
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), Box<dyn Error>> {
        let path = self.path_of(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Box<dyn Error>> {
        let path = self.path_of(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Box::new(e)),
        }
    }
}

// ==========================================
// MemoryObjectStore - 内存对象存储
// ==========================================
// 用途: 测试替身,同时统计 put/exists 调用次数以验证发布幂等性
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    put_calls: Mutex<usize>,
    exists_calls: Mutex<usize>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前全部键 (有序)
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// 读取对象内容
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().ok().and_then(|m| m.get(key).cloned())
    }

    /// 累计 put 调用次数
    pub fn put_call_count(&self) -> usize {
        self.put_calls.lock().map(|c| *c).unwrap_or(0)
    }

    /// 累计 exists 调用次数
    pub fn exists_call_count(&self) -> usize {
        self.exists_calls.lock().map(|c| *c).unwrap_or(0)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn exists(&self, key: &str) -> Result<bool, Box<dyn Error>> {
        {
            let mut calls = self
                .exists_calls
                .lock()
                .map_err(|e| format!("锁获取失败: {}", e))?;
            *calls += 1;
        }
        let objects = self
            .objects
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?;
        Ok(objects.contains_key(key))
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), Box<dyn Error>> {
        {
            let mut calls = self
                .put_calls
                .lock()
                .map_err(|e| format!("锁获取失败: {}", e))?;
            *calls += 1;
        }
        let mut objects = self
            .objects
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?;
        objects.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Box<dyn Error>> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?;
        objects.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_store_put_exists_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        let key = "dsm_data/raw/SRPC/XYZ_TPS/2024/03/a.csv";
        assert!(!store.exists(key).await.unwrap());

        store.put(key, b"Date,Actual\n").await.unwrap();
        assert!(store.exists(key).await.unwrap());
        assert!(dir
            .path()
            .join("dsm_data/raw/SRPC/XYZ_TPS/2024/03/a.csv")
            .is_file());

        store.delete(key).await.unwrap();
        assert!(!store.exists(key).await.unwrap());
        // 重复删除幂等
        store.delete(key).await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_counters() {
        let store = MemoryObjectStore::new();
        store.put("k1", b"v1").await.unwrap();
        store.exists("k1").await.unwrap();
        store.exists("k2").await.unwrap();

        assert_eq!(store.put_call_count(), 1);
        assert_eq!(store.exists_call_count(), 2);
        assert_eq!(store.keys(), vec!["k1".to_string()]);
        assert_eq!(store.get("k1"), Some(b"v1".to_vec()));
    }
}

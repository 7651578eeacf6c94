// ==========================================
// 电力结算报表归一化系统 - 源连接器
// ==========================================
// 职责: 候选文档发现与取回
// 红线: 不解码,不做版本判断,候选顺序必须确定
// ==========================================

use crate::domain::document::{DocumentRef, RawDocument};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

// ==========================================
// SourceConnector Trait
// ==========================================
// 用途: 管道编排器获取候选文档的接口
// 实现者: LocalDirConnector (本地目录),站点专用连接器在外围工具中实现
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// 列举候选文档 (顺序确定,按文件名排序)
    async fn list_candidate_documents(
        &self,
        source_id: &str,
    ) -> Result<Vec<DocumentRef>, Box<dyn Error>>;

    /// 取回文档字节
    async fn fetch(&self, doc_ref: &DocumentRef) -> Result<RawDocument, Box<dyn Error>>;
}

// ==========================================
// LocalDirConnector - 本地目录连接器
// ==========================================
// 一个目录即一个发布方的投递箱,文件修改时间作为取回时间
pub struct LocalDirConnector {
    root: PathBuf,
}

impl LocalDirConnector {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        LocalDirConnector { root: root.into() }
    }
}

#[async_trait]
impl SourceConnector for LocalDirConnector {
    async fn list_candidate_documents(
        &self,
        source_id: &str,
    ) -> Result<Vec<DocumentRef>, Box<dyn Error>> {
        let mut refs = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            if file_name.starts_with('.') {
                continue;
            }
            refs.push(DocumentRef {
                source_id: source_id.to_string(),
                file_name,
                locator: path.display().to_string(),
            });
        }

        // 候选顺序确定化
        refs.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        debug!(source_id, count = refs.len(), "候选文档列举完成");
        Ok(refs)
    }

    async fn fetch(&self, doc_ref: &DocumentRef) -> Result<RawDocument, Box<dyn Error>> {
        let path = PathBuf::from(&doc_ref.locator);
        let bytes = fs::read(&path)?;

        // 取回时间用文件修改时间,重复运行同一文件不会被误判为更新
        let retrieved_at: DateTime<Utc> = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified.into(),
            Err(_) => Utc::now(),
        };

        Ok(RawDocument {
            doc_ref: doc_ref.clone(),
            bytes,
            retrieved_at,
            period_hint: None,
        })
    }
}

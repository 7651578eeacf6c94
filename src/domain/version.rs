// ==========================================
// 电力结算报表归一化系统 - 版本领域模型
// ==========================================
// 职责: 周期版本记录与修订比较规则
// 红线: 每个 PeriodKey 至多一条当前记录
// ==========================================

use crate::domain::document::PeriodKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// VersionRecord - 周期版本记录
// ==========================================
// 对齐: period_version 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub period: PeriodKey,           // 周期键
    pub revision_no: u32,            // 已接受的修订号
    pub accepted_at: DateTime<Utc>,  // 接受时间
    pub source_file: String,         // 来源文件名
    pub content_size: u64,           // 内容大小 (字节)
}

impl VersionRecord {
    /// 判断来文是否严格更新于本记录
    ///
    /// 规则: 修订号更高即更新;修订号相等时,取回时间更晚
    /// 且内容大小不同才算更新 (防止同一文件反复触发替换)
    pub fn superseded_by(
        &self,
        revision_no: u32,
        retrieved_at: DateTime<Utc>,
        content_size: u64,
    ) -> bool {
        if revision_no > self.revision_no {
            return true;
        }
        revision_no == self.revision_no
            && retrieved_at > self.accepted_at
            && content_size != self.content_size
    }
}

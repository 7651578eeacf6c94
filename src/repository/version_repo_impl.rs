// ==========================================
// 电力结算报表归一化系统 - 版本台账 SQLite 实现
// ==========================================
// 职责: period_version / period_artifact 表的数据访问
// 对齐: db::init_schema 中的表定义
// ==========================================

use crate::db::{configure_sqlite_connection, init_schema, open_and_init};
use crate::domain::document::PeriodKey;
use crate::domain::version::VersionRecord;
use crate::repository::error::RepositoryError;
use crate::repository::version_repo::VersionStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// SqliteVersionStore - SQLite 版本台账
// ==========================================
pub struct SqliteVersionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVersionStore {
    /// 创建新的 SqliteVersionStore 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_and_init(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（幂等应用 PRAGMA 与建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&conn_guard)?;
            init_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl VersionStore for SqliteVersionStore {
    async fn get_current(
        &self,
        period: &PeriodKey,
    ) -> Result<Option<VersionRecord>, Box<dyn Error>> {
        let conn = self.get_conn()?;

        let result = conn.query_row(
            r#"
            SELECT revision_no, accepted_at, source_file, content_size
            FROM period_version
            WHERE source_id = ?1 AND period_start = ?2 AND period_end = ?3 AND sequence_no = ?4
            "#,
            params![
                period.source_id,
                period.period_start,
                period.period_end,
                period.sequence_no,
            ],
            |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, DateTime<Utc>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        );

        match result {
            Ok((revision_no, accepted_at, source_file, content_size)) => Ok(Some(VersionRecord {
                period: period.clone(),
                revision_no,
                accepted_at,
                source_file,
                content_size: content_size as u64,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(RepositoryError::from(e))),
        }
    }

    async fn upsert_record(&self, record: &VersionRecord) -> Result<(), Box<dyn Error>> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO period_version (
                source_id,
                period_start,
                period_end,
                sequence_no,
                revision_no,
                accepted_at,
                source_file,
                content_size
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(source_id, period_start, period_end, sequence_no) DO UPDATE SET
                revision_no = excluded.revision_no,
                accepted_at = excluded.accepted_at,
                source_file = excluded.source_file,
                content_size = excluded.content_size
            "#,
            params![
                record.period.source_id,
                record.period.period_start,
                record.period.period_end,
                record.period.sequence_no,
                record.revision_no,
                record.accepted_at,
                record.source_file,
                record.content_size as i64,
            ],
        )
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn register_artifact(
        &self,
        period: &PeriodKey,
        artifact_key: &str,
    ) -> Result<(), Box<dyn Error>> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT OR IGNORE INTO period_artifact (
                source_id, period_start, period_end, sequence_no, artifact_key
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                period.source_id,
                period.period_start,
                period.period_end,
                period.sequence_no,
                artifact_key,
            ],
        )
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn artifacts_for(&self, period: &PeriodKey) -> Result<Vec<String>, Box<dyn Error>> {
        let conn = self.get_conn()?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT artifact_key FROM period_artifact
                WHERE source_id = ?1 AND period_start = ?2 AND period_end = ?3 AND sequence_no = ?4
                ORDER BY artifact_key ASC
                "#,
            )
            .map_err(RepositoryError::from)?;

        let keys = stmt
            .query_map(
                params![
                    period.source_id,
                    period.period_start,
                    period.period_end,
                    period.sequence_no,
                ],
                |row| row.get::<_, String>(0),
            )
            .map_err(RepositoryError::from)?
            .collect::<SqliteResult<Vec<_>>>()
            .map_err(RepositoryError::from)?;

        Ok(keys)
    }

    async fn clear_artifacts(&self, period: &PeriodKey) -> Result<(), Box<dyn Error>> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            DELETE FROM period_artifact
            WHERE source_id = ?1 AND period_start = ?2 AND period_end = ?3 AND sequence_no = ?4
            "#,
            params![
                period.source_id,
                period.period_start,
                period.period_end,
                period.sequence_no,
            ],
        )
        .map_err(RepositoryError::from)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn period(seq: u32) -> PeriodKey {
        PeriodKey {
            source_id: "SRPC".to_string(),
            period_start: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            sequence_no: seq,
        }
    }

    fn record(seq: u32, revision_no: u32, content_size: u64) -> VersionRecord {
        VersionRecord {
            period: period(seq),
            revision_no,
            accepted_at: Utc::now(),
            source_file: format!("dsm_040324_r{}.xlsx", revision_no),
            content_size,
        }
    }

    #[tokio::test]
    async fn test_get_current_unseen_period() {
        let store = SqliteVersionStore::new(":memory:").unwrap();
        let current = store.get_current(&period(10)).await.unwrap();
        assert!(current.is_none());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_single_record() {
        let store = SqliteVersionStore::new(":memory:").unwrap();

        store.upsert_record(&record(10, 0, 1000)).await.unwrap();
        store.upsert_record(&record(10, 2, 1200)).await.unwrap();

        let current = store.get_current(&period(10)).await.unwrap().unwrap();
        assert_eq!(current.revision_no, 2);
        assert_eq!(current.content_size, 1200);
        assert_eq!(current.source_file, "dsm_040324_r2.xlsx");

        // 同周期只有一条记录
        let conn = store.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM period_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_artifact_registration_roundtrip() {
        let store = SqliteVersionStore::new(":memory:").unwrap();
        let p = period(10);

        store
            .register_artifact(&p, "dsm_data/raw/SRPC/XYZ_TPS/2024/03/a.csv")
            .await
            .unwrap();
        store
            .register_artifact(&p, "dsm_data/columnar/SRPC/XYZ_TPS/2024/03/a.parquet")
            .await
            .unwrap();
        // 重复登记幂等
        store
            .register_artifact(&p, "dsm_data/raw/SRPC/XYZ_TPS/2024/03/a.csv")
            .await
            .unwrap();

        let keys = store.artifacts_for(&p).await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys[0].contains("columnar"));

        store.clear_artifacts(&p).await.unwrap();
        assert!(store.artifacts_for(&p).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_periods_are_isolated() {
        let store = SqliteVersionStore::new(":memory:").unwrap();
        store.upsert_record(&record(10, 1, 100)).await.unwrap();
        store.upsert_record(&record(11, 3, 200)).await.unwrap();

        let r10 = store.get_current(&period(10)).await.unwrap().unwrap();
        let r11 = store.get_current(&period(11)).await.unwrap().unwrap();
        assert_eq!(r10.revision_no, 1);
        assert_eq!(r11.revision_no, 3);
    }
}

// ==========================================
// 电力结算报表归一化系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免“部分模块外键开启/部分不开启”
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 统一建表入口，版本台账与配置表只在这里定义
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化版本台账与配置表
///
/// 说明：
/// - period_version: 每个报告周期只保留一条“当前版本”记录
/// - period_artifact: 记录每个周期已发布的产物 key，供修订替换时清理
/// - config_kv: 运行参数（预算、阈值等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS period_version (
            source_id     TEXT    NOT NULL,
            period_start  TEXT    NOT NULL,
            period_end    TEXT    NOT NULL,
            sequence_no   INTEGER NOT NULL DEFAULT 0,
            revision_no   INTEGER NOT NULL DEFAULT 0,
            accepted_at   TEXT    NOT NULL,
            source_file   TEXT    NOT NULL,
            content_size  INTEGER NOT NULL,
            PRIMARY KEY (source_id, period_start, period_end, sequence_no)
        );

        CREATE TABLE IF NOT EXISTS period_artifact (
            source_id     TEXT    NOT NULL,
            period_start  TEXT    NOT NULL,
            period_end    TEXT    NOT NULL,
            sequence_no   INTEGER NOT NULL DEFAULT 0,
            artifact_key  TEXT    NOT NULL,
            PRIMARY KEY (source_id, period_start, period_end, sequence_no, artifact_key)
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            config_key    TEXT    NOT NULL PRIMARY KEY,
            config_value  TEXT    NOT NULL,
            updated_at    TEXT    NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;
    Ok(())
}

/// 打开连接并确保 schema 就绪（仓储层统一入口）
pub fn open_and_init(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

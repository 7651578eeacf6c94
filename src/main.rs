// ==========================================
// 电力结算报表归一化系统 - 命令行主入口
// ==========================================
// 技术栈: Rust + SQLite + Parquet
// 系统定位: 多发布方结算报表 -> 规范分区数据集
// ==========================================

use dsm_consolidator::config::{
    ColumnRoleLexicon, ConfigManager, PipelineConfigReader, StationRegistry,
};
use dsm_consolidator::connector::LocalDirConnector;
use dsm_consolidator::engine::Pipeline;
use dsm_consolidator::logging;
use dsm_consolidator::repository::SqliteVersionStore;
use dsm_consolidator::store::FsObjectStore;
use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("电力结算报表归一化系统");
    tracing::info!("系统版本: {}", dsm_consolidator::VERSION);
    tracing::info!("==================================================");

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("用法: {} <来源标识> <输入目录> [产物目录] [数据库路径]", args[0]);
        eprintln!("示例: {} SRPC ./inbox ./artifacts", args[0]);
        process::exit(2);
    }
    let source_id = &args[1];
    let input_dir = PathBuf::from(&args[2]);
    let artifact_dir = args
        .get(3)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("artifacts"));
    let db_path = match args.get(4) {
        Some(path) => path.clone(),
        None => default_db_path()?,
    };

    tracing::info!("来源标识: {}", source_id);
    tracing::info!("输入目录: {}", input_dir.display());
    tracing::info!("产物目录: {}", artifact_dir.display());
    tracing::info!("使用数据库: {}", db_path);

    // 装配配置与存储
    let config = Arc::new(ConfigManager::new(&db_path)?);
    let version_store = Arc::new(SqliteVersionStore::new(&db_path)?);
    let object_store = Arc::new(FsObjectStore::new(artifact_dir));
    let connector = Arc::new(LocalDirConnector::new(input_dir));

    // 注册表与词典: 配置了覆盖文件则加载,否则用内置
    let registry = match config.get_station_registry_path().await? {
        Some(path) => Arc::new(StationRegistry::from_json_file(&path)?),
        None => Arc::new(StationRegistry::builtin()),
    };
    let lexicon = match config.get_column_lexicon_path().await? {
        Some(path) => Arc::new(ColumnRoleLexicon::from_json_file(&path)?),
        None => Arc::new(ColumnRoleLexicon::builtin()),
    };

    let pipeline = Pipeline::new(
        connector,
        version_store,
        object_store,
        config,
        registry,
        lexicon,
    );

    let report = pipeline.run(source_id).await?;

    println!("==================================================");
    println!("运行编号:       {}", report.run_id);
    println!("来源标识:       {}", report.source_id);
    println!("接受文档:       {}", report.accepted);
    println!("顶替版本:       {}", report.superseded);
    println!("判稳跳过:       {}", report.skipped_stale);
    println!("解码失败:       {}", report.decode_failures);
    println!("过滤丢弃行:     {}", report.dropped_rows);
    println!("发布制品:       {}", report.published);
    println!("短路跳过制品:   {}", report.publish_skipped);
    println!("涉及实体:       {}", report.entities.len());
    println!("耗时:           {} ms", report.elapsed_ms());
    println!("==================================================");

    Ok(())
}

/// 默认数据库路径: 平台数据目录下的 dsm-consolidator/dsm.db
///
/// 可通过环境变量 DSM_CONSOLIDATOR_DB_PATH 显式指定 (便于调试/测试/CI)
fn default_db_path() -> Result<String, Box<dyn Error>> {
    if let Ok(path) = env::var("DSM_CONSOLIDATOR_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    let dir = base.join("dsm-consolidator");
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("dsm.db").to_string_lossy().into_owned())
}

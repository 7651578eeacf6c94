// ==========================================
// 电力结算报表归一化系统 - 引擎层
// ==========================================
// 职责: 实现归一化与归集的业务规则,不拼 SQL
// 红线: 单文档/单表失败不得中断整次运行
// ==========================================

pub mod classifier;
pub mod consolidator;
pub mod entity_splitter;
pub mod header_detector;
pub mod pipeline;
pub mod publisher;
pub mod station_resolver;
pub mod table_normalizer;
pub mod unit_normalizer;
pub mod version_gate;

// 重导出核心引擎
pub use classifier::SheetClassifier;
pub use consolidator::{ConsolidatedPartition, MergeStats, PartitionedConsolidator};
pub use entity_splitter::{EntitySplitter, SplitOutcome};
pub use header_detector::{HeaderDetector, HeaderResolution};
pub use pipeline::Pipeline;
pub use publisher::{ArtifactPublisher, PublishOutcome};
pub use station_resolver::StationResolver;
pub use table_normalizer::{NormalizeOutcome, TableNormalizer};
pub use unit_normalizer::UnitNormalizer;
pub use version_gate::{GateDecision, ParsedDocumentVersion, PeriodParser, VersionGate};

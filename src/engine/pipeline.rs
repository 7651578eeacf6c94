// ==========================================
// 电力结算报表归一化系统 - 归集流水线
// ==========================================
// 用途: 协调 连接器→版本闸门→解码→归一化→归并→发布 的完整运行
// 红线: 单文档失败只计数不中断;接受量达预算即提前收束
// ==========================================

use crate::config::column_roles::ColumnRoleLexicon;
use crate::config::pipeline_config_trait::PipelineConfigReader;
use crate::config::station_registry::StationRegistry;
use crate::connector::SourceConnector;
use crate::decoder::file_parser::{is_junk_name, supported_extension, DocumentDecoder};
use crate::domain::table::RunReport;
use crate::engine::consolidator::PartitionedConsolidator;
use crate::engine::publisher::ArtifactPublisher;
use crate::engine::table_normalizer::TableNormalizer;
use crate::engine::version_gate::{GateDecision, PeriodParser, VersionGate};
use crate::repository::version_repo::VersionStore;
use crate::store::ObjectStore;
use chrono::Utc;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// Pipeline - 归集流水线
// ==========================================

pub struct Pipeline<N, V, S, C>
where
    N: SourceConnector + ?Sized,
    V: VersionStore + ?Sized,
    S: ObjectStore + ?Sized,
    C: PipelineConfigReader + ?Sized,
{
    connector: Arc<N>,
    version_store: Arc<V>,
    object_store: Arc<S>,
    config: Arc<C>,
    registry: Arc<StationRegistry>,
    lexicon: Arc<ColumnRoleLexicon>,
}

impl<N, V, S, C> Pipeline<N, V, S, C>
where
    N: SourceConnector + ?Sized,
    V: VersionStore + ?Sized,
    S: ObjectStore + ?Sized,
    C: PipelineConfigReader + ?Sized,
{
    pub fn new(
        connector: Arc<N>,
        version_store: Arc<V>,
        object_store: Arc<S>,
        config: Arc<C>,
        registry: Arc<StationRegistry>,
        lexicon: Arc<ColumnRoleLexicon>,
    ) -> Self {
        Self {
            connector,
            version_store,
            object_store,
            config,
            registry,
            lexicon,
        }
    }

    /// 对一个来源执行一次完整归集运行
    #[instrument(skip(self))]
    pub async fn run(&self, source_id: &str) -> Result<RunReport, Box<dyn Error>> {
        let mut report = RunReport::new(source_id);
        let run_clock = Utc::now().date_naive();

        // ==========================================
        // 步骤1: 装配运行参数与各级部件
        // ==========================================
        let scan_depth = self.config.get_header_scan_depth().await?;
        let unit_threshold = self.config.get_unit_median_threshold().await?;
        let budget = self.config.get_run_budget_docs().await?;
        let prefix = self.config.get_artifact_prefix().await?;

        let parser = PeriodParser::new()?;
        let decoder = DocumentDecoder;
        let normalizer = TableNormalizer::new(
            Arc::clone(&self.lexicon),
            Arc::clone(&self.registry),
            scan_depth,
            unit_threshold,
        )?;
        let gate = VersionGate::new(Arc::clone(&self.version_store));
        let publisher = ArtifactPublisher::new(Arc::clone(&self.object_store), prefix);
        let mut consolidator = PartitionedConsolidator::new(run_clock);

        let candidates = self.connector.list_candidate_documents(source_id).await?;
        info!(
            run_id = %report.run_id,
            candidate_count = candidates.len(),
            budget,
            "归集运行开始"
        );

        // ==========================================
        // 步骤2: 逐文档 闸门→解码→归一化→归并
        // ==========================================
        for doc_ref in candidates {
            if report.accepted >= budget {
                info!(budget, "接受量达单次运行预算,提前收束");
                break;
            }

            if is_junk_name(&doc_ref.file_name) || !supported_extension(&doc_ref.file_name) {
                debug!(file_name = %doc_ref.file_name, "占位或不支持的文件,跳过");
                continue;
            }

            let doc = match self.connector.fetch(&doc_ref).await {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(file_name = %doc_ref.file_name, error = %e, "文档拉取失败");
                    report.decode_failures += 1;
                    continue;
                }
            };

            let mut parsed = parser.parse(source_id, &doc_ref.file_name, run_clock);
            if let Some(hint) = &doc.period_hint {
                parsed.period = hint.clone();
                parsed.inferred = false;
            }

            let decision = gate.evaluate(&parsed, &doc).await?;
            if let GateDecision::RejectStale { current_revision } = decision {
                debug!(
                    file_name = %doc_ref.file_name,
                    period = %parsed.period,
                    current_revision,
                    "非严格更新,拒绝"
                );
                report.skipped_stale += 1;
                continue;
            }

            let tables = match decoder.decode(&doc) {
                Ok(tables) => tables,
                Err(e) => {
                    warn!(file_name = %doc_ref.file_name, error = %e, "文档解码失败");
                    report.decode_failures += 1;
                    continue;
                }
            };

            let mut normalized_tables = Vec::new();
            let mut doc_dropped = 0usize;
            for table in &tables {
                let outcome = normalizer.normalize_table(table);
                doc_dropped += outcome.dropped_rows;
                normalized_tables.extend(outcome.tables);
            }

            // 解码与归一化都成功才算接受,此刻才允许动共享状态
            if let GateDecision::AcceptSupersede {
                prior_revision,
                stale_artifacts,
            } = decision
            {
                for key in &stale_artifacts {
                    self.object_store.delete(key).await?;
                }
                self.version_store.clear_artifacts(&parsed.period).await?;
                consolidator.evict_period(&parsed.period);
                report.superseded += 1;
                info!(
                    period = %parsed.period,
                    prior_revision,
                    revision_no = parsed.revision_no,
                    retired_artifacts = stale_artifacts.len(),
                    "顶替在位版本"
                );
            }

            gate.record_acceptance(&parsed, &doc).await?;
            report.accepted += 1;
            report.dropped_rows += doc_dropped;

            let mut inferred_rows = 0usize;
            for normalized in &normalized_tables {
                report.entities.insert(normalized.entity_id.clone());
                let stats = consolidator.merge_table(normalized, &parsed.period);
                inferred_rows += stats.inferred_rows;
            }

            info!(
                file_name = %doc_ref.file_name,
                period = %parsed.period,
                revision_no = parsed.revision_no,
                table_count = normalized_tables.len(),
                dropped_rows = doc_dropped,
                inferred_rows,
                "文档接受并归并"
            );
        }

        // ==========================================
        // 步骤3: 发布分区制品并登记归属
        // ==========================================
        let consolidated = consolidator.finish();
        info!(partition_count = consolidated.len(), "开始发布分区制品");

        for entry in &consolidated {
            let outcome = publisher.publish(source_id, &entry.partition).await?;
            report.published += outcome.written.len();
            report.publish_skipped += outcome.skipped.len();

            for artifact in outcome.written.iter().chain(outcome.skipped.iter()) {
                for period in &entry.contributing_periods {
                    self.version_store
                        .register_artifact(period, &artifact.remote_key)
                        .await?;
                }
            }
        }

        report.finish();
        info!(
            run_id = %report.run_id,
            accepted = report.accepted,
            superseded = report.superseded,
            skipped_stale = report.skipped_stale,
            decode_failures = report.decode_failures,
            dropped_rows = report.dropped_rows,
            published = report.published,
            publish_skipped = report.publish_skipped,
            entity_count = report.entities.len(),
            elapsed_ms = report.elapsed_ms(),
            "归集运行结束"
        );
        Ok(report)
    }
}

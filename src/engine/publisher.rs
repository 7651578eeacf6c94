// ==========================================
// 电力结算报表归一化系统 - 制品发布器
// ==========================================
// 职责: 按确定性键发布分区的行式 CSV 与列式 Parquet 制品
// 红线: 远端已存在同键制品时跳过视为成功,不得覆写
// ==========================================

use crate::domain::table::{ArtifactRef, CellValue, Partition, PartitionKey};
use crate::domain::types::ArtifactFormat;
use crate::store::ObjectStore;
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, instrument};

/// 单分区发布结果
#[derive(Debug, Default)]
pub struct PublishOutcome {
    pub written: Vec<ArtifactRef>,
    /// 远端已存在而短路跳过的制品
    pub skipped: Vec<ArtifactRef>,
}

// ==========================================
// ArtifactPublisher - 制品发布器
// ==========================================
pub struct ArtifactPublisher<S>
where
    S: ObjectStore + ?Sized,
{
    store: Arc<S>,
    /// 制品键前缀,如 "dsm_data"
    prefix: String,
}

impl<S> ArtifactPublisher<S>
where
    S: ObjectStore + ?Sized,
{
    pub fn new(store: Arc<S>, prefix: String) -> Self {
        Self { store, prefix }
    }

    /// 发布一个分区的两种格式制品,键已存在则跳过
    #[instrument(skip(self, partition), fields(partition = %partition.key))]
    pub async fn publish(
        &self,
        source_id: &str,
        partition: &Partition,
    ) -> Result<PublishOutcome, Box<dyn Error>> {
        let mut outcome = PublishOutcome::default();

        for format in [ArtifactFormat::RawCsv, ArtifactFormat::Columnar] {
            let remote_key = self.artifact_key(source_id, &partition.key, format);
            let artifact = ArtifactRef {
                partition_key: partition.key.clone(),
                format,
                remote_key: remote_key.clone(),
            };

            if self.store.exists(&remote_key).await? {
                debug!(remote_key = %remote_key, "制品已存在,跳过发布");
                outcome.skipped.push(artifact);
                continue;
            }

            let bytes = match format {
                ArtifactFormat::RawCsv => encode_csv(partition)?,
                ArtifactFormat::Columnar => encode_parquet(partition)?,
            };
            self.store.put(&remote_key, &bytes).await?;
            debug!(remote_key = %remote_key, size = bytes.len(), "制品发布完成");
            outcome.written.push(artifact);
        }

        Ok(outcome)
    }

    /// 确定性制品键:
    /// {前缀}/{格式段}/{来源}/{实体}/{年}/{月}/{来源}_{实体}_{年}_{月}.{扩展名}
    pub fn artifact_key(
        &self,
        source_id: &str,
        key: &PartitionKey,
        format: ArtifactFormat,
    ) -> String {
        format!(
            "{}/{}/{}/{}/{}/{:02}/{}_{}_{}_{:02}.{}",
            self.prefix,
            format.key_segment(),
            source_id,
            key.entity_id,
            key.year,
            key.month,
            source_id,
            key.entity_id,
            key.year,
            key.month,
            format.extension(),
        )
    }
}

/// 行式 CSV 编码,空单元格落为空字段
fn encode_csv(partition: &Partition) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::WriterBuilder::new().from_writer(&mut buf);
        writer.write_record(&partition.columns)?;
        for row in &partition.rows {
            writer.write_record(row.iter().map(CellValue::render))?;
        }
        writer.flush()?;
    }
    Ok(buf)
}

/// 列式 Parquet 编码
///
/// 全数值列落 Float64,混入文本的列落 Utf8,均可空;列名中的
/// 空格/斜杠/连字符折为下划线
fn encode_parquet(partition: &Partition) -> Result<Vec<u8>, Box<dyn Error>> {
    let names = parquet_column_names(&partition.columns);
    let mut fields = Vec::with_capacity(names.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(names.len());

    for (idx, name) in names.iter().enumerate() {
        let column: Vec<&CellValue> = partition
            .rows
            .iter()
            .map(|row| row.get(idx).unwrap_or(&CellValue::Empty))
            .collect();

        let all_numeric = column.iter().all(|c| !matches!(c, CellValue::Text(_)));
        if all_numeric {
            let values: Float64Array = column.iter().map(|c| c.as_number()).collect();
            fields.push(Field::new(name, DataType::Float64, true));
            arrays.push(Arc::new(values));
        } else {
            let values: StringArray = column
                .iter()
                .map(|c| match c {
                    CellValue::Empty => None,
                    other => Some(other.render()),
                })
                .collect();
            fields.push(Field::new(name, DataType::Utf8, true));
            arrays.push(Arc::new(values));
        }
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(Arc::clone(&schema), arrays)?;
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema, Some(WriterProperties::builder().build()))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(buf)
}

/// 清洗后的列名仍须唯一,冲突按出现次序加 .N 后缀
fn parquet_column_names(columns: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(columns.len());
    for raw in columns {
        let base: String = raw
            .chars()
            .map(|c| if matches!(c, ' ' | '/' | '-') { '_' } else { c })
            .collect();
        let n = seen.entry(base.clone()).or_insert(0);
        if *n == 0 {
            out.push(base);
        } else {
            out.push(format!("{}.{}", base, n));
        }
        *n += 1;
    }
    out
}

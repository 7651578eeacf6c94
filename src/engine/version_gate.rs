// ==========================================
// 电力结算报表归一化系统 - 版本闸门
// ==========================================
// 职责: 从文件名解析结算周期与修订号,判定接受/顶替/拒绝
// 红线: 仅"严格更新"可顶替在位版本;重放同一文件必须判稳
// ==========================================

use crate::domain::document::{PeriodKey, RawDocument};
use crate::domain::version::VersionRecord;
use crate::repository::version_repo::VersionStore;
use chrono::{Datelike, NaiveDate, Weekday};
use regex::Regex;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, instrument};

/// 文件名解析出的版本坐标
#[derive(Debug, Clone)]
pub struct ParsedDocumentVersion {
    pub period: PeriodKey,
    pub revision_no: u32,
    /// 周期是否为推断值 (文件名无任何周期记号时回退当前周)
    pub inferred: bool,
}

/// 版本闸门判定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// 周期首见,直接接受
    AcceptNew,
    /// 严格更新,接受并顶替在位版本
    AcceptSupersede {
        prior_revision: u32,
        /// 在位版本已发布的制品键,接受前须撤下
        stale_artifacts: Vec<String>,
    },
    /// 非严格更新,拒绝处理
    RejectStale { current_revision: u32 },
}

// ==========================================
// PeriodParser - 文件名周期/修订解析器
// ==========================================
pub struct PeriodParser {
    /// DDMMYY-DDMMYY 周跨度
    span_pattern: Regex,
    /// dd.mm.yyyy 单日
    dotted_pattern: Regex,
    /// yyyy-mm-dd 单日
    iso_pattern: Regex,
    /// dd_mm_yyyy 单日
    underscore_pattern: Regex,
    /// WK-nn / week_nn 周序号
    week_pattern: Regex,
    /// 带编号的修订记号 (_r2 / _rev3 / (r2) / _revision4)
    revision_pattern: Regex,
    /// DSMR<N> 形态的修订记号
    dsmr_pattern: Regex,
    /// 无编号的 REVISED 关键词
    revised_pattern: Regex,
}

impl PeriodParser {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            span_pattern: Regex::new(r"(\d{6})\s*-\s*(\d{6})")?,
            dotted_pattern: Regex::new(r"(\d{2})\.(\d{2})\.(\d{4})")?,
            iso_pattern: Regex::new(r"(\d{4})-(\d{2})-(\d{2})")?,
            underscore_pattern: Regex::new(r"(\d{2})_(\d{2})_(\d{4})")?,
            week_pattern: Regex::new(r"(?i)(?:wk|week)[-_ ]?(\d{1,2})")?,
            revision_pattern: Regex::new(
                r"(?i)[_\-\( ]r(?:ev(?:ision)?)?[\. _\-]?(\d{1,3})(?:\D|$)",
            )?,
            dsmr_pattern: Regex::new(r"(?i)dsmr[ _\-]?(\d{1,3})(?:\D|$)")?,
            revised_pattern: Regex::new(r"(?i)revised")?,
        })
    }

    /// 解析文件名,得到周期与修订号;无周期记号回退运行时钟所在周
    pub fn parse(
        &self,
        source_id: &str,
        file_name: &str,
        run_clock: NaiveDate,
    ) -> ParsedDocumentVersion {
        let revision_no = self.parse_revision(file_name);

        if let Some((start, end)) = self.parse_period(file_name, run_clock) {
            return ParsedDocumentVersion {
                period: PeriodKey {
                    source_id: source_id.to_string(),
                    period_start: start,
                    period_end: end,
                    sequence_no: start.iso_week().week(),
                },
                revision_no,
                inferred: false,
            };
        }

        // 回退: 运行时钟所在的周一至周日
        let week = run_clock.week(Weekday::Mon);
        debug!(file_name, "文件名无周期记号,回退当前周");
        ParsedDocumentVersion {
            period: PeriodKey {
                source_id: source_id.to_string(),
                period_start: week.first_day(),
                period_end: week.last_day(),
                sequence_no: run_clock.iso_week().week(),
            },
            revision_no,
            inferred: true,
        }
    }

    fn parse_period(&self, file_name: &str, run_clock: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        if let Some(caps) = self.span_pattern.captures(file_name) {
            let start = NaiveDate::parse_from_str(&caps[1], "%d%m%y").ok();
            let end = NaiveDate::parse_from_str(&caps[2], "%d%m%y").ok();
            if let (Some(start), Some(end)) = (start, end) {
                if start <= end {
                    return Some((start, end));
                }
            }
        }
        if let Some(caps) = self.dotted_pattern.captures(file_name) {
            if let Some(date) = ymd(&caps[3], &caps[2], &caps[1]) {
                return Some((date, date));
            }
        }
        if let Some(caps) = self.iso_pattern.captures(file_name) {
            if let Some(date) = ymd(&caps[1], &caps[2], &caps[3]) {
                return Some((date, date));
            }
        }
        if let Some(caps) = self.underscore_pattern.captures(file_name) {
            if let Some(date) = ymd(&caps[3], &caps[2], &caps[1]) {
                return Some((date, date));
            }
        }
        if let Some(caps) = self.week_pattern.captures(file_name) {
            if let Ok(week_no) = caps[1].parse::<u32>() {
                if let Some(start) = NaiveDate::from_isoywd_opt(
                    run_clock.iso_week().year(),
                    week_no,
                    Weekday::Mon,
                ) {
                    let end = start + chrono::Days::new(6);
                    return Some((start, end));
                }
            }
        }
        None
    }

    /// 修订号: 带编号记号优先,REVISED 关键词记 1,无记号记 0
    fn parse_revision(&self, file_name: &str) -> u32 {
        for pattern in [&self.revision_pattern, &self.dsmr_pattern] {
            if let Some(caps) = pattern.captures(file_name) {
                if let Ok(n) = caps[1].parse::<u32>() {
                    return n;
                }
            }
        }
        if self.revised_pattern.is_match(file_name) {
            return 1;
        }
        0
    }
}

// ==========================================
// VersionGate - 版本闸门
// ==========================================
pub struct VersionGate<V>
where
    V: VersionStore + ?Sized,
{
    store: Arc<V>,
}

impl<V> VersionGate<V>
where
    V: VersionStore + ?Sized,
{
    pub fn new(store: Arc<V>) -> Self {
        Self { store }
    }

    /// 对照在位版本记录判定文档去留
    #[instrument(
        skip(self, parsed, doc),
        fields(period = %parsed.period, revision_no = parsed.revision_no)
    )]
    pub async fn evaluate(
        &self,
        parsed: &ParsedDocumentVersion,
        doc: &RawDocument,
    ) -> Result<GateDecision, Box<dyn Error>> {
        let current = match self.store.get_current(&parsed.period).await? {
            Some(record) => record,
            None => return Ok(GateDecision::AcceptNew),
        };

        if current.superseded_by(parsed.revision_no, doc.retrieved_at, doc.content_size()) {
            let stale_artifacts = self.store.artifacts_for(&parsed.period).await?;
            debug!(
                prior_revision = current.revision_no,
                stale_count = stale_artifacts.len(),
                "在位版本将被顶替"
            );
            Ok(GateDecision::AcceptSupersede {
                prior_revision: current.revision_no,
                stale_artifacts,
            })
        } else {
            Ok(GateDecision::RejectStale {
                current_revision: current.revision_no,
            })
        }
    }

    /// 接受后落版本记录,周期转入 Current 态
    pub async fn record_acceptance(
        &self,
        parsed: &ParsedDocumentVersion,
        doc: &RawDocument,
    ) -> Result<(), Box<dyn Error>> {
        let record = VersionRecord {
            period: parsed.period.clone(),
            revision_no: parsed.revision_no,
            accepted_at: doc.retrieved_at,
            source_file: doc.doc_ref.file_name.clone(),
            content_size: doc.content_size(),
        };
        self.store.upsert_record(&record).await
    }
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month.parse().ok()?,
        day.parse().ok()?,
    )
}

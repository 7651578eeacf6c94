// ==========================================
// 电力结算报表归一化系统 - 文档解码器
// ==========================================
// 支持: CSV (.csv) / Excel (.xlsx/.xls) / 压缩包 (.zip)
// 说明: 一个文档可解出多张 RawTable (多 sheet / 多压缩成员),
//       此阶段不识别表头,所有单元格按字符串保留
// ==========================================

use crate::decoder::error::{DecodeError, DecodeResult};
use crate::domain::document::{DocumentRef, RawDocument, RawTable};
use calamine::{open_workbook_auto_from_rs, Reader};
use csv::ReaderBuilder;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;

/// 候选过滤: 文件名含此类标记的多为空表或临时产物,解码前跳过
const JUNK_NAME_TOKENS: &[&str] = &[
    "empty", "null", "blank", "test", "sample", "temp", "backup", "old", "archive", "copy",
];

/// 文件名是否为垃圾候选
pub fn is_junk_name(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    JUNK_NAME_TOKENS.iter().any(|t| lower.contains(t))
}

/// 扩展名是否受支持
pub fn supported_extension(file_name: &str) -> bool {
    matches!(
        extension_of(file_name).as_str(),
        "csv" | "xlsx" | "xls" | "zip"
    )
}

fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn stem_of(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
        .to_string()
}

// ==========================================
// DocumentDecoder - 文档解码器
// ==========================================
pub struct DocumentDecoder;

impl DocumentDecoder {
    /// 解码整个文档为 RawTable 列表
    ///
    /// # 返回
    /// - Ok(tables): 至少一张非空表
    /// - Err(EmptyDocument): 文档存在但解不出任何表格
    pub fn decode(&self, doc: &RawDocument) -> DecodeResult<Vec<RawTable>> {
        let file_name = doc.doc_ref.file_name.clone();
        let tables = self.decode_member(&doc.doc_ref, &file_name, &doc.bytes, true)?;

        if tables.is_empty() {
            return Err(DecodeError::EmptyDocument(file_name));
        }
        Ok(tables)
    }

    /// 解码一个成员 (顶层文件或压缩包内成员)
    fn decode_member(
        &self,
        doc_ref: &DocumentRef,
        member_name: &str,
        bytes: &[u8],
        allow_zip: bool,
    ) -> DecodeResult<Vec<RawTable>> {
        match extension_of(member_name).as_str() {
            "csv" => {
                let table = self.decode_csv(doc_ref, member_name, bytes)?;
                Ok(table.into_iter().collect())
            }
            "xlsx" | "xls" => self.decode_excel(doc_ref, bytes),
            "zip" if allow_zip => self.decode_zip(doc_ref, bytes),
            "zip" => {
                // 不递归进入嵌套压缩包
                warn!(member = member_name, "跳过嵌套压缩包");
                Ok(Vec::new())
            }
            other => Err(DecodeError::UnsupportedFormat(other.to_string())),
        }
    }

    /// CSV 解码: 不解释表头,整文件为一张表
    fn decode_csv(
        &self,
        doc_ref: &DocumentRef,
        member_name: &str,
        bytes: &[u8],
    ) -> DecodeResult<Option<RawTable>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes);

        let mut rows: Vec<Vec<String>> = Vec::new();
        for result in reader.byte_records() {
            let record = result?;
            let cells: Vec<String> = record
                .iter()
                .map(|b| String::from_utf8_lossy(b).trim().to_string())
                .collect();

            // 跳过完全空白的行
            if cells.iter().all(|c| c.is_empty()) {
                continue;
            }
            rows.push(cells);
        }

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(RawTable {
            doc_ref: doc_ref.clone(),
            declared_name: stem_of(member_name),
            rows,
        }))
    }

    /// Excel 解码: 每个非空 sheet 为一张表
    fn decode_excel(&self, doc_ref: &DocumentRef, bytes: &[u8]) -> DecodeResult<Vec<RawTable>> {
        let cursor = Cursor::new(bytes);
        let mut workbook = open_workbook_auto_from_rs(cursor)
            .map_err(|e| DecodeError::ExcelParseError(e.to_string()))?;

        let sheet_names = workbook.sheet_names();
        let mut tables = Vec::new();

        for sheet_name in sheet_names {
            let range = match workbook.worksheet_range(&sheet_name) {
                Ok(range) => range,
                Err(e) => {
                    warn!(sheet = %sheet_name, error = %e, "sheet 读取失败,跳过");
                    continue;
                }
            };

            let mut rows: Vec<Vec<String>> = Vec::new();
            for row in range.rows() {
                let cells: Vec<String> = row
                    .iter()
                    .map(|cell| cell.to_string().trim().to_string())
                    .collect();
                if cells.iter().all(|c| c.is_empty()) {
                    continue;
                }
                rows.push(cells);
            }

            if rows.is_empty() {
                debug!(sheet = %sheet_name, "空 sheet,跳过");
                continue;
            }
            tables.push(RawTable {
                doc_ref: doc_ref.clone(),
                declared_name: sheet_name,
                rows,
            });
        }

        Ok(tables)
    }

    /// ZIP 解码: 按成员扩展名逐个解码,不支持的成员跳过
    fn decode_zip(&self, doc_ref: &DocumentRef, bytes: &[u8]) -> DecodeResult<Vec<RawTable>> {
        let cursor = Cursor::new(bytes);
        let mut archive = ZipArchive::new(cursor)?;

        let mut tables = Vec::new();
        for i in 0..archive.len() {
            let mut member = archive.by_index(i)?;
            if member.is_dir() {
                continue;
            }
            let member_name = member.name().to_string();
            if !supported_extension(&member_name) {
                debug!(member = %member_name, "压缩包成员格式不支持,跳过");
                continue;
            }

            let mut member_bytes = Vec::new();
            member.read_to_end(&mut member_bytes)?;

            match self.decode_member(doc_ref, &member_name, &member_bytes, false) {
                Ok(member_tables) => tables.extend(member_tables),
                Err(e) => {
                    // 单个成员失败不影响其余成员
                    warn!(member = %member_name, error = %e, "压缩包成员解码失败,跳过");
                }
            }
        }

        Ok(tables)
    }
}

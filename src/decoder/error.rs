// ==========================================
// 电力结算报表归一化系统 - 解码模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 解码模块错误类型
#[derive(Error, Debug)]
pub enum DecodeError {
    // ===== 文件相关错误 =====
    #[error("文件格式不支持: {0}（仅支持 .csv/.xlsx/.xls/.zip）")]
    UnsupportedFormat(String),

    #[error("文档无可用表格: {0}")]
    EmptyDocument(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    // ===== 格式解析错误 =====
    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("压缩包解析失败: {0}")]
    ZipParseError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for DecodeError {
    fn from(err: csv::Error) -> Self {
        DecodeError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for DecodeError {
    fn from(err: calamine::Error) -> Self {
        DecodeError::ExcelParseError(err.to_string())
    }
}

// 实现 From<zip::result::ZipError>
impl From<zip::result::ZipError> for DecodeError {
    fn from(err: zip::result::ZipError) -> Self {
        DecodeError::ZipParseError(err.to_string())
    }
}

/// Result 类型别名
pub type DecodeResult<T> = Result<T, DecodeError>;

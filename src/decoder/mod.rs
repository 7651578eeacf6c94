// ==========================================
// 电力结算报表归一化系统 - 解码层
// ==========================================
// 职责: 原始文档字节 → RawTable 列表
// 红线: 不识别表头,不做归一化,单成员失败不拖垮整包
// ==========================================

pub mod error;
pub mod file_parser;

// 重导出核心类型
pub use error::{DecodeError, DecodeResult};
pub use file_parser::{is_junk_name, supported_extension, DocumentDecoder};

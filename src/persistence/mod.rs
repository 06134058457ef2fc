//! Save export/import with versioned envelopes
//!
//! Features:
//! - Versioned JSON envelope (`formatVersion` 3)
//! - Version detection and migration from every older layout
//! - Validation and state repair (smart completion + boundary checks)
//! - Import flow with confirmation/welcome text and rollback on failure

pub mod envelope;
pub mod import;
pub mod migration;
pub mod validation;

pub use envelope::{SaveEnvelope, export_file_name};
pub use import::{ImportPlan, new_attribute_labels, welcome_message};
pub use migration::{SaveFormat, SaveVersion, detect_version, migrate};
pub use validation::{repair_state, validate};

use thiserror::Error;

/// Everything that can go wrong while importing a save
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Not JSON at all
    #[error("save file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// JSON, but no layout we can migrate from
    #[error("unsupported or corrupted save format")]
    Unsupported,

    /// Migrated data failed validation
    #[error("save validation failed: {0}")]
    Invalid(String),

    /// Repaired state still did not fit the state record
    #[error("failed to load save data: {0}")]
    Load(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl PersistenceError {
    /// Text shown to the player in an alert
    pub fn user_message(&self) -> String {
        match self {
            PersistenceError::Parse(e) => {
                let detail = match e.classify() {
                    serde_json::error::Category::Eof => "文件内容不完整，可能在传输过程中被截断。",
                    serde_json::error::Category::Syntax => "文件内容不是有效的JSON格式。",
                    _ => "文件内容损坏或格式不正确。",
                };
                format!(
                    "❗ 存档文件格式错误，无法解析！\n\n{detail}\n\n请确保：\n1. 文件是通过修仙系统导出的\n2. 文件未被修改或损坏\n3. 文件扩展名为.json"
                )
            }
            PersistenceError::Unsupported => {
                "❗ 存档文件格式不支持或已损坏！\n\n支持的格式：修仙系统 v1.0+ 导出的JSON文件"
                    .to_string()
            }
            PersistenceError::Invalid(_) => {
                "❗ 存档数据验证失败，可能存在兼容性问题！\n\n请确保文件是完整的修仙系统存档。"
                    .to_string()
            }
            PersistenceError::Load(_) => {
                "❗ 存档导入失败！数据可能已损坏，已还原原有进度。".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_messages_distinguish_truncation() {
        let eof = serde_json::from_str::<serde_json::Value>("{\"a\":").unwrap_err();
        let msg = PersistenceError::from(eof).user_message();
        assert!(msg.contains("截断"));

        let syntax = serde_json::from_str::<serde_json::Value>("{oops}").unwrap_err();
        let msg = PersistenceError::from(syntax).user_message();
        assert!(msg.contains("不是有效的JSON"));
    }
}

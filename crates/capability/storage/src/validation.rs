//! 验证辅助函数
//!
//! 表名与列名来自配置，会拼进 SQL 与 PostgREST 路径，使用前必须校验。

use crate::error::StorageError;

/// 校验标识符：`[A-Za-z_][A-Za-z0-9_]*`。
pub fn ensure_identifier(name: &str) -> Result<(), StorageError> {
    let mut chars = name.chars();
    let valid_head = chars
        .next()
        .map(|ch| ch.is_ascii_alphabetic() || ch == '_')
        .unwrap_or(false);
    if !valid_head || !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Err(StorageError::new(format!("invalid identifier: {:?}", name)));
    }
    Ok(())
}

/// 生成带双引号的 SQL 标识符（已校验过，无需转义）。
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name)
}

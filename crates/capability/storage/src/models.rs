//! 存储数据模型

use crate::error::StorageError;
use crate::validation::ensure_identifier;

/// 读数表结构。
///
/// 每个测量字段对应同名的数值列（可为 NULL）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub topic_column: String,
    pub timestamp_column: String,
    pub fields: Vec<String>,
}

impl TableSchema {
    /// 构造并校验所有标识符。
    pub fn new(
        table: impl Into<String>,
        topic_column: impl Into<String>,
        timestamp_column: impl Into<String>,
        fields: Vec<String>,
    ) -> Result<Self, StorageError> {
        let schema = Self {
            table: table.into(),
            topic_column: topic_column.into(),
            timestamp_column: timestamp_column.into(),
            fields,
        };
        ensure_identifier(&schema.table)?;
        ensure_identifier(&schema.topic_column)?;
        ensure_identifier(&schema.timestamp_column)?;
        for field in &schema.fields {
            ensure_identifier(field)?;
            if *field == schema.topic_column || *field == schema.timestamp_column {
                return Err(StorageError::new(format!(
                    "field {} collides with a reserved column",
                    field
                )));
            }
        }
        Ok(schema)
    }
}

//! 存储接口 Trait 定义

use crate::error::StorageError;
use async_trait::async_trait;
use domain::Reading;

/// 读数存储接口
///
/// 只有追加写入与读取最新一行两种操作。
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// 写入一行读数
    async fn insert_reading(&self, reading: &Reading) -> Result<(), StorageError>;

    /// 按时间戳倒序读取最新一行；表为空时返回 `None`
    async fn latest_reading(&self) -> Result<Option<Reading>, StorageError>;
}

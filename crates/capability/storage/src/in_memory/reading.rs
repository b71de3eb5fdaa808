//! 读数内存实现

use crate::error::StorageError;
use crate::traits::ReadingStore;
use domain::Reading;
use std::sync::RwLock;

/// 读数内存存储
#[derive(Default)]
pub struct InMemoryReadingStore {
    readings: RwLock<Vec<Reading>>,
}

impl InMemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以已有数据初始化（用于测试）
    pub fn with_readings(readings: Vec<Reading>) -> Self {
        Self {
            readings: RwLock::new(readings),
        }
    }

    /// 当前行数（用于测试）
    pub fn len(&self) -> usize {
        self.readings.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 全部读数的副本，按写入顺序
    pub fn readings(&self) -> Vec<Reading> {
        self.readings.read().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ReadingStore for InMemoryReadingStore {
    async fn insert_reading(&self, reading: &Reading) -> Result<(), StorageError> {
        let mut readings = self
            .readings
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        readings.push(reading.clone());
        Ok(())
    }

    async fn latest_reading(&self) -> Result<Option<Reading>, StorageError> {
        let readings = self
            .readings
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        // 时间戳相同时取后写入的一行
        Ok(readings.iter().max_by_key(|item| item.ts_ms).cloned())
    }
}

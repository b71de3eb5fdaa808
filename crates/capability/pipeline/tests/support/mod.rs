#![allow(dead_code)]

use async_trait::async_trait;
use domain::Reading;
use relay_dashboard::{Dashboard, DashboardError};
use relay_storage::{ReadingStore, StorageError};
use tokio::sync::{Mutex, Semaphore, mpsc};

/// 记录所有调用的仪表盘；`fail` 为 true 时每次返回 503。
#[derive(Default)]
pub struct RecordingDashboard {
    pub calls: Mutex<Vec<(String, f64)>>,
    pub fail: bool,
}

impl RecordingDashboard {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn calls(&self) -> Vec<(String, f64)> {
        let mut calls = self.calls.lock().await.clone();
        calls.sort_by(|a, b| a.0.cmp(&b.0));
        calls
    }
}

#[async_trait]
impl Dashboard for RecordingDashboard {
    async fn update(&self, pin: &str, value: f64) -> Result<(), DashboardError> {
        self.calls.lock().await.push((pin.to_string(), value));
        if self.fail {
            return Err(DashboardError::Status(503));
        }
        Ok(())
    }
}

/// 所有操作都失败的存储。
pub struct FailingStore;

#[async_trait]
impl ReadingStore for FailingStore {
    async fn insert_reading(&self, _reading: &Reading) -> Result<(), StorageError> {
        Err(StorageError::new("forced failure"))
    }

    async fn latest_reading(&self) -> Result<Option<Reading>, StorageError> {
        Err(StorageError::new("forced failure"))
    }
}

/// 读取时先发出 entered 信号，再等待测试放行。
pub struct GatedStore {
    pub reading: Reading,
    pub entered: mpsc::UnboundedSender<()>,
    pub release: Semaphore,
}

impl GatedStore {
    pub fn new(reading: Reading) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (entered, receiver) = mpsc::unbounded_channel();
        (
            Self {
                reading,
                entered,
                release: Semaphore::new(0),
            },
            receiver,
        )
    }
}

#[async_trait]
impl ReadingStore for GatedStore {
    async fn insert_reading(&self, _reading: &Reading) -> Result<(), StorageError> {
        Ok(())
    }

    async fn latest_reading(&self) -> Result<Option<Reading>, StorageError> {
        let _ = self.entered.send(());
        self.release
            .acquire()
            .await
            .map_err(|_| StorageError::new("gate closed"))?
            .forget();
        Ok(Some(self.reading.clone()))
    }
}

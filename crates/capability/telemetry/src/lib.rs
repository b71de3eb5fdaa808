//! 日志初始化、事件 ID 与中继计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub messages_discarded: u64,
    pub write_success: u64,
    pub write_failure: u64,
    pub notify_success: u64,
    pub notify_failure: u64,
    pub ticks: u64,
    pub ticks_skipped: u64,
    pub ticks_empty: u64,
    pub ticks_field_missing: u64,
    pub read_failure: u64,
}

/// 进程级计数器（只增不减）。
pub struct RelayMetrics {
    messages_received: AtomicU64,
    messages_discarded: AtomicU64,
    write_success: AtomicU64,
    write_failure: AtomicU64,
    notify_success: AtomicU64,
    notify_failure: AtomicU64,
    ticks: AtomicU64,
    ticks_skipped: AtomicU64,
    ticks_empty: AtomicU64,
    ticks_field_missing: AtomicU64,
    read_failure: AtomicU64,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            messages_discarded: AtomicU64::new(0),
            write_success: AtomicU64::new(0),
            write_failure: AtomicU64::new(0),
            notify_success: AtomicU64::new(0),
            notify_failure: AtomicU64::new(0),
            ticks: AtomicU64::new(0),
            ticks_skipped: AtomicU64::new(0),
            ticks_empty: AtomicU64::new(0),
            ticks_field_missing: AtomicU64::new(0),
            read_failure: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_discarded: self.messages_discarded.load(Ordering::Relaxed),
            write_success: self.write_success.load(Ordering::Relaxed),
            write_failure: self.write_failure.load(Ordering::Relaxed),
            notify_success: self.notify_success.load(Ordering::Relaxed),
            notify_failure: self.notify_failure.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            ticks_empty: self.ticks_empty.load(Ordering::Relaxed),
            ticks_field_missing: self.ticks_field_missing.load(Ordering::Relaxed),
            read_failure: self.read_failure.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<RelayMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static RelayMetrics {
    METRICS.get_or_init(RelayMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 为一次推送事件或一次轮询 tick 生成事件 ID。
pub fn new_event_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn record_message_received() {
    metrics().messages_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录解码失败被丢弃的消息。
pub fn record_message_discarded() {
    metrics().messages_discarded.fetch_add(1, Ordering::Relaxed);
}

pub fn record_write_success() {
    metrics().write_success.fetch_add(1, Ordering::Relaxed);
}

pub fn record_write_failure() {
    metrics().write_failure.fetch_add(1, Ordering::Relaxed);
}

/// 记录仪表盘更新成功次数。
pub fn record_notify_success() {
    metrics().notify_success.fetch_add(1, Ordering::Relaxed);
}

/// 记录仪表盘更新失败次数。
pub fn record_notify_failure() {
    metrics().notify_failure.fetch_add(1, Ordering::Relaxed);
}

pub fn record_tick() {
    metrics().ticks.fetch_add(1, Ordering::Relaxed);
}

/// 记录因上一次 tick 尚未结束而跳过的次数。
pub fn record_tick_skipped() {
    metrics().ticks_skipped.fetch_add(1, Ordering::Relaxed);
}

pub fn record_tick_empty() {
    metrics().ticks_empty.fetch_add(1, Ordering::Relaxed);
}

/// 记录最新一行中缺少转发字段的 tick。
pub fn record_tick_field_missing() {
    metrics().ticks_field_missing.fetch_add(1, Ordering::Relaxed);
}

pub fn record_read_failure() {
    metrics().read_failure.fetch_add(1, Ordering::Relaxed);
}

use relay_config::PollConfig;
use relay_dashboard::Dashboard;
use relay_storage::ReadingStore;
use relay_telemetry::{
    new_event_id, record_notify_failure, record_notify_success, record_read_failure, record_tick,
    record_tick_empty, record_tick_field_missing, record_tick_skipped,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, info, warn};

// Skip：上一次 tick 尚未结束时跳过新 tick；Allow：并发执行，不做保护
pub use relay_config::OverlapPolicy;

/// 轮询链路参数。
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// 从最新一行中转发的字段。
    pub field: String,
    pub pin: String,
    pub interval: Duration,
    pub overlap: OverlapPolicy,
}

impl From<&PollConfig> for PollSettings {
    fn from(config: &PollConfig) -> Self {
        Self {
            field: config.field.clone(),
            pin: config.pin.clone(),
            interval: Duration::from_millis(config.interval_ms),
            overlap: config.overlap,
        }
    }
}

/// 单次 tick 的结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Forwarded { value: f64 },
    /// 表为空。
    Empty,
    /// 最新一行中该字段为空。
    FieldMissing,
    ReadFailed,
    NotifyFailed,
    /// 上一次 tick 仍在执行。
    Skipped,
}

struct PollInner {
    store: Arc<dyn ReadingStore>,
    dashboard: Arc<dyn Dashboard>,
    settings: PollSettings,
    in_flight: AtomicBool,
}

/// 轮询中继。
#[derive(Clone)]
pub struct PollRelay {
    inner: Arc<PollInner>,
}

/// tick 执行期间持有；释放时清除 in-flight 标记。
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl PollRelay {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        dashboard: Arc<dyn Dashboard>,
        settings: PollSettings,
    ) -> Self {
        Self {
            inner: Arc::new(PollInner {
                store,
                dashboard,
                settings,
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    /// 执行一次 tick：读取最新一行并转发选定字段。
    pub async fn tick(&self) -> TickOutcome {
        record_tick();
        let _guard = match self.inner.settings.overlap {
            OverlapPolicy::Skip => match InFlightGuard::acquire(&self.inner.in_flight) {
                Some(guard) => Some(guard),
                None => {
                    record_tick_skipped();
                    info!(target: "relay.poll", "tick_skipped_in_flight");
                    return TickOutcome::Skipped;
                }
            },
            OverlapPolicy::Allow => None,
        };
        let span = tracing::info_span!("poll_tick", event_id = %new_event_id());
        self.forward_latest().instrument(span).await
    }

    async fn forward_latest(&self) -> TickOutcome {
        let settings = &self.inner.settings;
        let reading = match self.inner.store.latest_reading().await {
            Ok(Some(reading)) => reading,
            Ok(None) => {
                record_tick_empty();
                info!(target: "relay.poll", "no_reading_yet");
                return TickOutcome::Empty;
            }
            Err(err) => {
                record_read_failure();
                warn!(target: "relay.poll", error = %err, "latest_reading_failed");
                return TickOutcome::ReadFailed;
            }
        };

        let Some(value) = reading.field(&settings.field) else {
            record_tick_field_missing();
            warn!(
                target: "relay.poll",
                field = %settings.field,
                topic = %reading.topic,
                ts_ms = reading.ts_ms,
                "latest_reading_field_missing"
            );
            return TickOutcome::FieldMissing;
        };

        match self.inner.dashboard.update(&settings.pin, value).await {
            Ok(()) => {
                record_notify_success();
                info!(
                    target: "relay.poll",
                    pin = %settings.pin,
                    value = value,
                    ts_ms = reading.ts_ms,
                    "dashboard_updated"
                );
                TickOutcome::Forwarded { value }
            }
            Err(err) => {
                record_notify_failure();
                warn!(target: "relay.poll", pin = %settings.pin, error = %err, "dashboard_update_failed");
                TickOutcome::NotifyFailed
            }
        }
    }

    /// 按固定间隔执行 tick，永不返回。
    ///
    /// 第一次 tick 立即触发；每次 tick 在独立任务中运行，定时器不等待其结束。
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.inner.settings.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            target: "relay.poll",
            interval_ms = self.inner.settings.interval.as_millis() as u64,
            field = %self.inner.settings.field,
            pin = %self.inner.settings.pin,
            overlap = ?self.inner.settings.overlap,
            "poll_started"
        );
        loop {
            interval.tick().await;
            let relay = self.clone();
            tokio::spawn(async move {
                relay.tick().await;
            });
        }
    }
}

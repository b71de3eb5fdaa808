use async_trait::async_trait;
use domain::InboundMessage;
use relay_config::PushConfig;
use relay_dashboard::Dashboard;
use relay_ingest::{IngestError, MessageHandler};
use relay_normalize::{DecodeError, decode_reading};
use relay_storage::ReadingStore;
use relay_telemetry::{
    new_event_id, record_message_discarded, record_message_received, record_notify_failure,
    record_notify_success, record_write_failure, record_write_success,
};
use std::sync::Arc;
use tracing::{Instrument, info, warn};

/// 测量字段到仪表盘虚拟引脚的绑定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinBinding {
    pub field: String,
    pub pin: String,
}

/// 推送链路参数。
#[derive(Debug, Clone)]
pub struct PushSettings {
    /// 从报文中解码并落库的测量字段。
    pub fields: Vec<String>,
    /// 需要转发到仪表盘的字段。
    pub pins: Vec<PinBinding>,
}

impl From<&PushConfig> for PushSettings {
    fn from(config: &PushConfig) -> Self {
        Self {
            fields: config.fields.clone(),
            pins: config
                .pins
                .iter()
                .map(|mapping| PinBinding {
                    field: mapping.field.clone(),
                    pin: mapping.pin.clone(),
                })
                .collect(),
        }
    }
}

/// 单条消息的处理结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub persisted: bool,
    pub notified: usize,
    pub notify_failed: usize,
    /// 报文中缺少对应字段而未转发的引脚数。
    pub skipped_pins: usize,
}

struct PushInner {
    store: Arc<dyn ReadingStore>,
    dashboard: Arc<dyn Dashboard>,
    settings: PushSettings,
}

/// 推送中继。
#[derive(Clone)]
pub struct PushRelay {
    inner: Arc<PushInner>,
}

impl PushRelay {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        dashboard: Arc<dyn Dashboard>,
        settings: PushSettings,
    ) -> Self {
        Self {
            inner: Arc::new(PushInner {
                store,
                dashboard,
                settings,
            }),
        }
    }

    /// 处理一条消息并等待所有外部调用结束。
    ///
    /// 解码失败时返回错误且不写库；写库与每次仪表盘调用在各自的任务中并发执行，
    /// 任何一个失败都不影响其他调用。
    pub async fn process(&self, message: InboundMessage) -> Result<PushReport, DecodeError> {
        let span = tracing::info_span!(
            "push_event",
            event_id = %new_event_id(),
            topic = %message.topic
        );
        self.process_message(message).instrument(span).await
    }

    async fn process_message(&self, message: InboundMessage) -> Result<PushReport, DecodeError> {
        record_message_received();
        info!(
            target: "relay.push",
            payload_size = message.payload.len(),
            received_at_ms = message.received_at_ms,
            "message_received"
        );

        let reading = match decode_reading(&message, &self.inner.settings.fields) {
            Ok(reading) => Arc::new(reading),
            Err(err) => {
                record_message_discarded();
                warn!(target: "relay.push", error = %err, "message_discarded");
                return Err(err);
            }
        };

        let write = {
            let store = self.inner.store.clone();
            let reading = reading.clone();
            tokio::spawn(async move { store.insert_reading(&reading).await }.in_current_span())
        };

        let mut report = PushReport::default();
        let mut notifications = Vec::with_capacity(self.inner.settings.pins.len());
        for binding in &self.inner.settings.pins {
            let Some(value) = reading.field(&binding.field) else {
                report.skipped_pins += 1;
                continue;
            };
            let dashboard = self.inner.dashboard.clone();
            let pin = binding.pin.clone();
            let handle =
                tokio::spawn(async move { dashboard.update(&pin, value).await }.in_current_span());
            notifications.push((binding.pin.clone(), value, handle));
        }

        match write.await {
            Ok(Ok(())) => {
                record_write_success();
                report.persisted = true;
                info!(target: "relay.push", fields = ?reading.fields, "reading_persisted");
            }
            Ok(Err(err)) => {
                record_write_failure();
                warn!(target: "relay.push", error = %err, "reading_persist_failed");
            }
            Err(err) => {
                record_write_failure();
                warn!(target: "relay.push", error = %err, "reading_persist_task_failed");
            }
        }

        for (pin, value, handle) in notifications {
            match handle.await {
                Ok(Ok(())) => {
                    record_notify_success();
                    report.notified += 1;
                    info!(target: "relay.push", pin = %pin, value = value, "dashboard_updated");
                }
                Ok(Err(err)) => {
                    record_notify_failure();
                    report.notify_failed += 1;
                    warn!(target: "relay.push", pin = %pin, value = value, error = %err, "dashboard_update_failed");
                }
                Err(err) => {
                    record_notify_failure();
                    report.notify_failed += 1;
                    warn!(target: "relay.push", pin = %pin, error = %err, "dashboard_update_task_failed");
                }
            }
        }

        Ok(report)
    }
}

#[async_trait]
impl MessageHandler for PushRelay {
    /// 在独立任务中处理消息后立即返回，不阻塞 broker 事件循环。
    async fn handle(&self, message: InboundMessage) -> Result<(), IngestError> {
        let relay = self.clone();
        tokio::spawn(async move {
            // 结果已在 process 内记录
            let _ = relay.process(message).await;
        });
        Ok(())
    }
}


use async_trait::async_trait;
use domain::{InboundMessage, now_epoch_ms};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};

/// 接入错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("handler error: {0}")]
    Handler(String),
    #[error("source error: {0}")]
    Source(String),
}

/// 消息处理器。
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: InboundMessage) -> Result<(), IngestError>;
}

/// 消息源抽象。
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn run(&self, handler: Arc<dyn MessageHandler>) -> Result<(), IngestError>;
}

/// 进程内消息源（测试与无 broker 场景）。
///
/// 发送端全部关闭后 `run` 返回。
pub struct ChannelSource {
    receiver: Mutex<Option<mpsc::Receiver<InboundMessage>>>,
}

impl ChannelSource {
    pub fn new(capacity: usize) -> (mpsc::Sender<InboundMessage>, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            sender,
            Self {
                receiver: Mutex::new(Some(receiver)),
            },
        )
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn run(&self, handler: Arc<dyn MessageHandler>) -> Result<(), IngestError> {
        let mut receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| IngestError::Source("channel source already running".to_string()))?;
        while let Some(message) = receiver.recv().await {
            if let Err(err) = handler.handle(message).await {
                warn!(target: "relay.ingest", error = %err, "message_handler_failed");
            }
        }
        Ok(())
    }
}

/// MQTT 消息源配置。
#[derive(Debug, Clone)]
pub struct MqttSourceConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// 订阅的通配符 topic，例如 `sensor/#`。
    pub topic_filter: String,
    pub qos: u8,
    /// 是否使用 TLS（mqtts）。
    pub tls: bool,
    pub client_id_prefix: String,
    pub keep_alive_secs: u64,
}

/// MQTT 消息源。
#[derive(Debug, Clone)]
pub struct MqttSource {
    config: MqttSourceConfig,
}

impl MqttSource {
    pub fn new(config: MqttSourceConfig) -> Self {
        Self { config }
    }

    fn options(&self) -> rumqttc::MqttOptions {
        let client_id = format!("{}-{}", self.config.client_id_prefix, uuid::Uuid::new_v4());
        let mut options =
            rumqttc::MqttOptions::new(client_id, self.config.host.clone(), self.config.port);
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs.max(5)));
        if let (Some(username), Some(password)) =
            (self.config.username.as_ref(), self.config.password.as_ref())
        {
            options.set_credentials(username, password);
        }
        if self.config.tls {
            options.set_transport(rumqttc::Transport::tls_with_default_config());
        }
        options
    }
}

#[async_trait]
impl MessageSource for MqttSource {
    async fn run(&self, handler: Arc<dyn MessageHandler>) -> Result<(), IngestError> {
        let (client, mut eventloop) = rumqttc::AsyncClient::new(self.options(), 10);
        let qos = qos_from_u8(self.config.qos);

        loop {
            match eventloop.poll().await {
                Ok(rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(_))) => {
                    // 每次（重新）连接后订阅；clean session 下 broker 不保留订阅。
                    info!(
                        target: "relay.ingest",
                        host = %self.config.host,
                        port = self.config.port,
                        topic = %self.config.topic_filter,
                        "mqtt_connected"
                    );
                    if let Err(err) = client.try_subscribe(self.config.topic_filter.clone(), qos) {
                        warn!(target: "relay.ingest", error = %err, "mqtt_subscribe_failed");
                    }
                }
                Ok(rumqttc::Event::Incoming(rumqttc::Packet::Publish(publish))) => {
                    if !topic_matches(&self.config.topic_filter, &publish.topic) {
                        warn!(target: "relay.ingest", topic = %publish.topic, "mqtt_topic_skipped");
                        continue;
                    }
                    let message = InboundMessage {
                        topic: publish.topic.clone(),
                        payload: publish.payload.to_vec(),
                        received_at_ms: now_epoch_ms(),
                    };
                    if let Err(err) = handler.handle(message).await {
                        warn!(target: "relay.ingest", error = %err, "message_handler_failed");
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(target: "relay.ingest", error = %err, "mqtt_eventloop_error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}

/// MQTT topic 过滤匹配（支持 `+` 单层与 `#` 多层通配）。
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    // 以 `$` 开头的系统 topic 不匹配首层通配符。
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => {}
            (Some(expected), Some(actual)) if expected == actual => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

fn qos_from_u8(value: u8) -> rumqttc::QoS {
    match value {
        0 => rumqttc::QoS::AtMostOnce,
        1 => rumqttc::QoS::AtLeastOnce,
        2 => rumqttc::QoS::ExactlyOnce,
        _ => rumqttc::QoS::AtLeastOnce,
    }
}

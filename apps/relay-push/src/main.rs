//! 推送链路：订阅 MQTT → 解码 → 写库 + 仪表盘更新。

use relay_config::PushConfig;
use relay_dashboard::{BlynkClient, DashboardConfig};
use relay_ingest::{MessageSource, MqttSource, MqttSourceConfig};
use relay_pipeline::{PushRelay, PushSettings};
use relay_storage::{TableSchema, open_reading_store};
use relay_telemetry::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在）
    dotenvy::dotenv().ok();
    init_tracing();

    // 配置缺失时在任何网络连接之前退出
    let config = PushConfig::from_env().inspect_err(|err| {
        error!(error = %err, "config_invalid");
    })?;

    let schema = TableSchema::new(
        config.database.table.as_str(),
        config.database.topic_column.as_str(),
        config.database.timestamp_column.as_str(),
        config.fields.clone(),
    )?;
    // 不在启动时连接数据库；连接错误在每次写入时记录
    let store = open_reading_store(
        &config.database.url,
        config.database.key.as_deref(),
        schema,
        Duration::from_millis(config.database.timeout_ms),
    )?;
    let dashboard = Arc::new(BlynkClient::new(DashboardConfig::from(&config.dashboard))?);
    let relay = PushRelay::new(store, dashboard, PushSettings::from(&config));

    let http_addr = config.http_addr.clone();
    tokio::spawn(async move {
        if let Err(err) = relay_liveness::serve(&http_addr).await {
            error!(addr = %http_addr, error = %err, "liveness_stopped");
        }
    });

    let source = MqttSource::new(mqtt_source_config(&config));
    info!(
        host = %config.mqtt_host,
        port = config.mqtt_port,
        topic = %config.mqtt_topic,
        tls = config.mqtt_tls,
        "push_relay_starting"
    );
    source.run(Arc::new(relay)).await?;
    Ok(())
}

fn mqtt_source_config(config: &PushConfig) -> MqttSourceConfig {
    MqttSourceConfig {
        host: config.mqtt_host.clone(),
        port: config.mqtt_port,
        username: config.mqtt_username.clone(),
        password: config.mqtt_password.clone(),
        topic_filter: config.mqtt_topic.clone(),
        qos: config.mqtt_qos,
        tls: config.mqtt_tls,
        client_id_prefix: "relay-push".to_string(),
        keep_alive_secs: 30,
    }
}

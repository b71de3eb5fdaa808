//! 轮询链路：定时读取最新一行 → 仪表盘更新。

use relay_config::PollConfig;
use relay_dashboard::{BlynkClient, DashboardConfig};
use relay_pipeline::{PollRelay, PollSettings};
use relay_storage::{TableSchema, open_reading_store};
use relay_telemetry::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在）
    dotenvy::dotenv().ok();
    init_tracing();

    // 配置缺失时在任何网络连接之前退出
    let config = PollConfig::from_env().inspect_err(|err| {
        error!(error = %err, "config_invalid");
    })?;

    let schema = TableSchema::new(
        config.database.table.as_str(),
        config.database.topic_column.as_str(),
        config.database.timestamp_column.as_str(),
        vec![config.field.clone()],
    )?;
    // 不在启动时连接数据库；连接错误在每次 tick 时记录
    let store = open_reading_store(
        &config.database.url,
        config.database.key.as_deref(),
        schema,
        Duration::from_millis(config.database.timeout_ms),
    )?;
    let dashboard = Arc::new(BlynkClient::new(DashboardConfig::from(&config.dashboard))?);
    let relay = PollRelay::new(store, dashboard, PollSettings::from(&config));

    let http_addr = config.http_addr.clone();
    tokio::spawn(async move {
        if let Err(err) = relay_liveness::serve(&http_addr).await {
            error!(addr = %http_addr, error = %err, "liveness_stopped");
        }
    });

    relay.run().await;
    Ok(())
}

//! 仪表盘转发：把测量值写到 Blynk 风格 HTTP API 的虚拟引脚。

use async_trait::async_trait;
use domain::format_value;
use relay_config::DashboardSettings;
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

// Path：`{base}/{token}/update/{pin}?value={v}`
// Query：`{base}/external/api/update?token={token}&{pin}={v}`，引脚名小写
pub use relay_config::UrlStyle;

/// 仪表盘调用错误。
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("invalid url: {0}")]
    Url(String),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status: {0}")]
    Status(u16),
}

/// 仪表盘抽象。
#[async_trait]
pub trait Dashboard: Send + Sync {
    /// 将 `value` 写到虚拟引脚 `pin`（如 `V1`）。
    async fn update(&self, pin: &str, value: f64) -> Result<(), DashboardError>;
}

/// Blynk 客户端配置。
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub base_url: String,
    pub token: String,
    pub url_style: UrlStyle,
    pub timeout: Duration,
}

impl From<&DashboardSettings> for DashboardConfig {
    fn from(settings: &DashboardSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            token: settings.token.clone(),
            url_style: settings.url_style,
            timeout: Duration::from_millis(settings.timeout_ms),
        }
    }
}

/// Blynk HTTP 客户端。
#[derive(Debug, Clone)]
pub struct BlynkClient {
    client: reqwest::Client,
    base_url: Url,
    token: String,
    url_style: UrlStyle,
}

impl BlynkClient {
    pub fn new(config: DashboardConfig) -> Result<Self, DashboardError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|err| DashboardError::Url(format!("{}: {}", config.base_url, err)))?;
        if base_url.cannot_be_a_base() {
            return Err(DashboardError::Url(config.base_url));
        }
        Ok(Self {
            client,
            base_url,
            token: config.token,
            url_style: config.url_style,
        })
    }

    /// 构造一次更新请求的 URL。
    pub fn update_url(&self, pin: &str, value: f64) -> Result<Url, DashboardError> {
        let mut url = self.base_url.clone();
        let rendered = format_value(value);
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| DashboardError::Url(self.base_url.to_string()))?;
            segments.pop_if_empty();
            match self.url_style {
                UrlStyle::Path => {
                    segments.push(&self.token).push("update").push(pin);
                }
                UrlStyle::Query => {
                    segments.push("external").push("api").push("update");
                }
            }
        }
        match self.url_style {
            UrlStyle::Path => {
                url.query_pairs_mut().append_pair("value", &rendered);
            }
            UrlStyle::Query => {
                url.query_pairs_mut()
                    .append_pair("token", &self.token)
                    .append_pair(&pin.to_ascii_lowercase(), &rendered);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl Dashboard for BlynkClient {
    async fn update(&self, pin: &str, value: f64) -> Result<(), DashboardError> {
        let url = self.update_url(pin, value)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::Status(status.as_u16()));
        }
        debug!(target: "relay.dashboard", pin = %pin, value = value, "dashboard_updated");
        Ok(())
    }
}

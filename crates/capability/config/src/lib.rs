//! 中继运行配置加载。
//!
//! 推送与轮询是两个独立部署的进程，各自只读取自己需要的环境变量；
//! 缺少必填项时 `from_env` 直接返回错误，进程在建立任何网络连接前退出。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 仪表盘 URL 形式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlStyle {
    /// `{base}/{token}/update/{pin}?value={v}`
    Path,
    /// `{base}/external/api/update?token={token}&{pin}={v}`
    Query,
}

/// 轮询重叠策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// 上一次尚未结束时跳过本次 tick。
    Skip,
    /// 允许并发执行。
    Allow,
}

/// 数据库配置（两条链路共用）。
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub key: Option<String>,
    pub table: String,
    pub topic_column: String,
    pub timestamp_column: String,
    /// 单次数据库请求的超时（毫秒）。
    pub timeout_ms: u64,
}

impl DatabaseSettings {
    /// http(s) 地址走 PostgREST，其余按 Postgres 连接串处理。
    pub fn is_rest(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}

/// 仪表盘配置（两条链路共用）。
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub base_url: String,
    pub token: String,
    pub url_style: UrlStyle,
    pub timeout_ms: u64,
}

/// 字段到仪表盘虚拟引脚的映射。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinMapping {
    pub field: String,
    pub pin: String,
}

/// 推送链路配置。
#[derive(Debug, Clone)]
pub struct PushConfig {
    pub http_addr: String,
    pub database: DatabaseSettings,
    pub dashboard: DashboardSettings,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_topic: String,
    pub mqtt_qos: u8,
    pub mqtt_tls: bool,
    pub fields: Vec<String>,
    pub pins: Vec<PinMapping>,
}

/// 轮询链路配置。
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub http_addr: String,
    pub database: DatabaseSettings,
    pub dashboard: DashboardSettings,
    pub field: String,
    pub pin: String,
    pub interval_ms: u64,
    pub overlap: OverlapPolicy,
}

impl PushConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置（测试中使用 HashMap）。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars::new(&lookup);
        let mqtt_host = vars.required("RELAY_MQTT_HOST")?;
        let database = read_database(&vars)?;
        let dashboard = read_dashboard(&vars, UrlStyle::Query)?;
        let mqtt_port = vars.u16_with_default("RELAY_MQTT_PORT", 8883)?;
        let mqtt_username = vars.optional("RELAY_MQTT_USERNAME");
        let mqtt_password = vars.optional("RELAY_MQTT_PASSWORD");
        if mqtt_username.is_some() != mqtt_password.is_some() {
            return Err(ConfigError::Invalid(
                "RELAY_MQTT_USERNAME".to_string(),
                "username and password must be set together".to_string(),
            ));
        }
        let mqtt_topic = vars.with_default("RELAY_MQTT_TOPIC", "sensor/#");
        let mqtt_qos = vars.u8_with_default("RELAY_MQTT_QOS", 1)?;
        if mqtt_qos > 2 {
            return Err(ConfigError::Invalid(
                "RELAY_MQTT_QOS".to_string(),
                mqtt_qos.to_string(),
            ));
        }
        let mqtt_tls = vars.bool_with_default("RELAY_MQTT_TLS", true);
        let fields = parse_list(&vars.with_default("RELAY_FIELDS", "temperature,humidity"));
        if fields.is_empty() {
            return Err(ConfigError::Invalid(
                "RELAY_FIELDS".to_string(),
                "empty".to_string(),
            ));
        }
        let raw_pins = vars.with_default("RELAY_PUSH_PINS", "temperature:V1,humidity:V2");
        let pins = parse_pins(&raw_pins)
            .ok_or_else(|| ConfigError::Invalid("RELAY_PUSH_PINS".to_string(), raw_pins.clone()))?;
        if let Some(unknown) = pins.iter().find(|pin| !fields.contains(&pin.field)) {
            return Err(ConfigError::Invalid(
                "RELAY_PUSH_PINS".to_string(),
                format!("field {} not in RELAY_FIELDS", unknown.field),
            ));
        }

        Ok(Self {
            http_addr: read_http_addr(&vars),
            database,
            dashboard,
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_topic,
            mqtt_qos,
            mqtt_tls,
            fields,
            pins,
        })
    }
}

impl PollConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars::new(&lookup);
        let database = read_database(&vars)?;
        let dashboard = read_dashboard(&vars, UrlStyle::Path)?;
        let field = vars.with_default("RELAY_POLL_FIELD", "current");
        let pin = vars.with_default("RELAY_POLL_PIN", "V1");
        let interval_ms = vars.u64_with_default("RELAY_POLL_INTERVAL_MS", 10_000)?;
        if interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "RELAY_POLL_INTERVAL_MS".to_string(),
                "0".to_string(),
            ));
        }
        let overlap = match vars.optional("RELAY_POLL_OVERLAP") {
            None => OverlapPolicy::Skip,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "skip" => OverlapPolicy::Skip,
                "allow" => OverlapPolicy::Allow,
                _ => return Err(ConfigError::Invalid("RELAY_POLL_OVERLAP".to_string(), value)),
            },
        };

        Ok(Self {
            http_addr: read_http_addr(&vars),
            database,
            dashboard,
            field,
            pin,
            interval_ms,
            overlap,
        })
    }
}

fn read_database(vars: &Vars<'_>) -> Result<DatabaseSettings, ConfigError> {
    let settings = DatabaseSettings {
        url: vars.required("RELAY_DATABASE_URL")?,
        key: vars.optional("RELAY_DATABASE_KEY"),
        table: vars.with_default("RELAY_TABLE", "sensor_data"),
        topic_column: vars.with_default("RELAY_TOPIC_COLUMN", "topic"),
        timestamp_column: vars.with_default("RELAY_TIMESTAMP_COLUMN", "timestamp"),
        timeout_ms: vars.u64_with_default("RELAY_DATABASE_TIMEOUT_MS", 10_000)?,
    };
    if settings.timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "RELAY_DATABASE_TIMEOUT_MS".to_string(),
            "0".to_string(),
        ));
    }
    if settings.is_rest() && settings.key.is_none() {
        return Err(ConfigError::Missing("RELAY_DATABASE_KEY".to_string()));
    }
    Ok(settings)
}

fn read_dashboard(vars: &Vars<'_>, default_style: UrlStyle) -> Result<DashboardSettings, ConfigError> {
    let token = vars.required("RELAY_DASHBOARD_TOKEN")?;
    let base_url = vars.with_default("RELAY_DASHBOARD_URL", "https://blynk.cloud");
    let url_style = match vars.optional("RELAY_DASHBOARD_URL_STYLE") {
        None => default_style,
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "path" => UrlStyle::Path,
            "query" => UrlStyle::Query,
            _ => {
                return Err(ConfigError::Invalid(
                    "RELAY_DASHBOARD_URL_STYLE".to_string(),
                    value,
                ));
            }
        },
    };
    let timeout_ms = vars.u64_with_default("RELAY_DASHBOARD_TIMEOUT_MS", 10_000)?;
    Ok(DashboardSettings {
        base_url,
        token,
        url_style,
        timeout_ms,
    })
}

/// 托管平台通过 `PORT` 指定端口。
fn read_http_addr(vars: &Vars<'_>) -> String {
    if let Some(addr) = vars.optional("RELAY_HTTP_ADDR") {
        return addr;
    }
    match vars.optional("PORT") {
        Some(port) => format!("0.0.0.0:{}", port),
        None => "0.0.0.0:3000".to_string(),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// `field:pin` 以逗号分隔；空串表示不转发任何字段。
fn parse_pins(value: &str) -> Option<Vec<PinMapping>> {
    let mut pins = Vec::new();
    for item in parse_list(value) {
        let (field, pin) = item.split_once(':')?;
        let (field, pin) = (field.trim(), pin.trim());
        if field.is_empty() || pin.is_empty() {
            return None;
        }
        pins.push(PinMapping {
            field: field.to_string(),
            pin: pin.to_string(),
        });
    }
    Some(pins)
}

/// 环境变量读取辅助。
struct Vars<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> Vars<'a> {
    fn new(lookup: &'a dyn Fn(&str) -> Option<String>) -> Self {
        Self { lookup }
    }

    fn optional(&self, key: &str) -> Option<String> {
        match (self.lookup)(key) {
            Some(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    fn with_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn u16_with_default(&self, key: &str, default: u16) -> Result<u16, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(default);
        };
        value
            .parse::<u16>()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value))
    }

    fn u8_with_default(&self, key: &str, default: u8) -> Result<u8, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(default);
        };
        value
            .parse::<u8>()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value))
    }

    fn u64_with_default(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(default);
        };
        value
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value))
    }

    fn bool_with_default(&self, key: &str, default: bool) -> bool {
        match self.optional(key) {
            Some(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
            None => default,
        }
    }
}

use crate::now_epoch_ms;
use std::collections::BTreeMap;

/// 从 broker 收到的原始消息。
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub received_at_ms: i64,
}

impl InboundMessage {
    /// 以当前时间作为接收时间构造消息。
    pub fn now(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            received_at_ms: now_epoch_ms(),
        }
    }
}

/// 一条持久化的测量记录。
///
/// `ts_ms` 由中继在接收时赋值，不取自设备。写入后不可变。
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub topic: String,
    /// 配置的测量列；`None` 表示报文中没有该字段（落库为 NULL）。
    pub fields: BTreeMap<String, Option<f64>>,
    pub ts_ms: i64,
}

impl Reading {
    pub fn new(topic: impl Into<String>, ts_ms: i64) -> Self {
        Self {
            topic: topic.into(),
            fields: BTreeMap::new(),
            ts_ms,
        }
    }

    /// 追加一个测量字段（构造器风格）。
    pub fn with_field(mut self, name: impl Into<String>, value: Option<f64>) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// 读取字段值；字段不存在或为空时返回 `None`。
    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied().flatten()
    }
}

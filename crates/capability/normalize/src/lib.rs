//! 报文解码：JSON → `Reading`。

use domain::{InboundMessage, Reading};
use serde_json::Value;
use tracing::warn;

/// 解码错误；出现时消息被丢弃，不写库。
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is json null")]
    Null,
}

/// 按配置的测量字段解码一条消息。
///
/// 只要报文是合法 JSON 且不是 `null`，就得到一条 `Reading`：
/// - 字段缺失或为 `null` 时记为 `None`；
/// - 数字字符串按数字处理；
/// - 其余类型或非有限值记为 `None` 并记录 `field_not_numeric`；
/// - 顶层不是对象时所有字段为 `None`。
///
/// 多余的键忽略。时间戳取接收时间。
pub fn decode_reading(message: &InboundMessage, fields: &[String]) -> Result<Reading, DecodeError> {
    let value: Value = serde_json::from_slice(&message.payload)?;
    let object = match value {
        Value::Null => return Err(DecodeError::Null),
        Value::Object(object) => Some(object),
        _ => {
            warn!(target: "relay.normalize", topic = %message.topic, "payload_not_object");
            None
        }
    };

    let mut reading = Reading::new(message.topic.clone(), message.received_at_ms);
    for field in fields {
        let parsed = match object.as_ref().and_then(|object| object.get(field)) {
            None | Some(Value::Null) => None,
            Some(raw) => {
                let number = numeric(raw);
                if number.is_none() {
                    warn!(
                        target: "relay.normalize",
                        topic = %message.topic,
                        field = %field,
                        raw = %raw,
                        "field_not_numeric"
                    );
                }
                number
            }
        };
        reading.fields.insert(field.clone(), parsed);
    }
    Ok(reading)
}

fn numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

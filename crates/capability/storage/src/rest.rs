//! PostgREST 读数存储实现
//!
//! 适用于只开放 HTTP 接口的托管数据库（如 Supabase）：
//! - 写入：`POST {url}/rest/v1/{table}`，JSON 数组
//! - 最新一行：`GET {url}/rest/v1/{table}?select=*&order={ts}.desc&limit=1`
//!
//! 两个请求都携带 `apikey` 与 `Authorization: Bearer` 头。

use crate::error::StorageError;
use crate::models::TableSchema;
use crate::traits::ReadingStore;
use domain::Reading;
use serde_json::{Map, Value};
use time::format_description::well_known::{Iso8601, Rfc3339};
use std::time::Duration;
use time::{OffsetDateTime, PrimitiveDateTime};

pub struct RestReadingStore {
    client: reqwest::Client,
    endpoint: String,
    key: String,
    schema: TableSchema,
}

impl RestReadingStore {
    /// `timeout` 覆盖从建立连接到读完响应体的整个请求。
    pub fn new(
        base_url: &str,
        key: impl Into<String>,
        schema: TableSchema,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, key, schema))
    }

    fn with_client(
        client: reqwest::Client,
        base_url: &str,
        key: impl Into<String>,
        schema: TableSchema,
    ) -> Self {
        let endpoint = format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), schema.table);
        Self {
            client,
            endpoint,
            key: key.into(),
            schema,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.key)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", self.key))
    }
}

#[async_trait::async_trait]
impl ReadingStore for RestReadingStore {
    async fn insert_reading(&self, reading: &Reading) -> Result<(), StorageError> {
        let body = Value::Array(vec![Value::Object(row_from_reading(reading, &self.schema)?)]);
        let response = self
            .authorized(self.client.post(&self.endpoint))
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn latest_reading(&self) -> Result<Option<Reading>, StorageError> {
        let order = format!("{}.desc", self.schema.timestamp_column);
        let response = self
            .authorized(self.client.get(&self.endpoint))
            .query(&[("select", "*"), ("order", order.as_str()), ("limit", "1")])
            .send()
            .await?;
        let rows: Vec<Map<String, Value>> = ensure_success(response).await?.json().await?;
        match rows.first() {
            Some(row) => reading_from_row(row, &self.schema).map(Some),
            None => Ok(None),
        }
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::new(format!("postgrest status {}: {}", status, body)))
}

/// Reading → PostgREST 行对象。
pub fn row_from_reading(reading: &Reading, schema: &TableSchema) -> Result<Map<String, Value>, StorageError> {
    let mut row = Map::new();
    row.insert(schema.topic_column.clone(), Value::String(reading.topic.clone()));
    for field in &schema.fields {
        let value = reading
            .field(field)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
        row.insert(field.clone(), value);
    }
    row.insert(
        schema.timestamp_column.clone(),
        Value::String(format_timestamp(reading.ts_ms)?),
    );
    Ok(row)
}

/// PostgREST 行对象 → Reading。
pub fn reading_from_row(row: &Map<String, Value>, schema: &TableSchema) -> Result<Reading, StorageError> {
    let topic = match row.get(&schema.topic_column) {
        Some(Value::String(topic)) => topic.clone(),
        _ => String::new(),
    };
    let ts_ms = match row.get(&schema.timestamp_column) {
        Some(Value::String(raw)) => parse_timestamp(raw)?,
        _ => {
            return Err(StorageError::new(format!(
                "row has no {} column",
                schema.timestamp_column
            )));
        }
    };
    let mut reading = Reading::new(topic, ts_ms);
    for field in &schema.fields {
        let value = match row.get(field) {
            Some(Value::Number(number)) => number.as_f64(),
            // numeric/bigint 列可能以字符串返回
            Some(Value::String(text)) => text.parse::<f64>().ok(),
            _ => None,
        };
        reading.fields.insert(field.clone(), value);
    }
    Ok(reading)
}

fn format_timestamp(ts_ms: i64) -> Result<String, StorageError> {
    let datetime = OffsetDateTime::from_unix_timestamp_nanos(i128::from(ts_ms) * 1_000_000)
        .map_err(|err| StorageError::new(err.to_string()))?;
    datetime
        .format(&Rfc3339)
        .map_err(|err| StorageError::new(err.to_string()))
}

/// timestamptz 带时区偏移；timestamp 列没有偏移，按 UTC 处理。
fn parse_timestamp(raw: &str) -> Result<i64, StorageError> {
    let datetime = match OffsetDateTime::parse(raw, &Rfc3339) {
        Ok(datetime) => datetime,
        Err(_) => PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT)
            .map_err(|err| StorageError::new(format!("invalid timestamp {}: {}", raw, err)))?
            .assume_utc(),
    };
    Ok((datetime.unix_timestamp_nanos() / 1_000_000) as i64)
}

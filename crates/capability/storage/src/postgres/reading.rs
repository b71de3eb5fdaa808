//! Postgres 读数存储实现

use crate::error::StorageError;
use crate::models::TableSchema;
use crate::traits::ReadingStore;
use crate::validation::quote_identifier;
use domain::Reading;
use sqlx::{PgPool, Row};
use std::time::Duration;

pub struct PgReadingStore {
    pub pool: PgPool,
    insert_sql: String,
    latest_sql: String,
    fields: Vec<String>,
}

impl PgReadingStore {
    pub fn new(pool: PgPool, schema: TableSchema) -> Self {
        Self {
            pool,
            insert_sql: insert_sql(&schema),
            latest_sql: latest_sql(&schema),
            fields: schema.fields,
        }
    }

    /// 连接在第一次写入或读取时建立。
    pub fn connect_lazy(
        database_url: &str,
        schema: TableSchema,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url, timeout)?;
        Ok(Self::new(pool, schema))
    }
}

/// `insert into t (topic, f1.., ts) values ($1, $2.., to_timestamp($n / 1000.0))`
fn insert_sql(schema: &TableSchema) -> String {
    let mut columns = vec![quote_identifier(&schema.topic_column)];
    let mut params = vec!["$1".to_string()];
    for (index, field) in schema.fields.iter().enumerate() {
        columns.push(quote_identifier(field));
        params.push(format!("${}", index + 2));
    }
    columns.push(quote_identifier(&schema.timestamp_column));
    params.push(format!("to_timestamp(${} / 1000.0)", schema.fields.len() + 2));
    format!(
        "insert into {} ({}) values ({})",
        quote_identifier(&schema.table),
        columns.join(", "),
        params.join(", ")
    )
}

/// 按列位置读取：0 = topic，1 = ts_ms，2.. = 测量列。
fn latest_sql(schema: &TableSchema) -> String {
    let ts = quote_identifier(&schema.timestamp_column);
    let mut columns = vec![
        format!("{}::text", quote_identifier(&schema.topic_column)),
        format!("(extract(epoch from {}) * 1000)::bigint", ts),
    ];
    for field in &schema.fields {
        columns.push(format!("{}::double precision", quote_identifier(field)));
    }
    format!(
        "select {} from {} order by {} desc limit 1",
        columns.join(", "),
        quote_identifier(&schema.table),
        ts
    )
}

#[async_trait::async_trait]
impl ReadingStore for PgReadingStore {
    async fn insert_reading(&self, reading: &Reading) -> Result<(), StorageError> {
        let mut query = sqlx::query(&self.insert_sql).bind(&reading.topic);
        for field in &self.fields {
            query = query.bind(reading.field(field));
        }
        query
            .bind(reading.ts_ms as f64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn latest_reading(&self) -> Result<Option<Reading>, StorageError> {
        let row = sqlx::query(&self.latest_sql)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let topic: Option<String> = row.try_get(0)?;
        let ts_ms: i64 = row.try_get(1)?;
        let mut reading = Reading::new(topic.unwrap_or_default(), ts_ms);
        for (index, field) in self.fields.iter().enumerate() {
            let value: Option<f64> = row.try_get(index + 2)?;
            reading.fields.insert(field.clone(), value);
        }
        Ok(Some(reading))
    }
}

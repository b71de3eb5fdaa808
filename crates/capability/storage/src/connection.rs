//! 数据库连接管理
//!
//! - connect_pool：建立 Postgres 连接池（惰性连接）
//! - open_reading_store：按连接地址选择存储实现

use crate::error::StorageError;
use crate::models::TableSchema;
use crate::postgres::PgReadingStore;
use crate::rest::RestReadingStore;
use crate::traits::ReadingStore;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// 建立 Postgres 连接池
///
/// 最大连接数限制为 8；并发的写入与读取共享该池。
/// 启动时不建立连接：数据库不可达时错误出现在每次写入或读取上。
///
/// # 参数
/// - `database_url`：Postgres 连接字符串
/// - `timeout`：获取连接的等待上限，同时作为服务端 `statement_timeout`
///
/// 需要在 tokio 运行时内调用。
pub fn connect_pool(database_url: &str, timeout: Duration) -> Result<PgPool, StorageError> {
    let options = PgConnectOptions::from_str(database_url)?
        .options([("statement_timeout", timeout.as_millis())]);
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .acquire_timeout(timeout)
        .connect_lazy_with(options);
    Ok(pool)
}

/// 按地址选择读数存储
///
/// - `http://` / `https://`：PostgREST，必须提供 `key`
/// - 其他：Postgres 连接串
///
/// 每次数据库请求都以 `timeout` 为上限。
pub fn open_reading_store(
    database_url: &str,
    key: Option<&str>,
    schema: TableSchema,
    timeout: Duration,
) -> Result<Arc<dyn ReadingStore>, StorageError> {
    if database_url.starts_with("http://") || database_url.starts_with("https://") {
        let key = key.ok_or_else(|| StorageError::new("postgrest requires an api key"))?;
        return Ok(Arc::new(RestReadingStore::new(database_url, key, schema, timeout)?));
    }
    Ok(Arc::new(PgReadingStore::connect_lazy(database_url, schema, timeout)?))
}

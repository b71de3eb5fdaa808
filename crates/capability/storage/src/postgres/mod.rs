//! # PostgreSQL 存储实现模块
//!
//! 使用 sqlx 参数化查询；表名与列名来自已校验的 [`TableSchema`](crate::TableSchema)。
//!
//! ## 数据库模式要求
//!
//! ```sql
//! create table sensor_data (
//!     id bigserial primary key,
//!     topic text not null,
//!     temperature double precision,
//!     humidity double precision,
//!     "timestamp" timestamptz not null
//! );
//! create index on sensor_data ("timestamp" desc);
//! ```

pub mod reading;

pub use reading::*;

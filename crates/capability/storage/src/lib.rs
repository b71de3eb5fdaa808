//! # Relay Storage 模块
//!
//! 读数表的存储抽象与实现。
//!
//! ## 模块说明
//!
//! - [`traits`]：`ReadingStore` 接口（写入一行、读取最新一行）
//! - [`models`]：`TableSchema`（表名、列名、测量列）
//! - [`validation`]：SQL 标识符校验
//! - [`connection`]：PostgreSQL 连接池
//! - [`error`]：存储错误类型
//!
//! ## 存储实现
//!
//! - [`postgres`]：sqlx 直连 PostgreSQL
//! - [`rest`]：PostgREST（Supabase 等托管数据库）HTTP 接口
//! - [`in_memory`]：内存实现，用于测试
//!
//! 读数写入后不可变，接口上没有更新与删除。

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod rest;
pub mod traits;
pub mod validation;

pub use connection::*;
pub use error::*;
pub use models::*;
pub use traits::*;
pub use validation::*;

pub use in_memory::InMemoryReadingStore;
pub use postgres::PgReadingStore;
pub use rest::{RestReadingStore, reading_from_row, row_from_reading};

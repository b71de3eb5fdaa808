//! 内存存储实现模块
//!
//! 仅用于本地测试。

pub mod reading;

pub use reading::*;

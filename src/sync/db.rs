//! SQLite 数据库工具：统一创建连接池并执行 sqlx 迁移
//!
//! 约定：本 crate 根目录下存在 `migrations/` 目录，存放所有迁移 SQL 文件。
//! 通过 `sqlx::migrate!()` 自动管理 schema 升级，库不存在时会创建 `syncs` 表，
//! 已存在时迁移为空操作，不会改动已有记录。

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// 打开数据库最多尝试次数
const OPEN_ATTEMPTS: u32 = 5;

/// 创建 SQLite 连接池并执行所有未执行的迁移
///
/// 多个连接池同时初始化同一个库文件时，后到的一方可能因写冲突或重复登记迁移而失败；
/// 重试时迁移已被对方登记，会直接成为空操作。
pub async fn create_sqlite_pool_with_migration(db_url: &str) -> Result<Pool<Sqlite>> {
    let mut attempt = 1;
    loop {
        match try_create_pool(db_url).await {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < OPEN_ATTEMPTS => {
                warn!(
                    "[DB] 打开数据库失败（第 {} 次），稍后重试: {:#}",
                    attempt, e
                );
                tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn try_create_pool(db_url: &str) -> Result<Pool<Sqlite>> {
    let options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("无效的 SQLite URL: {}", db_url))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("连接SQLite数据库失败: {}", db_url))?;

    // 从 `migrations/` 目录读取迁移并执行
    if let Err(e) = sqlx::migrate!().run(&pool).await {
        pool.close().await;
        return Err(e).context("执行数据库迁移失败");
    }

    Ok(pool)
}

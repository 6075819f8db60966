//! 同步记录数据访问层（DAO）
//!
//! 负责 `syncs` 表的打开、读取和写入，读改写在同一个事务内完成。

use crate::sync::db::create_sqlite_pool_with_migration;
use crate::sync::error::SyncError;
use crate::sync::models::SyncRecord;
use sqlx::sqlite::SqliteConnection;
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, error, info, warn};

/// 同步记录 DAO（基于 sqlx）
#[derive(Clone)]
pub struct SyncDao {
    db: Pool<Sqlite>,
}

impl SyncDao {
    /// 打开数据库（不存在时创建表结构）
    pub async fn open(db_url: &str) -> Result<Self, SyncError> {
        debug!("[SyncDAO] 打开数据库: {}", db_url);
        let db = create_sqlite_pool_with_migration(db_url)
            .await
            .map_err(|e| {
                error!("[SyncDAO] 打开数据库失败: {:#}", e);
                SyncError::DbOpen
            })?;
        info!("[SyncDAO] 数据库已就绪: {}", db_url);
        Ok(Self { db })
    }

    /// 关闭连接池
    pub async fn close(&self) {
        self.db.close().await;
    }

    /// 查询某个同步类型的记录
    pub async fn get_sync_record(&self, sync_type: &str) -> Result<Option<SyncRecord>, SyncError> {
        let row = sqlx::query("SELECT type, time, sync_count FROM syncs WHERE type = ?")
            .bind(sync_type)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                error!("[SyncDAO] 查询同步记录失败: {}", e);
                SyncError::DbRead
            })?;

        row.map(|r| row_to_record(&r)).transpose()
    }

    /// 更新同步时间并累加同步次数，返回新的同步次数
    ///
    /// 读取和写入在同一个 `BEGIN IMMEDIATE` 事务中执行：事务开始即持有写锁，
    /// 并发写入方在 busy_timeout 内排队等待，任一步失败都会回滚。
    pub async fn update_sync_time(&self, sync_type: &str, sync_time: i64) -> Result<i64, SyncError> {
        let mut conn = self.db.acquire().await.map_err(|e| {
            error!("[SyncDAO] 获取数据库连接失败: {}", e);
            SyncError::DbRead
        })?;

        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                error!("[SyncDAO] 开启事务失败: {}", e);
                SyncError::DbRead
            })?;

        let data = match Self::read_modify_write(&mut conn, sync_type, sync_time).await {
            Ok(data) => data,
            Err(e) => {
                if let Err(rollback_err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    warn!("[SyncDAO] 回滚事务失败: {}", rollback_err);
                }
                return Err(e);
            }
        };

        if let Err(e) = sqlx::query("COMMIT").execute(&mut *conn).await {
            error!("[SyncDAO] 提交事务失败: {}", e);
            if let Err(rollback_err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                warn!("[SyncDAO] 回滚事务失败: {}", rollback_err);
            }
            return Err(SyncError::DbWrite);
        }

        debug!(
            "[SyncDAO] 同步记录已更新 - 类型: {}, 次数: {}, 时间: {}",
            data.sync_type, data.sync_count, data.time
        );
        Ok(data.sync_count)
    }

    /// 事务内读取记录、更新时间和次数并写回
    async fn read_modify_write(
        conn: &mut SqliteConnection,
        sync_type: &str,
        sync_time: i64,
    ) -> Result<SyncRecord, SyncError> {
        let row = sqlx::query("SELECT type, time, sync_count FROM syncs WHERE type = ?")
            .bind(sync_type)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                error!("[SyncDAO] 读取同步记录失败: {}", e);
                SyncError::DbRead
            })?;

        let current = match row {
            Some(r) => row_to_record(&r)?,
            None => {
                debug!("[SyncDAO] 同步类型 {} 暂无记录，使用默认值", sync_type);
                SyncRecord::empty(sync_type)
            }
        };
        let data = current.touch(sync_time);

        sqlx::query(
            r#"
            INSERT INTO syncs (type, time, sync_count) VALUES (?, ?, ?)
            ON CONFLICT(type) DO UPDATE SET
                time = excluded.time,
                sync_count = excluded.sync_count
            "#,
        )
        .bind(&data.sync_type)
        .bind(data.time)
        .bind(data.sync_count)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            error!("[SyncDAO] 写入同步记录失败: {}", e);
            SyncError::DbWrite
        })?;

        Ok(data)
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<SyncRecord, SyncError> {
    let decode = || -> Result<SyncRecord, sqlx::Error> {
        Ok(SyncRecord {
            sync_type: row.try_get("type")?,
            time: row.try_get("time")?,
            sync_count: row.try_get("sync_count")?,
        })
    };
    decode().map_err(|e| {
        error!("[SyncDAO] 解析同步记录失败: {}", e);
        SyncError::DbRead
    })
}

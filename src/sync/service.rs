//! 后台同步服务层
//!
//! 一次同步按固定顺序执行：拉取资源 → 解析 JSON → 打开数据库 → 读改写记录 → 上报结果。
//! 任一步失败都会直接跳到失败上报，错误不会逃出本次调用。

use crate::sync::api::{build_http_client, parse_payload, SyncApi};
use crate::sync::dao::SyncDao;
use crate::sync::error::SyncError;
use crate::sync::listener::{ClientRegistry, EmptyNotificationListener, NotificationListener};
use crate::sync::models::{SyncEvent, SyncHandlerConfig, SyncOutcome};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 失败时展示的通用通知
pub const SYNC_FAILED_NOTICE: &str = "Sync fired! There was an error.";

/// 单次同步的执行阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Fetching,
    Parsing,
    PersistenceOpen,
    PersistenceReadModifyWrite,
    ReportingSuccess,
    ReportingFailure,
}

/// 后台同步处理器
pub struct SyncHandler {
    config: SyncHandlerConfig,
    api: SyncApi,
    listener: Arc<dyn NotificationListener>,
    clients: ClientRegistry,
    /// `cache_store` 开启时复用的 DAO；关闭时仅用于串行化打开过程
    cached_dao: Mutex<Option<SyncDao>>,
    /// 按同步类型划分的读改写锁
    type_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SyncHandler {
    /// 创建新的同步处理器（使用默认空监听器，无客户端）
    pub fn new(config: SyncHandlerConfig) -> Result<Self> {
        Self::with_listener(
            config,
            Arc::new(EmptyNotificationListener),
            ClientRegistry::new(),
        )
    }

    /// 创建新的同步处理器（带自定义监听器和客户端注册表）
    pub fn with_listener(
        config: SyncHandlerConfig,
        listener: Arc<dyn NotificationListener>,
        clients: ClientRegistry,
    ) -> Result<Self> {
        let api = SyncApi::new(build_http_client()?, config.resource_url());
        info!(
            "[SyncHandler] 创建同步处理器，资源: {}, 数据库: {}, 同步类型: {}",
            api.resource_url(),
            config.db_url(),
            config.sync_type
        );
        Ok(Self {
            config,
            api,
            listener,
            clients,
            cached_dao: Mutex::new(None),
            type_locks: Mutex::new(HashMap::new()),
        })
    }

    /// 处理一次同步事件，保证最终一定会展示成功或失败通知
    pub async fn handle_sync(&self, event: &SyncEvent) -> SyncOutcome {
        let operation_id = Uuid::new_v4().to_string();
        info!(
            "[SyncHandler] 🔄 收到同步事件: tag={}, 操作ID: {}",
            event.tag, operation_id
        );

        let outcome = match self.run_sync(&operation_id).await {
            Ok((sync_count, list_version)) => {
                self.enter(SyncPhase::ReportingSuccess, &operation_id);
                self.report_success(sync_count, &list_version).await;
                SyncOutcome::Success {
                    sync_count,
                    list_version,
                }
            }
            Err(e) => {
                let message = e.to_string();
                self.enter(SyncPhase::ReportingFailure, &operation_id);
                self.report_failure(&message).await;
                SyncOutcome::Failure { message }
            }
        };

        self.enter(SyncPhase::Idle, &operation_id);
        outcome
    }

    /// 执行拉取、解析和持久化，返回新的同步次数和列表版本
    async fn run_sync(&self, operation_id: &str) -> Result<(i64, String), SyncError> {
        self.enter(SyncPhase::Fetching, operation_id);
        let text = self.api.fetch_sample_text(operation_id).await?;

        self.enter(SyncPhase::Parsing, operation_id);
        let payload = parse_payload(&text)?;

        self.enter(SyncPhase::PersistenceOpen, operation_id);
        let dao = self.open_store().await?;

        self.enter(SyncPhase::PersistenceReadModifyWrite, operation_id);
        let result = {
            let _guard = match self.type_lock().await {
                Some(lock) => Some(lock.lock_owned().await),
                None => None,
            };
            let now_ms = chrono::Utc::now().timestamp_millis();
            dao.update_sync_time(&self.config.sync_type, now_ms).await
        };

        if !self.config.cache_store {
            dao.close().await;
        }

        // 读取列表版本在持久化之后，payload 不是对象时计数已经累加
        let sync_count = result?;
        Ok((sync_count, payload.list_version_text()?))
    }

    /// 打开数据库，`cache_store` 开启时只打开一次
    ///
    /// 同一处理器内的打开过程互斥，避免并发调用同时初始化表结构。
    async fn open_store(&self) -> Result<SyncDao, SyncError> {
        let mut cached = self.cached_dao.lock().await;
        if !self.config.cache_store {
            return SyncDao::open(&self.config.db_url()).await;
        }

        if let Some(dao) = cached.as_ref() {
            return Ok(dao.clone());
        }
        let dao = SyncDao::open(&self.config.db_url()).await?;
        *cached = Some(dao.clone());
        Ok(dao)
    }

    async fn type_lock(&self) -> Option<Arc<Mutex<()>>> {
        if !self.config.serialize_per_type {
            return None;
        }
        let mut locks = self.type_locks.lock().await;
        Some(
            locks
                .entry(self.config.sync_type.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone(),
        )
    }

    async fn report_success(&self, sync_count: i64, list_version: &str) {
        info!(
            "[SyncHandler] ✅ 同步成功 - 次数: {}, 列表版本: {}",
            sync_count, list_version
        );
        self.listener
            .on_show_notification(format!(
                "Sync fired! ({}) Fetched list v{}",
                sync_count, list_version
            ))
            .await;
    }

    async fn report_failure(&self, message: &str) {
        error!("[SyncHandler] ❌ 同步失败: {}", message);
        self.listener
            .on_show_notification(SYNC_FAILED_NOTICE.to_string())
            .await;
        self.listener.on_show_notification(message.to_string()).await;
        self.clients.broadcast(message).await;
    }

    fn enter(&self, phase: SyncPhase, operation_id: &str) {
        debug!("[SyncHandler] 阶段: {:?}, 操作ID: {}", phase, operation_id);
    }

    /// 持续消费同步事件，每个事件在独立任务中处理
    ///
    /// 所有注册句柄被丢弃后返回，返回前会等待进行中的同步结束。
    pub async fn listen(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<SyncEvent>) {
        info!("[SyncHandler] 📥 开始监听同步事件");
        let mut tasks = JoinSet::new();

        while let Some(event) = rx.recv().await {
            let handler = self.clone();
            tasks.spawn(async move { handler.handle_sync(&event).await });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("[SyncHandler] 同步任务异常结束: {}", e);
            }
        }
        info!("[SyncHandler] 同步事件监听结束");
    }

    /// 关闭复用的连接池
    pub async fn close(&self) {
        if let Some(dao) = self.cached_dao.lock().await.take() {
            dao.close().await;
            debug!("[SyncHandler] 已关闭复用的数据库连接池");
        }
    }
}

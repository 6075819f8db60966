//! 同步事件注册入口
//!
//! 外部通过 [`SyncRegistration::register`] 投递同步事件，
//! 由 [`SyncHandler::listen`](crate::sync::service::SyncHandler::listen) 消费。

use crate::sync::models::SyncEvent;
use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::debug;

/// 同步事件注册句柄，可克隆后在多处投递事件
#[derive(Clone)]
pub struct SyncRegistration {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl SyncRegistration {
    /// 创建注册句柄及其对应的事件接收端
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// 投递一次同步事件
    pub fn register(&self, tag: &str) -> Result<()> {
        debug!("[SyncRegistration] 投递同步事件: tag={}", tag);
        self.tx
            .send(SyncEvent::new(tag))
            .map_err(|_| anyhow!("同步处理器已停止，无法投递事件: {}", tag))
    }
}

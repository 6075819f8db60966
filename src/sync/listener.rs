//! 同步结果上报接口：通知监听器与观察者客户端

use async_trait::async_trait;
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// 通知监听器回调接口（对应宿主环境的通知展示能力）
#[async_trait]
pub trait NotificationListener: Send + Sync {
    /// 展示一条通知
    async fn on_show_notification(&self, title: String);
}

/// 默认空实现（无操作）
pub struct EmptyNotificationListener;

#[async_trait]
impl NotificationListener for EmptyNotificationListener {
    async fn on_show_notification(&self, _title: String) {}
}

/// 已连接的观察者客户端
#[async_trait]
pub trait SyncClient: Send + Sync {
    /// 接收后台处理器发来的消息
    async fn post_message(&self, message: String);
}

struct RegisteredClient {
    client: Arc<dyn SyncClient>,
    controlled: bool,
}

/// 观察者客户端注册表
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<RwLock<Vec<RegisteredClient>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册客户端，`controlled` 表示该客户端是否已被当前处理器接管
    pub async fn add_client(&self, client: Arc<dyn SyncClient>, controlled: bool) {
        let mut clients = self.clients.write().await;
        clients.push(RegisteredClient { client, controlled });
        debug!(
            "[ClientRegistry] 新增客户端，controlled={}，当前共 {} 个",
            controlled,
            clients.len()
        );
    }

    /// 枚举客户端，`include_uncontrolled` 为 false 时只返回已接管的客户端
    pub async fn match_all(&self, include_uncontrolled: bool) -> Vec<Arc<dyn SyncClient>> {
        self.clients
            .read()
            .await
            .iter()
            .filter(|c| include_uncontrolled || c.controlled)
            .map(|c| c.client.clone())
            .collect()
    }

    /// 向所有客户端（包括未接管的）广播消息
    pub async fn broadcast(&self, message: &str) {
        let clients = self.match_all(true).await;
        debug!("[ClientRegistry] 广播消息给 {} 个客户端", clients.len());
        join_all(
            clients
                .iter()
                .map(|client| client.post_message(message.to_string())),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Inbox(Mutex<Vec<String>>);

    #[async_trait]
    impl SyncClient for Inbox {
        async fn post_message(&self, message: String) {
            self.0.lock().await.push(message);
        }
    }

    #[tokio::test]
    async fn match_all_filters_uncontrolled() {
        let registry = ClientRegistry::new();
        registry.add_client(Arc::new(Inbox::default()), true).await;
        registry.add_client(Arc::new(Inbox::default()), false).await;

        assert_eq!(registry.match_all(false).await.len(), 1);
        assert_eq!(registry.match_all(true).await.len(), 2);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_client() {
        let registry = ClientRegistry::new();
        let controlled = Arc::new(Inbox::default());
        let uncontrolled = Arc::new(Inbox::default());
        registry.add_client(controlled.clone(), true).await;
        registry.add_client(uncontrolled.clone(), false).await;

        registry.broadcast("boom").await;

        assert_eq!(*controlled.0.lock().await, vec!["boom".to_string()]);
        assert_eq!(*uncontrolled.0.lock().await, vec!["boom".to_string()]);
    }
}

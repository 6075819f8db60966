//! 后台同步模块
//!
//! 收到同步事件后拉取 JSON 资源、在本地数据库记录同步信息，并通过通知上报结果

pub mod api;
pub mod dao;
pub mod db;
pub mod error;
pub mod listener;
pub mod models;
pub mod registration;
pub mod service;

// 重新导出主要类型和函数
pub use api::SyncApi;
pub use dao::SyncDao;
pub use error::SyncError;
pub use listener::{ClientRegistry, EmptyNotificationListener, NotificationListener, SyncClient};
pub use models::{FetchedPayload, SyncEvent, SyncHandlerConfig, SyncOutcome, SyncRecord};
pub use registration::SyncRegistration;
pub use service::{SyncHandler, SyncPhase};

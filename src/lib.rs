pub mod sync;

// 重新导出常用类型，方便外部使用
pub use sync::{
    ClientRegistry, NotificationListener, SyncClient, SyncError, SyncEvent, SyncHandler,
    SyncHandlerConfig, SyncOutcome, SyncRecord, SyncRegistration,
};

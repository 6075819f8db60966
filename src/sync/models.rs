//! 后台同步本地模型定义

use crate::sync::error::SyncError;
use serde::{Deserialize, Serialize};

/// 默认同步类型
pub const DEFAULT_SYNC_TYPE: &str = "one-shot";

/// 远端资源路径
pub const SAMPLE_RESOURCE_PATH: &str = "/BackgroundSync/demo/sample.json";

/// 默认数据库文件名
pub const DEFAULT_DB_PATH: &str = "BgSyncDemoDB.sqlite";

/// 同步记录（每个同步类型一行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// 同步类型，唯一键
    #[serde(rename = "type")]
    pub sync_type: String,
    /// 上次成功同步时间（毫秒）
    pub time: i64,
    /// 成功同步次数
    #[serde(rename = "syncCount")]
    pub sync_count: i64,
}

impl SyncRecord {
    /// 不存在记录时使用的默认值
    pub fn empty(sync_type: &str) -> Self {
        Self {
            sync_type: sync_type.to_string(),
            time: 0,
            sync_count: 0,
        }
    }

    /// 记录一次成功同步
    pub fn touch(mut self, now_ms: i64) -> Self {
        self.time = now_ms;
        self.sync_count += 1;
        self
    }
}

/// 拉取到的 JSON 数据，只在一次同步处理期间存在
#[derive(Debug, Clone)]
pub struct FetchedPayload(pub serde_json::Value);

impl FetchedPayload {
    /// 通知文本中展示的列表版本号
    ///
    /// 按字符串拼接的规则渲染：字符串原样输出，整数值的浮点数不带小数部分，
    /// 数组按逗号连接元素，对象为 `[object Object]`，字段缺失为 `undefined`。
    /// 整个 JSON 为 null 时无法读取字段，返回错误。
    pub fn list_version_text(&self) -> Result<String, SyncError> {
        match &self.0 {
            serde_json::Value::Null => Err(SyncError::Payload(
                "Cannot read properties of null (reading 'list_version')".to_string(),
            )),
            serde_json::Value::Object(map) => Ok(map
                .get("list_version")
                .map(concat_text)
                .unwrap_or_else(|| "undefined".to_string())),
            _ => Ok("undefined".to_string()),
        }
    }
}

/// JSON 值参与字符串拼接时的文本
fn concat_text(value: &serde_json::Value) -> String {
    use serde_json::Value;
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            // f64 的 Display 对整数值不输出小数部分
            (_, _, Some(f)) => f.to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => concat_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// 外部投递的同步事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    pub tag: String,
}

impl SyncEvent {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

/// 单次同步的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Success {
        sync_count: i64,
        list_version: String,
    },
    Failure {
        message: String,
    },
}

/// 同步处理器配置
#[derive(Debug, Clone)]
pub struct SyncHandlerConfig {
    /// API 基础 URL（不含资源路径）
    pub api_base_url: String,
    /// 数据库路径（SQLite），可以是：
    /// - 相对路径：如 "BgSyncDemoDB.sqlite"
    /// - 绝对路径：如 "/path/to/db.sqlite"
    /// - 完整URL：如 "sqlite://db.sqlite?mode=rwc" 直接使用
    pub db_path: String,
    /// 持久化使用的同步类型
    pub sync_type: String,
    /// 是否按同步类型串行化读改写
    pub serialize_per_type: bool,
    /// 是否在多次同步之间复用同一个连接池
    pub cache_store: bool,
}

impl Default for SyncHandlerConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            db_path: DEFAULT_DB_PATH.to_string(),
            sync_type: DEFAULT_SYNC_TYPE.to_string(),
            serialize_per_type: false,
            cache_store: false,
        }
    }
}

impl SyncHandlerConfig {
    /// 资源完整 URL
    pub fn resource_url(&self) -> String {
        format!(
            "{}{}",
            self.api_base_url.trim_end_matches('/'),
            SAMPLE_RESOURCE_PATH
        )
    }

    /// 数据库连接 URL
    pub fn db_url(&self) -> String {
        normalize_db_url(&self.db_path)
    }
}

/// 将文件路径转换为 sqlx 可用的 SQLite URL，完整 URL 原样返回
pub fn normalize_db_url(db_path: &str) -> String {
    if db_path.starts_with("sqlite:") {
        db_path.to_string()
    } else {
        format!("sqlite://{}?mode=rwc", db_path)
    }
}

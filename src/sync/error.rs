//! 后台同步错误定义
//!
//! 所有错误最终都走同一条失败上报路径，这里只负责给出可读的错误消息。

/// 一次后台同步中可能出现的错误
///
/// `Display` 输出即为通知和客户端广播里使用的消息文本。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// 网络层失败（连接失败、读取 body 失败等）
    #[error("{0}")]
    Network(String),

    /// HTTP 状态码不是 200
    #[error("{status} {status_text}")]
    HttpStatus { status: u16, status_text: String },

    /// JSON 解析失败，保留解析器原始错误文本
    #[error("{0}")]
    Parse(String),

    /// 拉取到的数据无法读取 `list_version`（如整个 JSON 为 null）
    #[error("{0}")]
    Payload(String),

    /// 打开（或初始化）数据库失败
    #[error("Error opening database.")]
    DbOpen,

    /// 读取记录失败
    #[error("Error getting value from database.")]
    DbRead,

    /// 写入（或提交）记录失败
    #[error("Error saving value to database.")]
    DbWrite,
}

impl SyncError {
    /// 由状态码和服务器返回的原因短语构造状态错误
    ///
    /// 服务器没有给出非标准短语时，statusText 取标准原因短语。
    pub fn from_status(status: reqwest::StatusCode, reason: Option<&str>) -> Self {
        let status_text = reason
            .or_else(|| status.canonical_reason())
            .unwrap_or_default();
        SyncError::HttpStatus {
            status: status.as_u16(),
            status_text: status_text.to_string(),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_is_code_and_text() {
        let err = SyncError::HttpStatus {
            status: 500,
            status_text: "Server Error".to_string(),
        };
        assert_eq!(err.to_string(), "500 Server Error");
    }

    #[test]
    fn from_status_uses_canonical_reason() {
        let err = SyncError::from_status(reqwest::StatusCode::NOT_FOUND, None);
        assert_eq!(err.to_string(), "404 Not Found");
    }

    #[test]
    fn from_status_prefers_server_reason() {
        let err = SyncError::from_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            Some("Server Error"),
        );
        assert_eq!(err.to_string(), "500 Server Error");
    }

    #[test]
    fn database_messages_are_fixed() {
        assert_eq!(SyncError::DbOpen.to_string(), "Error opening database.");
        assert_eq!(
            SyncError::DbRead.to_string(),
            "Error getting value from database."
        );
        assert_eq!(
            SyncError::DbWrite.to_string(),
            "Error saving value to database."
        );
    }

    #[test]
    fn parse_error_keeps_parser_text() {
        let parser_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let text = parser_err.to_string();
        let err: SyncError = parser_err.into();
        assert_eq!(err.to_string(), text);
    }
}

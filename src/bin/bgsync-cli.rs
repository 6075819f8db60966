//! 后台同步 CLI（演示版）
//!
//! 非交互式 CLI：按参数投递若干次同步事件，通知和客户端消息都输出到日志，
//! 结束前打印数据库中的同步记录

use anyhow::{Context, Result};
use bgsync_demo::sync::listener::{ClientRegistry, NotificationListener, SyncClient};
use bgsync_demo::sync::{SyncDao, SyncHandler, SyncHandlerConfig, SyncRegistration};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

/// 后台同步 CLI
#[derive(Parser, Debug)]
#[command(name = "bgsync-cli")]
#[command(about = "后台同步 CLI - 拉取示例资源并记录同步次数", long_about = None)]
struct Args {
    /// 资源服务器基础 URL
    #[arg(short, long, default_value = "http://localhost:8080")]
    base_url: String,

    /// 数据库路径（默认: BgSyncDemoDB.sqlite）
    #[arg(long, default_value = "BgSyncDemoDB.sqlite")]
    db: String,

    /// 同步事件 tag
    #[arg(short, long, default_value = "one-shot")]
    tag: String,

    /// 投递的同步事件数量
    #[arg(short, long, default_value = "1")]
    count: u32,

    /// 按同步类型串行化读改写
    #[arg(long)]
    serialize: bool,

    /// 日志级别（默认: info,bgsync_demo=debug）
    #[arg(long, default_value = "info,bgsync_demo=debug")]
    log_level: String,

    /// 日志文件
    #[arg(long, default_value = "bgsync.log")]
    log_file: String,
}

/// 初始化日志（同时输出到 stdout 和文件）
fn init_logger(log_level: &str, log_file: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("无法创建日志文件 {}", log_file))?;

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    // 文件不需要颜色
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("[CLI] 📝 日志已同时输出到控制台和文件: {}", log_file);
    Ok(())
}

struct CliNotificationListener;

#[async_trait::async_trait]
impl NotificationListener for CliNotificationListener {
    async fn on_show_notification(&self, title: String) {
        info!("[CLI/Notification] 🔔 {}", title);
    }
}

struct CliClient;

#[async_trait::async_trait]
impl SyncClient for CliClient {
    async fn post_message(&self, message: String) {
        warn!("[CLI/Client] 📨 收到后台消息: {}", message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level, &args.log_file)?;

    info!("[CLI] 🚀 后台同步 CLI");
    info!(
        "[CLI] 🌐 资源服务器: {}, 🗄️ 数据库: {}, 次数: {}",
        args.base_url, args.db, args.count
    );

    let config = SyncHandlerConfig {
        api_base_url: args.base_url.clone(),
        db_path: args.db.clone(),
        serialize_per_type: args.serialize,
        ..Default::default()
    };
    let db_url = config.db_url();
    let sync_type = config.sync_type.clone();

    let clients = ClientRegistry::new();
    clients.add_client(Arc::new(CliClient), false).await;

    let handler = Arc::new(SyncHandler::with_listener(
        config,
        Arc::new(CliNotificationListener),
        clients,
    )?);

    let (registration, rx) = SyncRegistration::channel();
    let listening = tokio::spawn(handler.clone().listen(rx));

    for _ in 0..args.count {
        registration.register(&args.tag)?;
    }
    drop(registration);

    listening.await.context("同步事件监听任务异常结束")?;
    handler.close().await;

    match SyncDao::open(&db_url).await {
        Ok(dao) => {
            match dao.get_sync_record(&sync_type).await {
                Ok(Some(record)) => info!(
                    "[CLI] 📋 同步记录: {}",
                    serde_json::to_string(&record).context("序列化同步记录失败")?
                ),
                Ok(None) => info!("[CLI] 📋 同步类型 {} 暂无记录", sync_type),
                Err(e) => warn!("[CLI] 读取同步记录失败: {}", e),
            }
            dao.close().await;
        }
        Err(e) => warn!("[CLI] 打开数据库失败: {}", e),
    }

    info!("[CLI] 👋 程序退出");
    Ok(())
}

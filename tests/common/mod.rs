pub mod json_server;

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

pub fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::EnvFilter;

        // 测试中默认打开当前 crate 和 sqlx 的 debug，关闭底层 HTTP 客户端的 debug 噪音
        let filter_layer =
            EnvFilter::new("info,bgsync_demo=debug,sqlx=info,hyper_util::client=info,reqwest=info");

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_test_writer();

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    });
}

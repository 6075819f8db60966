//! 集成测试用的最小 HTTP/1.1 服务器
//!
//! 对每个请求都返回同一个状态行和 body，随后关闭连接，并统计收到的请求数

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

pub struct JsonServer {
    /// 不带结尾斜杠的基础 URL，如 "http://127.0.0.1:12345"
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl JsonServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// 在后台线程启动服务器，`status` 为状态行中协议版本之后的部分，
/// 如 "200 OK" 或 "500 Server Error"。服务器一直运行到进程退出
pub fn start(status: &str, body: &str) -> JsonServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let hits = Arc::new(AtomicUsize::new(0));
    let response = Arc::new(format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    ));
    let counter = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let response = Arc::clone(&response);
            let counter = Arc::clone(&counter);
            thread::spawn(move || handle(stream, &response, &counter));
        }
    });
    JsonServer {
        base_url: format!("http://127.0.0.1:{}", port),
        hits,
    }
}

/// 返回一个没有任何服务监听的基础 URL
pub fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

fn handle(mut stream: std::net::TcpStream, response: &str, hits: &AtomicUsize) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    hits.fetch_add(1, Ordering::SeqCst);
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

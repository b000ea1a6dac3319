//! Common test utilities
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use rsaspnet::{ConfigManager, ScanConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use wiremock::MockServer;

/// 安装测试日志输出，RUST_LOG 控制级别；重复调用无副作用
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// mock 服务器的 `host:port`，作为扫描目标域名
pub fn domain_of(server: &MockServer) -> String {
    server.address().to_string()
}

/// 只发送响应头和一小段响应体、之后一直不再发送数据的服务器
/// 每个连接只读一次请求，TLS 握手会收到明文响应而失败
pub async fn start_stalled_body_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stalled server");
    let addr = listener.local_addr().expect("stalled server address");

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                if socket.read(&mut buf).await.is_err() {
                    return;
                }
                let head = "HTTP/1.1 200 OK\r\n\
                            Content-Type: text/html\r\n\
                            X-Powered-By: ASP.NET\r\n\
                            Content-Length: 1048576\r\n\r\n<html><body>";
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });

    addr
}

/// 快速失败的测试配置：短超时、短退避
pub fn fast_config(retry_count: u32, allow_http_fallback: bool) -> ScanConfig {
    ConfigManager::custom()
        .retry_count(retry_count)
        .retry_backoff_base(Duration::from_millis(20))
        .per_attempt_timeout(Duration::from_secs(2))
        .allow_http_fallback(allow_http_fallback)
        .user_agent("rsaspnet-test/0.1")
        .build()
}

/// 典型 Web Forms 页面
pub const WEBFORMS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Login</title></head>
<body>
<form method="post" action="./Login.aspx" id="form1">
<input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="/wEPDwUKLTcxNjI5MzU2NWRk" />
<script src="/WebResource.axd?d=pynGkmcFUV13He1Qd6_TZA&amp;t=638250000000000000" type="text/javascript"></script>
</form>
</body>
</html>"#;

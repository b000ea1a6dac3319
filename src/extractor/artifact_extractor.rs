//! 响应快照提取器
//! 将一次完成的HTTP响应转为标准化的 ArtifactSnapshot：
//! 状态码、最终URL、小写Header表、Set-Cookie列表、限长响应体、耗时

use std::time::{Duration, Instant};

use reqwest::Response;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{AspNetError, AspResult};
use crate::rule::ArtifactSnapshot;
use crate::utils::HeaderConverter;

/// 限长读取的响应体
#[derive(Debug, Default)]
struct CapturedBody {
    bytes: Vec<u8>,
    truncated: bool,
}

/// 响应快照提取器
pub struct ArtifactExtractor;

impl ArtifactExtractor {
    /// 提取快照
    /// - `started`：扫描开始时刻，耗时在 Header/Cookie 采集完成时截止
    /// - `read_timeout`：读取响应体的总时限，超时保留已读取部分
    /// 响应在函数返回时被释放（包括取消路径）
    pub async fn extract(
        domain: &str,
        mut response: Response,
        max_body_bytes: usize,
        read_timeout: Duration,
        started: Instant,
        cancel: &CancellationToken,
    ) -> AspResult<ArtifactSnapshot> {
        let status_code = Some(response.status().as_u16());
        let final_url = Some(response.url().clone());
        let headers = HeaderConverter::flatten(response.headers());
        let cookies = HeaderConverter::cookies(response.headers());
        let elapsed = started.elapsed();

        let body = Self::read_capped_body(&mut response, max_body_bytes, read_timeout, cancel).await?;
        drop(response);

        debug!(
            "[Extract] {} | status={:?} | headers={} | cookies={} | body={}B{} | elapsed={:?}",
            domain,
            status_code,
            headers.len(),
            cookies.len(),
            body.bytes.len(),
            if body.truncated { " (truncated)" } else { "" },
            elapsed
        );

        let captured_bytes = body.bytes.len();
        let body_text = (!body.bytes.is_empty())
            .then(|| String::from_utf8_lossy(&body.bytes).into_owned());

        Ok(ArtifactSnapshot {
            domain: domain.to_string(),
            status_code,
            final_url,
            headers,
            cookies,
            body_text,
            captured_bytes,
            body_truncated: body.truncated,
            elapsed,
        })
    }

    /// 按块流式读取响应体，累计达到上限即停止，不会缓冲完整响应体
    async fn read_capped_body(
        response: &mut Response,
        max_body_bytes: usize,
        read_timeout: Duration,
        cancel: &CancellationToken,
    ) -> AspResult<CapturedBody> {
        let deadline = tokio::time::Instant::now() + read_timeout;
        let mut body = CapturedBody {
            bytes: Vec::with_capacity(max_body_bytes.min(16 * 1024)),
            truncated: false,
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AspNetError::Cancelled),
                next = tokio::time::timeout_at(deadline, response.chunk()) => next,
            };

            let chunk = match next {
                Ok(Ok(Some(chunk))) => chunk,
                Ok(Ok(None)) => break,
                Ok(Err(e)) => {
                    warn!("响应体读取中断，保留已读取的 {} 字节：{}", body.bytes.len(), e);
                    break;
                }
                Err(_) => {
                    warn!("响应体读取超时（{:?}），保留已读取的 {} 字节", read_timeout, body.bytes.len());
                    break;
                }
            };

            let remaining = max_body_bytes - body.bytes.len();
            if chunk.len() > remaining {
                body.bytes.extend_from_slice(&chunk[..remaining]);
                body.truncated = true;
                break;
            }
            body.bytes.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

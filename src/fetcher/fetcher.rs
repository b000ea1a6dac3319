//! Resilient fetcher module
//! 带重试的单页抓取器
//! 核心特性：
//! 1. 可重试条件：传输错误 / 5xx / 单次超时
//! 2. 指数退避，第 k 次重试前等待 base * 2^(k-1)，无抖动
//! 3. 每次尝试独立计时；可选的扫描总时限会压缩单次超时，也会截断退避
//! 4. 所有挂起点（发送、退避、读取）都响应取消信号
//! 5. 2xx-4xx 直接返回，状态码的含义交给检测引擎判断

use std::time::{Duration, Instant};

use reqwest::header::ACCEPT;
use reqwest::{Client, Response, redirect};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::FetchPolicy;
use crate::error::{AspNetError, AspResult, FetchFailure};
use crate::rule::Scheme;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";

/// 一次成功抓取
#[derive(Debug)]
pub struct Fetched {
    pub response: Response,
    pub scheme: Scheme,
    /// 实际发起的请求次数（含首次）
    pub attempts: u32,
}

/// 某一协议的重试全部失败
#[derive(Debug)]
pub struct FetchExhausted {
    pub scheme: Scheme,
    pub attempts: u32,
    /// 最后一次尝试的失败原因
    pub failure: FetchFailure,
}

impl From<FetchExhausted> for AspNetError {
    fn from(e: FetchExhausted) -> Self {
        AspNetError::from_fetch(e.scheme, e.attempts, e.failure)
    }
}

/// 带重试的抓取器
/// 内部的 reqwest::Client 是线程安全的连接池，克隆开销很小
#[derive(Debug, Clone)]
pub struct ResilientFetcher {
    client: Client,
    policy: FetchPolicy,
}

impl ResilientFetcher {
    /// 按策略构建独立的 HTTP 客户端
    pub fn new(policy: FetchPolicy) -> AspResult<Self> {
        let client = Client::builder()
            .user_agent(policy.user_agent.as_str())
            .redirect(redirect::Policy::limited(policy.max_redirects))
            .build()?;
        Ok(Self { client, policy })
    }

    /// 复用调用方提供的共享客户端
    pub fn with_client(client: Client, policy: FetchPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// GET `scheme://domain/`，按策略重试
    /// - `deadline`：扫描总时限的截止时刻（可选）
    pub async fn fetch(
        &self,
        domain: &str,
        use_https: bool,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<Fetched, FetchExhausted> {
        let scheme = Scheme::from_https(use_https);
        let url = format!("{}://{}/", scheme.as_str(), domain);
        let max_attempts = self.policy.max_attempts();
        let exhausted = |attempts, failure| FetchExhausted {
            scheme,
            attempts,
            failure,
        };

        let mut attempt = 0;
        let mut last_failure: Option<FetchFailure> = None;
        loop {
            if attempt > 0 {
                let backoff = self.policy.backoff_for(attempt);
                // 退避结束前总时限就会耗尽，则不再等待
                if Self::remaining(deadline).is_some_and(|remaining| remaining <= backoff) {
                    debug!("[Fetch] {} 退避 {:?} 超出总时限，停止重试", url, backoff);
                    return Err(exhausted(attempt, FetchFailure::deadline_after(last_failure)));
                }
                debug!("[Fetch] {} 第 {} 次重试，等待 {:?}", url, attempt, backoff);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(exhausted(attempt, FetchFailure::Cancelled)),
                    _ = tokio::time::sleep(backoff) => {}
                }
            }

            let Some(timeout) = self.attempt_timeout(deadline) else {
                return Err(exhausted(attempt, FetchFailure::deadline_after(last_failure)));
            };

            attempt += 1;
            let failure = match self.attempt(&url, timeout, cancel).await {
                Ok(response) if response.status().as_u16() >= 500 => {
                    FetchFailure::ServerError(response.status())
                }
                Ok(response) => {
                    debug!(
                        "[Fetch] {} -> {} | 尝试次数: {}",
                        url,
                        response.status(),
                        attempt
                    );
                    return Ok(Fetched {
                        response,
                        scheme,
                        attempts: attempt,
                    });
                }
                Err(failure) => failure,
            };

            if !failure.is_retryable() || attempt >= max_attempts {
                debug!("[Fetch] {} 终止 | 尝试次数: {} | 原因: {}", url, attempt, failure);
                return Err(exhausted(attempt, failure));
            }
            warn!(
                "Request failed, retrying (attempt {}/{}): {} - {}",
                attempt, max_attempts, url, failure
            );
            last_failure = Some(failure);
        }
    }

    fn remaining(deadline: Option<Instant>) -> Option<Duration> {
        deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// 单次尝试的超时：单次超时与总时限剩余时间取较小值；总时限已耗尽时返回 None
    fn attempt_timeout(&self, deadline: Option<Instant>) -> Option<Duration> {
        let per_attempt = self.policy.per_attempt_timeout;
        match Self::remaining(deadline) {
            None => Some(per_attempt),
            Some(remaining) => (!remaining.is_zero()).then(|| per_attempt.min(remaining)),
        }
    }

    /// 单次请求，超时与取消都在这里生效
    async fn attempt(
        &self,
        url: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Response, FetchFailure> {
        let request = self.client.get(url).header(ACCEPT, ACCEPT_HTML).send();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchFailure::Cancelled),
            result = tokio::time::timeout(timeout, request) => match result {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(e)) if e.is_timeout() => Err(FetchFailure::Timeout(timeout)),
                Ok(Err(e)) => Err(FetchFailure::Transport(e)),
                Err(_) => Err(FetchFailure::Timeout(timeout)),
            },
        }
    }
}

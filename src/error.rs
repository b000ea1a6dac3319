//! 全局错误类型定义
use std::any::Any;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use url::ParseError as UrlParseError;

use crate::rule::model::Scheme;

/// 单次请求尝试的失败原因
/// Fetcher 依据 `is_retryable` 决定是否重试，Scanner 依据最终结果决定是否回退到 HTTP
#[derive(Error, Debug)]
pub enum FetchFailure {
    #[error("传输层错误：{0}")]
    Transport(#[source] reqwest::Error),
    #[error("请求超时（{0:?}）")]
    Timeout(Duration),
    #[error("服务端错误状态码：{0}")]
    ServerError(StatusCode),
    #[error("请求已取消")]
    Cancelled,
    /// 携带总时限耗尽前最后一次尝试的失败原因（若有）
    #[error("扫描总时限已耗尽{}", last_cause(.last))]
    DeadlineExceeded {
        #[source]
        last: Option<Box<FetchFailure>>,
    },
}

fn last_cause(last: &Option<Box<FetchFailure>>) -> String {
    match last {
        Some(failure) => format!("（最后一次失败：{}）", failure),
        None => String::new(),
    }
}

impl FetchFailure {
    /// 传输错误 / 5xx / 单次超时可重试；取消与总时限耗尽立即终止
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchFailure::Transport(_) | FetchFailure::Timeout(_) | FetchFailure::ServerError(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchFailure::Cancelled)
    }

    pub fn deadline_after(last: Option<FetchFailure>) -> Self {
        FetchFailure::DeadlineExceeded {
            last: last.map(Box::new),
        }
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, FetchFailure::DeadlineExceeded { .. })
    }
}

#[derive(Error, Debug)]
pub enum AspNetError {
    // 输入相关错误
    #[error("无效输入：{0}")]
    InvalidInput(String),

    // 网络相关错误
    #[error("{scheme} 请求在 {attempts} 次尝试后失败：{source}")]
    TerminalFetchFailure {
        scheme: Scheme,
        attempts: u32,
        #[source]
        source: FetchFailure,
    },
    #[error("扫描已被调用方取消")]
    Cancelled,
    #[error("扫描任务异常退出：{0}")]
    TaskPanicked(String),
    #[error("HTTP 客户端初始化失败：{0}")]
    HttpClientInit(#[from] reqwest::Error),

    // 外部证据来源错误（仅用于日志与备注，不会中断扫描）
    #[error("证据来源 [{provider}] 执行失败：{reason}")]
    EnrichmentProviderFailure { provider: String, reason: String },

    // 序列化错误
    #[error("JSON序列化失败：{0}")]
    Json(#[from] SerdeJsonError),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] UrlParseError),
}

impl AspNetError {
    /// 由某一协议的最终失败构造错误；取消会被单独归类
    pub fn from_fetch(scheme: Scheme, attempts: u32, failure: FetchFailure) -> Self {
        if failure.is_cancelled() {
            return AspNetError::Cancelled;
        }
        AspNetError::TerminalFetchFailure {
            scheme,
            attempts,
            source: failure,
        }
    }
}

// 全局Result类型
pub type AspResult<T> = Result<T, AspNetError>;

/// 取出 panic 负载中的文本
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

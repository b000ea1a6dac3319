//! 检测数据模型定义
//! 仅存储数据，无任何业务逻辑，支持序列化/反序列化

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::signal::Signal;
use crate::config::duration_ms;
use crate::error::AspResult;

/// 请求协议
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Https,
    Http,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Https => "https",
            Scheme::Http => "http",
        }
    }

    pub fn from_https(use_https: bool) -> Self {
        if use_https { Scheme::Https } else { Scheme::Http }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// 单条证据：一次信号命中
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub signal: Signal,
    pub description: String,
    pub matched_value: String,
    pub weight: i32,
}

impl Evidence {
    pub fn new(
        signal: Signal,
        description: impl Into<String>,
        matched_value: impl Into<String>,
        weight: i32,
    ) -> Self {
        Self {
            signal,
            description: description.into(),
            matched_value: matched_value.into(),
            weight,
        }
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:+}] {}: {}", self.weight, self.description, self.matched_value)
    }
}

/// 置信度分档，按分数单调递增
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfidenceBand {
    Low,
    Medium,
    High,
    Certain,
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfidenceBand::Low => "Low",
            ConfidenceBand::Medium => "Medium",
            ConfidenceBand::High => "High",
            ConfidenceBand::Certain => "Certain",
        };
        f.write_str(s)
    }
}

/// 检测结论
/// 不变量：score == evidence 权重之和
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub score: i32,
    pub confidence: ConfidenceBand,
    /// Some(true)=是 / Some(false)=否 / None=未知（边界区间）
    pub verdict: Option<bool>,
    pub evidence: Vec<Evidence>,
}

/// 单次响应的标准化快照
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactSnapshot {
    pub domain: String,
    pub status_code: Option<u16>,
    pub final_url: Option<Url>,
    /// 小写 Header 名 → 值，同名后写覆盖
    pub headers: HashMap<String, String>,
    /// Set-Cookie 拆分后的原始 Cookie 串，保持顺序
    pub cookies: Vec<String>,
    pub body_text: Option<String>,
    /// 解码前实际读取的响应体字节数
    pub captured_bytes: usize,
    /// 响应体是否因上限被截断
    pub body_truncated: bool,
    /// 从扫描开始到 Header/Cookie 采集完成的耗时
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl ArtifactSnapshot {
    /// 仅包含域名的空快照
    pub fn empty(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    /// 大小写不敏感的 Header 读取
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn server_header(&self) -> Option<&str> {
        self.header("server")
    }

    /// 非空响应体
    pub fn body(&self) -> Option<&str> {
        self.body_text.as_deref().filter(|b| !b.is_empty())
    }
}

/// 单个域名的扫描结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub domain: String,
    pub scheme: Scheme,
    pub verdict: Option<bool>,
    pub score: i32,
    pub confidence: ConfidenceBand,
    pub server_header: Option<String>,
    pub framework_version: Option<String>,
    pub artifacts: ArtifactSnapshot,
    pub notes: Vec<String>,
    pub evidence: Vec<Evidence>,
}

impl ScanResult {
    pub fn to_compact_json(&self) -> AspResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_pretty_json(&self) -> AspResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn verdict_label(&self) -> &'static str {
        match self.verdict {
            Some(true) => "yes",
            Some(false) => "no",
            None => "unknown",
        }
    }
}

// ======== 为 ScanResult 实现 Display trait（用于日志输出） ========
impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] aspnet={} score={} confidence={}",
            self.domain,
            self.scheme.as_str(),
            self.verdict_label(),
            self.score,
            self.confidence
        )?;
        if let Some(server) = &self.server_header {
            write!(f, " server={}", server)?;
        }
        Ok(())
    }
}

//! 全局配置管理,存储所有可配置项
//! 配置在进程启动时构建一次，之后以只读方式在并发扫描间共享

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 默认 User-Agent
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; rsaspnet/0.1)";
/// 默认响应体截断上限（256 KiB）
pub const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024;

/// 请求策略：重试、超时与协议回退
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchPolicy {
    /// 重试次数（不含第一次请求）
    pub retry_count: u32,
    /// 单次请求超时，每次重试重新计时
    #[serde(with = "duration_ms")]
    pub per_attempt_timeout: Duration,
    /// 退避基数，第 k 次重试前等待 base * 2^(k-1)
    #[serde(with = "duration_ms")]
    pub retry_backoff_base: Duration,
    /// HTTPS 失败后是否回退到 HTTP
    pub allow_http_fallback: bool,
    /// 单个域名扫描的总时限；设置后单次超时不会超过剩余时间
    #[serde(default, with = "opt_duration_ms")]
    pub scan_deadline: Option<Duration>,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            retry_count: 2,
            per_attempt_timeout: Duration::from_secs(10),
            retry_backoff_base: Duration::from_millis(500),
            allow_http_fallback: true,
            scan_deadline: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 10,
        }
    }
}

impl FetchPolicy {
    /// 第 `retry` 次重试（从 1 开始）前的退避时长，无抖动
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        self.retry_backoff_base.saturating_mul(1u32 << exp)
    }

    /// 最大尝试次数（首次 + 重试）
    pub fn max_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }
}

/// 判定阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// score >= true_at 判定为是
    pub true_at: i32,
    /// score < borderline_at 判定为否，两者之间为未知
    pub borderline_at: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            true_at: 7,
            borderline_at: 4,
        }
    }
}

/// 扫描全局配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub fetch: FetchPolicy,
    pub thresholds: Thresholds,
    /// 响应体最大读取字节数
    pub max_body_bytes: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            fetch: FetchPolicy::default(),
            thresholds: Thresholds::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> ScanConfig {
        ScanConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（链式 API）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: ScanConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry_count(mut self, count: u32) -> Self {
        self.config.fetch.retry_count = count;
        self
    }

    pub fn per_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch.per_attempt_timeout = timeout;
        self
    }

    pub fn retry_backoff_base(mut self, base: Duration) -> Self {
        self.config.fetch.retry_backoff_base = base;
        self
    }

    pub fn allow_http_fallback(mut self, allow: bool) -> Self {
        self.config.fetch.allow_http_fallback = allow;
        self
    }

    pub fn scan_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.config.fetch.scan_deadline = deadline;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.fetch.user_agent = ua.into();
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.fetch.max_redirects = max;
        self
    }

    pub fn thresholds(mut self, true_at: i32, borderline_at: i32) -> Self {
        self.config.thresholds = Thresholds {
            true_at,
            borderline_at,
        };
        self
    }

    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.config.max_body_bytes = max;
        self
    }

    pub fn build(self) -> ScanConfig {
        self.config
    }
}

/// Duration 以毫秒整数序列化
pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

pub(crate) mod opt_duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

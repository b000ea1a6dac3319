//! 单域名扫描器
//! 流程：校验 → HTTPS 抓取 → (失败且允许时) HTTP 抓取 → 提取快照 → 外部证据 → 评分
//! 取消信号不会触发协议回退，直接向上返回

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::enrichment::EvidenceProvider;
use crate::config::ScanConfig;
use crate::detector::DetectionEngine;
use crate::error::{AspNetError, AspResult, panic_message};
use crate::extractor::ArtifactExtractor;
use crate::fetcher::{Fetched, ResilientFetcher};
use crate::rule::{ArtifactSnapshot, Evidence, ScanResult, SignalCatalog};
use crate::utils::{VersionExtractor, validate_domain};

/// 可解析框架版本的 Header，按优先级排列
const VERSION_HEADERS: &[&str] = &["x-aspnetmvc-version", "x-aspnet-version", "x-powered-by"];

/// 域名扫描器
/// 克隆开销很小，可在并发任务间共享
#[derive(Clone)]
pub struct DomainScanner {
    fetcher: ResilientFetcher,
    engine: DetectionEngine,
    config: Arc<ScanConfig>,
    providers: Vec<Arc<dyn EvidenceProvider>>,
}

impl DomainScanner {
    /// 使用默认信号目录创建扫描器
    pub fn new(config: ScanConfig) -> AspResult<Self> {
        Self::with_catalog(config, Arc::new(SignalCatalog::default()))
    }

    /// 使用自定义信号目录创建扫描器
    pub fn with_catalog(config: ScanConfig, catalog: Arc<SignalCatalog>) -> AspResult<Self> {
        let fetcher = ResilientFetcher::new(config.fetch.clone())?;
        let engine = DetectionEngine::new(catalog, config.thresholds);
        Ok(Self {
            fetcher,
            engine,
            config: Arc::new(config),
            providers: Vec::new(),
        })
    }

    /// 注册外部证据来源，按注册顺序调用
    pub fn with_provider(mut self, provider: Arc<dyn EvidenceProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn engine(&self) -> &DetectionEngine {
        &self.engine
    }

    /// 扫描单个域名（不可取消）
    pub async fn scan_one(&self, domain: &str) -> AspResult<ScanResult> {
        self.scan_one_with_cancel(domain, &CancellationToken::new()).await
    }

    /// 扫描单个域名
    pub async fn scan_one_with_cancel(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> AspResult<ScanResult> {
        let domain = validate_domain(domain)?;
        let started = Instant::now();
        let deadline = self.config.fetch.scan_deadline.map(|budget| started + budget);
        let mut notes = Vec::new();

        let fetched = self.fetch_with_fallback(domain, deadline, cancel, &mut notes).await?;
        let Fetched {
            response,
            scheme,
            attempts,
        } = fetched;
        if attempts > 1 {
            notes.push(format!("{} succeeded after {} attempts", scheme, attempts));
        }

        let read_timeout = self.body_read_timeout(deadline);
        let artifacts = ArtifactExtractor::extract(
            domain,
            response,
            self.config.max_body_bytes,
            read_timeout,
            started,
            cancel,
        )
        .await?;
        if artifacts.body_truncated {
            notes.push(format!(
                "Response body truncated at {} bytes",
                artifacts.captured_bytes
            ));
        }

        let external = self.collect_external(domain, &artifacts, cancel, &mut notes).await?;
        let outcome = self.engine.evaluate(&artifacts, Some(&external));
        let framework_version = VersionExtractor::from_snapshot(&artifacts, VERSION_HEADERS);

        let result = ScanResult {
            domain: domain.to_string(),
            scheme,
            verdict: outcome.verdict,
            score: outcome.score,
            confidence: outcome.confidence,
            server_header: artifacts.server_header().map(str::to_string),
            framework_version,
            artifacts,
            notes,
            evidence: outcome.evidence,
        };
        info!("{}", result);
        Ok(result)
    }

    /// HTTPS 优先，失败后按配置回退 HTTP；两者均失败时返回最后一个错误
    async fn fetch_with_fallback(
        &self,
        domain: &str,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
        notes: &mut Vec<String>,
    ) -> AspResult<Fetched> {
        let https_err = match self.fetcher.fetch(domain, true, deadline, cancel).await {
            Ok(fetched) => return Ok(fetched),
            Err(e) => e,
        };
        if https_err.failure.is_cancelled() {
            return Err(AspNetError::Cancelled);
        }
        notes.push(format!("HTTPS request failed: {}", https_err.failure));
        if !self.fetcher.policy().allow_http_fallback {
            debug!("[Scan] {} HTTPS 失败且未开启 HTTP 回退", domain);
            return Err(https_err.into());
        }
        if https_err.failure.is_deadline_exceeded() {
            return Err(https_err.into());
        }

        info!("[Scan] {} HTTPS 失败，回退到 HTTP：{}", domain, https_err.failure);
        match self.fetcher.fetch(domain, false, deadline, cancel).await {
            Ok(fetched) => {
                notes.push("Fell back to HTTP".to_string());
                Ok(fetched)
            }
            Err(http_err) => {
                notes.push(format!("HTTP request failed: {}", http_err.failure));
                Err(http_err.into())
            }
        }
    }

    /// 读取响应体的时限：单次超时，且不超过扫描总时限剩余时间
    fn body_read_timeout(&self, deadline: Option<Instant>) -> Duration {
        let per_attempt = self.config.fetch.per_attempt_timeout;
        match deadline {
            Some(deadline) => per_attempt.min(deadline.saturating_duration_since(Instant::now())),
            None => per_attempt,
        }
    }

    /// 依次调用外部证据来源；单个来源返回错误或 panic 都只记录日志与备注
    async fn collect_external(
        &self,
        domain: &str,
        artifacts: &ArtifactSnapshot,
        cancel: &CancellationToken,
        notes: &mut Vec<String>,
    ) -> AspResult<Vec<Evidence>> {
        let mut external = Vec::new();

        for provider in &self.providers {
            let collected = AssertUnwindSafe(provider.collect(domain, artifacts)).catch_unwind();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AspNetError::Cancelled),
                result = collected => result,
            };

            let reason = match result {
                Ok(Ok(evidence)) => {
                    debug!(
                        "[Enrich] {} | 来源: {} | 证据数: {}",
                        domain,
                        provider.name(),
                        evidence.len()
                    );
                    external.extend(evidence);
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };

            let failure = AspNetError::EnrichmentProviderFailure {
                provider: provider.name().to_string(),
                reason,
            };
            warn!("[Enrich] {} | {}", domain, failure);
            notes.push(failure.to_string());
        }

        Ok(external)
    }
}

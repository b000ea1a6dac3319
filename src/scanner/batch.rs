//! 批量扫描：信号量限制并发，单个域名失败不影响整批

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::scanner::DomainScanner;
use crate::error::{AspNetError, panic_message};
use crate::rule::ScanResult;

/// 批量扫描报告，成功与失败分开收集，均保持输入顺序
#[derive(Debug, Default)]
pub struct BatchReport {
    pub successes: Vec<ScanResult>,
    pub failures: Vec<(String, AspNetError)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

/// 批量扫描器
#[derive(Clone)]
pub struct BatchScanner {
    scanner: DomainScanner,
}

impl BatchScanner {
    pub fn new(scanner: DomainScanner) -> Self {
        Self { scanner }
    }

    /// 并发扫描一组域名，同时进行的扫描数不超过 `concurrency`（最少为 1）
    pub async fn scan_many<I, S>(
        &self,
        domains: I,
        concurrency: usize,
        cancel: &CancellationToken,
    ) -> BatchReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut set = JoinSet::new();

        for (index, domain) in domains.into_iter().enumerate() {
            let sem = Arc::clone(&semaphore);
            let scanner = self.scanner.clone();
            let cancel = cancel.clone();
            let domain: String = domain.into();

            set.spawn(async move {
                let _permit = sem.acquire().await;
                let result = AssertUnwindSafe(scanner.scan_one_with_cancel(&domain, &cancel))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        Err(AspNetError::TaskPanicked(panic_message(payload.as_ref())))
                    });
                (index, domain, result)
            });
        }

        let mut finished = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(item) => finished.push(item),
                // 任务内的 panic 已转换为 TaskPanicked，这里只剩运行时中止
                Err(e) => warn!("[Batch] 扫描任务被中止：{}", e),
            }
        }
        finished.sort_by_key(|(index, _, _)| *index);

        let mut report = BatchReport::default();
        for (_, domain, result) in finished {
            match result {
                Ok(scan) => report.successes.push(scan),
                Err(e) => {
                    warn!("[Batch] {} 扫描失败：{}", domain, e);
                    report.failures.push((domain, e));
                }
            }
        }

        info!(
            "[Batch] 完成 | 成功: {} | 失败: {}",
            report.successes.len(),
            report.failures.len()
        );
        report
    }
}

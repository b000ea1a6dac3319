//! 外部证据来源
//! 抓取成功后、评分之前调用；来源失败不会中断扫描

use async_trait::async_trait;

use crate::error::AspResult;
use crate::rule::{ArtifactSnapshot, Evidence};

/// 外部证据来源（技术画像、内容分析等）
/// 返回的证据原样追加到检测结果中，权重由来源自行决定
#[async_trait]
pub trait EvidenceProvider: Send + Sync {
    /// 来源名称，用于日志与备注
    fn name(&self) -> &str;

    async fn collect(&self, domain: &str, artifacts: &ArtifactSnapshot) -> AspResult<Vec<Evidence>>;
}

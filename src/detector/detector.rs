//! 检测引擎核心：整合各类分析器，输出评分与判定
use std::sync::Arc;

use tracing::debug;

use super::analyzer::{Analyzer, CookieAnalyzer, HeaderAnalyzer, HtmlAnalyzer, UrlAnalyzer};
use crate::config::Thresholds;
use crate::rule::{ArtifactSnapshot, ConfidenceBand, Evidence, Outcome, SignalCatalog};

/// 检测引擎
/// 纯函数式评估，无内部可变状态，可在线程间共享
#[derive(Debug, Clone)]
pub struct DetectionEngine {
    catalog: Arc<SignalCatalog>,
    thresholds: Thresholds,
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::new(Arc::new(SignalCatalog::default()), Thresholds::default())
    }
}

impl DetectionEngine {
    pub fn new(catalog: Arc<SignalCatalog>, thresholds: Thresholds) -> Self {
        Self { catalog, thresholds }
    }

    pub fn catalog(&self) -> &SignalCatalog {
        &self.catalog
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// 评估快照
    /// 证据按 Header → Cookie → HTML → URL → 外部证据 的顺序追加
    pub fn evaluate(&self, artifacts: &ArtifactSnapshot, external: Option<&[Evidence]>) -> Outcome {
        let mut evidence = Vec::new();

        HeaderAnalyzer::analyze(&self.catalog, artifacts, &mut evidence);
        CookieAnalyzer::analyze(&self.catalog, artifacts, &mut evidence);
        HtmlAnalyzer::analyze(&self.catalog, artifacts, &mut evidence);
        UrlAnalyzer::analyze(&self.catalog, artifacts, &mut evidence);

        if let Some(external) = external {
            evidence.extend_from_slice(external);
        }

        // 外部证据的权重不受控，按饱和加法累计
        let score = evidence.iter().fold(0i32, |acc, e| acc.saturating_add(e.weight));
        let (verdict, confidence) = classify(score, &self.thresholds);

        debug!(
            "[Engine] {} | score={} | confidence={} | verdict={:?} | evidence={}",
            artifacts.domain,
            score,
            confidence,
            verdict,
            evidence.len()
        );

        Outcome {
            score,
            confidence,
            verdict,
            evidence,
        }
    }
}

/// 分数到 (判定, 置信度) 的映射
/// - 判定：>= true_at 为 true，< borderline_at 为 false，其余未知
/// - 置信度：>= true_at + 2 为 Certain
pub fn classify(score: i32, thresholds: &Thresholds) -> (Option<bool>, ConfidenceBand) {
    let verdict = if score >= thresholds.true_at {
        Some(true)
    } else if score < thresholds.borderline_at {
        Some(false)
    } else {
        None
    };

    let confidence = if score >= thresholds.true_at.saturating_add(2) {
        ConfidenceBand::Certain
    } else if score >= thresholds.true_at {
        ConfidenceBand::High
    } else if score >= thresholds.borderline_at {
        ConfidenceBand::Medium
    } else {
        ConfidenceBand::Low
    };

    (verdict, confidence)
}

/// 使用默认信号目录与阈值评估
pub fn evaluate(artifacts: &ArtifactSnapshot, external: Option<&[Evidence]>) -> Outcome {
    DetectionEngine::default().evaluate(artifacts, external)
}

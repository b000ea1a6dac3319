//! rsaspnet - 基于多信号加权评分的 ASP.NET 站点指纹识别

// 导出全局错误类型
pub use self::error::{AspNetError, AspResult, FetchFailure};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, FetchPolicy, ScanConfig, Thresholds};

// 导出规则模块核心接口
pub use self::rule::{
    ArtifactSnapshot, ConfidenceBand, Evidence, Matcher, Outcome, ScanResult, Scheme, Signal,
    SignalCatalog,
};

// 导出提取模块核心接口
pub use self::extractor::{ArtifactExtractor, ScriptSourceFinder};

// 导出工具模块核心接口
pub use self::utils::{HeaderConverter, VersionExtractor, normalize_domains, validate_domain};

// 导出抓取与检测模块核心接口
pub use self::detector::{DetectionEngine, evaluate};
pub use self::fetcher::ResilientFetcher;

// 导出扫描模块核心接口
pub use self::scanner::{BatchReport, BatchScanner, DomainScanner, EvidenceProvider};

// 声明所有子模块
pub mod config;
pub mod detector;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod rule;
pub mod scanner;
pub mod utils;

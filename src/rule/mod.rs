//! 规则模块：信号目录、匹配器与数据模型定义
pub mod matcher;
pub mod model;
pub mod signal;

// 导出核心接口
pub use self::matcher::Matcher;
pub use self::model::{
    ArtifactSnapshot, ConfidenceBand, Evidence, Outcome, ScanResult, Scheme,
};
pub use self::signal::{AspNetRules, Signal, SignalCatalog};

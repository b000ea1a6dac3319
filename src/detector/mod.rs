//! 检测模块：ASP.NET 指纹评分核心逻辑
pub mod analyzer;
pub mod detector;

// 导出核心接口
pub use self::analyzer::{Analyzer, CookieAnalyzer, HeaderAnalyzer, HtmlAnalyzer, UrlAnalyzer};
pub use self::detector::{DetectionEngine, classify, evaluate};

//! 版本提取工具模块
//! 从版本标记头 / X-Powered-By 中提取框架版本号，仅用于展示

use once_cell::sync::Lazy;
use regex::Regex;

use crate::rule::ArtifactSnapshot;

static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+){1,3})").unwrap());

/// 版本提取工具类
pub struct VersionExtractor;

impl VersionExtractor {
    /// 从 Header 值中提取第一个形如 `4.0.30319` 的版本号
    pub fn extract(value: &str) -> Option<String> {
        VERSION_REGEX
            .captures(value)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// 按优先级依次尝试给定的 Header，返回第一个可解析出的版本
    pub fn from_snapshot(snapshot: &ArtifactSnapshot, header_names: &[&str]) -> Option<String> {
        header_names
            .iter()
            .filter_map(|name| snapshot.header(name))
            .find_map(Self::extract)
    }
}
